use std::collections::HashMap;

use chrono::naive::NaiveDate;
use lazy_static::lazy_static;
use serde::Deserialize;


#[derive(Deserialize,Clone,Copy,Debug,PartialEq,Eq,Hash)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Bg,
    En,
}

lazy_static! {
    static ref STRINGS: HashMap<(Locale,&'static str),&'static str> = {
	let table: &[(&'static str, &'static str, &'static str)] = &[
	    ("common.generation_date", "Генерирано на %d.%m.%Y", "Generated on %d.%m.%Y"),
	    ("common.week", "Седмица", "Week"),
	    ("common.cases", "Брой случаи", "Number of cases"),
	    ("cases.infected", "Заразени", "Infected"),
	    ("cases.cured", "Излекувани", "Cured"),
	    ("cases.fatal", "Жертви", "Fatal"),
	    ("cases.hospitalized", "Хоспитализирани", "Hospitalized"),
	    ("cases.intensive_care", "Интензивни грижи", "Intensive care"),
	    ("week_cases.title", "Хронология на случаите по седмици", "Weekly case chronology"),
	    ("forecast.title", "14-дневна прогноза на заболеваемостта", "14-day incidence forecast"),
	    ("forecast.reported", "Отчетени случаи", "Reported cases"),
	    ("forecast.predicted", "Предсказани случаи", "Predicted cases"),
	    ("forecast.rt", "Моментно репродуктивно число (Rt)", "Instantaneous reproduction number (Rt)"),
	    ("forecast.predicted_rt", "Предсказано моментно репродуктивно число (Rt*)",
	     "Predicted instantaneous reproduction number (Rt*)"),
	    ("forecast.rt_axis", "Моментно репродуктивно число, Rt", "Instantaneous reproduction number, Rt"),
	    ("active.title", "Активни случаи", "Active cases"),
	    ("places.title", "Нови случаи по области", "New cases by province"),
	    ("places.average", "Нови случаи (средно)", "New cases (average)"),
	    ("tests.title", "Позитивност от направените тестове", "Test positivity"),
	    ("tests.percentage", "Процент", "Percentage"),
	    ("tests.total", "Брой тестове", "Number of tests"),
	];
	table.iter().flat_map(|(key,bg,en)| vec![
	    ((Locale::Bg, *key), *bg),
	    ((Locale::En, *key), *en)
	]).collect()
    };
}

impl Locale {

    pub fn name(&self) -> &'static str {
	match self {
	    Self::Bg => "bg",
	    Self::En => "en"
	}
    }

    /// Translation of `key`, falling back to English and then to the key.
    pub fn t(&self, key: &'static str) -> &'static str {
	STRINGS.get(&(*self, key))
	    .or_else(|| STRINGS.get(&(Self::En, key)))
	    .copied()
	    .unwrap_or(key)
    }

    pub fn generation_date(&self, date: NaiveDate) -> String {
	format!("{}", date.format(self.t("common.generation_date")))
    }

}
