use std::{io,fs};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::naive::NaiveDate;
use serde_json::{Value,json};

use super::bulgaria::{PlaceWeek,Variable,WeekRow,WeeklyTests};
use super::error::Result;
use super::forecast::Forecast;
use super::locale::Locale;


pub type Series = Vec<(NaiveDate,f64)>;
pub type CasesData = Vec<(String,Series)>;


fn date_str(date: &NaiveDate) -> String {
    format!("{}", date.format("%Y-%m-%d"))
}


pub fn week_cases_graph(graph_path: &Path, locale: Locale, generated: NaiveDate,
			name: &str, rows: &[WeekRow], vars: &[Variable]) -> Result<()> {
    let graph_path = graph_path.join(locale.name());
    let data = vars.iter().map(
	|var| (locale.t(var.key()).to_string(), rows.iter().filter_map(
	    |row| var.get(row).map(|val| (row.date, val))
	).collect())
    ).collect();
    graph(&graph_path, &format!("{}.html", name), locale.t("week_cases.title"),
	  &locale.generation_date(generated), locale.t("common.week"),
	  locale.t("common.cases"), &data)
}


pub fn forecast_graph(graph_path: &Path, locale: Locale, generated: NaiveDate,
		      band: f64, forecast: &Forecast) -> Result<()> {

    let graph_path = graph_path.join(locale.name());
    let percent = (band * 100.0).round();
    let predicted = locale.t("forecast.predicted");
    let central = format!("{} (Rt*)", predicted);
    let increase = format!("{} (Rt* + {}%)", predicted, percent);
    let decline = format!("{} (Rt* - {}%)", predicted, percent);

    let cases = forecast.weekly.actual.iter().map(|week| json!({
	"Date": date_str(&week.date),
	"Series": locale.t("forecast.reported"),
	"Value": week.infected
    })).chain(forecast.weekly.forecast.iter().flat_map(|row| vec![
	json!({"Date": date_str(&row.week_ending), "Series": &increase, "Value": row.increase}),
	json!({"Date": date_str(&row.week_ending), "Series": &central, "Value": row.central}),
	json!({"Date": date_str(&row.week_ending), "Series": &decline, "Value": row.decline}),
    ])).collect::<Vec<_>>();

    let bands = forecast.weekly.forecast.iter().map(|row| json!({
	"Date": date_str(&row.week_ending),
	"Low": row.decline,
	"Mid": row.central,
	"High": row.increase
    })).collect::<Vec<_>>();

    let rt = forecast.rt.iter().map(|row| json!({
	"Date": date_str(&row.date),
	"Series": locale.t("forecast.rt"),
	"Rt": row.rt_median,
	"Low": row.rt_q05,
	"High": row.rt_q95
    })).chain(forecast.rt_forecast.dates().enumerate().map(|(i,date)| json!({
	"Date": date_str(&date),
	"Series": locale.t("forecast.predicted_rt"),
	"Rt": forecast.rt_forecast.central[i],
	"Low": forecast.rt_forecast.decline[i],
	"High": forecast.rt_forecast.increase[i]
    }))).collect::<Vec<_>>();

    let title = locale.t("forecast.title");

    page(&graph_path, "Weekly14DaysForecast.html", title, &json!({
	"$schema": "https://vega.github.io/schema/vega-lite/v4.json",
	"height": "container",
	"width": "container",
	"title": {"text": title, "subtitle": locale.generation_date(generated)},
	"resolve": {"scale": {"y": "independent"}},
	"layer": [
	    {
		"data": {"values": bands},
		"layer": [
		    {
			"mark": {"type": "area", "color": "red", "opacity": 0.2},
			"encoding": {
			    "x": {"field": "Date", "type": "temporal"},
			    "y": {"field": "Mid", "type": "quantitative"},
			    "y2": {"field": "High"}
			}
		    },
		    {
			"mark": {"type": "area", "color": "olive", "opacity": 0.2},
			"encoding": {
			    "x": {"field": "Date", "type": "temporal"},
			    "y": {"field": "Low", "type": "quantitative"},
			    "y2": {"field": "Mid"}
			}
		    }
		]
	    },
	    {
		"data": {"values": cases},
		"mark": "line",
		"encoding": {
		    "x": {
			"field": "Date",
			"timeUnit": "utcyearmonthdate",
			"title": locale.t("common.week"),
			"type": "temporal"
		    },
		    "y": {
			"field": "Value",
			"title": locale.t("common.cases"),
			"type": "quantitative"
		    },
		    "color": {
			"field": "Series",
			"type": "nominal",
			"scale": {
			    "domain": [locale.t("forecast.reported"), &increase, &central, &decline],
			    "range": ["orange", "red", "purple", "olive"]
			}
		    },
		    "tooltip": [
			{"field": "Date", "type": "temporal"},
			{"field": "Series", "type": "nominal"},
			{"field": "Value", "type": "quantitative", "format": ".0f"}
		    ]
		}
	    },
	    {
		"data": {"values": rt},
		"encoding": {
		    "x": {"field": "Date", "type": "temporal"},
		    "color": {"field": "Series", "type": "nominal",
			      "scale": {"range": ["lightblue", "darkblue"]}}
		},
		"layer": [
		    {
			"mark": {"type": "area", "opacity": 0.2},
			"encoding": {
			    "y": {"field": "Low", "type": "quantitative",
				  "scale": {"domain": [0, 3]},
				  "axis": {"title": locale.t("forecast.rt_axis")}},
			    "y2": {"field": "High"}
			}
		    },
		    {
			"mark": "line",
			"encoding": {
			    "y": {"field": "Rt", "type": "quantitative",
				  "scale": {"domain": [0, 3]}, "axis": null}
			}
		    },
		    {
			"data": {"values": [{"Value": 1.0}]},
			"mark": {"type": "rule", "color": "green", "strokeDash": [4, 4]},
			"encoding": {
			    "y": {"field": "Value", "type": "quantitative",
				  "scale": {"domain": [0, 3]}, "axis": null}
			}
		    }
		]
	    }
	]
    }))

}


pub fn positive_tests_graph(graph_path: &Path, locale: Locale, generated: NaiveDate,
			    data: &[WeeklyTests]) -> Result<()> {

    let graph_path = graph_path.join(locale.name());
    let title = locale.t("tests.title");

    page(&graph_path, "WeeklyPositiveTests.html", title, &json!({
	"$schema": "https://vega.github.io/schema/vega-lite/v4.json",
	"height": "container",
	"width": "container",
	"title": {"text": title, "subtitle": locale.generation_date(generated)},
	"data": {
	    "values": data.iter().filter_map(
		|week| week.positive_percentage.map(|pct| json!({
		    "Date": date_str(&week.week_ending),
		    "Positive": pct,
		    "Total": week.total_tests
		}))
	    ).collect::<Vec<_>>()
	},
	"encoding": {
	    "x": {
		"field": "Date",
		"timeUnit": "utcyearmonthdate",
		"title": locale.t("common.week"),
		"type": "temporal"
	    }
	},
	"layer": [
	    {
		"mark": {"type": "bar", "color": "#4e73df"},
		"encoding": {
		    "y": {"field": "Positive", "type": "quantitative",
			  "title": locale.t("tests.percentage")},
		    "tooltip": [
			{"field": "Date", "type": "temporal"},
			{"field": "Positive", "type": "quantitative", "format": ".2f"},
			{"field": "Total", "type": "quantitative", "format": ".0f",
			 "title": locale.t("tests.total")}
		    ]
		}
	    }
	]
    }))

}


/// New cases per province, averaged over the week. The legend lists the
/// provinces with the most cases in their latest week first.
pub fn places_cases_graph(graph_path: &Path, locale: Locale, generated: NaiveDate,
			  rows: &[PlaceWeek]) -> Result<()> {

    let mut by_place: BTreeMap<&str,Series> = BTreeMap::new();
    for row in rows {
	if let Some(avg) = row.infected_avg {
	    by_place.entry(row.place.as_str()).or_insert_with(Vec::new).push((row.date, avg));
	}
    }

    let mut data: CasesData = by_place.into_iter()
	.map(|(place,mut vals)| {
	    vals.sort_by_key(|(date,_)| *date);
	    (place.to_string(), vals)
	}).collect();
    data.sort_by(|(_,a),(_,b)| latest(b).partial_cmp(&latest(a)).unwrap_or(Ordering::Equal));

    graph(&graph_path.join(locale.name()), "WeeklyPlacesCases.html", locale.t("places.title"),
	  &locale.generation_date(generated), locale.t("common.week"),
	  locale.t("places.average"), &data)

}

fn latest(vals: &Series) -> f64 {
    vals.last().map_or(0.0, |(_,val)| *val)
}


pub fn active_cases_graph(graph_path: &Path, locale: Locale, generated: NaiveDate,
			  data: &Series) -> Result<()> {

    let graph_path = graph_path.join(locale.name());
    let title = locale.t("active.title");

    page(&graph_path, "ActiveCases.html", title, &json!({
	"$schema": "https://vega.github.io/schema/vega-lite/v4.json",
	"height": "container",
	"width": "container",
	"title": {"text": title, "subtitle": locale.generation_date(generated)},
	"data": {
	    "values": data.iter().map(|(date,active)| json!({
		"Date": date_str(date),
		"Active": active
	    })).collect::<Vec<_>>()
	},
	"encoding": {
	    "x": {"field": "Date", "timeUnit": "utcyearmonthdate",
		  "title": locale.t("common.week"), "type": "temporal"},
	    "y": {"field": "Active", "title": locale.t("common.cases"), "type": "quantitative"}
	},
	"layer": [
	    {"mark": {"type": "area", "color": "orange", "opacity": 0.2}},
	    {
		"mark": {"type": "line", "color": "orange"},
		"encoding": {
		    "tooltip": [
			{"field": "Date", "type": "temporal"},
			{"field": "Active", "type": "quantitative", "format": ".0f"}
		    ]
		}
	    }
	]
    }))

}


/// Multi-series line chart; clicking a legend entry highlights its series.
/// Series are listed in the order given.
fn graph(graph_path: &Path, path: &str, title: &str, subtitle: &str, xtitle: &str,
	 ytitle: &str, data: &CasesData) -> Result<()> {

    let order = data.iter().map(|(series,_)| series.clone()).collect::<Vec<_>>();

    page(graph_path, path, title, &json!({
	"$schema": "https://vega.github.io/schema/vega-lite/v4.json",
	"height": "container",
	"width": "container",
	"title": {"text": title, "subtitle": subtitle},
	"data": {
	    "values": data.iter().flat_map(
		|(series,vals)| vals.iter().filter(|(_,val)| val.is_finite()).map(
		    move |(date,val)| json!({
			"Date": date_str(date),
			"Series": series,
			"Value": val
		    }))
	    ).collect::<Vec<_>>()
	},
	"encoding": {
	    "x": {"field": "Date", "timeUnit": "utcyearmonthdate",
		  "title": xtitle, "type": "temporal"},
	    "y": {"field": "Value", "title": ytitle, "type": "quantitative"},
	    "color": {"field": "Series", "type": "nominal", "sort": order}
	},
	"layer": [
	    {
		"mark": "line",
		"selection": {
		    "Highlight": {"bind": "legend", "type": "multi", "fields": ["Series"]}
		},
		"encoding": {
		    "opacity": {"value": 0.15, "condition": {"value": 1, "selection": "Highlight"}}
		}
	    },
	    {
		"mark": {"type": "point", "filled": true, "size": 20},
		"encoding": {
		    "opacity": {"value": 0, "condition": {"value": 1, "selection": "Highlight"}},
		    "tooltip": [
			{"field": "Date", "type": "temporal"},
			{"field": "Series", "type": "nominal"},
			{"field": "Value", "type": "quantitative", "format": ".1f"}
		    ]
		}
	    }
	]
    }))

}


fn page(graph_path: &Path, path: &str, title: &str, spec: &Value) -> Result<()> {

    fs::create_dir_all(graph_path)?;
    let mut out = io::BufWriter::new(File::create(graph_path.join(path))?);

    write!(out, "<!DOCTYPE html><html><head>")?;
    write!(out, "<meta charset=\"UTF-8\">")?;
    write!(out, "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">")?;
    write!(out, "<title>{}</title>", title)?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega@5\"></script>")?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega-lite@4\"></script>")?;
    write!(out, "<script src=\"https://cdn.jsdelivr.net/npm/vega-embed\"></script>")?;
    write!(out, "</head>")?;
    write!(out, "<body>")?;
    write!(out, "<div id=\"vis\" style=\"overflow: hidden; position: absolute;top: 0; left: 0; right: 0; bottom: 0;\"></div>")?;
    write!(out, "<script type=\"text/javascript\">")?;
    write!(out, "var spec = ")?;

    serde_json::to_writer_pretty(out.by_ref(), spec)?;

    write!(out, ";vegaEmbed('#vis', spec,{{}}).then(function(result) {{")?;
    write!(out, "}}).catch(console.error);")?;
    write!(out, "</script>")?;
    write!(out, "</body></html>")?;

    Ok(())

}


#[cfg(test)]
mod tests {

    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use crate::config::ForecastConfig;
    use crate::forecast;
    use crate::weekly::WeekCases;
    use crate::NaiveDateRange;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
	NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn spec_of(html: &str) -> Value {
	let start = html.find("var spec = ").unwrap() + "var spec = ".len();
	let end = html.find(";vegaEmbed").unwrap();
	serde_json::from_str(&html[start..end]).unwrap()
    }

    #[test]
    fn forecast_page_per_locale() {
	let dir = tempfile::tempdir().unwrap();
	let daily: Series = NaiveDateRange(date(2021, 9, 1), None)
	    .take(60).map(|date| (date, 100.0)).collect();
	let config = ForecastConfig::default();
	let start = forecast::start_date(&daily, &config).unwrap();
	let weeks = vec![WeekCases { date: date(2021, 10, 24), infected: 700.0 }];
	let result = forecast::run(&daily, &weeks, start, &config,
				   &mut StdRng::seed_from_u64(5)).unwrap();

	for locale in &[Locale::Bg, Locale::En] {
	    forecast_graph(dir.path(), *locale, date(2021, 10, 31), 0.05, &result).unwrap();
	    let html = fs::read_to_string(
		dir.path().join(locale.name()).join("Weekly14DaysForecast.html")).unwrap();
	    assert!(html.contains(&format!("<title>{}</title>", locale.t("forecast.title"))));
	    let spec = spec_of(&html);
	    assert_eq!(spec["title"]["subtitle"], json!(locale.generation_date(date(2021, 10, 31))));
	    let cases = spec["layer"][1]["data"]["values"].as_array().unwrap();
	    assert_eq!(cases.len(), result.weekly.actual.len() + 3 * result.weekly.forecast.len());
	}
    }

    #[test]
    fn week_cases_page_skips_missing_values() {
	let dir = tempfile::tempdir().unwrap();
	let rows = vec![
	    WeekRow { date: date(2021, 10, 31), infected: Some(10.0), cured: None,
		      fatal: Some(1.0), hospitalized: None, intensive_care: None },
	    WeekRow { date: date(2021, 11, 7), infected: Some(12.0), cured: Some(8.0),
		      fatal: Some(2.0), hospitalized: None, intensive_care: None },
	];
	week_cases_graph(dir.path(), Locale::En, date(2021, 11, 8), "WeeklyInfectedCured",
			 &rows, &[Variable::Infected, Variable::Cured]).unwrap();
	let html = fs::read_to_string(dir.path().join("en").join("WeeklyInfectedCured.html")).unwrap();
	let spec = spec_of(&html);
	assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 3);
	assert_eq!(spec["encoding"]["color"]["sort"], json!(["Infected", "Cured"]));
    }

    #[test]
    fn places_page_orders_by_latest_week() {
	let dir = tempfile::tempdir().unwrap();
	let row = |d: u32, place: &str, avg: Option<f64>| PlaceWeek {
	    date: date(2021, 10, d), place: place.to_string(), infected: None, infected_avg: avg
	};
	let rows = vec![
	    row(24, "Sofia", Some(300.0)), row(31, "Sofia", Some(150.0)),
	    row(24, "Varna", Some(100.0)), row(31, "Varna", Some(180.0)),
	    row(24, "Ruse", Some(20.0)), row(31, "Ruse", None),
	];
	places_cases_graph(dir.path(), Locale::Bg, date(2021, 11, 1), &rows).unwrap();
	let html = fs::read_to_string(dir.path().join("bg").join("WeeklyPlacesCases.html")).unwrap();
	let spec = spec_of(&html);
	assert_eq!(spec["encoding"]["color"]["sort"], json!(["Varna", "Sofia", "Ruse"]));
	assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 5);
	assert_eq!(spec["title"]["text"], json!(Locale::Bg.t("places.title")));
    }

    #[test]
    fn active_cases_page() {
	let dir = tempfile::tempdir().unwrap();
	let data: Series = vec![(date(2021, 3, 1), 5000.0), (date(2021, 3, 5), 4900.0)];
	active_cases_graph(dir.path(), Locale::En, date(2021, 3, 6), &data).unwrap();
	let html = fs::read_to_string(dir.path().join("en").join("ActiveCases.html")).unwrap();
	assert!(html.contains("<title>Active cases</title>"));
	let spec = spec_of(&html);
	assert_eq!(spec["data"]["values"][1], json!({"Date": "2021-03-05", "Active": 4900.0}));
    }

    #[test]
    fn positive_tests_page() {
	let dir = tempfile::tempdir().unwrap();
	let weeks = vec![WeeklyTests {
	    week_ending: date(2021, 11, 7),
	    pcr_tests: 100.0, antigen_tests: 50.0,
	    positive_pcr_tests: 10.0, positive_antigen_tests: 5.0,
	    positive_percentage: Some(10.0),
	    pcr_positive_percentage: None, antigen_positive_percentage: None,
	    total_tests: 150.0, total_positive_tests: 15.0,
	}];
	positive_tests_graph(dir.path(), Locale::Bg, date(2021, 11, 8), &weeks).unwrap();
	let html = fs::read_to_string(dir.path().join("bg").join("WeeklyPositiveTests.html")).unwrap();
	let spec = spec_of(&html);
	assert_eq!(spec["data"]["values"][0]["Total"], json!(150.0));
    }

}
