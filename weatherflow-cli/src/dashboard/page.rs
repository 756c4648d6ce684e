//! HTML rendering of the dashboard page.

use std::fmt::Write as _;
use weatherflow_core::{
    LoadedTable, Parameter,
    table::{Series, TableRow, round2},
};

use super::{DashboardQuery, chart, escape};

const TITLE: &str = "Real-Time Weather Data Dashboard";

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0 auto;max-width:1000px;padding:1rem 2rem;color:#222}\
h1{margin-bottom:.2rem}\
.source{color:#666;font-size:.9rem}\
.metrics{display:flex;gap:1rem;margin:1rem 0}\
.metric{flex:1;border:1px solid #ddd;border-radius:6px;padding:.6rem 1rem}\
.metric-label{color:#666;font-size:.85rem}\
.metric-value{font-size:1.6rem;font-weight:600}\
table{border-collapse:collapse;width:100%;font-size:.85rem}\
th,td{border-bottom:1px solid #eee;padding:.25rem .5rem;text-align:left}\
form{display:flex;flex-wrap:wrap;gap:1rem;margin:1rem 0}\
.notice{padding:1rem;background:#fff4e5;border:1px solid #f0c36d;border-radius:6px}\
.error{color:#a00;font-family:monospace}\
section{margin:2rem 0}";

fn open_page(out: &mut String) {
    let _ = write!(
        out,
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><title>{TITLE}</title><style>{STYLE}</style></head><body><h1>{TITLE}</h1>"#
    );
}

fn close_page(out: &mut String) {
    out.push_str("</body></html>");
}

/// Page shown when there is no transformed batch to display.
pub fn render_no_data(error: Option<&str>) -> String {
    let mut out = String::new();
    open_page(&mut out);
    out.push_str(r#"<div class="notice"><p>No data available to display.</p>"#);
    if let Some(err) = error {
        let _ = write!(out, r#"<p class="error">Error fetching data: {}</p>"#, escape(err));
    }
    out.push_str("</div>");
    close_page(&mut out);
    out
}

pub fn render(loaded: &LoadedTable, query: &DashboardQuery) -> String {
    let table = &loaded.table;
    let mut out = String::new();
    open_page(&mut out);

    let _ = write!(
        out,
        r#"<p class="source">Source: <code>{}</code> (last modified {})</p>"#,
        escape(&loaded.key),
        loaded.last_modified.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    if let Some(m) = table.metrics() {
        out.push_str(r#"<div class="metrics">"#);
        metric(&mut out, "Avg Temperature (°C)", m.avg_temperature_c);
        metric(&mut out, "Avg Humidity (%)", m.avg_humidity);
        metric(&mut out, "Total Rainfall (mm)", m.total_rainfall_mm);
        metric(&mut out, "Avg Wind Speed (kph)", m.avg_wind_kph);
        out.push_str("</div>");
    }

    out.push_str("<section><h2>Weather Data</h2>");
    rows_table(&mut out, table.rows.iter());
    out.push_str("</section>");

    let cities = table.cities();
    let states = table.states();
    let city = query
        .city()
        .filter(|c| cities.contains(c))
        .or(cities.first().copied())
        .unwrap_or_default();
    let state = query
        .state()
        .filter(|s| states.contains(s))
        .or(states.first().copied())
        .unwrap_or_default();
    let (compare, trend, aggregate) = (query.compare(), query.trend(), query.aggregate());

    out.push_str(r#"<form method="get" action="/">"#);
    select(&mut out, "city", "City", cities.iter().map(|c| (*c, *c)), city);
    select(&mut out, "state", "State", states.iter().map(|s| (*s, *s)), state);
    parameter_select(&mut out, "compare", "Compare cities by", compare);
    parameter_select(&mut out, "trend", "Trend parameter", trend);
    parameter_select(&mut out, "aggregate", "Aggregate parameter", aggregate);
    out.push_str(r#"<noscript><button type="submit">Apply</button></noscript></form>"#);

    let _ = write!(
        out,
        "<section><h2>Weather Details for {}, {}</h2>",
        escape(city),
        escape(state)
    );
    let details = table.filter(Some(city), Some(state));
    if details.is_empty() {
        out.push_str(r#"<p class="notice">No rows for this city and state.</p>"#);
    } else {
        rows_table(&mut out, details.iter().copied());
        push_chart(
            &mut out,
            chart::line_chart(
                &format!("Temperature and Humidity in {city}"),
                "Value",
                &details_series(&details),
            ),
        );
    }
    out.push_str("</section>");

    out.push_str("<section><h2>City-wise Weather Comparisons</h2>");
    push_chart(
        &mut out,
        chart::bar_chart(
            &format!("City-wise Comparison of {}", compare.label()),
            compare.label(),
            &table.mean_by_city(compare),
        ),
    );
    out.push_str("</section>");

    out.push_str("<section><h2>State-wise Weather Trends</h2>");
    push_chart(
        &mut out,
        chart::line_chart(
            &format!("{} Trends by State", trend.label()),
            trend.label(),
            &table.trends_by_state(trend),
        ),
    );
    out.push_str("</section>");

    out.push_str("<section><h2>Correlation Heatmap</h2>");
    push_chart(&mut out, chart::heatmap(&table.correlation()));
    out.push_str("</section>");

    out.push_str("<section><h2>State-wise Aggregate Data</h2>");
    push_chart(
        &mut out,
        chart::bar_chart(
            &format!("Average {} by State", aggregate.label()),
            aggregate.label(),
            &table.mean_by_state(aggregate),
        ),
    );
    out.push_str("</section>");

    close_page(&mut out);
    out
}

/// Embed a rendered chart, or a notice when drawing failed.
fn push_chart(out: &mut String, chart: anyhow::Result<String>) {
    match chart {
        Ok(svg) => out.push_str(&svg),
        Err(err) => {
            tracing::warn!(error = %err, "chart rendering failed");
            let _ = write!(
                out,
                r#"<p class="notice">Chart unavailable: {}</p>"#,
                escape(&err.to_string())
            );
        }
    }
}

fn metric(out: &mut String, label: &str, value: f64) {
    let _ = write!(
        out,
        r#"<div class="metric"><div class="metric-label">{}</div><div class="metric-value">{}</div></div>"#,
        escape(label),
        round2(value),
    );
}

fn rows_table<'a>(out: &mut String, rows: impl Iterator<Item = &'a TableRow>) {
    out.push_str(
        "<table><thead><tr><th>City</th><th>State</th><th>Temperature (°C)</th><th>Humidity (%)</th>\
         <th>Wind (kph)</th><th>Rainfall (mm)</th><th>Visibility (km)</th><th>Condition</th>\
         <th>Timestamp</th></tr></thead><tbody>",
    );
    for r in rows {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&r.city),
            escape(&r.state),
            r.temperature_c,
            r.humidity,
            r.wind_kph,
            r.rainfall_mm,
            r.visibility_km,
            escape(&r.condition),
            escape(&r.timestamp),
        );
    }
    out.push_str("</tbody></table>");
}

fn select<'a>(
    out: &mut String,
    name: &str,
    label: &str,
    options: impl Iterator<Item = (&'a str, &'a str)>,
    selected: &str,
) {
    let _ = write!(
        out,
        r#"<label>{label} <select name="{name}" onchange="this.form.submit()">"#
    );
    for (value, text) in options {
        let marker = if value == selected { " selected" } else { "" };
        let _ = write!(
            out,
            r#"<option value="{}"{marker}>{}</option>"#,
            escape(value),
            escape(text)
        );
    }
    out.push_str("</select></label>");
}

fn parameter_select(out: &mut String, name: &str, label: &str, selected: Parameter) {
    select(
        out,
        name,
        label,
        Parameter::ALL.iter().map(|p| (p.as_str(), p.label())),
        selected.as_str(),
    );
}

fn details_series(rows: &[&TableRow]) -> Vec<Series> {
    [Parameter::TemperatureC, Parameter::Humidity]
        .into_iter()
        .map(|p| Series {
            name: p.label().to_string(),
            points: rows.iter().map(|r| (r.timestamp.clone(), p.value(r))).collect(),
        })
        .collect()
}
