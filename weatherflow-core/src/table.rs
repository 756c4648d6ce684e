//! In-memory view of a transformed batch and the aggregates the dashboard shows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    error::TableError,
    select,
    store::{BlobStore, Namespace},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub temperature_c: f64,
    pub humidity: f64,
    pub wind_kph: f64,
    #[serde(default)]
    pub rainfall_mm: f64,
    #[serde(default)]
    pub visibility_km: f64,
    #[serde(default)]
    pub condition: String,
    pub timestamp: String,
}

/// Numeric columns that can be compared, trended and correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parameter {
    #[default]
    TemperatureC,
    Humidity,
    RainfallMm,
    WindKph,
}

impl Parameter {
    pub const ALL: [Parameter; 4] =
        [Parameter::TemperatureC, Parameter::Humidity, Parameter::RainfallMm, Parameter::WindKph];

    /// Column name in the transformed batch.
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::TemperatureC => "temperature_c",
            Parameter::Humidity => "humidity",
            Parameter::RainfallMm => "rainfall_mm",
            Parameter::WindKph => "wind_kph",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Parameter::TemperatureC => "Temperature (°C)",
            Parameter::Humidity => "Humidity (%)",
            Parameter::RainfallMm => "Rainfall (mm)",
            Parameter::WindKph => "Wind Speed (kph)",
        }
    }

    pub fn value(&self, row: &TableRow) -> f64 {
        match self {
            Parameter::TemperatureC => row.temperature_c,
            Parameter::Humidity => row.humidity,
            Parameter::RainfallMm => row.rainfall_mm,
            Parameter::WindKph => row.wind_kph,
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headline numbers over the whole table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub avg_temperature_c: f64,
    pub avg_humidity: f64,
    pub total_rainfall_mm: f64,
    pub avg_wind_kph: f64,
}

/// One line of a trend chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    /// `(timestamp, value)` sorted by timestamp; duplicate timestamps are averaged.
    pub points: Vec<(String, f64)>,
}

/// Pearson correlations between every pair of [`Parameter::ALL`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub parameters: [Parameter; 4],
    /// `None` where a column has no variance.
    pub values: [[Option<f64>; 4]; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherTable {
    pub rows: Vec<TableRow>,
}

impl WeatherTable {
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self { rows }
    }

    /// Parse by key suffix: `.json` is a JSON array, anything else is CSV.
    pub fn parse(key: &str, bytes: &[u8]) -> Result<Self, TableError> {
        if key.ends_with(".json") {
            Self::parse_json(key, bytes)
        } else {
            Self::parse_csv(key, bytes)
        }
    }

    pub fn parse_csv(key: &str, bytes: &[u8]) -> Result<Self, TableError> {
        let text =
            std::str::from_utf8(bytes).map_err(|_| TableError::Utf8 { key: key.to_string() })?;
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(text.as_bytes());

        let rows = rdr
            .deserialize()
            .collect::<Result<Vec<TableRow>, _>>()
            .map_err(|e| TableError::Parse { key: key.to_string(), reason: e.to_string() })?;

        Ok(Self { rows })
    }

    pub fn parse_json(key: &str, bytes: &[u8]) -> Result<Self, TableError> {
        let rows: Vec<TableRow> = serde_json::from_slice(bytes)
            .map_err(|e| TableError::Parse { key: key.to_string(), reason: e.to_string() })?;
        Ok(Self { rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `None` for an empty table.
    pub fn metrics(&self) -> Option<Metrics> {
        if self.rows.is_empty() {
            return None;
        }
        let n = self.rows.len() as f64;
        let sum = |p: Parameter| self.rows.iter().map(|r| p.value(r)).sum::<f64>();

        Some(Metrics {
            avg_temperature_c: sum(Parameter::TemperatureC) / n,
            avg_humidity: sum(Parameter::Humidity) / n,
            total_rainfall_mm: sum(Parameter::RainfallMm),
            avg_wind_kph: sum(Parameter::WindKph) / n,
        })
    }

    /// Distinct cities in order of first appearance.
    pub fn cities(&self) -> Vec<&str> {
        distinct(self.rows.iter().map(|r| r.city.as_str()))
    }

    /// Distinct states in order of first appearance.
    pub fn states(&self) -> Vec<&str> {
        distinct(self.rows.iter().map(|r| r.state.as_str()))
    }

    /// Rows equal to the given city and/or state; `None` matches anything.
    pub fn filter(&self, city: Option<&str>, state: Option<&str>) -> Vec<&TableRow> {
        self.rows
            .iter()
            .filter(|r| city.is_none_or(|c| r.city == c))
            .filter(|r| state.is_none_or(|s| r.state == s))
            .collect()
    }

    /// Mean of `param` per city, highest first.
    pub fn mean_by_city(&self, param: Parameter) -> Vec<(String, f64)> {
        self.mean_by(param, |r| &r.city)
    }

    /// Mean of `param` per state, highest first.
    pub fn mean_by_state(&self, param: Parameter) -> Vec<(String, f64)> {
        self.mean_by(param, |r| &r.state)
    }

    fn mean_by<F>(&self, param: Parameter, group: F) -> Vec<(String, f64)>
    where
        F: Fn(&TableRow) -> &String,
    {
        let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for row in &self.rows {
            let entry = groups.entry(group(row).as_str()).or_default();
            entry.0 += param.value(row);
            entry.1 += 1;
        }

        let mut means: Vec<(String, f64)> =
            groups.into_iter().map(|(k, (sum, n))| (k.to_string(), sum / n as f64)).collect();
        means.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        means
    }

    /// One series per state of `param` over time.
    pub fn trends_by_state(&self, param: Parameter) -> Vec<Series> {
        let mut grouped: BTreeMap<&str, BTreeMap<&str, (f64, usize)>> = BTreeMap::new();
        for row in &self.rows {
            let point = grouped
                .entry(row.state.as_str())
                .or_default()
                .entry(row.timestamp.as_str())
                .or_default();
            point.0 += param.value(row);
            point.1 += 1;
        }

        grouped
            .into_iter()
            .map(|(state, points)| Series {
                name: state.to_string(),
                points: points
                    .into_iter()
                    .map(|(ts, (sum, n))| (ts.to_string(), sum / n as f64))
                    .collect(),
            })
            .collect()
    }

    pub fn correlation(&self) -> CorrelationMatrix {
        let columns: Vec<Vec<f64>> = Parameter::ALL
            .iter()
            .map(|p| self.rows.iter().map(|r| p.value(r)).collect())
            .collect();

        let mut values = [[None; 4]; 4];
        for (i, row) in values.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = pearson(&columns[i], &columns[j]);
            }
        }

        CorrelationMatrix { parameters: Parameter::ALL, values }
    }
}

/// Round for display, e.g. metric tiles.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// A parsed transformed batch and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub table: WeatherTable,
}

/// Load the latest transformed batch, or `None` if there is none yet.
pub async fn load_latest(store: &dyn BlobStore) -> Result<Option<LoadedTable>, TableError> {
    let Some(latest) = select::latest_object(store, Namespace::Transformed).await? else {
        return Ok(None);
    };

    let bytes = store.get(&latest.key).await?;
    let table = WeatherTable::parse(&latest.key, &bytes)?;
    tracing::debug!(key = %latest.key, rows = table.len(), "loaded transformed batch");

    Ok(Some(LoadedTable { key: latest.key, last_modified: latest.last_modified, table }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const CSV: &str = "\
city,state,temperature_c,humidity,wind_kph,rainfall_mm,visibility_km,condition,timestamp
Austin,Texas,30,50,10,0,10,Clear,2024-01-01 00:00:00
Dallas,Texas,20,70,14,2.5,8,Rain,2024-01-01 00:00:00
Reno,Nevada,10,20,6,0,16,Sunny,2024-01-01 01:00:00
";

    fn table() -> WeatherTable {
        WeatherTable::parse_csv("transformed/t.csv", CSV.as_bytes()).unwrap()
    }

    fn row(city: &str, state: &str, temp: f64, ts: &str) -> TableRow {
        TableRow {
            city: city.into(),
            state: state.into(),
            temperature_c: temp,
            humidity: 50.0,
            wind_kph: 10.0,
            rainfall_mm: 0.0,
            visibility_km: 10.0,
            condition: "Clear".into(),
            timestamp: ts.into(),
        }
    }

    #[test]
    fn average_temperature_of_twenty_and_thirty_is_twenty_five() {
        let t = WeatherTable::new(vec![row("A", "X", 20.0, "t"), row("B", "X", 30.0, "t")]);
        let m = t.metrics().unwrap();
        assert_eq!(m.avg_temperature_c, 25.0);
        assert_eq!(round2(m.avg_temperature_c), 25.0);
    }

    #[test]
    fn parameters_resolve_from_column_names() {
        for p in Parameter::ALL {
            assert_eq!(Parameter::from_column(p.as_str()), Some(p));
        }
        assert_eq!(Parameter::from_column("visibility_km"), None);
    }

    #[test]
    fn metrics_over_whole_table() {
        let m = table().metrics().unwrap();
        assert_eq!(m.avg_temperature_c, 20.0);
        assert_eq!(round2(m.avg_humidity), 46.67);
        assert_eq!(m.total_rainfall_mm, 2.5);
        assert_eq!(m.avg_wind_kph, 10.0);
    }

    #[test]
    fn empty_table_has_no_metrics() {
        let header = b"city,state,temperature_c,humidity,wind_kph,rainfall_mm,visibility_km,\
                       condition,timestamp\n";
        let t = WeatherTable::parse_csv("k", header).unwrap();
        assert!(t.is_empty());
        assert!(t.metrics().is_none());
    }

    #[test]
    fn filter_by_city_and_state() {
        let t = table();
        assert_eq!(t.filter(Some("Austin"), Some("Texas")).len(), 1);
        assert_eq!(t.filter(None, Some("Texas")).len(), 2);
        assert!(t.filter(Some("Austin"), Some("Nevada")).is_empty());
        assert_eq!(t.filter(None, None).len(), 3);
        assert_eq!(t.cities(), ["Austin", "Dallas", "Reno"]);
        assert_eq!(t.states(), ["Texas", "Nevada"]);
    }

    #[test]
    fn group_means_sorted_descending() {
        let t = table();
        assert_eq!(
            t.mean_by_city(Parameter::TemperatureC),
            vec![
                ("Austin".to_string(), 30.0),
                ("Dallas".to_string(), 20.0),
                ("Reno".to_string(), 10.0),
            ]
        );
        assert_eq!(
            t.mean_by_state(Parameter::TemperatureC),
            vec![("Texas".to_string(), 25.0), ("Nevada".to_string(), 10.0)]
        );
    }

    #[test]
    fn trends_group_by_state_and_average_same_timestamp() {
        let series = table().trends_by_state(Parameter::TemperatureC);
        assert_eq!(series.len(), 2);

        let texas = series.iter().find(|s| s.name == "Texas").unwrap();
        assert_eq!(texas.points, vec![("2024-01-01 00:00:00".to_string(), 25.0)]);
    }

    #[test]
    fn correlation_matrix_properties() {
        let t = WeatherTable::new(vec![
            TableRow { humidity: 10.0, wind_kph: 5.0, ..row("A", "X", 10.0, "t") },
            TableRow { humidity: 20.0, wind_kph: 3.0, ..row("B", "X", 20.0, "t") },
            TableRow { humidity: 30.0, wind_kph: 1.0, ..row("C", "X", 30.0, "t") },
        ]);
        let m = t.correlation();

        // temperature vs humidity: perfectly correlated; vs wind: perfectly anti-correlated.
        assert!((m.values[0][1].unwrap() - 1.0).abs() < 1e-9);
        assert!((m.values[0][3].unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(m.values[1][0], m.values[0][1]);
        // rainfall is constant.
        assert_eq!(m.values[2][0], None);
        assert_eq!(m.values[2][2], None);
        assert!((m.values[3][3].unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn json_batches_parse_too() {
        let json = r#"[{"city":"Austin","state":"Texas","temperature_c":30,"humidity":50,"wind_kph":10,"rainfall_mm":0,"visibility_km":10,"condition":"Clear","timestamp":"2024-01-01 00:00:00"}]"#;
        let t = WeatherTable::parse("transformed/x.json", json.as_bytes()).unwrap();
        assert_eq!(t.rows[0], row("Austin", "Texas", 30.0, "2024-01-01 00:00:00"));
    }

    #[test]
    fn malformed_csv_is_a_parse_error() {
        let bad = "city,state,temperature_c,humidity,wind_kph,rainfall_mm,visibility_km,condition,timestamp\nAustin,Texas,hot,50,10,0,10,Clear,t\n";
        let err = WeatherTable::parse_csv("transformed/bad.csv", bad.as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::Parse { .. }));
    }

    #[tokio::test]
    async fn load_latest_on_empty_store_is_none() {
        let store = MemoryStore::new();
        assert!(load_latest(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_latest_reads_newest_transformed_batch() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        store.insert_at(
            "transformed/old.csv",
            "city,state,temperature_c,humidity,wind_kph,timestamp\n",
            "text/csv",
            t0,
        );
        store.insert_at("transformed/new.csv", CSV, "text/csv", t0 + chrono::Duration::seconds(1));

        let loaded = load_latest(&store).await.unwrap().unwrap();
        assert_eq!(loaded.key, "transformed/new.csv");
        assert_eq!(loaded.table.len(), 3);
    }
}
