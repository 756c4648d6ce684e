use serde::{Deserialize, Serialize};
use serde_json::Number;

/// One current-conditions reading for a single city, as written to the raw namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub region: String,
    pub country: String,
    pub temperature_c: f64,
    pub humidity: u8,
    pub wind_kph: f64,
    pub precipitation_mm: f64,
    pub cloud_cover: u8,
    pub uv_index: f64,
    pub visibility_km: f64,
    pub condition: String,
    /// `YYYY-MM-DD HH:MM` (API local time) or `YYYY-MM-DD HH:MM:SS` (fetch time, UTC).
    pub timestamp: String,
}

/// Current conditions as reported by a weather provider for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub name: String,
    pub region: String,
    pub country: String,
    /// Local time at the location, `YYYY-MM-DD HH:MM`.
    pub localtime: String,
    pub temperature_c: f64,
    pub humidity: u8,
    pub wind_kph: f64,
    pub precip_mm: f64,
    pub cloud: u8,
    pub uv: f64,
    pub vis_km: f64,
    pub condition: String,
}

/// A row of the transformed batch.
///
/// Numbers keep the representation they had in the raw batch, so an integer
/// reading stays an integer in the CSV output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub city: String,
    pub state: String,
    pub temperature_c: Number,
    pub humidity: Number,
    pub wind_kph: Number,
    pub rainfall_mm: Number,
    pub visibility_km: Number,
    pub condition: String,
    pub timestamp: String,
}

impl TransformedRecord {
    /// Column order of the CSV form.
    pub const HEADER: [&'static str; 9] = [
        "city",
        "state",
        "temperature_c",
        "humidity",
        "wind_kph",
        "rainfall_mm",
        "visibility_km",
        "condition",
        "timestamp",
    ];

    /// Values in [`Self::HEADER`] order.
    pub fn to_row(&self) -> [String; 9] {
        [
            self.city.clone(),
            self.state.clone(),
            self.temperature_c.to_string(),
            self.humidity.to_string(),
            self.wind_kph.to_string(),
            self.rainfall_mm.to_string(),
            self.visibility_km.to_string(),
            self.condition.clone(),
            self.timestamp.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_record_omits_missing_state() {
        let record = WeatherRecord {
            city: "Chicago".into(),
            state: None,
            region: "Illinois".into(),
            country: "United States of America".into(),
            temperature_c: 4.5,
            humidity: 70,
            wind_kph: 12.2,
            precipitation_mm: 0.0,
            cloud_cover: 25,
            uv_index: 1.0,
            visibility_km: 16.0,
            condition: "Partly cloudy".into(),
            timestamp: "2024-12-11 11:47".into(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("state").is_none());
        assert_eq!(json["humidity"], 70);
    }

    #[test]
    fn integer_readings_render_without_fraction() {
        let record = TransformedRecord {
            city: "Austin".into(),
            state: "Texas".into(),
            temperature_c: 30.into(),
            humidity: 50.into(),
            wind_kph: Number::from_f64(10.5).unwrap(),
            rainfall_mm: 0.into(),
            visibility_km: 10.into(),
            condition: "Clear".into(),
            timestamp: "2024-01-01 00:00:00".into(),
        };

        let row = record.to_row();
        assert_eq!(row[2], "30");
        assert_eq!(row[4], "10.5");
        assert_eq!(row.len(), TransformedRecord::HEADER.len());
    }
}
