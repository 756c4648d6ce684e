use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// A city to query, optionally grouped under a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: Option<String>,
}

impl Location {
    pub fn city(city: impl Into<String>) -> Self {
        Self { city: city.into(), state: None }
    }

    pub fn in_state(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self { city: city.into(), state: Some(state.into()) }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Some(state) => write!(f, "{}, {}", self.city, state),
            None => f.write_str(&self.city),
        }
    }
}

/// Flat list of large US cities.
pub const DEFAULT_CITIES: &[&str] = &[
    "San Francisco",
    "New York",
    "Los Angeles",
    "Chicago",
    "Houston",
    "Phoenix",
    "Philadelphia",
    "San Antonio",
    "San Diego",
    "Dallas",
    "San Jose",
    "Austin",
    "Jacksonville",
    "Indianapolis",
    "Columbus",
];

/// Cities grouped by US state.
pub const DEFAULT_STATE_CITIES: &[(&str, &[&str])] = &[
    ("Alabama", &["Birmingham", "Montgomery", "Huntsville"]),
    ("Alaska", &["Anchorage", "Juneau", "Fairbanks"]),
    ("Arizona", &["Phoenix", "Tucson", "Mesa", "Williams"]),
    ("Arkansas", &["Little Rock", "Fort Smith", "Fayetteville"]),
    ("California", &["Los Angeles", "San Francisco", "San Diego"]),
    ("Colorado", &["Denver", "Colorado Springs", "Aurora"]),
    ("Connecticut", &["Bridgeport", "New Haven", "Stamford"]),
    ("Delaware", &["Wilmington", "Dover", "Newark"]),
    ("Florida", &["Miami", "Orlando", "Tampa"]),
    ("Georgia", &["Atlanta", "Augusta", "Columbus"]),
    ("Hawaii", &["Honolulu", "Hilo", "Kailua"]),
    ("Nevada", &["Las Vegas", "Reno", "Incline Village"]),
    ("Texas", &["Dallas", "Austin", "Houston"]),
    ("Washington", &["Seattle", "Tacoma", "Vancouver"]),
    ("Illinois", &["Chicago", "Illinois City", "Peoria"]),
    ("Michigan", &["Detroit", "Flint", "Warren"]),
];

/// Location lists, overridable from the `[locations]` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationsConfig {
    pub cities: Vec<String>,
    pub states: BTreeMap<String, Vec<String>>,
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            states: DEFAULT_STATE_CITIES
                .iter()
                .map(|(state, cities)| {
                    (state.to_string(), cities.iter().map(|c| c.to_string()).collect())
                })
                .collect(),
        }
    }
}

impl LocationsConfig {
    /// Locations for the flat city-list variant.
    pub fn flat(&self) -> Vec<Location> {
        self.cities.iter().map(Location::city).collect()
    }

    /// Locations for the state-grouped variant, states in alphabetical order.
    pub fn by_state(&self) -> Vec<Location> {
        self.states
            .iter()
            .flat_map(|(state, cities)| cities.iter().map(move |c| Location::in_state(c, state)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lists_are_populated() {
        let cfg = LocationsConfig::default();

        assert_eq!(cfg.flat().len(), DEFAULT_CITIES.len());

        let expected: usize = DEFAULT_STATE_CITIES.iter().map(|(_, c)| c.len()).sum();
        assert_eq!(cfg.by_state().len(), expected);
    }

    #[test]
    fn by_state_tags_every_city() {
        let mut cfg = LocationsConfig { cities: vec![], states: BTreeMap::new() };
        cfg.states.insert("Texas".into(), vec!["Austin".into(), "Houston".into()]);

        let locations = cfg.by_state();
        assert_eq!(
            locations,
            vec![Location::in_state("Austin", "Texas"), Location::in_state("Houston", "Texas")]
        );
        assert_eq!(locations[0].to_string(), "Austin, Texas");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: LocationsConfig = toml::from_str(r#"cities = ["Reno"]"#).unwrap();

        assert_eq!(cfg.flat(), vec![Location::city("Reno")]);
        assert!(cfg.states.contains_key("Texas"));
    }
}
