// 🔎 Query Filters - Typed optional parameters for catalog queries
// Malformed or unaccepted filters fail fast with InvalidFilter; no defaults are substituted.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FILTER KEYS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    SeasonFrom,
    SeasonTo,
    Industry,
    City,
    State,
    MinCount,
    Limit,
    MaxPosition,
}

impl FilterKey {
    pub const ALL: [FilterKey; 8] = [
        FilterKey::SeasonFrom,
        FilterKey::SeasonTo,
        FilterKey::Industry,
        FilterKey::City,
        FilterKey::State,
        FilterKey::MinCount,
        FilterKey::Limit,
        FilterKey::MaxPosition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::SeasonFrom => "season_from",
            FilterKey::SeasonTo => "season_to",
            FilterKey::Industry => "industry",
            FilterKey::City => "city",
            FilterKey::State => "state",
            FilterKey::MinCount => "min_count",
            FilterKey::Limit => "limit",
            FilterKey::MaxPosition => "max_position",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FilterKey::SeasonFrom => "First season to include (inclusive)",
            FilterKey::SeasonTo => "Last season to include (inclusive)",
            FilterKey::Industry => "Industry name, case-insensitive substring",
            FilterKey::City => "Entrepreneur city, case-insensitive substring",
            FilterKey::State => "Entrepreneur state, case-insensitive substring",
            FilterKey::MinCount => "Minimum group size / pair count to report",
            FilterKey::Limit => "Keep rows ranked at or above this dense rank",
            FilterKey::MaxPosition => "Highest pitch position to report",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FilterKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::invalid_filter(wanted, "unknown filter"))
    }
}

// ============================================================================
// FILTER SET
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    pub season_from: Option<i64>,
    pub season_to: Option<i64>,
    pub industry: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub min_count: Option<u64>,
    pub limit: Option<usize>,
    pub max_position: Option<usize>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    // Builders ---------------------------------------------------------------

    pub fn season_range(mut self, from: i64, to: i64) -> Self {
        self.season_from = Some(from);
        self.season_to = Some(to);
        self
    }

    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn min_count(mut self, n: u64) -> Self {
        self.min_count = Some(n);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn max_position(mut self, n: usize) -> Self {
        self.max_position = Some(n);
        self
    }

    // Parsing ----------------------------------------------------------------

    /// Parse (key, value) pairs, e.g. from a query string
    pub fn parse<I, K, V>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filters = Filters::new();
        for (key, value) in pairs {
            let key: FilterKey = key.as_ref().parse()?;
            filters.set(key, value.as_ref())?;
        }
        Ok(filters)
    }

    /// Parse `key=value` assignments, e.g. from the command line
    pub fn parse_assignments<S: AsRef<str>>(assignments: &[S]) -> EngineResult<Self> {
        let pairs = assignments
            .iter()
            .map(|a| {
                let a = a.as_ref();
                a.split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| EngineError::invalid_filter(a, "expected key=value"))
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Filters::parse(pairs)
    }

    pub fn set(&mut self, key: FilterKey, raw: &str) -> EngineResult<()> {
        let raw = raw.trim();
        match key {
            FilterKey::SeasonFrom => self.season_from = Some(parse_int(key, raw)?),
            FilterKey::SeasonTo => self.season_to = Some(parse_int(key, raw)?),
            FilterKey::Industry => self.industry = Some(raw.to_string()),
            FilterKey::City => self.city = Some(raw.to_string()),
            FilterKey::State => self.state = Some(raw.to_string()),
            FilterKey::MinCount => self.min_count = Some(parse_int(key, raw)?),
            FilterKey::Limit => self.limit = Some(parse_int(key, raw)?),
            FilterKey::MaxPosition => self.max_position = Some(parse_int(key, raw)?),
        }
        Ok(())
    }

    /// Keys that carry a value
    pub fn present(&self) -> Vec<FilterKey> {
        let mut keys = Vec::new();
        if self.season_from.is_some() {
            keys.push(FilterKey::SeasonFrom);
        }
        if self.season_to.is_some() {
            keys.push(FilterKey::SeasonTo);
        }
        if self.industry.is_some() {
            keys.push(FilterKey::Industry);
        }
        if self.city.is_some() {
            keys.push(FilterKey::City);
        }
        if self.state.is_some() {
            keys.push(FilterKey::State);
        }
        if self.min_count.is_some() {
            keys.push(FilterKey::MinCount);
        }
        if self.limit.is_some() {
            keys.push(FilterKey::Limit);
        }
        if self.max_position.is_some() {
            keys.push(FilterKey::MaxPosition);
        }
        keys
    }

    // Validation -------------------------------------------------------------

    /// Check every present key is accepted and every value is in range
    pub fn validate(&self, accepted: &[FilterKey]) -> EngineResult<()> {
        for key in self.present() {
            if !accepted.contains(&key) {
                return Err(EngineError::invalid_filter(
                    key.as_str(),
                    "not accepted by this query",
                ));
            }
        }

        if let (Some(from), Some(to)) = (self.season_from, self.season_to) {
            if from > to {
                return Err(EngineError::invalid_filter(
                    FilterKey::SeasonFrom.as_str(),
                    format!("season range {}..{} is inverted", from, to),
                ));
            }
        }

        for (key, text) in [
            (FilterKey::Industry, &self.industry),
            (FilterKey::City, &self.city),
            (FilterKey::State, &self.state),
        ] {
            if matches!(text, Some(t) if t.trim().is_empty()) {
                return Err(EngineError::invalid_filter(key.as_str(), "must not be empty"));
            }
        }

        for (key, value) in [
            (FilterKey::MinCount, self.min_count.map(|n| n as u128)),
            (FilterKey::Limit, self.limit.map(|n| n as u128)),
            (FilterKey::MaxPosition, self.max_position.map(|n| n as u128)),
        ] {
            if value == Some(0) {
                return Err(EngineError::invalid_filter(key.as_str(), "must be at least 1"));
            }
        }

        Ok(())
    }

    // Matching ---------------------------------------------------------------

    pub fn season_contains(&self, season_id: i64) -> bool {
        self.season_from.map_or(true, |from| season_id >= from)
            && self.season_to.map_or(true, |to| season_id <= to)
    }

    pub fn industry_matches(&self, industry: Option<&str>) -> bool {
        contains_ignore_case(self.industry.as_deref(), industry)
    }

    pub fn city_matches(&self, city: Option<&str>) -> bool {
        contains_ignore_case(self.city.as_deref(), city)
    }

    pub fn state_matches(&self, state: Option<&str>) -> bool {
        contains_ignore_case(self.state.as_deref(), state)
    }
}

fn parse_int<T: FromStr>(key: FilterKey, raw: &str) -> EngineResult<T> {
    raw.parse().map_err(|_| {
        EngineError::invalid_filter(
            key.as_str(),
            format!("expected an integer, got '{}'", raw),
        )
    })
}

/// No pattern matches everything; a pattern never matches a missing value
fn contains_ignore_case(pattern: Option<&str>, value: Option<&str>) -> bool {
    match (pattern, value) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(p), Some(v)) => v.to_lowercase().contains(&p.trim().to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let filters = Filters::parse(vec![
            ("season_from", "2"),
            ("season_to", "5"),
            ("industry", "Food"),
        ])
        .unwrap();

        assert_eq!(filters.season_from, Some(2));
        assert_eq!(filters.season_to, Some(5));
        assert_eq!(filters.industry.as_deref(), Some("Food"));
        assert_eq!(
            filters.present(),
            vec![FilterKey::SeasonFrom, FilterKey::SeasonTo, FilterKey::Industry]
        );
    }

    #[test]
    fn test_parse_assignments() {
        let filters = Filters::parse_assignments(&["limit=3", "min_count = 2"]).unwrap();
        assert_eq!(filters.limit, Some(3));
        assert_eq!(filters.min_count, Some(2));

        assert!(matches!(
            Filters::parse_assignments(&["limit"]),
            Err(EngineError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_unknown_key_and_bad_value() {
        match Filters::parse(vec![("sharkiness", "9")]) {
            Err(EngineError::InvalidFilter { key, .. }) => assert_eq!(key, "sharkiness"),
            other => panic!("expected InvalidFilter, got {:?}", other),
        }

        match Filters::parse(vec![("season_from", "three")]) {
            Err(EngineError::InvalidFilter { key, reason }) => {
                assert_eq!(key, "season_from");
                assert!(reason.contains("three"));
            }
            other => panic!("expected InvalidFilter, got {:?}", other),
        }

        assert!(Filters::parse(vec![("limit", "-1")]).is_err());
    }

    #[test]
    fn test_validate() {
        let accepted = [FilterKey::SeasonFrom, FilterKey::SeasonTo, FilterKey::Limit];

        assert!(Filters::new().season_range(1, 3).validate(&accepted).is_ok());
        assert!(Filters::new().season_range(4, 3).validate(&accepted).is_err());
        assert!(Filters::new().limit(0).validate(&accepted).is_err());
        assert!(Filters::new().city("Austin").validate(&accepted).is_err());
        assert!(Filters::new()
            .industry("  ")
            .validate(&[FilterKey::Industry])
            .is_err());
    }

    #[test]
    fn test_matching() {
        let filters = Filters::new().season_range(2, 4).industry("food");

        assert!(filters.season_contains(2));
        assert!(filters.season_contains(4));
        assert!(!filters.season_contains(5));
        assert!(filters.industry_matches(Some("Food and Beverage")));
        assert!(!filters.industry_matches(Some("Fitness")));
        assert!(!filters.industry_matches(None));

        let open = Filters::new();
        assert!(open.season_contains(99));
        assert!(open.city_matches(None));
    }
}
