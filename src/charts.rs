// 📈 Chart Datasets - Tables shaped for the visualization layer
// Plus the distinct values that populate UI selectors.

use crate::dataset::{Snapshot, Table};
use crate::error::{EngineError, EngineResult};
use crate::table::{Scalar, TabularResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// VALUATIONS
// ============================================================================

/// Highest average implied valuations per (company, industry, season), accepted deals only
pub fn top_valuations(snapshot: &Snapshot, limit: usize) -> TabularResult {
    let companies = snapshot.companies_by_id();

    let mut valuations: BTreeMap<(i64, i64), (f64, usize)> = BTreeMap::new();
    for i in snapshot.investments.iter().filter(|i| i.accepted) {
        if let Some(v) = i.valuation() {
            if companies.contains_key(&i.company_id) {
                let entry = valuations.entry((i.company_id, i.season_id)).or_insert((0.0, 0));
                entry.0 += v;
                entry.1 += 1;
            }
        }
    }

    let mut rows: Vec<((i64, i64), f64)> = valuations
        .into_iter()
        .map(|(key, (sum, n))| (key, sum / n as f64))
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows.truncate(limit);

    let mut result = TabularResult::new(&["company", "industry", "season", "valuation"]);
    for ((company_id, season_id), valuation) in rows {
        let company = companies.get(&company_id);
        result.push_row(vec![
            Scalar::from(company.map(|c| c.name.clone())),
            Scalar::from(company.and_then(|c| c.industry.clone())),
            Scalar::from(season_id),
            Scalar::from(valuation),
        ]);
    }
    result
}

// ============================================================================
// STRATEGY HEATMAP
// ============================================================================

/// Accepted deals per (shark, industry)
pub fn shark_industry_strategy(snapshot: &Snapshot) -> TabularResult {
    let deals: HashMap<i64, i64> = snapshot
        .investments
        .iter()
        .filter(|i| i.accepted)
        .map(|i| (i.investment_id, i.company_id))
        .collect();
    let companies = snapshot.companies_by_id();
    let names = snapshot.shark_names();

    // (shark, investment) once, even if a shark has several contribution rows
    let joined: BTreeSet<(i64, i64)> = snapshot
        .contributions
        .iter()
        .filter(|c| deals.contains_key(&c.investment_id))
        .map(|c| (c.shark_id, c.investment_id))
        .collect();

    let mut counts: BTreeMap<(String, Option<String>), i64> = BTreeMap::new();
    for (shark_id, investment_id) in joined {
        let industry = deals
            .get(&investment_id)
            .and_then(|company_id| companies.get(company_id))
            .and_then(|c| c.industry.clone());
        let shark = names
            .get(&shark_id)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("Shark {}", shark_id));
        *counts.entry((shark, industry)).or_insert(0) += 1;
    }

    let mut rows: Vec<((String, Option<String>), i64)> = counts.into_iter().collect();
    rows.sort_by(|a, b| {
        a.0 .0
            .cmp(&b.0 .0)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0 .1.cmp(&b.0 .1))
    });

    let mut result = TabularResult::new(&["shark", "industry", "investment_count"]);
    for ((shark, industry), count) in rows {
        result.push_row(vec![Scalar::from(shark), Scalar::from(industry), Scalar::from(count)]);
    }
    result
}

// ============================================================================
// FILTER OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Industry,
    Shark,
    Season,
    City,
    State,
}

impl OptionKind {
    pub const ALL: [OptionKind; 5] = [
        OptionKind::Industry,
        OptionKind::Shark,
        OptionKind::Season,
        OptionKind::City,
        OptionKind::State,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Industry => "industry",
            OptionKind::Shark => "shark",
            OptionKind::Season => "season",
            OptionKind::City => "city",
            OptionKind::State => "state",
        }
    }

    /// The one table the option list is read from
    pub fn source_table(&self) -> Table {
        match self {
            OptionKind::Industry => Table::Industry,
            OptionKind::Shark => Table::Shark,
            OptionKind::Season => Table::Season,
            OptionKind::City | OptionKind::State => Table::Entrepreneur,
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OptionKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::invalid_filter("kind", format!("unknown option list '{}'", wanted)))
    }
}

/// Distinct, sorted values for a selector. Seasons are numeric, the rest text.
pub fn filter_options(snapshot: &Snapshot, kind: OptionKind) -> Vec<Scalar> {
    fn text(values: impl Iterator<Item = Option<String>>) -> Vec<Scalar> {
        values
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(Scalar::from)
            .collect()
    }

    match kind {
        OptionKind::Industry => text(snapshot.industries.iter().map(|i| Some(i.name.clone()))),
        OptionKind::Shark => text(snapshot.sharks.iter().map(|s| Some(s.name.clone()))),
        OptionKind::Season => snapshot
            .seasons
            .iter()
            .map(|s| s.season_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(Scalar::from)
            .collect(),
        OptionKind::City => text(snapshot.entrepreneurs.iter().map(|e| e.location_city.clone())),
        OptionKind::State => text(snapshot.entrepreneurs.iter().map(|e| e.location_state.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;

    fn snapshot() -> Snapshot {
        Snapshot::fetch(&fixture(), &Table::ALL).unwrap()
    }

    #[test]
    fn test_top_valuations() {
        let result = top_valuations(&snapshot(), 10);

        assert_eq!(result.len(), 4);
        assert_eq!(result.value(0, "company"), Some(&Scalar::from("Bakery")));
        assert_eq!(result.value(0, "season"), Some(&Scalar::Int(2)));
        assert_eq!(result.value(0, "valuation"), Some(&Scalar::Float(600_000.0)));
        // ties broken by company id, then season
        assert_eq!(result.value(1, "company"), Some(&Scalar::from("Bakery")));
        assert_eq!(result.value(2, "company"), Some(&Scalar::from("Gadget")));

        assert_eq!(top_valuations(&snapshot(), 2).len(), 2);
    }

    #[test]
    fn test_shark_industry_strategy() {
        let result = shark_industry_strategy(&snapshot());

        let sharks: Vec<String> = result.column("shark").unwrap().iter().map(|s| s.to_string()).collect();
        assert_eq!(sharks, vec!["Gwen", "Kevin", "Lori", "Lori", "Mark", "Mark"]);
        assert_eq!(result.value(4, "industry"), Some(&Scalar::from("Food")));
        assert_eq!(result.value(4, "investment_count"), Some(&Scalar::Int(2)));
        // the declined investment is not part of Kevin's strategy
        assert_eq!(result.value(1, "industry"), Some(&Scalar::from("Tech")));
    }

    #[test]
    fn test_filter_options() {
        let snap = snapshot();

        assert_eq!(
            filter_options(&snap, OptionKind::Industry),
            vec![Scalar::from("Fitness"), Scalar::from("Food"), Scalar::from("Tech")]
        );
        assert_eq!(
            filter_options(&snap, OptionKind::Season),
            vec![Scalar::Int(1), Scalar::Int(2)]
        );
        assert_eq!(
            filter_options(&snap, OptionKind::City),
            vec![Scalar::from("Austin"), Scalar::from("Denver")]
        );
        assert_eq!(filter_options(&snap, OptionKind::Shark).len(), 4);
    }

    #[test]
    fn test_option_kind_parse() {
        assert_eq!("STATE".parse::<OptionKind>().unwrap(), OptionKind::State);
        assert_eq!(OptionKind::City.source_table(), Table::Entrepreneur);
        assert!(matches!(
            "color".parse::<OptionKind>(),
            Err(EngineError::InvalidFilter { .. })
        ));
    }
}
