// 📚 Query Catalog - Registry of named analytical computations
//
// Every entry is a descriptor (id, inputs, grouping, metrics, ordering,
// accepted filters) plus a computation over a typed Snapshot. The registry
// is validated once when it is built; lookups never reflect at call time.

pub mod queries;

use crate::config::EngineConfig;
use crate::dataset::{DatasetSource, Snapshot, Table};
use crate::error::{EngineError, EngineResult};
use crate::filters::{FilterKey, Filters};
use crate::table::TabularResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// The four reusable recipes every catalog entry is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryShape {
    /// successful / total per group
    Rate,
    /// count / mean / min / max of a measure per group
    Summary,
    /// aggregate, sort descending, dense rank
    RankedTopN,
    /// canonical pairs under a shared parent
    CoOccurrence,
}

impl QueryShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryShape::Rate => "rate",
            QueryShape::Summary => "summary",
            QueryShape::RankedTopN => "ranked_top_n",
            QueryShape::CoOccurrence => "co_occurrence",
        }
    }
}

pub type QueryFn = fn(&Snapshot, &Filters, &EngineConfig) -> TabularResult;

#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub shape: QueryShape,
    /// Tables fetched once per invocation
    pub required_tables: &'static [Table],
    pub grouping_keys: &'static [&'static str],
    pub metrics: &'static [&'static str],
    pub ordering: &'static str,
    pub accepted_filters: &'static [FilterKey],
    pub run: QueryFn,
}

impl QueryDescriptor {
    /// Validate filters, fetch the snapshot, compute
    pub fn execute<S: DatasetSource + ?Sized>(
        &self,
        source: &S,
        filters: &Filters,
        config: &EngineConfig,
    ) -> EngineResult<TabularResult> {
        filters.validate(self.accepted_filters)?;
        let snapshot = Snapshot::fetch(source, self.required_tables)?;
        Ok((self.run)(&snapshot, filters, config))
    }

    pub fn info(&self) -> QueryInfo {
        QueryInfo {
            id: self.id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            shape: self.shape,
            required_tables: self.required_tables.to_vec(),
            grouping_keys: self.grouping_keys.iter().map(|k| k.to_string()).collect(),
            metrics: self.metrics.iter().map(|m| m.to_string()).collect(),
            ordering: self.ordering.to_string(),
            accepted_filters: self.accepted_filters.to_vec(),
        }
    }
}

/// Manifest entry for selectors and API listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub shape: QueryShape,
    pub required_tables: Vec<Table>,
    pub grouping_keys: Vec<String>,
    pub metrics: Vec<String>,
    pub ordering: String,
    pub accepted_filters: Vec<FilterKey>,
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone)]
pub struct QueryCatalog {
    entries: Vec<QueryDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl QueryCatalog {
    /// Build a registry, rejecting duplicate or ill-formed entries
    pub fn new(entries: Vec<QueryDescriptor>) -> EngineResult<Self> {
        let mut index = HashMap::new();

        for (position, entry) in entries.iter().enumerate() {
            let well_formed = !entry.id.is_empty()
                && entry
                    .id
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !well_formed {
                return Err(EngineError::InvalidCatalog(format!(
                    "query id '{}' must be non-empty snake_case",
                    entry.id
                )));
            }
            if entry.required_tables.is_empty() {
                return Err(EngineError::InvalidCatalog(format!(
                    "query '{}' declares no required tables",
                    entry.id
                )));
            }
            if index.insert(entry.id, position).is_some() {
                return Err(EngineError::InvalidCatalog(format!(
                    "duplicate query id '{}'",
                    entry.id
                )));
            }
        }

        Ok(QueryCatalog { entries, index })
    }

    /// The 13 built-in questions
    pub fn standard() -> EngineResult<Self> {
        Self::new(standard_entries())
    }

    pub fn get(&self, id: &str) -> EngineResult<&QueryDescriptor> {
        self.index
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| EngineError::QueryNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order
    pub fn descriptors(&self) -> &[QueryDescriptor] {
        &self.entries
    }

    pub fn manifest(&self) -> Vec<QueryInfo> {
        self.entries.iter().map(|e| e.info()).collect()
    }
}

// ============================================================================
// BUILT-IN ENTRIES
// ============================================================================

use crate::filters::FilterKey::{City, Industry, Limit, MaxPosition, MinCount, SeasonFrom, SeasonTo, State};

fn standard_entries() -> Vec<QueryDescriptor> {
    vec![
        QueryDescriptor {
            id: "industry_deal_rates",
            title: "Industries with Most Appearances and Deal Rates",
            description: "How often each industry appears and how often its companies land a deal",
            shape: QueryShape::Rate,
            required_tables: &[Table::Company, Table::Investment],
            grouping_keys: &["industry"],
            metrics: &["company_count", "deal_count", "deal_rate"],
            ordering: "company_count desc, industry asc",
            accepted_filters: &[Industry],
            run: queries::industry_deal_rates,
        },
        QueryDescriptor {
            id: "industry_ask_summary",
            title: "Average & Range of Asks per Industry",
            description: "Ask amount range, average and requested equity per industry",
            shape: QueryShape::Summary,
            required_tables: &[Table::Ask, Table::Company],
            grouping_keys: &["industry"],
            metrics: &[
                "asks",
                "missing_amounts",
                "min_amount",
                "max_amount",
                "avg_amount",
                "avg_equity",
            ],
            ordering: "industry asc",
            accepted_filters: &[Industry, SeasonFrom, SeasonTo],
            run: queries::industry_ask_summary,
        },
        QueryDescriptor {
            id: "season_valuation_trends",
            title: "Valuation Trends Across Seasons",
            description: "Average implied valuation of accepted deals per season and industry",
            shape: QueryShape::Summary,
            required_tables: &[Table::Investment, Table::Company],
            grouping_keys: &["season", "industry"],
            metrics: &["deals", "avg_valuation"],
            ordering: "season asc, avg_valuation desc, industry asc",
            accepted_filters: &[SeasonFrom, SeasonTo, Industry],
            run: queries::season_valuation_trends,
        },
        QueryDescriptor {
            id: "shark_collaborations",
            title: "Shark Collaboration Patterns",
            description: "Pairs of sharks that contributed to the same investment",
            shape: QueryShape::CoOccurrence,
            required_tables: &[Table::Contribute, Table::Investment, Table::Shark],
            grouping_keys: &["shark1", "shark2"],
            metrics: &["collaborations", "shared_amount"],
            ordering: "rank (collaborations desc), shark ids asc",
            accepted_filters: &[MinCount, SeasonFrom, SeasonTo],
            run: queries::shark_collaborations,
        },
        QueryDescriptor {
            id: "top_sharks",
            title: "Top Sharks by Deal Frequency and Total Investment",
            description: "Sharks ranked by the amount they personally contributed to accepted deals",
            shape: QueryShape::RankedTopN,
            required_tables: &[Table::Investment, Table::Contribute, Table::Shark],
            grouping_keys: &["shark"],
            metrics: &[
                "total_deals",
                "max_single_investment",
                "total_investment",
                "total_contributed",
            ],
            ordering: "rank (total_contributed desc), shark id asc",
            accepted_filters: &[Limit, SeasonFrom, SeasonTo],
            run: queries::top_sharks,
        },
        QueryDescriptor {
            id: "shark_deal_rate",
            title: "Shark Deal Rate",
            description: "Share of each shark's opportunities that became accepted deals it joined",
            shape: QueryShape::Rate,
            required_tables: &[
                Table::Ask,
                Table::Judge,
                Table::Investment,
                Table::Contribute,
                Table::Shark,
            ],
            grouping_keys: &["shark"],
            metrics: &["successful_deals", "total_opportunities", "deal_rate"],
            ordering: "deal_rate desc (null last), shark id asc",
            accepted_filters: &[SeasonFrom, SeasonTo],
            run: queries::shark_deal_rate,
        },
        QueryDescriptor {
            id: "guest_shark_effect",
            title: "Effect of Guest Shark Presence on Deals",
            description: "Average accepted deals per episode, with and without a guest shark on the panel",
            shape: QueryShape::Summary,
            required_tables: &[Table::Episode, Table::Judge, Table::Shark, Table::Investment],
            grouping_keys: &["has_guest"],
            metrics: &["episodes", "average_deal_count"],
            ordering: "has_guest Yes first",
            accepted_filters: &[SeasonFrom, SeasonTo],
            run: queries::guest_shark_effect,
        },
        QueryDescriptor {
            id: "pitch_order_success",
            title: "Impact of Pitch Order on Success",
            description: "Deal success rate by position of the pitch within its episode",
            shape: QueryShape::Rate,
            required_tables: &[Table::Ask, Table::Investment],
            grouping_keys: &["pitch_order"],
            metrics: &["total_pitches", "deal_success_rate"],
            ordering: "pitch_order asc",
            accepted_filters: &[MaxPosition, SeasonFrom, SeasonTo],
            run: queries::pitch_order_success,
        },
        QueryDescriptor {
            id: "location_deal_stats",
            title: "Companies by City/State and Their Deal Stats",
            description: "Deal success rate of companies grouped by their owners' location",
            shape: QueryShape::Rate,
            required_tables: &[Table::Entrepreneur, Table::Own, Table::Company, Table::Investment],
            grouping_keys: &["city", "state"],
            metrics: &["total_companies", "companies_with_deals", "deal_success_rate"],
            ordering: "deal_success_rate desc, total_companies desc, city asc, state asc",
            accepted_filters: &[City, State, MinCount],
            run: queries::location_deal_stats,
        },
        QueryDescriptor {
            id: "industry_company_stats",
            title: "Companies by Industry and Their Deal Stats",
            description: "Deal success rate and average amount raised per industry",
            shape: QueryShape::Rate,
            required_tables: &[Table::Entrepreneur, Table::Own, Table::Company, Table::Investment],
            grouping_keys: &["industry"],
            metrics: &[
                "total_companies",
                "companies_with_deals",
                "deal_success_rate",
                "average_amount_raised",
            ],
            ordering: "deal_success_rate desc, total_companies desc, industry asc",
            accepted_filters: &[Industry, MinCount],
            run: queries::industry_company_stats,
        },
        QueryDescriptor {
            id: "top_funded_companies",
            title: "Companies with Highest Total Amount Invested",
            description: "Companies ranked by the total of their accepted investments",
            shape: QueryShape::RankedTopN,
            required_tables: &[Table::Investment, Table::Company],
            grouping_keys: &["company"],
            metrics: &["total_invested"],
            ordering: "rank (total_invested desc), company id asc",
            accepted_filters: &[Limit, Industry],
            run: queries::top_funded_companies,
        },
        QueryDescriptor {
            id: "episodes_by_deal_count",
            title: "Episodes with Highest Accepted Deal Count",
            description: "Episodes ranked by the number of accepted deals",
            shape: QueryShape::RankedTopN,
            required_tables: &[Table::Episode, Table::Investment],
            grouping_keys: &["season", "episode"],
            metrics: &["accepted_deals"],
            ordering: "rank (accepted_deals desc), season asc, episode asc",
            accepted_filters: &[Limit, SeasonFrom, SeasonTo],
            run: queries::episodes_by_deal_count,
        },
        QueryDescriptor {
            id: "season_investment_stats",
            title: "Average Investment Stats per Season",
            description: "Pitches, accepted deals, success rate and amounts invested per season",
            shape: QueryShape::Summary,
            required_tables: &[Table::Season, Table::Ask, Table::Investment],
            grouping_keys: &["season"],
            metrics: &[
                "total_pitches",
                "total_investments",
                "deal_success_rate",
                "total_invested",
                "avg_investment",
            ],
            ordering: "season asc",
            accepted_filters: &[SeasonFrom, SeasonTo],
            run: queries::season_investment_stats,
        },
    ]
}
