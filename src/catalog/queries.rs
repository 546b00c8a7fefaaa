// 📊 Catalog Queries - The 13 computations behind the registry
//
// Each function is pure over a Snapshot. Joins are inner unless noted:
// a row referencing a company/investment missing from the snapshot is skipped.
// "Deal" always means an Investment with accepted = true.

use crate::aggregate::{
    cmp_desc, dense_rank, group_aggregate, pairwise_cooccurrence, rate, row_number, Metric,
    PairStats, Ranked,
};
use crate::config::EngineConfig;
use crate::dataset::Snapshot;
use crate::entities::{Ask, Contribute, Entrepreneur, EpisodeKey, Investment, PitchKey, Shark};
use crate::filters::Filters;
use crate::table::{Scalar, TabularResult};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

// ============================================================================
// SHARED HELPERS
// ============================================================================

fn deals(snapshot: &Snapshot) -> impl Iterator<Item = &Investment> {
    snapshot.investments.iter().filter(|i| i.accepted)
}

fn companies_with_deals(snapshot: &Snapshot) -> HashSet<i64> {
    deals(snapshot).map(|i| i.company_id).collect()
}

fn shark_label(names: &HashMap<i64, &str>, id: i64) -> String {
    names
        .get(&id)
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("Shark {}", id))
}

/// Highest dense rank to keep: the `limit` filter, else the configured default
fn rank_cutoff(filters: &Filters, config: &EngineConfig) -> usize {
    filters.limit.or(config.default_top_n).unwrap_or(usize::MAX)
}

fn within_cutoff<T>(ranked: Vec<Ranked<T>>, cutoff: usize) -> impl Iterator<Item = Ranked<T>> {
    ranked.into_iter().take_while(move |r| r.rank <= cutoff)
}

fn ratio(successful: i64, total: i64) -> Scalar {
    Scalar::from(rate(successful as f64, total as f64))
}

// ============================================================================
// 1. INDUSTRY DEAL RATES
// ============================================================================

pub fn industry_deal_rates(snapshot: &Snapshot, filters: &Filters, _config: &EngineConfig) -> TabularResult {
    let with_deals = companies_with_deals(snapshot);

    // One row per distinct company
    let companies: Vec<(i64, Option<String>)> = snapshot
        .companies
        .iter()
        .filter(|c| filters.industry_matches(c.industry.as_deref()))
        .map(|c| (c.company_id, c.industry.clone()))
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect();

    let metrics = [
        Metric::count("company_count"),
        Metric::count_where("deal_count", |row: &(i64, Option<String>)| {
            with_deals.contains(&row.0)
        }),
    ];
    let mut groups = group_aggregate(&companies, |row| row.1.clone(), &metrics);
    // stable: ties keep ascending industry
    groups.sort_by(|a, b| b.size.cmp(&a.size));

    let mut result = TabularResult::new(&["industry", "company_count", "deal_count", "deal_rate"]);
    for group in groups {
        let total = group.count("company_count");
        let won = group.count("deal_count");
        result.push_row(vec![
            Scalar::from(group.key),
            Scalar::from(total),
            Scalar::from(won),
            ratio(won, total),
        ]);
    }
    result
}

// ============================================================================
// 2. INDUSTRY ASK SUMMARY
// ============================================================================

type AskRow<'s> = (Option<String>, &'s Ask);

pub fn industry_ask_summary(snapshot: &Snapshot, filters: &Filters, _config: &EngineConfig) -> TabularResult {
    let companies = snapshot.companies_by_id();

    let asks: Vec<AskRow> = snapshot
        .asks
        .iter()
        .filter(|a| filters.season_contains(a.season_id))
        .filter_map(|a| companies.get(&a.company_id).map(|c| (c.industry.clone(), a)))
        .filter(|(industry, _)| filters.industry_matches(industry.as_deref()))
        .collect();

    let metrics = [
        Metric::count("asks"),
        Metric::missing("missing_amounts", |row: &AskRow| row.1.amount),
        Metric::min("min_amount", |row: &AskRow| row.1.amount),
        Metric::max("max_amount", |row: &AskRow| row.1.amount),
        Metric::mean("avg_amount", |row: &AskRow| row.1.amount),
        Metric::mean("avg_equity", |row: &AskRow| row.1.equity_share),
    ];
    let groups = group_aggregate(&asks, |row| row.0.clone(), &metrics);

    let mut result = TabularResult::new(&[
        "industry",
        "asks",
        "missing_amounts",
        "min_amount",
        "max_amount",
        "avg_amount",
        "avg_equity",
    ]);
    for group in groups {
        result.push_row(vec![
            Scalar::from(group.key.clone()),
            Scalar::from(group.count("asks")),
            Scalar::from(group.count("missing_amounts")),
            Scalar::from(group.value("min_amount")),
            Scalar::from(group.value("max_amount")),
            Scalar::from(group.value("avg_amount")),
            Scalar::from(group.value("avg_equity")),
        ]);
    }
    result
}

// ============================================================================
// 3. SEASON VALUATION TRENDS
// ============================================================================

pub fn season_valuation_trends(snapshot: &Snapshot, filters: &Filters, _config: &EngineConfig) -> TabularResult {
    let companies = snapshot.companies_by_id();

    let rows: Vec<(i64, Option<String>, f64)> = deals(snapshot)
        .filter(|i| filters.season_contains(i.season_id))
        .filter_map(|i| {
            let valuation = i.valuation()?;
            let company = companies.get(&i.company_id)?;
            Some((i.season_id, company.industry.clone(), valuation))
        })
        .filter(|(_, industry, _)| filters.industry_matches(industry.as_deref()))
        .collect();

    let metrics = [
        Metric::count("deals"),
        Metric::mean("avg_valuation", |row: &(i64, Option<String>, f64)| Some(row.2)),
    ];
    let mut groups = group_aggregate(&rows, |row| (row.0, row.1.clone()), &metrics);
    groups.sort_by(|a, b| {
        a.key
            .0
            .cmp(&b.key.0)
            .then_with(|| cmp_desc(a.value("avg_valuation"), b.value("avg_valuation")))
            .then_with(|| a.key.1.cmp(&b.key.1))
    });

    let mut result = TabularResult::new(&["season", "industry", "deals", "avg_valuation"]);
    for group in groups {
        let (season, industry) = group.key.clone();
        result.push_row(vec![
            Scalar::from(season),
            Scalar::from(industry),
            Scalar::from(group.count("deals")),
            Scalar::from(group.value("avg_valuation")),
        ]);
    }
    result
}

// ============================================================================
// 4. SHARK COLLABORATIONS
// ============================================================================

pub fn shark_collaborations(snapshot: &Snapshot, filters: &Filters, _config: &EngineConfig) -> TabularResult {
    let investments = snapshot.investments_by_id();
    let names = snapshot.shark_names();

    let contributions: Vec<&Contribute> = snapshot
        .contributions
        .iter()
        .filter(|c| {
            investments
                .get(&c.investment_id)
                .map_or(false, |i| filters.season_contains(i.season_id))
        })
        .collect();

    let min_count = filters.min_count.unwrap_or(1);
    let pairs: Vec<((i64, i64), PairStats)> = pairwise_cooccurrence(
        &contributions,
        |c| c.investment_id,
        |c| c.shark_id,
        |c| c.amount.unwrap_or(0.0),
    )
    .into_iter()
    .filter(|(_, stats)| stats.count >= min_count)
    .collect();

    let ranked = dense_rank(pairs, |(_, stats)| Some(stats.count as f64), |(pair, _)| *pair);

    let mut result = TabularResult::new(&["rank", "shark1", "shark2", "collaborations", "shared_amount"]);
    for Ranked { rank, item: ((a, b), stats) } in ranked {
        result.push_row(vec![
            Scalar::from(rank),
            Scalar::from(shark_label(&names, a)),
            Scalar::from(shark_label(&names, b)),
            Scalar::from(stats.count as i64),
            Scalar::from(stats.weight),
        ]);
    }
    result
}

// ============================================================================
// 5. TOP SHARKS
// ============================================================================

struct SharkDeal {
    shark_id: i64,
    /// Investment-level amount, once per (shark, investment)
    amount: Option<f64>,
    /// The shark's own contribution to that investment
    contributed: Option<f64>,
}

pub fn top_sharks(snapshot: &Snapshot, filters: &Filters, config: &EngineConfig) -> TabularResult {
    let investments: HashMap<i64, &Investment> = deals(snapshot)
        .filter(|i| filters.season_contains(i.season_id))
        .map(|i| (i.investment_id, i))
        .collect();

    let mut contributed: BTreeMap<(i64, i64), Option<f64>> = BTreeMap::new();
    for c in &snapshot.contributions {
        if !investments.contains_key(&c.investment_id) {
            continue;
        }
        let entry = contributed.entry((c.shark_id, c.investment_id)).or_insert(None);
        if let Some(amount) = c.amount {
            *entry = Some(entry.unwrap_or(0.0) + amount);
        }
    }

    let rows: Vec<SharkDeal> = contributed
        .into_iter()
        .filter_map(|((shark_id, investment_id), contributed)| {
            investments.get(&investment_id).map(|i| SharkDeal {
                shark_id,
                amount: i.amount,
                contributed,
            })
        })
        .collect();

    let metrics = [
        Metric::count("total_deals"),
        Metric::max("max_single_investment", |r: &SharkDeal| r.amount),
        Metric::sum("total_investment", |r: &SharkDeal| r.amount),
        Metric::sum("total_contributed", |r: &SharkDeal| r.contributed),
    ];
    let groups = group_aggregate(&rows, |r| r.shark_id, &metrics);
    let ranked = dense_rank(groups, |g| g.value("total_contributed"), |g| g.key);
    let names = snapshot.shark_names();

    let mut result = TabularResult::new(&[
        "rank",
        "shark",
        "total_deals",
        "max_single_investment",
        "total_investment",
        "total_contributed",
    ]);
    for Ranked { rank, item: group } in within_cutoff(ranked, rank_cutoff(filters, config)) {
        result.push_row(vec![
            Scalar::from(rank),
            Scalar::from(shark_label(&names, group.key)),
            Scalar::from(group.count("total_deals")),
            Scalar::from(group.value("max_single_investment")),
            Scalar::from(group.value("total_investment")),
            Scalar::from(group.value("total_contributed")),
        ]);
    }
    result
}

// ============================================================================
// 6. SHARK DEAL RATE
// ============================================================================

pub fn shark_deal_rate(snapshot: &Snapshot, filters: &Filters, _config: &EngineConfig) -> TabularResult {
    let mut asks_by_episode: HashMap<EpisodeKey, Vec<PitchKey>> = HashMap::new();
    for a in snapshot.asks.iter().filter(|a| filters.season_contains(a.season_id)) {
        asks_by_episode.entry(a.key().episode()).or_default().push(a.key());
    }

    // (shark, pitch) pairs: every ask judged, plus every investment joined
    let mut opportunities: BTreeSet<(i64, PitchKey)> = BTreeSet::new();
    for j in &snapshot.judges {
        if let Some(pitches) = asks_by_episode.get(&j.episode()) {
            opportunities.extend(pitches.iter().map(|p| (j.shark_id, *p)));
        }
    }

    let investments = snapshot.investments_by_id();
    let mut successful: HashSet<(i64, PitchKey)> = HashSet::new();
    for c in &snapshot.contributions {
        if let Some(i) = investments.get(&c.investment_id) {
            if !filters.season_contains(i.season_id) {
                continue;
            }
            opportunities.insert((c.shark_id, i.key()));
            if i.accepted {
                successful.insert((c.shark_id, i.key()));
            }
        }
    }

    let rows: Vec<(i64, bool)> = opportunities
        .into_iter()
        .map(|(shark_id, pitch)| (shark_id, successful.contains(&(shark_id, pitch))))
        .collect();

    let metrics = [
        Metric::count("total_opportunities"),
        Metric::count_where("successful_deals", |r: &(i64, bool)| r.1),
    ];
    let mut stats: Vec<(i64, i64, i64, Option<f64>)> = group_aggregate(&rows, |r| r.0, &metrics)
        .into_iter()
        .map(|g| {
            let won = g.count("successful_deals");
            let total = g.count("total_opportunities");
            (g.key, won, total, rate(won as f64, total as f64))
        })
        .collect();
    stats.sort_by(|a, b| cmp_desc(a.3, b.3).then_with(|| a.0.cmp(&b.0)));

    let names = snapshot.shark_names();
    let mut result = TabularResult::new(&["shark", "successful_deals", "total_opportunities", "deal_rate"]);
    for (shark_id, won, total, deal_rate) in stats {
        result.push_row(vec![
            Scalar::from(shark_label(&names, shark_id)),
            Scalar::from(won),
            Scalar::from(total),
            Scalar::from(deal_rate),
        ]);
    }
    result
}

// ============================================================================
// 7. GUEST SHARK EFFECT
// ============================================================================

pub fn guest_shark_effect(snapshot: &Snapshot, filters: &Filters, _config: &EngineConfig) -> TabularResult {
    let sharks: HashMap<i64, &Shark> = snapshot.sharks.iter().map(|s| (s.shark_id, s)).collect();

    let mut panel_has_guest: HashMap<EpisodeKey, bool> = HashMap::new();
    for j in &snapshot.judges {
        let guest = j.guest_for_episode(sharks.get(&j.shark_id).copied());
        *panel_has_guest.entry(j.episode()).or_insert(false) |= guest;
    }

    let mut deals_per_episode: HashMap<EpisodeKey, HashSet<i64>> = HashMap::new();
    for i in deals(snapshot) {
        deals_per_episode
            .entry(i.key().episode())
            .or_default()
            .insert(i.investment_id);
    }

    let episodes: BTreeSet<(EpisodeKey, Option<bool>)> = snapshot
        .episodes
        .iter()
        .filter(|e| filters.season_contains(e.season_id))
        .map(|e| (e.key(), e.guest_present))
        .collect();

    // Episodes without a recorded panel fall back to the episode's own flag
    let rows: Vec<(bool, f64)> = episodes
        .into_iter()
        .filter_map(|(key, guest_present)| {
            let has_guest = panel_has_guest.get(&key).copied().or(guest_present)?;
            let deal_count = deals_per_episode.get(&key).map_or(0, |d| d.len());
            Some((has_guest, deal_count as f64))
        })
        .collect();

    let metrics = [
        Metric::count("episodes"),
        Metric::mean("average_deal_count", |r: &(bool, f64)| Some(r.1)),
    ];
    let groups = group_aggregate(&rows, |r| r.0, &metrics);

    let mut result = TabularResult::new(&["has_guest", "episodes", "average_deal_count"]);
    // true sorts last, Yes comes first
    for group in groups.into_iter().rev() {
        result.push_row(vec![
            Scalar::from(if group.key { "Yes" } else { "No" }),
            Scalar::from(group.count("episodes")),
            Scalar::from(group.value("average_deal_count")),
        ]);
    }
    result
}

// ============================================================================
// 8. PITCH ORDER SUCCESS
// ============================================================================

pub fn pitch_order_success(snapshot: &Snapshot, filters: &Filters, config: &EngineConfig) -> TabularResult {
    let won: HashSet<PitchKey> = deals(snapshot).map(|i| i.key()).collect();
    let max_position = filters.max_position.unwrap_or(config.max_pitch_position);

    let pitches: Vec<PitchKey> = snapshot
        .asks
        .iter()
        .filter(|a| filters.season_contains(a.season_id))
        .map(|a| a.key())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows: Vec<(usize, bool)> = row_number(pitches, |p| p.episode(), |p| p.company_id)
        .into_iter()
        .filter(|(position, _)| *position <= max_position)
        .map(|(position, pitch)| (position, won.contains(&pitch)))
        .collect();

    let metrics = [
        Metric::count("total_pitches"),
        Metric::mean("deal_success_rate", |r: &(usize, bool)| {
            Some(if r.1 { 1.0 } else { 0.0 })
        }),
    ];

    let mut result = TabularResult::new(&["pitch_order", "total_pitches", "deal_success_rate"]);
    for group in group_aggregate(&rows, |r| r.0, &metrics) {
        result.push_row(vec![
            Scalar::from(group.key),
            Scalar::from(group.count("total_pitches")),
            Scalar::from(group.value("deal_success_rate")),
        ]);
    }
    result
}

// ============================================================================
// 9. LOCATION DEAL STATS
// ============================================================================

type Location = (Option<String>, Option<String>);

pub fn location_deal_stats(snapshot: &Snapshot, filters: &Filters, config: &EngineConfig) -> TabularResult {
    let entrepreneurs: HashMap<i64, &Entrepreneur> = snapshot
        .entrepreneurs
        .iter()
        .map(|e| (e.entrepreneur_id, e))
        .collect();
    let companies = snapshot.companies_by_id();
    let with_deals = companies_with_deals(snapshot);

    // Distinct (location, company): co-owners in one city count the company once
    let mut located: BTreeSet<(Location, i64)> = BTreeSet::new();
    for o in &snapshot.ownership {
        if let (Some(e), true) = (
            entrepreneurs.get(&o.entrepreneur_id),
            companies.contains_key(&o.company_id),
        ) {
            if filters.city_matches(e.location_city.as_deref())
                && filters.state_matches(e.location_state.as_deref())
            {
                located.insert((
                    (e.location_city.clone(), e.location_state.clone()),
                    o.company_id,
                ));
            }
        }
    }
    let rows: Vec<(Location, i64)> = located.into_iter().collect();

    let metrics = [
        Metric::count("total_companies"),
        Metric::count_where("companies_with_deals", |r: &(Location, i64)| {
            with_deals.contains(&r.1)
        }),
    ];
    let min_count = filters.min_count.unwrap_or(config.min_companies_per_group);

    let mut stats: Vec<(Location, i64, i64, Option<f64>)> = group_aggregate(&rows, |r| r.0.clone(), &metrics)
        .into_iter()
        .filter(|g| g.size as u64 >= min_count)
        .map(|g| {
            let total = g.count("total_companies");
            let won = g.count("companies_with_deals");
            (g.key, total, won, rate(won as f64, total as f64))
        })
        .collect();
    stats.sort_by(|a, b| {
        cmp_desc(a.3, b.3)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut result = TabularResult::new(&[
        "city",
        "state",
        "total_companies",
        "companies_with_deals",
        "deal_success_rate",
    ]);
    for ((city, state), total, won, success) in stats {
        result.push_row(vec![
            Scalar::from(city),
            Scalar::from(state),
            Scalar::from(total),
            Scalar::from(won),
            Scalar::from(success),
        ]);
    }
    result
}

// ============================================================================
// 10. INDUSTRY COMPANY STATS
// ============================================================================

pub fn industry_company_stats(snapshot: &Snapshot, filters: &Filters, config: &EngineConfig) -> TabularResult {
    let companies = snapshot.companies_by_id();
    let founders: HashSet<i64> = snapshot
        .entrepreneurs
        .iter()
        .map(|e| e.entrepreneur_id)
        .collect();
    let with_deals = companies_with_deals(snapshot);

    // Companies with at least one known owner, once each
    let owned: BTreeSet<(Option<String>, i64)> = snapshot
        .ownership
        .iter()
        .filter(|o| founders.contains(&o.entrepreneur_id))
        .filter_map(|o| companies.get(&o.company_id))
        .filter(|c| filters.industry_matches(c.industry.as_deref()))
        .map(|c| (c.industry.clone(), c.company_id))
        .collect();

    let mut raised_by_company: HashMap<i64, Vec<Option<f64>>> = HashMap::new();
    for i in deals(snapshot) {
        raised_by_company.entry(i.company_id).or_default().push(i.amount);
    }
    let raised: Vec<(Option<String>, Option<f64>)> = owned
        .iter()
        .flat_map(|(industry, company_id)| {
            raised_by_company
                .get(company_id)
                .into_iter()
                .flatten()
                .map(move |amount| (industry.clone(), *amount))
        })
        .collect();
    let average_raised: HashMap<Option<String>, Option<f64>> = group_aggregate(
        &raised,
        |r| r.0.clone(),
        &[Metric::mean("average_amount_raised", |r: &(Option<String>, Option<f64>)| r.1)],
    )
    .into_iter()
    .map(|g| {
        let value = g.value("average_amount_raised");
        (g.key, value)
    })
    .collect();

    let rows: Vec<(Option<String>, i64)> = owned.into_iter().collect();
    let metrics = [
        Metric::count("total_companies"),
        Metric::count_where("companies_with_deals", |r: &(Option<String>, i64)| {
            with_deals.contains(&r.1)
        }),
    ];
    let min_count = filters.min_count.unwrap_or(config.min_companies_per_group);

    let mut stats: Vec<(Option<String>, i64, i64, Option<f64>)> = group_aggregate(&rows, |r| r.0.clone(), &metrics)
        .into_iter()
        .filter(|g| g.size as u64 >= min_count)
        .map(|g| {
            let total = g.count("total_companies");
            let won = g.count("companies_with_deals");
            (g.key, total, won, rate(won as f64, total as f64))
        })
        .collect();
    stats.sort_by(|a, b| {
        cmp_desc(a.3, b.3)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut result = TabularResult::new(&[
        "industry",
        "total_companies",
        "companies_with_deals",
        "deal_success_rate",
        "average_amount_raised",
    ]);
    for (industry, total, won, success) in stats {
        let average = average_raised.get(&industry).copied().flatten();
        result.push_row(vec![
            Scalar::from(industry),
            Scalar::from(total),
            Scalar::from(won),
            Scalar::from(success),
            Scalar::from(average),
        ]);
    }
    result
}

// ============================================================================
// 11. TOP FUNDED COMPANIES
// ============================================================================

pub fn top_funded_companies(snapshot: &Snapshot, filters: &Filters, config: &EngineConfig) -> TabularResult {
    let companies = snapshot.companies_by_id();

    let rows: Vec<(i64, Option<f64>)> = deals(snapshot)
        .filter(|i| {
            companies
                .get(&i.company_id)
                .map_or(false, |c| filters.industry_matches(c.industry.as_deref()))
        })
        .map(|i| (i.company_id, i.amount))
        .collect();

    let metrics = [Metric::sum("total_invested", |r: &(i64, Option<f64>)| r.1)];
    let groups = group_aggregate(&rows, |r| r.0, &metrics);
    let ranked = dense_rank(groups, |g| g.value("total_invested"), |g| g.key);

    let mut result = TabularResult::new(&["rank", "company", "total_invested"]);
    for Ranked { rank, item: group } in within_cutoff(ranked, rank_cutoff(filters, config)) {
        let name = companies
            .get(&group.key)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("Company {}", group.key));
        result.push_row(vec![
            Scalar::from(rank),
            Scalar::from(name),
            Scalar::from(group.value("total_invested")),
        ]);
    }
    result
}

// ============================================================================
// 12. EPISODES BY DEAL COUNT
// ============================================================================

pub fn episodes_by_deal_count(snapshot: &Snapshot, filters: &Filters, config: &EngineConfig) -> TabularResult {
    let mut deals_per_episode: HashMap<EpisodeKey, BTreeSet<i64>> = HashMap::new();
    for i in deals(snapshot) {
        deals_per_episode
            .entry(i.key().episode())
            .or_default()
            .insert(i.investment_id);
    }

    let episodes: BTreeSet<EpisodeKey> = snapshot
        .episodes
        .iter()
        .filter(|e| filters.season_contains(e.season_id))
        .map(|e| e.key())
        .collect();

    let rows: Vec<(EpisodeKey, usize)> = episodes
        .into_iter()
        .filter_map(|key| {
            let count = deals_per_episode.get(&key).map_or(0, |d| d.len());
            (count > 0).then_some((key, count))
        })
        .collect();

    let ranked = dense_rank(rows, |r| Some(r.1 as f64), |r| r.0);

    let mut result = TabularResult::new(&["rank", "season", "episode", "accepted_deals"]);
    for Ranked { rank, item: (key, count) } in within_cutoff(ranked, rank_cutoff(filters, config)) {
        result.push_row(vec![
            Scalar::from(rank),
            Scalar::from(key.season_id),
            Scalar::from(key.episode_id),
            Scalar::from(count),
        ]);
    }
    result
}

// ============================================================================
// 13. SEASON INVESTMENT STATS
// ============================================================================

struct PitchOutcome {
    season_id: i64,
    deal: bool,
    /// Deal amount, None without a deal
    amount: Option<f64>,
}

pub fn season_investment_stats(snapshot: &Snapshot, filters: &Filters, _config: &EngineConfig) -> TabularResult {
    let seasons: HashSet<i64> = snapshot
        .seasons
        .iter()
        .map(|s| s.season_id)
        .filter(|id| filters.season_contains(*id))
        .collect();
    let deal_by_pitch: HashMap<PitchKey, &Investment> = deals(snapshot).map(|i| (i.key(), i)).collect();

    let pitches: BTreeSet<PitchKey> = snapshot
        .asks
        .iter()
        .filter(|a| seasons.contains(&a.season_id))
        .map(|a| a.key())
        .collect();

    let rows: Vec<PitchOutcome> = pitches
        .into_iter()
        .map(|pitch| {
            let deal = deal_by_pitch.get(&pitch);
            PitchOutcome {
                season_id: pitch.season_id,
                deal: deal.is_some(),
                amount: deal.and_then(|i| i.amount),
            }
        })
        .collect();

    let metrics = [
        Metric::count("total_pitches"),
        Metric::count_where("total_investments", |r: &PitchOutcome| r.deal),
        Metric::sum("total_invested", |r: &PitchOutcome| r.amount),
        Metric::mean("avg_investment", |r: &PitchOutcome| r.amount),
    ];

    let mut result = TabularResult::new(&[
        "season",
        "total_pitches",
        "total_investments",
        "deal_success_rate",
        "total_invested",
        "avg_investment",
    ]);
    for group in group_aggregate(&rows, |r| r.season_id, &metrics) {
        let pitched = group.count("total_pitches");
        let invested = group.count("total_investments");
        result.push_row(vec![
            Scalar::from(group.key),
            Scalar::from(pitched),
            Scalar::from(invested),
            ratio(invested, pitched),
            Scalar::from(group.value("total_invested").unwrap_or(0.0)),
            Scalar::from(group.value("avg_investment")),
        ]);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::QueryCatalog;
    use crate::dataset::MemoryDataset;
    use crate::test_support::{assert_close, fixture};

    fn run(id: &str, filters: Filters) -> TabularResult {
        run_with(&fixture(), id, filters, &EngineConfig::default())
    }

    fn run_with(dataset: &MemoryDataset, id: &str, filters: Filters, config: &EngineConfig) -> TabularResult {
        QueryCatalog::standard()
            .unwrap()
            .get(id)
            .unwrap()
            .execute(dataset, &filters, config)
            .unwrap()
    }

    fn text_column(result: &TabularResult, column: &str) -> Vec<String> {
        result
            .column(column)
            .unwrap()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_industry_deal_rates() {
        let result = run("industry_deal_rates", Filters::new());

        assert_eq!(text_column(&result, "industry"), vec!["Food", "Tech", "Fitness"]);
        assert_eq!(result.value(0, "company_count"), Some(&Scalar::Int(3)));
        assert_eq!(result.value(0, "deal_count"), Some(&Scalar::Int(2)));
        assert_close(result.value(0, "deal_rate"), 2.0 / 3.0);
        assert_close(result.value(1, "deal_rate"), 0.5);
        // declined investment is not a deal
        assert_close(result.value(2, "deal_rate"), 0.0);

        let food = run("industry_deal_rates", Filters::new().industry("foo"));
        assert_eq!(food.len(), 1);
    }

    #[test]
    fn test_industry_ask_summary_null_handling() {
        let result = run("industry_ask_summary", Filters::new());

        assert_eq!(text_column(&result, "industry"), vec!["Fitness", "Food", "Tech"]);
        let food = 1;
        assert_eq!(result.value(food, "asks"), Some(&Scalar::Int(4)));
        assert_eq!(result.value(food, "missing_amounts"), Some(&Scalar::Int(1)));
        assert_close(result.value(food, "min_amount"), 100_000.0);
        assert_close(result.value(food, "max_amount"), 150_000.0);
        assert_close(result.value(food, "avg_amount"), 370_000.0 / 3.0);
        assert_close(result.value(food, "avg_equity"), 10.0);

        let season_two = run("industry_ask_summary", Filters::new().season_range(2, 2));
        assert_eq!(season_two.len(), 1);
        assert_close(season_two.value(0, "min_amount"), 120_000.0);
    }

    #[test]
    fn test_season_valuation_trends() {
        let result = run("season_valuation_trends", Filters::new());

        assert_eq!(text_column(&result, "season"), vec!["1", "1", "2"]);
        // tie on valuation falls back to industry name
        assert_eq!(text_column(&result, "industry"), vec!["Food", "Tech", "Food"]);
        assert_close(result.value(2, "avg_valuation"), 550_000.0);
        assert_eq!(result.value(2, "deals"), Some(&Scalar::Int(2)));
    }

    #[test]
    fn test_shark_collaborations() {
        let result = run("shark_collaborations", Filters::new());

        assert_eq!(result.len(), 3);
        assert_eq!(text_column(&result, "shark1"), vec!["Mark", "Mark", "Lori"]);
        assert_eq!(text_column(&result, "shark2"), vec!["Lori", "Kevin", "Kevin"]);
        assert_eq!(text_column(&result, "rank"), vec!["1", "2", "2"]);
        assert_eq!(result.value(0, "collaborations"), Some(&Scalar::Int(3)));
        assert_close(result.value(0, "shared_amount"), 310_000.0);

        let strong = run("shark_collaborations", Filters::new().min_count(2));
        assert_eq!(strong.len(), 1);

        let season_one = run("shark_collaborations", Filters::new().season_range(1, 1));
        assert_eq!(season_one.value(0, "collaborations"), Some(&Scalar::Int(2)));
    }

    #[test]
    fn test_top_sharks_ranks_by_contribution() {
        let result = run("top_sharks", Filters::new());

        assert_eq!(text_column(&result, "shark"), vec!["Mark", "Gwen", "Lori", "Kevin"]);
        assert_eq!(result.value(0, "total_deals"), Some(&Scalar::Int(3)));
        assert_close(result.value(0, "max_single_investment"), 200_000.0);
        // investment-level amount counted once per investment
        assert_close(result.value(0, "total_investment"), 360_000.0);
        assert_close(result.value(0, "total_contributed"), 180_000.0);
        assert_close(result.value(3, "total_contributed"), 50_000.0);

        let top_two = run("top_sharks", Filters::new().limit(2));
        assert_eq!(text_column(&top_two, "shark"), vec!["Mark", "Gwen"]);
    }

    #[test]
    fn test_top_sharks_default_top_n_from_config() {
        let config = EngineConfig {
            default_top_n: Some(1),
            ..EngineConfig::default()
        };
        let result = run_with(&fixture(), "top_sharks", Filters::new(), &config);
        assert_eq!(text_column(&result, "shark"), vec!["Mark"]);

        let explicit = run_with(&fixture(), "top_sharks", Filters::new().limit(3), &config);
        assert_eq!(explicit.len(), 3);
    }

    #[test]
    fn test_shark_deal_rate() {
        let result = run("shark_deal_rate", Filters::new());

        assert_eq!(text_column(&result, "shark"), vec!["Gwen", "Mark", "Lori", "Kevin"]);
        assert_close(result.value(0, "deal_rate"), 1.0);
        assert_eq!(result.value(1, "successful_deals"), Some(&Scalar::Int(3)));
        assert_eq!(result.value(1, "total_opportunities"), Some(&Scalar::Int(7)));
        assert_close(result.value(3, "deal_rate"), 0.2);
    }

    #[test]
    fn test_guest_shark_effect() {
        let result = run("guest_shark_effect", Filters::new());

        assert_eq!(text_column(&result, "has_guest"), vec!["Yes", "No"]);
        assert_eq!(result.value(0, "episodes"), Some(&Scalar::Int(1)));
        assert_close(result.value(0, "average_deal_count"), 2.0);
        assert_eq!(result.value(1, "episodes"), Some(&Scalar::Int(2)));
        assert_close(result.value(1, "average_deal_count"), 1.0);
    }

    #[test]
    fn test_guest_status_is_per_episode() {
        let mut ds = fixture();
        // Kevin sits in as a guest for one episode only
        ds.push(
            crate::dataset::Table::Judge,
            &[
                ("season_id", Scalar::Int(1)),
                ("episode_id", Scalar::Int(2)),
                ("shark_id", Scalar::Int(3)),
                ("is_guest", Scalar::Bool(true)),
            ],
        );

        let result = run_with(&ds, "guest_shark_effect", Filters::new(), &EngineConfig::default());
        assert_eq!(result.value(0, "episodes"), Some(&Scalar::Int(2)));
        assert_close(result.value(0, "average_deal_count"), 1.0);
        assert_eq!(result.value(1, "episodes"), Some(&Scalar::Int(1)));
    }

    #[test]
    fn test_pitch_order_success() {
        let result = run("pitch_order_success", Filters::new());

        assert_eq!(text_column(&result, "pitch_order"), vec!["1", "2", "3"]);
        assert_eq!(result.value(0, "total_pitches"), Some(&Scalar::Int(3)));
        assert_close(result.value(0, "deal_success_rate"), 2.0 / 3.0);
        assert_close(result.value(2, "deal_success_rate"), 0.0);

        let first_two = run("pitch_order_success", Filters::new().max_position(2));
        assert_eq!(first_two.len(), 2);
    }

    #[test]
    fn test_location_deal_stats() {
        let result = run("location_deal_stats", Filters::new());

        assert_eq!(text_column(&result, "city"), vec!["Austin", "Denver"]);
        assert_eq!(result.value(0, "total_companies"), Some(&Scalar::Int(4)));
        assert_eq!(result.value(0, "companies_with_deals"), Some(&Scalar::Int(2)));
        assert_close(result.value(1, "deal_success_rate"), 0.5);

        assert_eq!(run("location_deal_stats", Filters::new().min_count(3)).len(), 1);
        let denver = run("location_deal_stats", Filters::new().city("DEN"));
        assert_eq!(text_column(&denver, "state"), vec!["CO"]);
    }

    #[test]
    fn test_industry_company_stats() {
        let result = run("industry_company_stats", Filters::new());

        // Fitness has a single company and falls below the default threshold
        assert_eq!(text_column(&result, "industry"), vec!["Food", "Tech"]);
        assert_close(result.value(0, "deal_success_rate"), 2.0 / 3.0);
        assert_close(result.value(0, "average_amount_raised"), 310_000.0 / 3.0);
        assert_close(result.value(1, "average_amount_raised"), 200_000.0);

        let everything = run("industry_company_stats", Filters::new().min_count(1));
        assert_eq!(everything.len(), 3);
        assert_eq!(everything.value(2, "average_amount_raised"), Some(&Scalar::Null));
    }

    #[test]
    fn test_top_funded_companies() {
        let result = run("top_funded_companies", Filters::new());

        assert_eq!(text_column(&result, "company"), vec!["Gadget", "Bakery", "Juice"]);
        assert_close(result.value(1, "total_invested"), 160_000.0);

        let food = run("top_funded_companies", Filters::new().industry("food").limit(1));
        assert_eq!(text_column(&food, "company"), vec!["Bakery"]);
        assert_eq!(food.value(0, "rank"), Some(&Scalar::Int(1)));
    }

    #[test]
    fn test_episodes_by_deal_count() {
        let result = run("episodes_by_deal_count", Filters::new());

        assert_eq!(result.len(), 2);
        assert_eq!(text_column(&result, "rank"), vec!["1", "1"]);
        assert_eq!(text_column(&result, "season"), vec!["1", "2"]);
        assert_eq!(result.value(0, "accepted_deals"), Some(&Scalar::Int(2)));
    }

    #[test]
    fn test_season_investment_stats() {
        let result = run("season_investment_stats", Filters::new());

        assert_eq!(text_column(&result, "season"), vec!["1", "2"]);
        assert_eq!(result.value(0, "total_pitches"), Some(&Scalar::Int(5)));
        assert_eq!(result.value(0, "total_investments"), Some(&Scalar::Int(2)));
        assert_close(result.value(0, "deal_success_rate"), 0.4);
        assert_close(result.value(0, "total_invested"), 300_000.0);
        assert_close(result.value(1, "avg_investment"), 105_000.0);

        println!("✅ Season investment stats test PASSED");
    }
}
