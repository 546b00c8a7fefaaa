// 🦈 Analytics Engine - The public face of the crate
//
// Holds only the immutable catalog and config. Every call receives the
// dataset source explicitly, fetches what it needs once, and keeps nothing.

use crate::catalog::{QueryCatalog, QueryInfo};
use crate::charts::{self, OptionKind};
use crate::config::EngineConfig;
use crate::dataset::{table_result, DatasetSource, RecordFilter, Snapshot, Table};
use crate::entities::Contribute;
use crate::error::{EngineError, EngineResult};
use crate::filters::Filters;
use crate::graph::{build_collaboration_graph, CollaborationGraph, EdgeWeighting};
use crate::table::{Scalar, TabularResult};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    catalog: QueryCatalog,
    config: EngineConfig,
}

impl AnalyticsEngine {
    /// Engine over the standard catalog; fails if the catalog is ill-formed
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Ok(Self::with_catalog(QueryCatalog::standard()?, config))
    }

    pub fn with_catalog(catalog: QueryCatalog, config: EngineConfig) -> Self {
        AnalyticsEngine { catalog, config }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // CATALOG
    // ========================================================================

    pub fn list_queries(&self) -> Vec<QueryInfo> {
        self.catalog.manifest()
    }

    pub fn run_query<S: DatasetSource + ?Sized>(
        &self,
        source: &S,
        id: &str,
        filters: &Filters,
    ) -> EngineResult<TabularResult> {
        let query = self.catalog.get(id)?;
        let started = Instant::now();

        let result = query.execute(source, filters, &self.config)?;

        debug!(
            query = id,
            filters = ?filters.present(),
            rows = result.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query finished"
        );
        Ok(result)
    }

    // ========================================================================
    // COLLABORATION GRAPH
    // ========================================================================

    /// Co-investment graph, weighted as configured
    pub fn build_collaboration_graph<S: DatasetSource + ?Sized>(
        &self,
        source: &S,
        min_shared_investments: Option<u64>,
    ) -> EngineResult<CollaborationGraph> {
        self.collaboration_graph(source, min_shared_investments, None)
    }

    /// Co-investment graph with an explicit weighting override
    pub fn collaboration_graph<S: DatasetSource + ?Sized>(
        &self,
        source: &S,
        min_shared_investments: Option<u64>,
        weighting: Option<EdgeWeighting>,
    ) -> EngineResult<CollaborationGraph> {
        if min_shared_investments == Some(0) {
            return Err(EngineError::invalid_filter("min_shared", "must be at least 1"));
        }

        let snapshot = Snapshot::fetch(source, &[Table::Contribute, Table::Shark, Table::Investment])?;
        let weighting = weighting.unwrap_or(self.config.edge_weighting);

        // Contributions only count against a recorded investment
        let investment_ids: HashSet<i64> = snapshot.investments.iter().map(|i| i.investment_id).collect();
        let contributions: Vec<Contribute> = snapshot
            .contributions
            .iter()
            .filter(|c| investment_ids.contains(&c.investment_id))
            .cloned()
            .collect();
        let dangling = snapshot.contributions.len() - contributions.len();
        if dangling > 0 {
            debug!(dangling, "skipping contributions with no matching investment");
        }

        let mut graph = build_collaboration_graph(&contributions, &snapshot.sharks, weighting);
        if let Some(min_shared) = min_shared_investments {
            graph = graph.prune(min_shared);
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            weighting = weighting.as_str(),
            "collaboration graph built"
        );
        Ok(graph)
    }

    // ========================================================================
    // RAW TABLES, CHARTS, OPTIONS
    // ========================================================================

    /// Any of the 11 tables by name; unknown names are DataUnavailable
    pub fn table<S: DatasetSource + ?Sized>(
        &self,
        source: &S,
        name: &str,
        filter: Option<&RecordFilter>,
    ) -> EngineResult<TabularResult> {
        let table: Table = name.parse()?;
        let records = source.fetch_table(table, filter)?;
        debug!(table = %table, rows = records.len(), "table browsed");
        Ok(table_result(table, &records))
    }

    /// Valuation chart; `limit` falls back to the configured row count
    pub fn top_valuations<S: DatasetSource + ?Sized>(
        &self,
        source: &S,
        limit: Option<usize>,
    ) -> EngineResult<TabularResult> {
        if limit == Some(0) {
            return Err(EngineError::invalid_filter("limit", "must be at least 1"));
        }
        let snapshot = Snapshot::fetch(source, &[Table::Investment, Table::Company])?;
        Ok(charts::top_valuations(
            &snapshot,
            limit.unwrap_or(self.config.valuation_chart_limit),
        ))
    }

    pub fn shark_industry_strategy<S: DatasetSource + ?Sized>(&self, source: &S) -> EngineResult<TabularResult> {
        let snapshot = Snapshot::fetch(
            source,
            &[Table::Investment, Table::Contribute, Table::Shark, Table::Company],
        )?;
        Ok(charts::shark_industry_strategy(&snapshot))
    }

    pub fn filter_options<S: DatasetSource + ?Sized>(
        &self,
        source: &S,
        kind: OptionKind,
    ) -> EngineResult<Vec<Scalar>> {
        let snapshot = Snapshot::fetch(source, &[kind.source_table()])?;
        Ok(charts::filter_options(&snapshot, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryDataset;
    use crate::db::SqliteDataset;
    use crate::test_support::{self, assert_close, fixture};

    fn engine() -> AnalyticsEngine {
        AnalyticsEngine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnalyticsEngine>();
        assert_send_sync::<MemoryDataset>();
        assert_send_sync::<SqliteDataset>();
    }

    #[test]
    fn test_list_queries() {
        let manifest = engine().list_queries();
        assert_eq!(manifest.len(), 13);
        assert!(manifest.iter().any(|q| q.id == "shark_deal_rate"));
    }

    #[test]
    fn test_unknown_query_fails_without_partial_result() {
        let result = engine().run_query(&fixture(), "no_such_query", &Filters::new());
        assert_eq!(
            result,
            Err(EngineError::QueryNotFound("no_such_query".to_string()))
        );
    }

    #[test]
    fn test_shark_in_ten_investments_four_accepted() {
        let mut ds = MemoryDataset::new();
        test_support::shark(&mut ds, 7, "Shark S", false);
        for n in 0..10 {
            let company = 100 + n;
            test_support::ask(&mut ds, 1, 1, company, Some(10_000.0), 10.0);
            test_support::investment(&mut ds, 1000 + n, 1, 1, company, 10_000.0, 10.0, n < 4);
            test_support::contribute(&mut ds, 1000 + n, 7, 10_000.0);
        }

        let result = engine()
            .run_query(&ds, "shark_deal_rate", &Filters::new())
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.value(0, "shark"), Some(&Scalar::from("Shark S")));
        assert_eq!(result.value(0, "total_opportunities"), Some(&Scalar::Int(10)));
        assert_close(result.value(0, "deal_rate"), 0.4);
    }

    #[test]
    fn test_invalid_filter_is_reported_not_defaulted() {
        let filters = Filters::parse(vec![("season_from", "3"), ("season_to", "1")]).unwrap();
        let err = engine()
            .run_query(&fixture(), "season_investment_stats", &filters)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidFilter { .. }));
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let result = engine()
            .run_query(&fixture(), "top_funded_companies", &Filters::new().industry("Aerospace"))
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns, vec!["rank", "company", "total_invested"]);
    }

    #[test]
    fn test_collaboration_graph_scenario() {
        let mut ds = MemoryDataset::new();
        test_support::investment(&mut ds, 1, 1, 1, 1, 300.0, 10.0, true);
        test_support::investment(&mut ds, 2, 1, 1, 2, 200.0, 10.0, true);
        for (investment, shark) in [(1, 1), (1, 2), (1, 3)] {
            test_support::contribute(&mut ds, investment, shark, 100.0);
        }

        let graph = engine().build_collaboration_graph(&ds, None).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.edges.iter().all(|e| e.weight == 1.0));

        for shark in [1, 2] {
            test_support::contribute(&mut ds, 2, shark, 100.0);
        }
        let graph = engine().build_collaboration_graph(&ds, None).unwrap();
        assert_eq!(graph.edge(1, 2).unwrap().weight, 2.0);
        assert_eq!(graph.edge(1, 3).unwrap().weight, 1.0);
        assert_eq!(graph.edge(2, 3).unwrap().weight, 1.0);

        let pruned = engine().build_collaboration_graph(&ds, Some(2)).unwrap();
        assert_eq!(pruned.edge_count(), 1);
        assert_eq!(pruned.node_count(), 3);
    }

    #[test]
    fn test_collaboration_graph_threshold_and_weighting() {
        let ds = fixture();
        assert!(matches!(
            engine().build_collaboration_graph(&ds, Some(0)),
            Err(EngineError::InvalidFilter { .. })
        ));

        let by_amount = engine()
            .collaboration_graph(&ds, None, Some(EdgeWeighting::SharedAmount))
            .unwrap();
        assert_eq!(by_amount.edge(1, 2).unwrap().weight, 310_000.0);
        assert_eq!(by_amount.node(4).unwrap().degree, 0);
    }

    #[test]
    fn test_graph_ignores_contributions_without_investment() {
        let mut ds = fixture();
        // investment 999 was never recorded
        test_support::contribute(&mut ds, 999, 1, 40_000.0);
        test_support::contribute(&mut ds, 999, 4, 40_000.0);

        let graph = engine()
            .collaboration_graph(&ds, None, Some(EdgeWeighting::SharedAmount))
            .unwrap();
        assert!(graph.edge(1, 4).is_none());
        assert_eq!(graph.edge(1, 2).unwrap().weight, 310_000.0);
        assert_eq!(graph, engine().collaboration_graph(&fixture(), None, Some(EdgeWeighting::SharedAmount)).unwrap());

        // the collaborations table drops the same rows
        let table = engine().run_query(&ds, "shark_collaborations", &Filters::new()).unwrap();
        let baseline = engine().run_query(&fixture(), "shark_collaborations", &Filters::new()).unwrap();
        assert_eq!(table, baseline);
    }

    #[test]
    fn test_csv_flag_columns_agree_across_sources() {
        let dir = std::env::temp_dir().join(format!("shark_tank_flags_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("Company.csv"),
            "company_id,company_name,industry_name\n1,Acme,Food\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("Investment.csv"),
            "investment_id,season_id,episode_id,company_id,equity_amount,equity_share,accepted\n7,1,1,1,50000,10,0.0\n",
        )
        .unwrap();

        let memory = MemoryDataset::from_csv_dir(&dir).unwrap();
        let sqlite = SqliteDataset::open_in_memory().unwrap();
        sqlite.import_csv_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        let engine = engine();
        let expected = engine.run_query(&memory, "industry_deal_rates", &Filters::new()).unwrap();
        let actual = engine.run_query(&sqlite, "industry_deal_rates", &Filters::new()).unwrap();
        assert_eq!(expected, actual);
        assert_eq!(expected.value(0, "deal_count"), Some(&Scalar::Int(0)));
    }

    #[test]
    fn test_graph_missing_table_is_data_unavailable() {
        let mut ds = fixture();
        ds.remove_table(Table::Contribute);
        assert!(matches!(
            engine().build_collaboration_graph(&ds, None),
            Err(EngineError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_table_browsing() {
        let engine = engine();
        let sharks = engine.table(&fixture(), "shark", None).unwrap();
        assert_eq!(sharks.len(), 4);
        assert_eq!(sharks.columns[1], "shark_name");

        let filter = RecordFilter::new().where_eq("location_state", "tx");
        let texans = engine.table(&fixture(), "Entrepreneur", Some(&filter)).unwrap();
        assert_eq!(texans.len(), 3);

        assert!(matches!(
            engine.table(&fixture(), "Sharks", None),
            Err(EngineError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_charts_and_options() {
        let engine = engine();
        let ds = fixture();

        assert_eq!(engine.top_valuations(&ds, None).unwrap().len(), 4);
        assert_eq!(engine.top_valuations(&ds, Some(1)).unwrap().len(), 1);
        assert_eq!(engine.shark_industry_strategy(&ds).unwrap().len(), 6);
        assert_eq!(
            engine.filter_options(&ds, OptionKind::State).unwrap(),
            vec![Scalar::from("CO"), Scalar::from("TX")]
        );
    }

    #[test]
    fn test_sqlite_and_memory_sources_agree() {
        let engine = engine();
        let memory = fixture();
        let sqlite = SqliteDataset::open_in_memory().unwrap();
        for table in Table::ALL {
            sqlite
                .insert_records(table, &memory.fetch_table(table, None).unwrap())
                .unwrap();
        }

        for query in engine.list_queries() {
            let expected = engine.run_query(&memory, &query.id, &Filters::new()).unwrap();
            let actual = engine.run_query(&sqlite, &query.id, &Filters::new()).unwrap();
            assert_eq!(expected, actual, "{} differs between sources", query.id);
        }

        println!("✅ SQLite/memory equivalence test PASSED");
    }
}
