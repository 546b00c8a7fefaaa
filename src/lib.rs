// Shark Tank Insights - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod table;
pub mod error;
pub mod dataset;        // Dataset access layer + in-memory source
pub mod db;             // SQLite-backed source
pub mod entities;       // Typed views over the 11 tables
pub mod filters;
pub mod aggregate;      // Grouping, ranking, co-occurrence primitives
pub mod catalog;        // Query registry + the 13 catalog queries
pub mod graph;          // Shark collaboration graph
pub mod charts;         // Valuation chart, strategy heatmap, selector options
pub mod config;
pub mod engine;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use table::{Record, Scalar, TabularResult};
pub use error::{EngineError, EngineResult};
pub use dataset::{
    load_csv_records, table_result,
    DatasetSource, MemoryDataset, RecordFilter, Snapshot, Table,
};
pub use db::{setup_database, ImportReport, SqliteDataset};
pub use entities::{
    Ask, Company, Contribute, Entrepreneur, Episode, EpisodeKey, Industry,
    Investment, Judge, Own, PitchKey, Season, Shark,
};
pub use filters::{FilterKey, Filters};
pub use catalog::{QueryCatalog, QueryDescriptor, QueryInfo, QueryShape};
pub use graph::{CollaborationGraph, EdgeWeighting, GraphEdge, GraphNode};
pub use charts::OptionKind;
pub use config::EngineConfig;
pub use engine::AnalyticsEngine;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
