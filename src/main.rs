// 🦈 Shark Tank Insights - Command line front end
// Reads from a SQLite store (or a directory of CSV exports) and prints
// catalog results as a table, CSV, or JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{ContentArrangement, Table as TextTable};
use shark_tank_insights::{
    AnalyticsEngine, CollaborationGraph, DatasetSource, EdgeWeighting, EngineConfig, Filters,
    MemoryDataset, OptionKind, RecordFilter, Scalar, SqliteDataset, TabularResult, Table,
};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shark-tank-insights", version, about = "Shark Tank pitch and deal analytics")]
struct Cli {
    /// SQLite database file
    #[arg(long, default_value = "shark_tank.db", global = true, env = "SHARK_TANK_DB")]
    db: PathBuf,

    /// Read `<Table>.csv` files from this directory instead of the database
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,

    /// Engine configuration (JSON)
    #[arg(long, global = true, env = "SHARK_TANK_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Load `<Table>.csv` files into the database
    Import {
        /// Directory holding the CSV exports
        dir: PathBuf,
    },
    /// List the catalog
    Queries,
    /// Run one catalog query
    Run {
        /// Query id, e.g. industry_deal_rates
        id: String,

        /// Filter as key=value (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },
    /// Build the shark collaboration graph
    Graph {
        /// Drop edges with fewer shared investments
        #[arg(long)]
        min_shared: Option<u64>,

        /// Edge weight: investments | amount
        #[arg(long)]
        weight: Option<EdgeWeighting>,

        /// Print connected groups of sharks instead of edges
        #[arg(long)]
        components: bool,
    },
    /// Browse a raw table
    Table {
        name: String,

        /// Column equality as column=value (repeatable)
        #[arg(short = 'w', long = "where")]
        conditions: Vec<String>,
    },
    /// Distinct values for a selector: industry | shark | season | city | state
    Options { kind: OptionKind },
    /// Highest implied valuations
    Valuations {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Deals per shark and industry
    Strategy,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Import { dir } => run_import(&cli.db, dir),
        _ => run_analytics(cli),
    }
}

fn run_analytics(cli: Cli) -> Result<()> {
    let config = EngineConfig::load_or_default(cli.config.as_ref())?;
    let engine = AnalyticsEngine::new(config)?;
    let source = open_source(&cli)?;
    let source = source.as_ref();

    match cli.command {
        Commands::Import { dir } => bail!("import of {:?} needs no analytics source", dir),
        Commands::Queries => print_queries(&engine, cli.format),
        Commands::Run { id, filters } => {
            let filters = Filters::parse_assignments(&filters)?;
            let result = engine.run_query(source, &id, &filters)?;
            print_result(&result, cli.format)
        }
        Commands::Graph {
            min_shared,
            weight,
            components,
        } => {
            let graph = engine.collaboration_graph(source, min_shared, weight)?;
            if components {
                print_components(&graph, cli.format)
            } else {
                print_graph(&graph, cli.format)
            }
        }
        Commands::Table { name, conditions } => {
            let filter = parse_conditions(&conditions)?;
            let result = engine.table(source, &name, Some(&filter))?;
            print_result(&result, cli.format)
        }
        Commands::Options { kind } => {
            let values = engine.filter_options(source, kind)?;
            let mut result = TabularResult::new(&[kind.as_str()]);
            for value in values {
                result.push_row(vec![value]);
            }
            print_result(&result, cli.format)
        }
        Commands::Valuations { limit } => print_result(&engine.top_valuations(source, limit)?, cli.format),
        Commands::Strategy => print_result(&engine.shark_industry_strategy(source)?, cli.format),
    }
}

fn open_source(cli: &Cli) -> Result<Box<dyn DatasetSource>> {
    match &cli.csv_dir {
        Some(dir) => {
            let dataset = MemoryDataset::from_csv_dir(dir)?;
            info!(dir = ?dir, "reading CSV exports");
            Ok(Box::new(dataset))
        }
        None => {
            if !cli.db.exists() {
                bail!(
                    "database {:?} not found; run `shark-tank-insights import <dir>` first",
                    cli.db
                );
            }
            Ok(Box::new(SqliteDataset::open(&cli.db)?))
        }
    }
}

// ============================================================================
// IMPORT
// ============================================================================

fn run_import(db: &Path, dir: &Path) -> Result<()> {
    println!("🗄️  Importing CSV exports → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let dataset = SqliteDataset::open(db)?;
    let report = dataset
        .import_csv_dir(dir)
        .with_context(|| format!("Failed to import from {:?}", dir))?;

    for (table, inserted, duplicates) in &report.tables {
        println!("✓ {:<13} {:>6} inserted, {} duplicates", table.as_str(), inserted, duplicates);
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✅ {} rows inserted, {} duplicates skipped into {:?}",
        report.inserted(),
        report.duplicates(),
        db
    );
    Ok(())
}

fn parse_conditions(conditions: &[String]) -> Result<RecordFilter> {
    let mut filter = RecordFilter::new();
    for condition in conditions {
        let Some((column, value)) = condition.split_once('=') else {
            bail!("expected column=value, got '{}'", condition);
        };
        filter = filter.where_eq(column.trim(), Scalar::infer(value.trim()));
    }
    Ok(filter)
}

// ============================================================================
// OUTPUT
// ============================================================================

fn print_result(result: &TabularResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result.to_records())?);
        }
        OutputFormat::Csv => {
            result.write_csv(io::stdout())?;
        }
        OutputFormat::Table => {
            if result.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = TextTable::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(&result.columns);
            for row in &result.rows {
                table.add_row(row.iter().map(format_cell).collect::<Vec<_>>());
            }

            println!("{}", table);
            println!("{} row(s)", result.len());
        }
    }
    Ok(())
}

fn format_cell(value: &Scalar) -> String {
    match value {
        Scalar::Null => "null".to_string(),
        Scalar::Float(f) => format!("{:.4}", f)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        other => other.to_string(),
    }
}

fn print_queries(engine: &AnalyticsEngine, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&engine.list_queries())?);
        return Ok(());
    }

    let mut result = TabularResult::new(&["id", "title", "shape", "tables", "filters"]);
    for query in engine.list_queries() {
        let tables: Vec<&str> = query.required_tables.iter().map(Table::as_str).collect();
        let filters: Vec<&str> = query.accepted_filters.iter().map(|f| f.as_str()).collect();
        result.push_row(vec![
            Scalar::from(query.id),
            Scalar::from(query.title),
            Scalar::from(query.shape.as_str()),
            Scalar::from(tables.join(", ")),
            Scalar::from(filters.join(", ")),
        ]);
    }
    print_result(&result, format)
}

fn print_graph(graph: &CollaborationGraph, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(graph)?);
        return Ok(());
    }

    let mut edges = TabularResult::new(&["source", "target", "shared_investments", "shared_amount", "weight"]);
    for edge in &graph.edges {
        edges.push_row(vec![
            Scalar::from(label(graph, edge.source)),
            Scalar::from(label(graph, edge.target)),
            Scalar::from(edge.shared_investments as i64),
            Scalar::from(edge.shared_amount),
            Scalar::from(edge.weight),
        ]);
    }

    if let OutputFormat::Table = format {
        println!(
            "🕸️  {} sharks, {} collaborations (weighted by {})",
            graph.node_count(),
            graph.edge_count(),
            graph.weighting.as_str()
        );
    }
    print_result(&edges, format)
}

fn print_components(graph: &CollaborationGraph, format: OutputFormat) -> Result<()> {
    let mut result = TabularResult::new(&["group", "size", "sharks"]);
    for (n, component) in graph.connected_components().iter().enumerate() {
        let names: Vec<String> = component.iter().map(|id| label(graph, *id)).collect();
        result.push_row(vec![
            Scalar::from(n + 1),
            Scalar::from(component.len()),
            Scalar::from(names.join(", ")),
        ]);
    }
    print_result(&result, format)
}

fn label(graph: &CollaborationGraph, id: i64) -> String {
    graph
        .node(id)
        .map(|n| n.label.clone())
        .unwrap_or_else(|| id.to_string())
}
