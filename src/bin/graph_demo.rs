//! Graph demo binary
//!
//! Seeds a small people/companies graph and logs a few queries against it.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (optional, needs the
//!   `postgres` feature; the in-memory substrate is used otherwise)
//! - `GRAPH_NAMESPACE` and the other `GRAPH_*` variables read by `GraphConfig::from_env`
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin graph_demo --features demo
//! DATABASE_URL=postgresql://... cargo run --bin graph_demo --features demo,postgres
//! ```

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use graphkv::{properties, Direction, GraphConfig, GraphEngine, GraphResult, KvSubstrate, MemorySubstrate};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "graph_demo=info,graphkv=info,sqlx=warn".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

async fn seed<S: KvSubstrate>(engine: &GraphEngine<S>) -> GraphResult<()> {
    let people = [("p1", "Alice", 30), ("p2", "Bob", 25), ("p3", "Charlie", 35)];
    for (id, name, age) in people {
        engine
            .add_vertex(id, "person", properties([("name", name.into()), ("age", age.into())]))
            .await?;
    }

    let companies = [("c1", "Tech Corp", "Technology"), ("c2", "Data Inc", "Analytics")];
    for (id, name, industry) in companies {
        engine
            .add_vertex(id, "company", properties([("name", name.into()), ("industry", industry.into())]))
            .await?;
    }

    let jobs = [
        ("p1", "c1", "Engineer", 2020),
        ("p2", "c1", "Designer", 2021),
        ("p3", "c2", "Analyst", 2019),
    ];
    for (person, company, role, since) in jobs {
        engine
            .add_edge(person, "WORKS_AT", company, properties([("role", role.into()), ("since", since.into())]))
            .await?;
    }

    let friendships = [("p1", "p2", 2018), ("p2", "p3", 2020)];
    for (a, b, since) in friendships {
        engine
            .add_edge(a, "KNOWS", b, properties([("since", since.into())]))
            .await?;
    }
    Ok(())
}

async fn run<S: KvSubstrate>(substrate: Arc<S>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = GraphEngine::new(substrate, GraphConfig::from_env())?;
    seed(&engine).await?;
    info!(namespace = %engine.config().namespace, "Seeded demo graph");

    let alice = engine.get_vertex("p1").await?;
    info!(vertex_id = %alice.id, properties = ?alice.properties, "Fetched vertex");

    let employers = engine.get_neighbors("p1", "WORKS_AT", Direction::Out).await?;
    info!(employers = ?employers.ids(), "Alice works at");

    let employees = engine.get_neighbors("c1", "WORKS_AT", Direction::In).await?;
    info!(employees = ?employees.ids(), degraded = employees.is_degraded(), "Tech Corp employs");

    let mut traversal = engine.traverse("p1", "KNOWS", Direction::Out, 3).await?;
    while let Some(layer) = traversal.next_layer().await? {
        let ids: Vec<&str> = layer.iter().map(|v| v.vertex_id.as_str()).collect();
        info!(depth = traversal.depth(), reached = ?ids, "Traversal layer");
    }

    let report = engine.check_integrity().await?;
    info!(
        edges = report.edges_checked,
        lists = report.lists_checked,
        consistent = report.is_consistent(),
        "Integrity check"
    );
    if !report.is_consistent() {
        tracing::warn!(report = %serde_json::to_string(&report)?, "Integrity report");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting graph demo");

    #[cfg(feature = "postgres")]
    {
        if std::env::var("DATABASE_URL").is_ok() {
            info!("Connecting to PostgreSQL...");
            let substrate = graphkv::PostgresSubstrate::from_env().await?;
            substrate.ensure_schema().await?;
            return run(Arc::new(substrate)).await;
        }
    }

    run(Arc::new(MemorySubstrate::new())).await
}
