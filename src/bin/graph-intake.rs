//! graph-intake CLI: run the intake server or drive it by hand.

use clap::{Parser, Subcommand};
use graph_intake::backend::{MemoryGraphStore, MemoryWorkQueue, PgGraphStore, PgmqWorkQueue};
use graph_intake::config::{Config, IntakeConfig};
use graph_intake::db::Db;
use graph_intake::intake::{IntakeError, IntakeHandler};
use graph_intake::model::CreateGraphRequest;
use graph_intake::telemetry::{TelemetryConfig, init_telemetry};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;

/// Visibility timeout for `queue peek`, so a peeked message reappears for
/// the worker shortly after.
const PEEK_VISIBILITY_SECONDS: i32 = 30;

#[derive(Parser)]
#[command(name = "graph-intake", about = "Register graph creation requests and queue them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP intake server
    Serve {
        /// Keep records and messages in memory instead of Postgres
        #[arg(long)]
        in_memory: bool,
    },
    /// Graph registration operations
    Graph {
        #[command(subcommand)]
        action: GraphAction,
    },
    /// Work queue operations
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
}

#[derive(Subcommand)]
enum GraphAction {
    /// Register a graph and queue it for the worker
    Create {
        /// Graph name (alphanumeric, case-insensitive)
        name: String,
        /// JSON schema payload
        #[arg(long)]
        schema: String,
    },
    /// Show a registered graph
    Show { name: String },
    /// List registered graphs
    List {
        /// Maximum graphs to show
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum QueueAction {
    /// Read the next pending work message without consuming it
    Peek,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { in_memory } => cmd_serve(config, in_memory).await,
        Command::Graph { action } => {
            let db = connect(&config).await?;
            match action {
                GraphAction::Create { name, schema } => {
                    cmd_graph_create(db, &config.intake, name, schema).await
                }
                GraphAction::Show { name } => cmd_graph_show(db, &config.intake, name).await,
                GraphAction::List { limit } => cmd_graph_list(&db, &config.intake, limit).await,
            }
        }
        Command::Queue {
            action: QueueAction::Peek,
        } => {
            let db = connect(&config).await?;
            cmd_queue_peek(&db, &config.intake).await
        }
    }
}

/// Connect, migrate, and make sure the graph table and queue exist.
async fn connect(config: &Config) -> anyhow::Result<Arc<Db>> {
    let url = config.require_database_url()?;
    let db = Db::connect(url.expose_secret()).await?;
    db.migrate().await?;
    db.ensure_graph_table(&config.intake.table_name).await?;
    db.create_queue(&config.intake.queue_name).await?;
    Ok(Arc::new(db))
}

fn postgres_handler(db: Arc<Db>, intake: &IntakeConfig) -> IntakeHandler {
    IntakeHandler::new(
        Arc::new(PgGraphStore::new(Arc::clone(&db), intake)),
        Arc::new(PgmqWorkQueue::new(db, intake)),
    )
}

async fn cmd_serve(config: Config, in_memory: bool) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "graph-intake".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let handler = if in_memory {
        info!("using in-memory backend, registrations are not persisted");
        IntakeHandler::new(
            Arc::new(MemoryGraphStore::new()),
            Arc::new(MemoryWorkQueue::new()),
        )
    } else {
        let db = connect(&config).await?;
        postgres_handler(db, &config.intake)
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "intake server listening");

    axum::serve(listener, graph_intake::http::router(handler))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("intake server shutting down");
        })
        .await?;
    Ok(())
}

async fn cmd_graph_create(
    db: Arc<Db>,
    intake: &IntakeConfig,
    name: String,
    schema: String,
) -> anyhow::Result<()> {
    let schema: serde_json::Value = serde_json::from_str(&schema)?;
    let handler = postgres_handler(db, intake);

    match handler.register(CreateGraphRequest::new(name, schema)).await {
        Ok(registered) => {
            println!(
                "Created: {} (state: {}, message: {})",
                registered.record.release_name,
                registered.record.current_state,
                registered.message_id
            );
            Ok(())
        }
        Err(IntakeError::AlreadyExists(name)) => {
            anyhow::bail!("graph {name} already exists")
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_graph_show(db: Arc<Db>, intake: &IntakeConfig, name: String) -> anyhow::Result<()> {
    let handler = postgres_handler(db, intake);
    let Some(record) = handler.lookup(&name).await? else {
        anyhow::bail!("no graph named '{}'", name.to_ascii_lowercase());
    };

    println!("Name:     {}", record.release_name);
    println!("State:    {}", record.current_state);
    println!("Created:  {}", record.created_at);
    Ok(())
}

async fn cmd_graph_list(db: &Db, intake: &IntakeConfig, limit: u32) -> anyhow::Result<()> {
    let records = db.list_graphs(&intake.table_name, i64::from(limit)).await?;

    if records.is_empty() {
        println!("No graphs found.");
        return Ok(());
    }

    println!("{:<32}  {:<24}  CREATED", "NAME", "STATE");
    println!("{}", "-".repeat(76));
    for record in &records {
        println!(
            "{:<32}  {:<24}  {}",
            record.release_name,
            record.current_state,
            record.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!("\n{} graph(s)", records.len());
    Ok(())
}

async fn cmd_queue_peek(db: &Db, intake: &IntakeConfig) -> anyhow::Result<()> {
    let Some(msg) = db
        .read_from_queue(&intake.queue_name, PEEK_VISIBILITY_SECONDS)
        .await?
    else {
        println!("Queue '{}' is empty.", intake.queue_name);
        return Ok(());
    };

    println!("Message:   {}", msg.msg_id);
    println!("Reads:     {}", msg.read_ct);
    println!("Enqueued:  {}", msg.enqueued_at);
    println!("Visible:   {}", msg.vt);
    match msg.work_message() {
        Ok(work) => {
            println!("Graph:     {}", work.id);
            println!("Expects:   {}", work.expected_status);
            println!("Schema:    {}", serde_json::to_string_pretty(&work.schema)?);
        }
        Err(_) => println!("Payload:   {}", serde_json::to_string_pretty(&msg.message)?),
    }
    Ok(())
}
