use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use itropa::config::Settings;
use itropa::generator::HttpGenerator;
use itropa::service::IdeationService;
use itropa::{api, db, render};

#[derive(Parser)]
#[command(name = "itropa")]
#[command(about = "Branching ideation engine for speculative future industries")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List stored needs
    Needs,
    /// Print the expression tree of a need
    Tree { need_id: Uuid },
    /// Delete a stored need and its cached analyses
    Delete { need_id: Uuid },
    /// Delete cached analyses that refer to missing expressions
    Prune,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "itropa=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(settings: &Settings) -> anyhow::Result<db::Database> {
    let db = match &settings.database_path {
        Some(path) => db::Database::open(path.clone()),
        None => db::Database::open_default(),
    }
    .context("Failed to open database")?;
    db.migrate()?;
    Ok(db)
}

async fn build_service(settings: &Settings) -> anyhow::Result<Arc<IdeationService>> {
    let db = open_database(settings)?;
    let generator = match &settings.generator_url {
        Some(url) => HttpGenerator::new(url.clone(), settings.generator_api_key.clone()),
        None => HttpGenerator::from_env(),
    };
    let service =
        IdeationService::load(Arc::new(generator), Arc::new(db), settings.history_capacity).await?;
    Ok(Arc::new(service))
}

async fn serve(settings: &Settings, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting ITROPA server on port {}", port);

    let app = api::create_router(build_service(settings).await?);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("ITROPA server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let settings = Settings::load();

    match cli.command {
        Some(Commands::Serve { port }) => {
            serve(&settings, port.unwrap_or(settings.port)).await?;
        }
        Some(Commands::Needs) => {
            let db = open_database(&settings)?;
            for need in db.get_all_needs()? {
                println!("{}  {}  (v{})", need.id, need.name, need.version);
            }
        }
        Some(Commands::Tree { need_id }) => {
            let db = open_database(&settings)?;
            let need = db
                .get_need(need_id)?
                .ok_or_else(|| anyhow::anyhow!("Need not found: {}", need_id))?;
            print!("{}", render::render_need(&need));
        }
        Some(Commands::Delete { need_id }) => {
            let db = open_database(&settings)?;
            if db.delete_need(need_id)? {
                println!("Deleted {}", need_id);
            } else {
                anyhow::bail!("Need not found: {}", need_id);
            }
        }
        Some(Commands::Prune) => {
            let removed = build_service(&settings).await?.prune_orphans().await?;
            println!("Removed {} orphaned analyses", removed);
        }
        None => {
            serve(&settings, settings.port).await?;
        }
    }

    Ok(())
}
