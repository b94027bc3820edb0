use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use mapforge_core::geo;
use mapforge_core::project::ProjectStatus;
use mapforge_db::{Database, DatabaseConfig, ExportRow};

#[derive(Parser)]
#[command(name = "mapforge", version, about = "Crowdsourced mapping project manager")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pending database migrations against DATABASE_URL
    Migrate {
        /// List pending migrations without applying them
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Export the project table to CSV or GeoJSON
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Restrict to one project status (DRAFT, PUBLISHED, ARCHIVED)
        #[arg(short, long)]
        status: Option<String>,

        /// Output file path
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportFormat {
    Csv,
    Geojson,
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Geojson => write!(f, "geojson"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mapforge=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate { dry_run } => {
            let db = connect_db().await?;
            cmd_migrate(&db, dry_run).await?;
        }
        Commands::Export {
            format,
            status,
            out,
        } => {
            let status = status
                .map(|s| s.parse::<ProjectStatus>())
                .transpose()
                .map_err(|e| anyhow::anyhow!(e))?;
            let db = connect_db().await?;
            cmd_export(&db, format, status, &out).await?;
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    Database::connect(&config)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to connect to database")
}

async fn cmd_migrate(db: &Database, dry_run: bool) -> Result<()> {
    let pending = db.pending_migrations().await.map_err(|e| anyhow::anyhow!(e))?;

    if pending.is_empty() {
        tracing::info!("Database schema is up to date");
        return Ok(());
    }

    for (version, description) in &pending {
        tracing::info!("pending migration {version}: {description}");
    }

    if dry_run {
        println!("{} migration(s) pending", pending.len());
        return Ok(());
    }

    db.migrate().await.map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Applied {} migration(s)", pending.len());

    Ok(())
}

async fn cmd_export(
    db: &Database,
    format: ExportFormat,
    status: Option<ProjectStatus>,
    out: &PathBuf,
) -> Result<()> {
    let rows = db
        .search_repo()
        .export_rows(status)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    let count = rows.len();

    match format {
        ExportFormat::Csv => write_csv(&rows, out)?,
        ExportFormat::Geojson => write_geojson(rows, out)?,
    }

    tracing::info!("Exported {count} project(s) to {}", out.display());
    Ok(())
}

fn write_csv(rows: &[ExportRow], out: &PathBuf) -> Result<()> {
    let mut writer = csv::Writer::from_path(out)
        .with_context(|| format!("Failed to open {}", out.display()))?;

    writer.write_record([
        "id",
        "name",
        "status",
        "priority",
        "difficulty",
        "campaign",
        "country",
        "centroid_lon",
        "centroid_lat",
    ])?;

    for row in rows {
        writer.write_record([
            row.id.to_string(),
            row.name.clone(),
            row.status.clone(),
            row.priority.clone(),
            row.difficulty.clone(),
            row.campaign.clone().unwrap_or_default(),
            row.country.clone().unwrap_or_default(),
            row.centroid_lon.to_string(),
            row.centroid_lat.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_geojson(rows: Vec<ExportRow>, out: &PathBuf) -> Result<()> {
    let features = rows
        .into_iter()
        .map(|row| {
            geo::feature(
                row.aoi,
                serde_json::json!({
                    "projectId": row.id,
                    "name": row.name,
                    "status": row.status,
                    "priority": row.priority,
                    "difficulty": row.difficulty,
                    "campaign": row.campaign,
                    "country": row.country,
                }),
            )
        })
        .collect();

    let collection = geo::feature_collection(features);
    std::fs::write(out, serde_json::to_vec_pretty(&collection)?)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    Ok(())
}
