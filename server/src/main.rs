use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use log::info;
use tower_http::services::ServeDir;

mod config;
mod db;
mod export;
mod handlers;
mod logic;
mod pages;
mod state;
mod storage;

use crate::config::StationConfig;
use crate::db::Database;
use crate::handlers::{
    export_csv_handler, export_sql_handler, index_handler, logs_handler, ping_handler, ws_handler,
};
use crate::state::AppState;
use crate::storage::SqliteStore;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// SQLite database file.
    #[arg(long, default_value = "defect_logs.db")]
    db: PathBuf,
    #[arg(long)]
    public_dir: Option<PathBuf>,
    /// JSON diagram layout replacing the built-in one.
    #[arg(long)]
    layout: Option<PathBuf>,
    /// Text file with one part number per line.
    #[arg(long)]
    part_numbers: Option<PathBuf>,
    /// Target table of the SQL INSERT export.
    #[arg(long)]
    export_table: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = StationConfig::load(
        args.layout.as_deref(),
        args.part_numbers.as_deref(),
        args.export_table,
    )?;
    let db = Database::new(args.db)?;
    let state = AppState::new(Arc::new(SqliteStore::new(db)), config);

    let public_dir = args
        .public_dir
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"));
    let index_file = public_dir.join("index.html");

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/logs", get(logs_handler))
        .route("/export.csv", get(export_csv_handler))
        .route("/export.sql", get(export_sql_handler))
        .route("/ping", get(ping_handler))
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(axum::Extension(index_file))
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Defect logger running at http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server crashed")?;
    Ok(())
}
