mod api;
mod config;
mod db;
mod error;
mod geometry;
mod parcels;
mod seed;
mod telemetry;

use std::sync::Arc;

use clap::Parser;

use api::AppState;
use config::{Command, Config, SeedArgs, ServerConfig};
use sea_orm::DatabaseConnection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let config = Config::parse();
    telemetry::init(config.log_level.as_deref(), config.log_format);

    let db = db::connect(&config.database).await?;
    tracing::info!("Database pool ready");

    match config.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&config.server, db).await,
        Command::Seed(args) => seed(&args, db).await,
    }
}

async fn serve(server: &ServerConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    if server.init_schema {
        db::create_tables(&db).await?;
    }

    let state = Arc::new(AppState::new(Arc::new(db)));
    let app = api::router(state, server.cors_enabled);

    let addr = server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("MeuAT API starting on http://{}", addr);
    tracing::info!("  GET  /fazendas/:id");
    tracing::info!("  POST /fazendas/busca-ponto");
    tracing::info!("  POST /fazendas/busca-raio");
    tracing::info!("  POST /fazendas/busca-area");
    tracing::info!("  GET  /health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn seed(args: &SeedArgs, db: DatabaseConnection) -> anyhow::Result<()> {
    db::create_tables(&db).await?;

    match seed::run(&db, &args.file, &args.name).await {
        Ok(outcome) => {
            tracing::info!(?outcome, seed_name = %args.name, "Seed finished");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, seed_name = %args.name, "Seed failed");
            Err(e.into())
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
