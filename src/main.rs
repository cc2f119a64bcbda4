mod api;
mod config;
mod notify;
mod schedule;
mod task;
mod tasks;

use anyhow::{Context, Result};
use axum::routing::get_service;
use clap::Parser;
use std::fs;
use tower_http::services::ServeDir;
use tracing::info;

use crate::api::TaskApi;
use crate::config::{Args, Settings};
use crate::tasks::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&args)?;
    config::init_logging(&settings.log_level)?;
    config::init_timezone(&settings.timezone);

    let api = TaskApi::new(&settings.api_url).context("configuring task service client")?;
    info!(api_url = %api.base_url(), "using task service");

    fs::create_dir_all("static")?;
    let static_dir = ServeDir::new("static");

    let state = AppState {
        api,
        daily_hours: settings.daily_hours,
    };
    let app = tasks::router()
        .with_state(state)
        .nest_service("/static", get_service(static_dir));

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("binding {}", settings.bind))?;
    info!(bind = %settings.bind, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
