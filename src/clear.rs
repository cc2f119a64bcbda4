//! Clear binary for emptying the task service.
//!
//! Usage: cargo run --bin clear
//!
//! Lists every task and deletes them one by one.

mod api;
mod config;
mod schedule;
mod task;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use crate::api::TaskApi;
use crate::config::{Args, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&args)?;
    config::init_logging(&settings.log_level)?;

    let api = TaskApi::new(&settings.api_url)?;
    info!(api_url = %api.base_url(), "clearing task service");

    let tasks = api.list_tasks().await?;
    info!(count = tasks.len(), "deleting tasks");

    let mut failed = 0usize;
    for task in &tasks {
        if let Err(e) = api.delete_task(&task.id).await {
            failed += 1;
            warn!(task_id = %task.id, error = %e, "failed to delete task");
        }
    }

    info!(deleted = tasks.len() - failed, failed, "clear complete");
    Ok(())
}
