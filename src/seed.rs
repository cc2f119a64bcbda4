//! Seed binary for populating the task service with initial tasks.
//!
//! Usage: cargo run --bin seed
//!        cargo run --bin seed -- --file demo.toml --api-url http://localhost:5000
//!
//! Reads tasks from seed.toml and submits each one through the task service API.

mod api;
mod config;
mod schedule;
mod task;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::api::TaskApi;
use crate::config::Settings;
use crate::task::TaskForm;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Submit the tasks listed in a TOML file to the task service")]
struct Args {
    /// Seed file to read
    #[arg(long, default_value = "seed.toml")]
    file: PathBuf,

    /// Base URL of the task service (overrides settings and environment)
    #[arg(long)]
    api_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedData {
    tasks: Vec<SeedTask>,
}

#[derive(Debug, Deserialize)]
struct SeedTask {
    name: String,
    estimated_hours: f64,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

impl SeedTask {
    fn to_form(&self) -> TaskForm {
        TaskForm {
            name: self.name.clone(),
            estimated_hours: self.estimated_hours.to_string(),
            deadline: self.deadline.clone().unwrap_or_default(),
            priority: self.priority.clone().unwrap_or_default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(&config::Args {
        api_url: args.api_url.clone(),
        ..config::Args::default()
    })?;
    config::init_logging(&settings.log_level)?;
    config::init_timezone(&settings.timezone);

    let api = TaskApi::new(&settings.api_url)?;
    info!(api_url = %api.base_url(), "seeding task service");

    let seed_content = fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let seed_data: SeedData = toml::from_str(&seed_content)?;
    info!(count = seed_data.tasks.len(), "found tasks to seed");

    let mut created = 0usize;
    for seed_task in &seed_data.tasks {
        let draft = match seed_task.to_form().validate() {
            Ok(draft) => draft,
            Err(e) => {
                warn!(name = %seed_task.name, error = %e, "skipping invalid task");
                continue;
            }
        };
        match api.create_task(&draft).await {
            Ok(_) => {
                created += 1;
                info!(name = %draft.name, "created task");
            }
            Err(e) => warn!(name = %draft.name, error = %e, "failed to create task"),
        }
    }

    info!(created, total = seed_data.tasks.len(), "seeding complete");
    Ok(())
}
