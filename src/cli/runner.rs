//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::PumpConfig;
use crate::decode::decoder_for;
use crate::engine::{ProcessingStep, ResumableLoop};
use crate::error::{Error, Result};
use crate::pull::{Cancellation, PullCycle};
use crate::query::CountQuery;
use crate::source::{starting_positions, HttpLogSource, LogSource, SharedConnection};
use crate::state::StateManager;
use crate::trigger::{start_instance, TriggerResponse};
use crate::types::StartPosition;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Start { instance, from } => self.start(&config, instance, *from).await,
            Commands::Run {
                instance,
                max_iterations,
                until,
            } => {
                self.run_instance(&config, instance, *max_iterations, *until)
                    .await
            }
            Commands::Show { instance } => self.show(&config, instance).await,
            Commands::List => self.list(&config).await,
            Commands::Positions { from } => self.positions(&config, *from).await,
        }
    }

    /// Load the config file (or defaults) and apply command-line overrides
    fn load_config(&self) -> Result<PumpConfig> {
        let mut config = match &self.cli.config {
            Some(path) => PumpConfig::from_file(path)?,
            None => PumpConfig::default(),
        };

        if let Some(base_url) = &self.cli.base_url {
            config.source.base_url = Some(base_url.clone());
        }
        if let Some(dir) = &self.cli.state_dir {
            config.state_dir = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn connect(config: &PumpConfig) -> SharedConnection {
        let source = config.source.clone();
        SharedConnection::lazy(move || {
            let source: Arc<dyn LogSource> = Arc::new(HttpLogSource::from_config(&source)?);
            Ok(source)
        })
    }

    fn states(config: &PumpConfig) -> StateManager {
        StateManager::new(&config.state_dir)
    }

    async fn start(&self, config: &PumpConfig, instance: &str, from: StartPosition) -> Result<()> {
        let source = Self::connect(config).get()?;
        let response = start_instance(source.as_ref(), &Self::states(config), instance, from).await;
        self.emit(&response)?;

        match response {
            TriggerResponse::Accepted { .. } => Ok(()),
            TriggerResponse::Rejected { reason } => Err(Error::Other(format!("Start rejected: {reason}"))),
        }
    }

    async fn run_instance(
        &self,
        config: &PumpConfig,
        instance: &str,
        max_iterations: Option<u64>,
        until: Option<u64>,
    ) -> Result<()> {
        let source = Self::connect(config).get()?;
        let cancel = Cancellation::new();

        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling");
                    cancel.cancel();
                }
            });
        }

        let cycle = PullCycle::new(
            source,
            decoder_for(config.source.decoder),
            config.pull.to_pull_config(),
            cancel,
        );

        let mut loop_config = config.resume.to_loop_config();
        if max_iterations.is_some() {
            loop_config.max_iterations = max_iterations;
        }
        let resumable = ResumableLoop::new(ProcessingStep::new(cycle), loop_config);

        let mut query = match until {
            Some(limit) => CountQuery::with_limit(limit),
            None => CountQuery::new(),
        };

        info!(instance, "Running instance");
        let outcome = resumable
            .run(&mut query, &Self::states(config), instance)
            .await?;

        self.emit(&json!({
            "instance_id": instance,
            "completed": outcome.completed,
            "iterations": outcome.iterations,
            "events_processed": outcome.events_processed,
            "positions": outcome.state.positions,
            "count": query.count(),
            "dropped": query.dropped(),
        }))
    }

    async fn show(&self, config: &PumpConfig, instance: &str) -> Result<()> {
        let record = Self::states(config)
            .load(instance)
            .await?
            .ok_or_else(|| Error::state(format!("Instance '{instance}' does not exist")))?;
        self.emit(&record)
    }

    async fn list(&self, config: &PumpConfig) -> Result<()> {
        let instances = Self::states(config).list().await?;
        self.emit(&json!({ "instances": instances }))
    }

    async fn positions(&self, config: &PumpConfig, from: StartPosition) -> Result<()> {
        let source = Self::connect(config).get()?;
        let positions = starting_positions(source.as_ref(), from).await?;
        self.emit(&json!({ "from": from, "positions": positions }))
    }

    /// Print a document to stdout in the selected format
    fn emit<T: Serialize>(&self, value: &T) -> Result<()> {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        println!("{rendered}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;

    #[test]
    fn test_emit_reports_serialization_failure() {
        let runner = Runner::new(Cli::parse_from(["logpump", "list"]));

        // JSON object keys must be strings
        let mut unrepresentable = HashMap::new();
        unrepresentable.insert((1, 2), "pair");
        let err = runner.emit(&unrepresentable).unwrap_err();
        assert!(matches!(err, Error::JsonParse(_)));

        assert!(runner.emit(&json!({ "instances": [] })).is_ok());
    }
}
