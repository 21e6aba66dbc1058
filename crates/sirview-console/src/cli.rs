use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::SimulationConfig;

#[derive(Debug, Parser)]
#[command(name = "sirview", version, about = "Viewer for the agent-based SIR simulation service")]
pub struct Cli {
    /// Config file. Defaults to <config dir>/sirview/config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Service root URL.
    #[arg(long, global = true, env = "SIRVIEW_BACKEND_URL")]
    pub base_url: Option<String>,

    #[command(flatten)]
    pub params: ParamArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive terminal viewer (default).
    Console,
    /// Fetch one batch run and print a summary.
    Run,
    /// Follow the live stream, printing one line per tick.
    Stream {
        /// Stop after this many messages.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check that the service is up.
    Health,
}

/// Per-invocation overrides of the `[simulation]` config section.
#[derive(Debug, Args, Default, Clone)]
pub struct ParamArgs {
    #[arg(long, global = true)]
    pub population_size: Option<u32>,
    #[arg(long, global = true)]
    pub duration: Option<u32>,
    #[arg(long, global = true)]
    pub transmission_rate: Option<f64>,
    #[arg(long, global = true)]
    pub recovery_rate: Option<f64>,
    #[arg(long, global = true)]
    pub movement_speed: Option<f64>,
}

impl ParamArgs {
    pub fn apply(&self, sim: &mut SimulationConfig) {
        if let Some(v) = self.population_size {
            sim.population_size = v;
        }
        if let Some(v) = self.duration {
            sim.duration = v;
        }
        if let Some(v) = self.transmission_rate {
            sim.transmission_rate = v;
        }
        if let Some(v) = self.recovery_rate {
            sim.recovery_rate = v;
        }
        if let Some(v) = self.movement_speed {
            sim.movement_speed = v;
        }
    }
}
