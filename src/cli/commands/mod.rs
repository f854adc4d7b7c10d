use clap::{Parser, Subcommand};

/// `agicore` - goal planner and saga orchestrator for a worker fleet.
#[derive(Parser, Debug)]
#[command(name = "agicore")]
#[command(version)]
#[command(about = "Plans goals into worker steps and keeps the fleet healthy.", long_about = None)]
pub struct Cli {
    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the long-running orchestrator (gateway + health prober)
    Serve {
        /// Port to listen on (use 0 for random available port); defaults to `[gateway] port`
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to `[gateway] host`
        #[arg(long)]
        host: Option<String>,
    },

    /// Decompose a goal into a plan and print it as JSON
    Plan {
        /// Natural-language goal
        goal: String,

        /// Constraint such as `require:<action>` or `skip:<action>` (repeatable)
        #[arg(short = 'c', long = "constraint")]
        constraints: Vec<String>,

        /// Run the plan against the configured workers before printing it
        #[arg(long)]
        execute: bool,
    },

    /// Print the capability registry
    Capabilities,

    /// Print the effective configuration
    Config,
}
