//! Command line definition

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "drydock", version, about = "Local infrastructure orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply a config, creating or updating the declared resources
    Apply {
        /// Config file or directory
        path: String,

        /// Variables injected into the config, as name=value
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// File of variables injected into the config
        #[arg(long)]
        vars_file: Option<String>,
    },

    /// Destroy resources, dependents first
    Destroy {
        /// Config file or directory; omit to destroy from state alone
        #[arg(default_value = "")]
        path: String,

        /// Keep destroying after a failure
        #[arg(long)]
        force: bool,
    },

    /// Tail logs for named resources, or all tailable resources
    Log {
        /// Resource FQDNs to tail
        resources: Vec<String>,
    },
}
