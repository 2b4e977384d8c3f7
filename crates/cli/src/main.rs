//! drydock binary
//!
//! Wires the production clients into the engine and exposes apply,
//! destroy and log. Ctrl-C turns into the engine's cancellation signal:
//! running visits finish, nothing new is scheduled, state is saved.

mod cli;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use drydock_adapters::{new_clients, DefaultProviderFactory};
use drydock_engine::{Engine, LogMultiplexer, StateDocument};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let clients = new_clients().context("unable to build clients")?;
    let factory = Arc::new(DefaultProviderFactory::new(clients.clone()));

    match cli.command {
        Command::Apply {
            path,
            vars,
            vars_file,
        } => {
            let engine = Arc::new(Engine::new(clients, factory));
            cancel_on_ctrl_c(engine.clone());

            let vars = parse_vars(&vars)?;
            let blueprint = engine
                .apply_with_variables(&path, &vars, vars_file.as_deref().map(Path::new))
                .await?;

            if let Some(title) = blueprint.and_then(|b| b.title) {
                info!("applied '{title}'");
            }
        }

        Command::Destroy { path, force } => {
            let engine = Arc::new(Engine::new(clients, factory));
            cancel_on_ctrl_c(engine.clone());

            engine.destroy(&path, force).await?;
        }

        Command::Log { resources } => {
            let state = StateDocument::load()?;
            let multiplexer = LogMultiplexer::new(clients.runtime.clone());

            multiplexer
                .tail(
                    &resources,
                    &state.resources,
                    tokio::io::stdout(),
                    tokio::io::stderr(),
                )
                .await?;
        }
    }

    Ok(())
}

fn cancel_on_ctrl_c(engine: Arc<Engine>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, letting running work finish");
            engine.cancel();
        }
    });
}

fn parse_vars(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();

    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("variable '{pair}' is not of the form name=value");
        };
        vars.insert(name.to_string(), value.to_string());
    }

    Ok(vars)
}
