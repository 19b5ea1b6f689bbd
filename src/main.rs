//! Spacedock CLI - inspect the deployments of an OpenShift space
//!
//! Thin diagnostic front end over the library: prints the same views the
//! API layer serializes, as JSON on stdout.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};

use spacedock::{KubeClient, KubeClientConfig};

#[derive(Parser, Debug)]
#[command(name = "spacedock")]
#[command(about = "Inspect the deployments of an OpenShift space", long_about = None)]
struct Args {
    /// Cluster API URL
    #[arg(long, env = "SPACEDOCK_API_URL")]
    api_url: String,

    /// Bearer token presented to the cluster and the metrics backend
    #[arg(long, env = "SPACEDOCK_TOKEN", hide_env_values = true)]
    token: String,

    /// Namespace holding build configs and the environments config map
    #[arg(long, env = "SPACEDOCK_NAMESPACE")]
    namespace: String,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// All applications of a space with their per-environment deployments
    Space { name: String },
    /// One application across environments
    App { space: String, name: String },
    /// The current deployment in one environment
    Deployment {
        space: String,
        app: String,
        env: String,
    },
    /// Known environments with quota usage
    Envs,
    /// Latest one-minute usage of a deployment
    Stats {
        space: String,
        app: String,
        env: String,
    },
    /// Set the replica count, printing the previous one
    Scale {
        space: String,
        app: String,
        env: String,
        replicas: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let client = KubeClient::new(KubeClientConfig {
        cluster_url: args.api_url.clone(),
        token: args.token.clone(),
        user_namespace: args.namespace.clone(),
    })
    .await
    .context("failed to connect to cluster")?;

    match &args.command {
        Command::Space { name } => print_json(&client.get_space(name).await?)?,
        Command::App { space, name } => print_json(&client.get_application(space, name).await?)?,
        Command::Deployment { space, app, env } => {
            match client.get_deployment(space, app, env).await? {
                Some(deployment) => print_json(&deployment)?,
                None => eprintln!("no deployment of '{app}' in '{env}'"),
            }
        }
        Command::Envs => print_json(&client.get_environments().await?)?,
        Command::Stats { space, app, env } => {
            let start = Utc::now() - Duration::minutes(1);
            match client.get_deployment_stats(space, app, env, start).await? {
                Some(stats) => print_json(&stats)?,
                None => eprintln!("no deployment of '{app}' in '{env}'"),
            }
        }
        Command::Scale {
            space,
            app,
            env,
            replicas,
        } => {
            let previous = client.scale_deployment(space, app, env, *replicas).await?;
            println!("{previous}");
        }
    }

    client.close();
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize logging based on debug flag. Logs go to stderr so stdout
/// stays valid JSON.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}
