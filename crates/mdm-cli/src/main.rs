mod cmd;
mod output;

use anyhow::Context;
use clap::Parser;
use cmd::RunExit;
use mdm_core::client::RestClient;
use mdm_core::orchestrator::Orchestrator;
use mdm_core::settings::{Settings, DEFAULT_SETTINGS_FILE};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mdm-orchestrate",
    about = "Run stored MDM orchestrations: Connect batches and matching jobs, one step at a time",
    version
)]
struct Cli {
    /// Test the connection by listing entities
    #[arg(short = 't', long)]
    test: bool,

    /// Log what would run without starting any job
    #[arg(short = 'w', long = "whatif")]
    what_if: bool,

    /// Orchestration code, or the process name with --process-type
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Platform URL (overrides the settings file)
    #[arg(short = 'p', long, env = "MDM_URL")]
    url: Option<String>,

    /// Client id sent as the API key (overrides the settings file)
    #[arg(short = 'c', long = "client-id", env = "MDM_CLIENT_ID")]
    client_id: Option<String>,

    /// Run a single process of this type (Connect or Matching) instead of an orchestration
    #[arg(short = 'o', long = "process-type")]
    process_type: Option<String>,

    /// Settings file
    #[arg(short = 's', long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Parameters JSON for --process-type
    #[arg(long, default_value = "{}")]
    parameters: String,

    /// Output as JSON
    #[arg(short = 'j', long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        let code = e.downcast_ref::<RunExit>().map_or(1, RunExit::exit_code);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&cli.settings)
        .with_context(|| format!("failed to load settings from {}", cli.settings.display()))?
        .with_overrides(cli.url, cli.client_id);
    let connection = settings.connection()?;
    let client = RestClient::new(&connection).context("failed to build HTTP client")?;

    if cli.test {
        return cmd::connection::run(&client, cli.json);
    }

    let name = cli
        .name
        .filter(|n| !n.trim().is_empty())
        .context("--name is required unless --test is given")?;

    let orchestrator = Orchestrator::new(&client, settings).what_if(cli.what_if);
    match cli.process_type {
        Some(process_type) => cmd::process::run(
            &orchestrator,
            &name,
            &process_type,
            &cli.parameters,
            cli.json,
        ),
        None => cmd::orchestrate::run(&orchestrator, &name, cli.json),
    }
}
