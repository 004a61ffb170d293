use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avd_hostctl::{arm, config, credential, pipeline};

/// Exit status after Ctrl-C, following the shell's 128 + SIGINT convention.
const INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "avd-hostctl", version)]
#[command(about = "Start or deallocate the session hosts of an Azure Virtual Desktop host pool")]
struct Cli {
    #[command(flatten)]
    run: config::RunArgs,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize tracing on stderr so stdout carries only the run summary.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "avd_hostctl=debug"
    } else {
        "avd_hostctl=info"
    };
    let filter =
        tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn execute(cli: Cli) -> anyhow::Result<u8> {
    let settings = config::Settings::resolve(&cli.run).context("Invalid configuration")?;
    tracing::info!(
        subscription = %settings.subscription_id,
        resource_group = %settings.resource_group,
        host_pool = %settings.host_pool,
        action = settings.action.as_str(),
        "starting run"
    );

    let token = credential::DefaultCredential::from_env()
        .get_token(settings.token_resource())
        .await
        .context("Failed to obtain Azure credentials")?;

    let client = arm::ArmClient::new(
        settings.arm_endpoint.as_str(),
        settings.subscription_id.as_str(),
        &token,
        settings.timeout,
    )?;

    let report = pipeline::run(
        &client,
        &settings.resource_group,
        &settings.host_pool,
        settings.action,
    )
    .await
    .with_context(|| {
        format!(
            "Run aborted for host pool '{}' in resource group '{}'",
            settings.host_pool, settings.resource_group
        )
    })?;

    print!("{}", report.render());
    if !report.is_success() {
        tracing::warn!(
            failed = report.failures().count(),
            "run finished with failures"
        );
    }
    Ok(report.exit_status())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tokio::select! {
        status = execute(cli) => status.map(ExitCode::from),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, abandoning in-flight requests");
            Ok(ExitCode::from(INTERRUPTED))
        }
    }
}
