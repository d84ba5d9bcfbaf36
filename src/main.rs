use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use user_checker::checker::UserChecker;
use user_checker::facts::{ShellFacts, SystemFacts};
use user_checker::server::{self, AppState};
use user_checker::service::ServiceManager;
use user_checker::{config, update};

/// Per-user session and account status for SSH/OpenVPN access servers.
#[derive(Parser, Debug)]
#[command(name = "checker", version, about)]
struct Cli {
    /// Print the status record for this user
    #[arg(short, long)]
    username: Option<String>,

    /// Output the status record as JSON
    #[arg(long)]
    json: bool,

    /// Persist the HTTP listener port to the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Run the HTTP server in the foreground
    #[arg(long)]
    run: bool,

    /// Start the background service
    #[arg(long)]
    start: bool,

    /// Stop the background service
    #[arg(long)]
    stop: bool,

    /// Show the background service status
    #[arg(long)]
    status: bool,

    /// Restart the background service
    #[arg(long)]
    restart: bool,

    /// Remove the background service registration
    #[arg(long)]
    remove: bool,

    /// Download and install the latest release
    #[arg(long)]
    update: bool,

    /// Check whether a newer release is available
    #[arg(long = "check-update")]
    check_update: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_checker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config_path = config::config_path();
    let mut config = config::load_config(&config_path)?;
    let facts: Arc<dyn SystemFacts> = Arc::new(ShellFacts);

    if let Some(username) = cli.username.as_deref() {
        let checker = UserChecker::new(facts.clone());
        let status = checker.check(username).await?;

        if cli.json {
            let body = serde_json::to_string_pretty(&status)
                .map_err(|e| format!("Failed to serialize status: {}", e))?;
            println!("{}", body);
        } else {
            println!("{}", status);
        }
        return Ok(());
    }

    if let Some(port) = cli.port {
        config.port = port;
        config::save_config(&config_path, &config)?;
        info!("listener port set to {}", port);
    }

    if cli.run {
        let state = Arc::new(AppState {
            checker: UserChecker::new(facts),
            config_path,
        });
        return server::serve(state, config.port).await;
    }

    let service = ServiceManager::new(facts);

    if cli.start {
        service.start().await?;
    } else if cli.stop {
        service.stop().await?;
    } else if cli.status {
        println!("{}", service.status().await?);
    } else if cli.restart {
        service.restart().await?;
    } else if cli.remove {
        service.remove().await?;
    } else if cli.update {
        if update::update().await? {
            println!("Update success");
        } else {
            println!("Not found new version");
        }
    } else if cli.check_update {
        match update::check_update().await? {
            Some(version) => println!("New version available: {}", version),
            None => println!("Already up to date"),
        }
    }

    Ok(())
}
