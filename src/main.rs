use bank_ragent::{
    api, build_provider, AccountDetails, AccountDetailsResponse, AccountProvider, AccountsResponse,
    AcquisitionError, AppConfig, ErrorResponse, RequestContext,
};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bank-ragent", version, about = "Retrieve NAB account data through a headless browser")]
struct Cli {
    /// Serve fixed sample data instead of logging in
    #[arg(long, global = true)]
    sample: bool,

    /// Run Chrome with a visible window
    #[arg(long, global = true)]
    show_browser: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every account visible after login
    Accounts,
    /// Show one account with its recent transactions
    Account {
        /// Account identifier as reported by `accounts`
        id: String,
    },
    /// Serve the account API over HTTP
    Serve {
        /// Listen port; defaults to $PORT or 8080
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(Some(json)) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let response = match err.downcast_ref::<AcquisitionError>() {
                Some(acquisition) => ErrorResponse::from(acquisition),
                None => ErrorResponse {
                    error: "CONFIGURATION_ERROR".to_string(),
                    message: err.to_string(),
                    timestamp: chrono::Utc::now(),
                },
            };
            match serde_json::to_string_pretty(&response) {
                Ok(body) => println!("{}", body),
                Err(_) => println!("{{\"error\":\"{}\"}}", response.error),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<Option<String>> {
    let mut config = if cli.sample {
        // credentials are not needed for the sample data set
        AppConfig::from_lookup(|key| match key {
            "ACCOUNT_PROVIDER" => Some("sample".to_string()),
            other => std::env::var(other).ok(),
        })?
    } else {
        AppConfig::from_env()?
    };

    if cli.show_browser {
        config.session = config.session.with_headless(false);
    }

    info!(
        provider = ?config.provider,
        base_url = %config.session.base_url,
        timeout = ?config.session.timeout,
        "Configuration loaded"
    );

    let provider: Arc<dyn AccountProvider> =
        Arc::from(build_provider(config.provider, Arc::new(config.session)));
    let ctx = RequestContext::new();

    let json = match cli.command {
        Command::Accounts => {
            let accounts = provider.list_accounts(&ctx).await?;
            serde_json::to_string_pretty(&AccountsResponse::new(accounts))?
        }
        Command::Account { id } => {
            let (account, transactions) =
                provider.fetch_account_with_transactions(&ctx, &id).await?;
            let response = AccountDetailsResponse::from(AccountDetails::new(account, transactions));
            serde_json::to_string_pretty(&response)?
        }
        Command::Serve { port } => {
            api::serve(port.unwrap_or(config.port), provider).await?;
            return Ok(None);
        }
    };

    Ok(Some(json))
}
