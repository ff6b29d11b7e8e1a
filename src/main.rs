use signals_console::config::Config;
use signals_console::services::Console;
use signals_console::types::OperationState;
use std::fmt::Debug;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signals_console=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("Starting signals console against {}", config.api_base_url);

    let console = Console::from_config(&config);

    if let Err(e) = console.ping().await {
        anyhow::bail!("backend at {} is unreachable: {}", config.api_base_url, e);
    }

    // Initial loads are independent; each records its own outcome.
    let _ = tokio::join!(
        console.load_instruments(),
        console.load_account(),
        console.load_credentials(),
    );

    report("instruments", &console.instruments().snapshot(), |_| {
        format!("{} instruments in catalogue", console.catalogue().len())
    });
    report("account", &console.account().snapshot(), |account| {
        format!(
            "cash {:.2}, margin {:.2}, {} position(s)",
            account.cash_balance,
            account.margin_used,
            account.positions.len()
        )
    });
    report("credentials", &console.credentials_load().snapshot(), |summary| {
        match summary {
            Some(summary) => format!(
                "client {} (auth token: {}, totp: {})",
                summary.client_code, summary.has_auth_token, summary.has_totp_secret
            ),
            None => "not configured".to_string(),
        }
    });

    let state = console.snapshot();
    if !state.order_form.symbol.is_empty() {
        info!("Selected symbol: {}", state.order_form.symbol);
    }

    Ok(())
}

fn report<T: Debug>(label: &str, state: &OperationState<T>, describe: impl Fn(&T) -> String) {
    match state {
        OperationState::Succeeded(value) => info!("{}: {}", label, describe(value)),
        OperationState::Failed(message) => warn!("{}: {}", label, message),
        other => warn!("{}: ended in {:?}", label, other.phase()),
    }
}
