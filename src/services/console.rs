//! Console session: forms, operations and the refreshes between them.
//!
//! Views edit forms through [`Console::edit`], trigger operations through the
//! async methods, and read results from each [`Operation`]. Every operation
//! captures its own failures; nothing propagates into unrelated operations.
//! Mutations apply their follow-ups whenever the backend accepted them, even
//! if a newer invocation has since taken over the operation's state.

use super::operation::Operation;
use super::refresh::{apply_state_effects, reloads_after, Settled};
use super::validation;
use crate::client::{ApiClient, ReqwestTransport, Transport};
use crate::config::Config;
use crate::error::{OperationError, Result};
use crate::types::{
    AccountSnapshot, BacktestForm, BacktestResult, BrokerStatus, CredentialsForm,
    CredentialsSummary, HealthStatus, Instrument, InstrumentForm, OperationKind, OrderForm,
    OrderResult, WebhookAck, WebhookForm, WebhookProvider,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Client-held session state shared by the forms.
#[derive(Debug, Clone, Default)]
pub struct ConsoleState {
    /// Current instrument catalogue, replaced wholesale on every fetch.
    pub catalogue: Vec<Instrument>,
    pub instrument_form: InstrumentForm,
    pub order_form: OrderForm,
    pub backtest_form: BacktestForm,
    pub webhook_form: WebhookForm,
    pub credentials_form: CredentialsForm,
    pub catalogue_notice: Option<String>,
    pub credentials_notice: Option<String>,
}

pub struct Console<T = ReqwestTransport> {
    client: ApiClient<T>,
    state: Mutex<ConsoleState>,
    account: Operation<AccountSnapshot>,
    instruments: Operation<Vec<Instrument>>,
    instrument_create: Operation<Instrument>,
    universe_refresh: Operation<Vec<Instrument>>,
    order_submit: Operation<OrderResult>,
    backtest_run: Operation<BacktestResult>,
    chartink_dispatch: Operation<WebhookAck>,
    tradingview_dispatch: Operation<WebhookAck>,
    credentials_load: Operation<Option<CredentialsSummary>>,
    credentials_save: Operation<CredentialsSummary>,
    broker_status: Operation<BrokerStatus>,
    health: Operation<HealthStatus>,
}

impl Console<ReqwestTransport> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(ApiClient::from_config(config))
    }
}

impl<T: Transport> Console<T> {
    pub fn new(client: ApiClient<T>) -> Self {
        Self {
            client,
            state: Mutex::new(ConsoleState::default()),
            account: Operation::new(OperationKind::LoadAccount),
            instruments: Operation::new(OperationKind::LoadInstruments),
            instrument_create: Operation::new(OperationKind::CreateInstrument),
            universe_refresh: Operation::new(OperationKind::RefreshUniverse),
            order_submit: Operation::new(OperationKind::SubmitOrder),
            backtest_run: Operation::new(OperationKind::RunBacktest),
            chartink_dispatch: Operation::new(OperationKind::DispatchChartink),
            tradingview_dispatch: Operation::new(OperationKind::DispatchTradingView),
            credentials_load: Operation::new(OperationKind::LoadCredentials),
            credentials_save: Operation::new(OperationKind::SaveCredentials),
            broker_status: Operation::new(OperationKind::CheckBrokerStatus),
            health: Operation::new(OperationKind::Ping),
        }
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    // ========== State access ==========

    fn lock_state(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the whole session state.
    pub fn snapshot(&self) -> ConsoleState {
        self.lock_state().clone()
    }

    /// Mutate session state, typically a form field.
    pub fn edit<R>(&self, f: impl FnOnce(&mut ConsoleState) -> R) -> R {
        f(&mut self.lock_state())
    }

    pub fn catalogue(&self) -> Vec<Instrument> {
        self.lock_state().catalogue.clone()
    }

    // ========== Operation handles ==========

    pub fn account(&self) -> &Operation<AccountSnapshot> {
        &self.account
    }

    /// Lifecycle of the catalogue fetch. Its value is the last fetched list;
    /// [`Console::catalogue`] is the live catalogue, which a universe refresh
    /// also replaces.
    pub fn instruments(&self) -> &Operation<Vec<Instrument>> {
        &self.instruments
    }

    pub fn instrument_create(&self) -> &Operation<Instrument> {
        &self.instrument_create
    }

    pub fn universe_refresh(&self) -> &Operation<Vec<Instrument>> {
        &self.universe_refresh
    }

    pub fn order_submit(&self) -> &Operation<OrderResult> {
        &self.order_submit
    }

    pub fn backtest_run(&self) -> &Operation<BacktestResult> {
        &self.backtest_run
    }

    pub fn webhook_dispatch(&self, provider: WebhookProvider) -> &Operation<WebhookAck> {
        match provider {
            WebhookProvider::Chartink => &self.chartink_dispatch,
            WebhookProvider::TradingView => &self.tradingview_dispatch,
        }
    }

    pub fn credentials_load(&self) -> &Operation<Option<CredentialsSummary>> {
        &self.credentials_load
    }

    pub fn credentials_save(&self) -> &Operation<CredentialsSummary> {
        &self.credentials_save
    }

    pub fn broker_status(&self) -> &Operation<BrokerStatus> {
        &self.broker_status
    }

    pub fn health(&self) -> &Operation<HealthStatus> {
        &self.health
    }

    // ========== Reads ==========

    pub async fn load_account(&self) -> Result<AccountSnapshot> {
        self.account
            .run(async { self.client.load_account().await.map_err(OperationError::from) })
            .await
    }

    /// Fetch the catalogue and replace the local copy with it.
    pub async fn load_instruments(&self) -> Result<Vec<Instrument>> {
        let outcome = self.fetch_instruments().await;
        if let Ok(instruments) = &outcome {
            self.settle(OperationKind::LoadInstruments, Settled::Instruments(instruments))
                .await;
        }
        outcome
    }

    async fn fetch_instruments(&self) -> Result<Vec<Instrument>> {
        self.instruments
            .run(async { self.client.list_instruments().await.map_err(OperationError::from) })
            .await
    }

    /// Fetch stored broker credentials and prefill the non-secret fields.
    pub async fn load_credentials(&self) -> Result<Option<CredentialsSummary>> {
        let outcome = self
            .credentials_load
            .run(async { self.client.broker_credentials().await.map_err(OperationError::from) })
            .await;
        if let Ok(summary) = &outcome {
            self.settle(OperationKind::LoadCredentials, Settled::Credentials(summary.as_ref()))
                .await;
        }
        outcome
    }

    pub async fn check_broker_status(&self) -> Result<BrokerStatus> {
        self.broker_status
            .run(async { self.client.broker_status().await.map_err(OperationError::from) })
            .await
    }

    pub async fn ping(&self) -> Result<HealthStatus> {
        self.health
            .run(async { self.client.ping().await.map_err(OperationError::from) })
            .await
    }

    // ========== Mutations ==========

    /// Create an instrument from the instrument form.
    pub async fn create_instrument(&self) -> Result<Instrument> {
        let form = self.lock_state().instrument_form.clone();
        let completion = self.instrument_create.complete(self.send_instrument(&form)).await;
        if completion.outcome.is_ok() {
            self.settle(OperationKind::CreateInstrument, Settled::Other).await;
        }
        completion.into_result()
    }

    async fn send_instrument(&self, form: &InstrumentForm) -> Result<Instrument> {
        let payload = validation::build_instrument(form)?;
        info!("Creating instrument {} on {}", payload.symbol, payload.exchange);
        Ok(self.client.create_instrument(&payload).await?)
    }

    /// Pull the NIFTY 100 universe through the broker and adopt it.
    pub async fn refresh_universe(&self) -> Result<Vec<Instrument>> {
        self.edit(|state| state.catalogue_notice = None);
        let completion = self
            .universe_refresh
            .complete(async { self.client.refresh_nifty100().await.map_err(OperationError::from) })
            .await;
        if let Ok(instruments) = &completion.outcome {
            self.settle(OperationKind::RefreshUniverse, Settled::Instruments(instruments))
                .await;
        }
        completion.into_result()
    }

    /// Submit the order form, then refresh the account snapshot.
    pub async fn submit_order(&self) -> Result<OrderResult> {
        let form = self.lock_state().order_form.clone();
        let completion = self.order_submit.complete(self.send_order(&form)).await;
        if completion.outcome.is_ok() {
            self.settle(OperationKind::SubmitOrder, Settled::Other).await;
        }
        completion.into_result()
    }

    async fn send_order(&self, form: &OrderForm) -> Result<OrderResult> {
        let order = validation::build_order(form)?;
        info!(
            "Submitting {} {} {} x{}",
            order.order_type, order.side, order.symbol, order.quantity
        );
        Ok(self.client.submit_order(&order).await?)
    }

    pub async fn run_backtest(&self) -> Result<BacktestResult> {
        let form = self.lock_state().backtest_form.clone();
        self.backtest_run.run(self.send_backtest(&form)).await
    }

    async fn send_backtest(&self, form: &BacktestForm) -> Result<BacktestResult> {
        let request = validation::build_backtest_request(form)?;
        info!(
            "Running backtest {} on {} symbol(s)",
            request.strategy_id,
            request.symbols.len()
        );
        Ok(self.client.run_backtest(&request).await?)
    }

    /// Replay the webhook form against its provider's endpoint.
    pub async fn dispatch_webhook(&self) -> Result<WebhookAck> {
        let form = self.lock_state().webhook_form.clone();
        self.webhook_dispatch(form.provider)
            .run(self.send_webhook(&form))
            .await
    }

    async fn send_webhook(&self, form: &WebhookForm) -> Result<WebhookAck> {
        let dispatch = validation::build_webhook(form)?;
        info!("Replaying webhook as {}", dispatch.provider);
        Ok(self.client.dispatch_webhook(&dispatch).await?)
    }

    /// Save the credentials form. Secrets are wiped from the form on success.
    pub async fn save_credentials(&self) -> Result<CredentialsSummary> {
        let mut form = self.edit(|state| {
            state.credentials_notice = None;
            state.credentials_form.clone()
        });
        let completion = self.credentials_save.complete(self.send_credentials(&form)).await;
        form.clear_secrets();
        if let Ok(summary) = &completion.outcome {
            self.settle(OperationKind::SaveCredentials, Settled::Credentials(Some(summary)))
                .await;
        }
        completion.into_result()
    }

    async fn send_credentials(&self, form: &CredentialsForm) -> Result<CredentialsSummary> {
        let payload = validation::build_credentials(form)?;
        info!("Saving broker credentials for client {}", payload.client_code);
        Ok(self.client.save_broker_credentials(&payload).await?)
    }

    // ========== Refresh policy ==========

    /// Apply the follow-ups of a successful operation: state edits first, then
    /// reloads. A failed reload is recorded on its own operation only.
    async fn settle(&self, kind: OperationKind, settled: Settled<'_>) {
        self.edit(|state| apply_state_effects(state, kind, settled));

        for target in reloads_after(kind) {
            info!("{} invalidated {}, reloading", kind, target);
            self.reload(target).await;
        }
    }

    async fn reload(&self, kind: OperationKind) {
        let outcome = match kind {
            OperationKind::LoadAccount => self.load_account().await.map(|_| ()),
            OperationKind::LoadInstruments => match self.fetch_instruments().await {
                Ok(instruments) => {
                    self.edit(|state| {
                        apply_state_effects(state, kind, Settled::Instruments(&instruments))
                    });
                    Ok(())
                }
                Err(e) => Err(e),
            },
            other => {
                warn!("No reload path for {}", other);
                return;
            }
        };

        if let Err(e) = outcome {
            warn!("Reload of {} failed: {}", kind, e);
        }
    }
}
