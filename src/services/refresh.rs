//! Dependent-data refresh policy.
//!
//! [`effects_after`] is the table of what a successful operation invalidates.
//! Reloads are executed by the console as separate operations; everything else
//! is a direct edit of the console state, applied here.

use super::console::ConsoleState;
use crate::types::{contains_symbol, CredentialsSummary, Instrument, OperationKind};
use tracing::debug;

/// Follow-up triggered by a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Re-run another operation.
    Reload(OperationKind),
    /// Blank the instrument form's symbol.
    ClearInstrumentSymbol,
    /// Replace the catalogue with the returned instruments.
    AdoptCatalogue,
    /// Select the first catalogue entry when nothing is selected.
    SelectDefaultSymbol,
    /// Select the first catalogue entry when the selection left the catalogue.
    ReselectMissingSymbol,
    /// Record how many instruments the broker refresh returned.
    AnnounceUniverse,
    /// Copy the stored identity fields into the credentials form.
    FillCredentials,
    /// Wipe the auth token and TOTP secret from the credentials form.
    ClearCredentialSecrets,
    /// Record the server-confirmed save time.
    AnnounceCredentialsSaved,
}

/// What the triggering operation returned, as far as effects care.
#[derive(Debug, Clone, Copy)]
pub enum Settled<'a> {
    Instruments(&'a [Instrument]),
    Credentials(Option<&'a CredentialsSummary>),
    Other,
}

pub fn effects_after(kind: OperationKind) -> &'static [Effect] {
    use Effect::*;

    match kind {
        OperationKind::SubmitOrder => &[Reload(OperationKind::LoadAccount)],
        OperationKind::CreateInstrument => {
            &[ClearInstrumentSymbol, Reload(OperationKind::LoadInstruments)]
        }
        OperationKind::LoadInstruments => &[AdoptCatalogue, SelectDefaultSymbol],
        OperationKind::RefreshUniverse => &[AdoptCatalogue, ReselectMissingSymbol, AnnounceUniverse],
        OperationKind::LoadCredentials => &[FillCredentials],
        OperationKind::SaveCredentials => &[ClearCredentialSecrets, AnnounceCredentialsSaved],
        _ => &[],
    }
}

/// Operations to re-run after `kind` succeeds.
pub fn reloads_after(kind: OperationKind) -> impl Iterator<Item = OperationKind> {
    effects_after(kind).iter().filter_map(|effect| match effect {
        Effect::Reload(target) => Some(*target),
        _ => None,
    })
}

/// Apply every non-reload effect of `kind` to the console state.
pub fn apply_state_effects(state: &mut ConsoleState, kind: OperationKind, settled: Settled<'_>) {
    for effect in effects_after(kind) {
        apply(state, *effect, settled);
    }
}

fn apply(state: &mut ConsoleState, effect: Effect, settled: Settled<'_>) {
    match (effect, settled) {
        (Effect::Reload(_), _) => {}
        (Effect::ClearInstrumentSymbol, _) => state.instrument_form.symbol.clear(),
        (Effect::AdoptCatalogue, Settled::Instruments(instruments)) => {
            state.catalogue = instruments.to_vec();
        }
        (Effect::SelectDefaultSymbol, Settled::Instruments(instruments)) => {
            if state.order_form.symbol.is_empty() {
                if let Some(first) = instruments.first() {
                    state.order_form.symbol = first.symbol.clone();
                }
            }
        }
        (Effect::ReselectMissingSymbol, Settled::Instruments(instruments)) => {
            if !contains_symbol(instruments, &state.order_form.symbol) {
                if let Some(first) = instruments.first() {
                    state.order_form.symbol = first.symbol.clone();
                }
            }
        }
        (Effect::AnnounceUniverse, Settled::Instruments(instruments)) => {
            state.catalogue_notice = Some(format!(
                "Loaded {} instruments from Motilal Oswal.",
                instruments.len()
            ));
        }
        (Effect::FillCredentials, Settled::Credentials(summary)) => {
            if let Some(summary) = summary {
                state.credentials_form.api_key = summary.api_key.clone();
                state.credentials_form.client_code = summary.client_code.clone();
                state.credentials_form.clear_secrets();
            }
        }
        (Effect::ClearCredentialSecrets, _) => state.credentials_form.clear_secrets(),
        (Effect::AnnounceCredentialsSaved, Settled::Credentials(Some(summary))) => {
            state.credentials_notice = Some(format!(
                "Credentials saved. Updated at {}",
                summary.updated_at.to_rfc3339()
            ));
        }
        (effect, settled) => {
            debug!("{:?} does not apply to {:?}", effect, settled);
        }
    }
}
