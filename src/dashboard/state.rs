//! Root view state of the dashboard
//!
//! Owns everything the views render. Payloads are only ever replaced all
//! together by a successful synchronization.

use crate::config::DEFAULT_TAX_RATE;
use crate::types::{Holding, Stats, Taxes};

/// The three payloads fetched after a synchronization
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardPayload {
    pub portfolio: Vec<Holding>,
    pub stats: Stats,
    pub taxes: Taxes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub portfolio: Vec<Holding>,
    pub stats: Option<Stats>,
    pub taxes: Option<Taxes>,
    /// Set by the first successful synchronization
    pub loaded: bool,
    /// A synchronization is in flight; the trigger is disabled
    pub loading: bool,
    pub error: Option<String>,
    /// Rate shown next to the estimated tax
    pub tax_rate: f64,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(DEFAULT_TAX_RATE)
    }
}

impl DashboardState {
    pub fn new(tax_rate: f64) -> Self {
        Self {
            portfolio: Vec::new(),
            stats: None,
            taxes: None,
            loaded: false,
            loading: false,
            error: None,
            tax_rate,
        }
    }

    pub fn begin_sync(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn apply(&mut self, payload: DashboardPayload) {
        self.portfolio = payload.portfolio;
        self.stats = Some(payload.stats);
        self.taxes = Some(payload.taxes);
        self.loaded = true;
        self.loading = false;
    }

    /// Keep the previous payloads and surface `message`
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.loading = false;
    }

    pub fn sync_button_label(&self) -> &'static str {
        if self.loading {
            "Synchronisation..."
        } else {
            "🔄 Synchroniser"
        }
    }
}
