//! The "synchronize" action
//!
//! One request triggers the backend refresh, then portfolio, stats and taxes
//! are fetched concurrently. Either everything is applied or nothing is.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::dashboard::state::{DashboardPayload, DashboardState};
use crate::error::{PortfolioError, Result};
use crate::log_error;
use crate::types::{Holding, Stats, Taxes};

/// Shown for any failure of the sequence, whichever request failed
pub const SYNC_FAILED_MESSAGE: &str = "La synchronisation a échoué. Vérifiez la connexion API.";

/// Backend operations the dashboard depends on
#[async_trait(?Send)]
pub trait DashboardApi {
    /// `POST /api/sync`
    async fn trigger_sync(&self) -> Result<()>;

    /// `GET /api/portfolio`
    async fn fetch_portfolio(&self) -> Result<Vec<Holding>>;

    /// `GET /api/stats`
    async fn fetch_stats(&self) -> Result<Stats>;

    /// `GET /api/taxes`
    async fn fetch_taxes(&self) -> Result<Taxes>;
}

/// Runs a synchronization against a backend and updates the root state
pub struct SyncAction<A> {
    api: A,
}

impl<A: DashboardApi> SyncAction<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Trigger, then join the three fetches
    pub async fn fetch(&self) -> Result<DashboardPayload> {
        self.api.trigger_sync().await?;

        let (portfolio, stats, taxes) = futures::try_join!(
            self.api.fetch_portfolio(),
            self.api.fetch_stats(),
            self.api.fetch_taxes()
        )?;

        Ok(DashboardPayload {
            portfolio,
            stats,
            taxes,
        })
    }

    /// On failure the previous payloads stay in place and the generic
    /// message is set; the underlying error is logged and returned.
    pub async fn run(&self, state: &mut DashboardState) -> Result<()> {
        state.begin_sync();
        match self.fetch().await {
            Ok(payload) => {
                state.apply(payload);
                Ok(())
            }
            Err(e) => {
                log_error!("Sync error: {}", e);
                state.fail(SYNC_FAILED_MESSAGE);
                Err(e)
            }
        }
    }
}

/// Dashboard backend reached over HTTP
pub struct HttpDashboardApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpDashboardApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http.get(self.endpoint(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortfolioError::Http(format!("GET {path}: HTTP {status}")));
        }
        Ok(response.json().await?)
    }
}

#[async_trait(?Send)]
impl DashboardApi for HttpDashboardApi {
    async fn trigger_sync(&self) -> Result<()> {
        let response = self.http.post(self.endpoint("/api/sync")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortfolioError::Http(format!("POST /api/sync: HTTP {status}")));
        }
        Ok(())
    }

    async fn fetch_portfolio(&self) -> Result<Vec<Holding>> {
        self.get_json("/api/portfolio").await
    }

    async fn fetch_stats(&self) -> Result<Stats> {
        self.get_json("/api/stats").await
    }

    async fn fetch_taxes(&self) -> Result<Taxes> {
        self.get_json("/api/taxes").await
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::types::{DistributionSlice, MonthlyProfit};

    /// In-memory backend failing on one chosen call
    #[derive(Default)]
    struct FakeApi {
        fail_on: Option<&'static str>,
        calls: RefCell<Vec<&'static str>>,
    }

    impl FakeApi {
        fn failing(call: &'static str) -> Self {
            Self {
                fail_on: Some(call),
                ..Self::default()
            }
        }

        fn record(&self, call: &'static str) -> Result<()> {
            self.calls.borrow_mut().push(call);
            if self.fail_on == Some(call) {
                Err(PortfolioError::Http(format!("{call}: HTTP 500")))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait(?Send)]
    impl DashboardApi for FakeApi {
        async fn trigger_sync(&self) -> Result<()> {
            self.record("sync")
        }

        async fn fetch_portfolio(&self) -> Result<Vec<Holding>> {
            self.record("portfolio")?;
            Ok(vec![Holding {
                asset: "BTC".into(),
                quantity: 0.25,
                total_invested: 5_000.0,
                average_price: 20_000.0,
                realized_profit: 0.0,
                unrealized_profit: 1_250.0,
            }])
        }

        async fn fetch_stats(&self) -> Result<Stats> {
            self.record("stats")?;
            Ok(Stats {
                total_value: Some(6_250.0),
                distribution: Some(vec![DistributionSlice {
                    asset: "BTC".into(),
                    value: 6_250.0,
                }]),
                monthly_profits: Some(vec![MonthlyProfit {
                    month: "2025-01".into(),
                    profit: 12.345,
                }]),
                ..Stats::default()
            })
        }

        async fn fetch_taxes(&self) -> Result<Taxes> {
            self.record("taxes")?;
            Ok(Taxes {
                year: 2025,
                yearly_profit: 100.0,
                estimated_tax: 30.0,
            })
        }
    }

    #[tokio::test]
    async fn test_successful_sync_loads_all_payloads() {
        let action = SyncAction::new(FakeApi::default());
        let mut state = DashboardState::default();

        action.run(&mut state).await.unwrap();

        assert!(state.loaded);
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.portfolio.len(), 1);
        assert_eq!(state.stats.as_ref().and_then(|s| s.total_value), Some(6_250.0));
        assert_eq!(state.taxes.as_ref().map(|t| t.estimated_tax), Some(30.0));
        assert_eq!(action.api.calls.borrow()[0], "sync");
        assert_eq!(action.api.calls.borrow().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_trigger_skips_fetches() {
        let action = SyncAction::new(FakeApi::failing("sync"));
        let mut state = DashboardState::default();

        assert!(action.run(&mut state).await.is_err());

        assert_eq!(*action.api.calls.borrow(), vec!["sync"]);
        assert!(!state.loaded);
        assert_eq!(state.error.as_deref(), Some(SYNC_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn test_any_failed_fetch_leaves_state_untouched() {
        for failing in ["portfolio", "stats", "taxes"] {
            let mut state = DashboardState::default();
            SyncAction::new(FakeApi::default())
                .run(&mut state)
                .await
                .unwrap();
            let previous = state.clone();

            let result = SyncAction::new(FakeApi::failing(failing)).run(&mut state).await;

            assert!(result.is_err(), "{failing} should fail the sync");
            assert_eq!(state.portfolio, previous.portfolio);
            assert_eq!(state.stats, previous.stats);
            assert_eq!(state.taxes, previous.taxes);
            assert!(!state.loading);
            assert_eq!(state.error.as_deref(), Some(SYNC_FAILED_MESSAGE));
        }
    }

    #[test]
    fn test_http_endpoint_joins_base_url() {
        let api = HttpDashboardApi::new("https://portfolio.example.com/");
        assert_eq!(api.endpoint("/api/stats"), "https://portfolio.example.com/api/stats");
    }
}
