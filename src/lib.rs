//! Portfolio Worker - Binance portfolio tracker for Cloudflare Workers
//!
//! Pulls balances, trades, deposits and conversions from a Binance account,
//! computes an average-cost portfolio and serves a French dashboard.
//!
//! # Architecture
//! - Main entry point handles HTTP requests
//! - KV storage for the last synchronized snapshot
//! - Binance API client with HMAC request signing
//!
//! # Features
//! - Holdings with realized and unrealized profit
//! - Portfolio distribution and monthly realized profit
//! - Yearly tax estimate
//! - Web dashboard with on-demand synchronization

// Clippy configuration
#![allow(clippy::similar_names)] // state/stats are common names here
#![allow(clippy::cast_precision_loss)] // Float casts OK for display
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::doc_markdown)] // Doc style flexibility
#![allow(clippy::needless_pass_by_value)] // Worker framework patterns
#![allow(clippy::module_name_repetitions)]

mod logging;

mod auth;
mod client;
mod config;
mod dashboard;
mod error;
mod fetcher;
mod portfolio;
mod store;
mod sync;
mod types;

use serde::Serialize;
use serde_json::{Value, json};
use worker::{Context, Env, Request, Response, RouteContext, Router, event};

pub use auth::BinanceAuth;
pub use client::BinanceClient;
pub use config::Config;
pub use dashboard::action::{DashboardApi, HttpDashboardApi, SyncAction};
pub use dashboard::state::DashboardState;
pub use error::PortfolioError;
pub use portfolio::PortfolioCalculator;
pub use sync::{LocalApi, SyncService};
pub use types::*;

use dashboard::action::SYNC_FAILED_MESSAGE;
use store::SnapshotStore;

/// Result type alias for worker operations
type WResult<T> = std::result::Result<T, worker::Error>;

const NOT_SYNCED_MESSAGE: &str = "Données non synchronisées. Veuillez utiliser /api/sync.";

/// Main Worker entry point
#[event(fetch)]
async fn fetch(req: Request, env: Env, _ctx: Context) -> WResult<Response> {
    console_error_panic_hook::set_once();

    let router = Router::new();

    router
        // Health check
        .get_async("/health", |_req, ctx| async move {
            let config = match load_config(&ctx.env) {
                Ok(c) => c,
                Err(e) => return Response::error(format!("Config error: {e}"), 500),
            };

            Response::from_json(&json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "environment": config.environment,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }))
        })
        // Dashboard UI
        .get_async("/", dashboard_page)
        .get_async("/dashboard", dashboard_page)
        .get_async("/dashboard/transactions", |_req, ctx| async move {
            let store = SnapshotStore::from_env(&ctx.env)?;
            match store.require().await {
                Ok(snapshot) => Response::from_html(dashboard::transactions_html(Some(
                    &TransactionHistory::from_snapshot(snapshot),
                ))),
                Err(PortfolioError::NotSynced) => {
                    Response::from_html(dashboard::transactions_html(None))
                }
                Err(e) => {
                    log_error!("Snapshot read failed: {}", e);
                    Response::error(format!("Storage error: {e}"), 500)
                }
            }
        })
        // Run the dashboard sync action and return the rendered content
        .post_async("/dashboard/sync", |_req, ctx| async move {
            let config = match load_config(&ctx.env) {
                Ok(c) => c,
                Err(e) => return error_response(&e.to_string(), 500),
            };

            let mut state = DashboardState::new(config.tax_rate);
            let result = match config.dashboard_api_base.as_deref() {
                Some(base) => SyncAction::new(HttpDashboardApi::new(base)).run(&mut state).await,
                None => {
                    SyncAction::new(LocalApi::new(&ctx.env, &config))
                        .run(&mut state)
                        .await
                }
            };

            match result {
                Ok(()) => Response::from_json(&json!({
                    "html": dashboard::views::content(&state),
                })),
                Err(_) => error_response(
                    state.error.as_deref().unwrap_or(SYNC_FAILED_MESSAGE),
                    502,
                ),
            }
        })
        // Fetch from Binance, recompute and store the snapshot
        .post_async("/api/sync", |_req, ctx| async move {
            let config = match load_config(&ctx.env) {
                Ok(c) => c,
                Err(e) => return error_response(&e.to_string(), 500),
            };

            match SyncService::new(&ctx.env, &config).run().await {
                Ok(summary) => Response::from_json(&summary),
                Err(e) => {
                    log_error!("Sync failed: {}", e);
                    error_response(&e.to_string(), 500)
                }
            }
        })
        .get_async("/api/portfolio", |_req, ctx| async move {
            snapshot_part(&ctx.env, |s| s.portfolio).await
        })
        .get_async("/api/stats", |_req, ctx| async move {
            snapshot_part(&ctx.env, |s| s.stats).await
        })
        .get_async("/api/taxes", |_req, ctx| async move {
            snapshot_part(&ctx.env, |s| s.taxes).await
        })
        .get_async("/api/transactions", |_req, ctx| async move {
            snapshot_part(&ctx.env, TransactionHistory::from_snapshot).await
        })
        .run(req, env)
        .await
}

/// Load and validate configuration, then apply its log level
fn load_config(env: &Env) -> error::Result<Config> {
    let config = Config::from_env(env)?;
    config.apply_log_level();
    Ok(config)
}

/// Dashboard page in its not-yet-synchronized state
async fn dashboard_page(_req: Request, ctx: RouteContext<()>) -> WResult<Response> {
    match load_config(&ctx.env) {
        Ok(config) => Response::from_html(dashboard::dashboard_html(&DashboardState::new(
            config.tax_rate,
        ))),
        Err(e) => Response::error(format!("Config error: {e}"), 500),
    }
}

fn error_response(message: &str, status: u16) -> WResult<Response> {
    Ok(Response::from_json(&json!({ "error": message }))?.with_status(status))
}

/// Status and body for one part of the stored snapshot; 400 before the
/// first sync
fn snapshot_reply<T, F>(snapshot: error::Result<PortfolioSnapshot>, part: F) -> (u16, Value)
where
    T: Serialize,
    F: FnOnce(PortfolioSnapshot) -> T,
{
    let body = snapshot.and_then(|s| serde_json::to_value(part(s)).map_err(PortfolioError::from));
    match body {
        Ok(body) => (200, body),
        Err(PortfolioError::NotSynced) => (400, json!({ "error": NOT_SYNCED_MESSAGE })),
        Err(e) => {
            log_error!("Snapshot read failed: {}", e);
            (500, json!({ "error": e.to_string() }))
        }
    }
}

async fn snapshot_part<T, F>(env: &Env, part: F) -> WResult<Response>
where
    T: Serialize,
    F: FnOnce(PortfolioSnapshot) -> T,
{
    let store = SnapshotStore::from_env(env)?;
    let (status, body) = snapshot_reply(store.require().await, part);
    Ok(Response::from_json(&body)?.with_status(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> PortfolioSnapshot {
        PortfolioSnapshot {
            portfolio: vec![],
            stats: Stats {
                total_value: Some(42.0),
                ..Stats::default()
            },
            taxes: Taxes {
                year: 2025,
                yearly_profit: 0.0,
                estimated_tax: 0.0,
            },
            transactions: vec![],
            cash_flows: vec![],
            synced_at: "2025-03-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_snapshot_reply_before_first_sync() {
        let (status, body) = snapshot_reply(Err(PortfolioError::NotSynced), |s| s.stats);
        assert_eq!(status, 400);
        assert_eq!(
            body,
            json!({ "error": "Données non synchronisées. Veuillez utiliser /api/sync." })
        );
    }

    #[test]
    fn test_snapshot_reply_serves_requested_part() {
        let (status, body) = snapshot_reply(Ok(snapshot()), |s| s.stats);
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "historique_valeur": 42.0 }));

        let (_, body) = snapshot_reply(Ok(snapshot()), TransactionHistory::from_snapshot);
        assert_eq!(body, json!({ "trades": [], "deposits": [], "withdrawals": [] }));
    }

    #[test]
    fn test_snapshot_reply_storage_failure() {
        let (status, body) =
            snapshot_reply(Err(PortfolioError::Storage("kv down".into())), |s| s.taxes);
        assert_eq!(status, 500);
        assert_eq!(body["error"], "Storage error: kv down");
    }
}
