//! Synchronization pipeline
//!
//! Fetch the Binance account, recompute the portfolio and persist the
//! result as a single snapshot. [`LocalApi`] exposes the same operations to
//! the dashboard without an HTTP round trip.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use worker::Env;

use crate::auth::BinanceAuth;
use crate::client::BinanceClient;
use crate::config::Config;
use crate::dashboard::action::DashboardApi;
use crate::error::Result;
use crate::fetcher::AccountFetcher;
use crate::log_info;
use crate::portfolio::PortfolioCalculator;
use crate::store::SnapshotStore;
use crate::types::{
    AccountData, Holding, PortfolioReport, PortfolioSnapshot, Stats, SyncSummary, Taxes,
};

pub const SYNC_SUCCESS_STATUS: &str = "Synchronisation réussie";

pub struct SyncService<'a> {
    env: &'a Env,
    config: &'a Config,
}

impl<'a> SyncService<'a> {
    pub fn new(env: &'a Env, config: &'a Config) -> Self {
        Self { env, config }
    }

    pub async fn run(&self) -> Result<SyncSummary> {
        let auth = BinanceAuth::from_env(self.env)?;
        let client = BinanceClient::new(auth, &self.config.binance_base_url);
        let store = SnapshotStore::from_env(self.env)?;
        let now = Utc::now();

        let data = AccountFetcher::new(&client, self.config).fetch(now).await?;
        log_info!(
            "Fetched {} balances, {} transactions, {} cash flows, {} prices",
            data.balances.len(),
            data.transactions.len(),
            data.cash_flows.len(),
            data.prices.len()
        );

        let report = PortfolioCalculator::from_config(self.config).calculate(&data, now);
        let snapshot = build_snapshot(report, data, now);
        store.save(&snapshot).await?;

        log_info!("Sync complete: {} holdings", snapshot.portfolio.len());
        Ok(summarize(&snapshot))
    }
}

pub fn build_snapshot(
    report: PortfolioReport,
    data: AccountData,
    now: DateTime<Utc>,
) -> PortfolioSnapshot {
    PortfolioSnapshot {
        portfolio: report.holdings,
        stats: report.stats,
        taxes: report.taxes,
        transactions: data.transactions,
        cash_flows: data.cash_flows,
        synced_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

pub fn summarize(snapshot: &PortfolioSnapshot) -> SyncSummary {
    SyncSummary {
        status: SYNC_SUCCESS_STATUS.to_string(),
        portfolio_count: snapshot.portfolio.len(),
    }
}

/// In-process dashboard backend reading the worker's own KV snapshot
pub struct LocalApi<'a> {
    env: &'a Env,
    config: &'a Config,
}

impl<'a> LocalApi<'a> {
    pub fn new(env: &'a Env, config: &'a Config) -> Self {
        Self { env, config }
    }

    async fn snapshot(&self) -> Result<PortfolioSnapshot> {
        SnapshotStore::from_env(self.env)?.require().await
    }
}

#[async_trait(?Send)]
impl DashboardApi for LocalApi<'_> {
    async fn trigger_sync(&self) -> Result<()> {
        SyncService::new(self.env, self.config).run().await.map(|_| ())
    }

    async fn fetch_portfolio(&self) -> Result<Vec<Holding>> {
        Ok(self.snapshot().await?.portfolio)
    }

    async fn fetch_stats(&self) -> Result<Stats> {
        Ok(self.snapshot().await?.stats)
    }

    async fn fetch_taxes(&self) -> Result<Taxes> {
        Ok(self.snapshot().await?.taxes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;
    use crate::types::Transaction;

    fn account() -> AccountData {
        AccountData {
            balances: BTreeMap::from([("BTC".to_string(), 0.5)]),
            transactions: vec![Transaction {
                symbol: "BTCUSDC".into(),
                is_buyer: true,
                qty: 0.5,
                price: 20_000.0,
                quote_qty: 10_000.0,
                commission: 0.0,
                commission_asset: None,
                time: 1_735_689_600_000,
                from_deposit: false,
                is_convert: false,
            }],
            cash_flows: vec![],
            prices: BTreeMap::from([("BTC".to_string(), 30_000.0)]),
        }
    }

    #[test]
    fn test_snapshot_carries_report_and_transactions() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let data = account();
        let report = PortfolioCalculator::new("USDC", vec!["USD".into(), "EUR".into()], 0.30)
            .calculate(&data, now);

        let snapshot = build_snapshot(report.clone(), data, now);

        assert_eq!(snapshot.portfolio, report.holdings);
        assert_eq!(snapshot.stats, report.stats);
        assert_eq!(snapshot.taxes, report.taxes);
        assert_eq!(snapshot.transactions.len(), 1);
        assert_eq!(snapshot.synced_at, "2025-03-01T12:00:00Z");
    }

    #[test]
    fn test_summary_counts_holdings() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let data = account();
        let report = PortfolioCalculator::new("USDC", vec![], 0.30).calculate(&data, now);
        let summary = summarize(&build_snapshot(report, data, now));

        assert_eq!(summary.status, SYNC_SUCCESS_STATUS);
        assert_eq!(summary.portfolio_count, 1);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["portfolioCount"], 1);
    }
}
