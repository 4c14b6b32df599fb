//! Common types for the portfolio system
//!
//! Wire names follow the backend JSON protocol consumed by the dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A buy or sell of a tracked asset against the quote asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Trading pair, e.g. "BTCUSDC"
    pub symbol: String,
    pub is_buyer: bool,
    pub qty: f64,
    pub price: f64,
    /// Amount of quote asset exchanged
    pub quote_qty: f64,
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub commission_asset: Option<String>,
    /// Unix time in milliseconds
    pub time: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_deposit: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_convert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowKind {
    CryptoDeposit,
    FiatDeposit,
    Withdrawal,
}

/// Money moved into or out of the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub kind: CashFlowKind,
    pub asset: String,
    pub amount: f64,
    /// Value in the quote asset at `time`, when a price was known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Unix time in milliseconds
    pub time: i64,
    /// Payment method of a fiat deposit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl CashFlow {
    pub fn is_deposit(&self) -> bool {
        self.kind != CashFlowKind::Withdrawal
    }
}

/// Raw account data gathered from the exchange during a sync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountData {
    /// Free balance per asset (only non-zero balances)
    pub balances: BTreeMap<String, f64>,
    pub transactions: Vec<Transaction>,
    /// Deposits and withdrawals, oldest first
    #[serde(default)]
    pub cash_flows: Vec<CashFlow>,
    /// Current price per asset, in the quote asset
    pub prices: BTreeMap<String, f64>,
}

/// One row of the holdings table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub asset: String,
    #[serde(rename = "quantite")]
    pub quantity: f64,
    #[serde(rename = "investissement_total")]
    pub total_invested: f64,
    #[serde(rename = "prix_moyen")]
    pub average_price: f64,
    #[serde(rename = "plus_value_realisee")]
    pub realized_profit: f64,
    #[serde(rename = "plus_value_latente")]
    pub unrealized_profit: f64,
}

/// Share of total portfolio value held in one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSlice {
    pub asset: String,
    pub value: f64,
}

/// Realized profit for one calendar month ("YYYY-MM")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProfit {
    pub month: String,
    pub profit: f64,
}

/// Aggregate figures for the charts
///
/// Every field may be missing in a backend response; the dashboard renders
/// placeholders for the missing parts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(rename = "historique_valeur", default, skip_serializing_if = "Option::is_none")]
    pub total_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Vec<DistributionSlice>>,
    #[serde(rename = "plus_values_mensuelles", default, skip_serializing_if = "Option::is_none")]
    pub monthly_profits: Option<Vec<MonthlyProfit>>,
    /// Sum of deposits valued when they arrived
    #[serde(rename = "capital_investi", default, skip_serializing_if = "Option::is_none")]
    pub invested: Option<f64>,
    /// Current value minus invested capital
    #[serde(rename = "plus_value_globale", default, skip_serializing_if = "Option::is_none")]
    pub overall_profit: Option<f64>,
}

/// Realized result for the current year and the estimated tax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxes {
    #[serde(rename = "annee")]
    pub year: i32,
    #[serde(rename = "plus_values_annee")]
    pub yearly_profit: f64,
    #[serde(rename = "taxes_estimees")]
    pub estimated_tax: f64,
}

/// Output of a portfolio calculation
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReport {
    pub holdings: Vec<Holding>,
    pub stats: Stats,
    pub taxes: Taxes,
}

/// Last successful synchronization, persisted in KV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub portfolio: Vec<Holding>,
    pub stats: Stats,
    pub taxes: Taxes,
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub cash_flows: Vec<CashFlow>,
    /// RFC 3339 timestamp of the sync
    pub synced_at: String,
}

/// Body of `GET /api/transactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionHistory {
    pub trades: Vec<Transaction>,
    pub deposits: Vec<CashFlow>,
    pub withdrawals: Vec<CashFlow>,
}

impl TransactionHistory {
    pub fn from_snapshot(snapshot: PortfolioSnapshot) -> Self {
        let (deposits, withdrawals): (Vec<CashFlow>, Vec<CashFlow>) = snapshot
            .cash_flows
            .into_iter()
            .partition(CashFlow::is_deposit);
        Self {
            trades: snapshot.transactions,
            deposits,
            withdrawals,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty() && self.deposits.is_empty() && self.withdrawals.is_empty()
    }
}

/// Body returned by `POST /api/sync`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSummary {
    pub status: String,
    #[serde(rename = "portfolioCount")]
    pub portfolio_count: usize,
}
