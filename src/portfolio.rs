//! Portfolio calculation
//!
//! Turns raw account data into the three dashboard payloads:
//! - Holdings with average-cost basis and realized/unrealized profit
//! - Stats: total value, distribution, realized profit per month, invested
//!   capital and overall result
//! - Taxes: realized result of the current year and the flat-rate estimate
//!
//! Pure computation: the clock is passed in, nothing here does I/O.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::log_warn;
use crate::types::{
    AccountData, CashFlow, DistributionSlice, Holding, MonthlyProfit, PortfolioReport, Stats,
    Taxes, Transaction,
};

/// Quantities below this are treated as a fully closed position
const DUST_QUANTITY: f64 = 1e-9;

/// Round half away from zero to `decimals` places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Running average-cost position for one asset
#[derive(Debug, Clone, Copy, Default)]
struct Position {
    quantity: f64,
    total_cost: f64,
    realized_profit: f64,
}

impl Position {
    fn buy(&mut self, qty: f64, quote_qty: f64) {
        self.quantity += qty;
        self.total_cost += quote_qty;
    }

    /// Returns the realized profit, or `None` when nothing is held
    fn sell(&mut self, qty: f64, quote_qty: f64) -> Option<f64> {
        if self.quantity <= 0.0 {
            return None;
        }
        let cost_sold = self.total_cost * (qty / self.quantity);
        let profit = quote_qty - cost_sold;

        self.realized_profit += profit;
        self.quantity -= qty;
        self.total_cost -= cost_sold;
        if self.quantity.abs() < DUST_QUANTITY {
            self.quantity = 0.0;
            self.total_cost = 0.0;
        }
        Some(profit)
    }

    fn average_price(&self) -> f64 {
        if self.quantity > 0.0 {
            self.total_cost / self.quantity
        } else {
            0.0
        }
    }
}

/// Realized profit at a point in time
#[derive(Debug, Clone, Copy)]
struct ProfitEvent {
    time: DateTime<Utc>,
    profit: f64,
}

/// Computes holdings, stats and taxes from account data
pub struct PortfolioCalculator {
    quote_asset: String,
    fiat_assets: Vec<String>,
    tax_rate: f64,
}

impl PortfolioCalculator {
    pub fn new(quote_asset: impl Into<String>, fiat_assets: Vec<String>, tax_rate: f64) -> Self {
        Self {
            quote_asset: quote_asset.into(),
            fiat_assets,
            tax_rate,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            config.quote_asset.clone(),
            config.fiat_assets.clone(),
            config.tax_rate,
        )
    }

    /// Replay transactions in time order and build the report
    pub fn calculate(&self, data: &AccountData, now: DateTime<Utc>) -> PortfolioReport {
        let mut transactions: Vec<&Transaction> = data.transactions.iter().collect();
        transactions.sort_by_key(|t| t.time);

        let mut positions: BTreeMap<String, Position> = BTreeMap::new();
        let mut events = Vec::new();

        for tx in transactions {
            let asset = self.asset_of(&tx.symbol);
            let position = positions.entry(asset.to_string()).or_default();
            if tx.is_buyer {
                position.buy(tx.qty, tx.quote_qty);
            } else if let Some(profit) = position.sell(tx.qty, tx.quote_qty) {
                match from_millis(tx.time) {
                    Some(time) => events.push(ProfitEvent { time, profit }),
                    None => log_warn!("Sale of {} at invalid time {} skipped in stats", asset, tx.time),
                }
            }
        }

        let mut total_value = 0.0;
        let mut distribution = Vec::new();
        let mut holdings = Vec::with_capacity(positions.len());

        for (asset, position) in &positions {
            let price = data.prices.get(asset).copied().unwrap_or(0.0);
            let current_value = price * position.quantity;
            total_value += current_value;
            if position.quantity > 0.0 {
                distribution.push(DistributionSlice {
                    asset: asset.clone(),
                    value: round_to(current_value, 2),
                });
            }

            let average_price = position.average_price();
            holdings.push(Holding {
                asset: asset.clone(),
                quantity: round_to(position.quantity, 8),
                total_invested: round_to(position.total_cost, 2),
                average_price: if average_price >= 1.0 {
                    round_to(average_price, 2)
                } else {
                    round_to(average_price, 5)
                },
                realized_profit: round_to(position.realized_profit, 2),
                unrealized_profit: round_to(current_value - position.total_cost, 2),
            });
        }

        for fiat in &self.fiat_assets {
            let amount = data.balances.get(fiat).copied().unwrap_or(0.0);
            if amount > 0.0 {
                total_value += amount;
                distribution.push(DistributionSlice {
                    asset: fiat.clone(),
                    value: round_to(amount, 2),
                });
            }
        }

        let invested = invested_capital(&data.cash_flows);
        let stats = Stats {
            total_value: Some(round_to(total_value, 2)),
            distribution: Some(distribution),
            monthly_profits: Some(monthly_profits(&events, now)),
            invested: invested.map(|v| round_to(v, 2)),
            overall_profit: invested.map(|v| round_to(total_value - v, 2)),
        };

        PortfolioReport {
            holdings,
            stats,
            taxes: self.taxes(&events, now),
        }
    }

    fn asset_of<'s>(&self, symbol: &'s str) -> &'s str {
        symbol.strip_suffix(self.quote_asset.as_str()).unwrap_or(symbol)
    }

    /// Flat-rate tax on the current year's realized result; losses owe nothing
    fn taxes(&self, events: &[ProfitEvent], now: DateTime<Utc>) -> Taxes {
        let year = now.year();
        let yearly_profit = round_to(
            events
                .iter()
                .filter(|e| e.time.year() == year)
                .map(|e| e.profit)
                .sum(),
            2,
        );
        let estimated_tax = if yearly_profit > 0.0 {
            round_to(yearly_profit * self.tax_rate, 2)
        } else {
            0.0
        };
        Taxes {
            year,
            yearly_profit,
            estimated_tax,
        }
    }
}

/// Deposits valued when they arrived; `None` without any deposit
fn invested_capital(flows: &[CashFlow]) -> Option<f64> {
    let deposits: Vec<&CashFlow> = flows.iter().filter(|f| f.is_deposit()).collect();
    if deposits.is_empty() {
        return None;
    }
    Some(deposits.iter().filter_map(|f| f.value).sum())
}

/// Realized profit per month, with every month from the first event up to
/// `now` present (zero when nothing was sold)
fn monthly_profits(events: &[ProfitEvent], now: DateTime<Utc>) -> Vec<MonthlyProfit> {
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    for event in events {
        *by_month.entry(month_key(event.time.date_naive())).or_insert(0.0) += event.profit;
    }

    let Some(first) = events.iter().map(|e| e.time).min() else {
        return Vec::new();
    };

    let end = now.date_naive();
    let mut cursor = first_of_month(first.date_naive());
    while cursor <= end {
        by_month.entry(month_key(cursor)).or_insert(0.0);
        cursor = next_month(cursor);
    }

    by_month
        .into_iter()
        .map(|(month, profit)| MonthlyProfit {
            month,
            profit: round_to(profit, 2),
        })
        .collect()
}

fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CashFlowKind;
    use chrono::TimeZone;

    fn ms(year: i32, month: u32, day: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn tx(symbol: &str, is_buyer: bool, qty: f64, quote_qty: f64, time: i64) -> Transaction {
        Transaction {
            symbol: symbol.to_string(),
            is_buyer,
            qty,
            price: quote_qty / qty,
            quote_qty,
            commission: 0.0,
            commission_asset: None,
            time,
            from_deposit: false,
            is_convert: false,
        }
    }

    fn calculator() -> PortfolioCalculator {
        PortfolioCalculator::new("USDC", vec!["USD".into(), "EUR".into()], 0.30)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_average_cost_realized_profit() {
        let mut data = AccountData::default();
        data.transactions = vec![
            tx("BTCUSDC", true, 1.0, 20_000.0, ms(2025, 1, 2)),
            tx("BTCUSDC", true, 1.0, 30_000.0, ms(2025, 1, 3)),
            tx("BTCUSDC", false, 1.0, 40_000.0, ms(2025, 2, 1)),
        ];
        data.prices.insert("BTC".into(), 50_000.0);

        let report = calculator().calculate(&data, now());
        let btc = &report.holdings[0];
        assert_eq!(btc.asset, "BTC");
        assert_eq!(btc.quantity, 1.0);
        assert_eq!(btc.total_invested, 25_000.0);
        assert_eq!(btc.average_price, 25_000.0);
        assert_eq!(btc.realized_profit, 15_000.0);
        assert_eq!(btc.unrealized_profit, 25_000.0);
        assert_eq!(report.stats.total_value, Some(50_000.0));
    }

    #[test]
    fn test_transactions_replayed_in_time_order() {
        let mut data = AccountData::default();
        // Sell listed before the buy that precedes it in time
        data.transactions = vec![
            tx("ETHUSDC", false, 1.0, 3_000.0, ms(2025, 2, 1)),
            tx("ETHUSDC", true, 2.0, 4_000.0, ms(2025, 1, 1)),
        ];

        let report = calculator().calculate(&data, now());
        assert_eq!(report.holdings[0].realized_profit, 1_000.0);
        assert_eq!(report.holdings[0].quantity, 1.0);
    }

    #[test]
    fn test_sell_without_position_is_ignored() {
        let mut data = AccountData::default();
        data.transactions = vec![tx("SOLUSDC", false, 5.0, 500.0, ms(2025, 1, 1))];

        let report = calculator().calculate(&data, now());
        assert_eq!(report.holdings[0].realized_profit, 0.0);
        assert_eq!(report.taxes.yearly_profit, 0.0);
        assert_eq!(report.stats.monthly_profits, Some(vec![]));
    }

    #[test]
    fn test_full_sale_resets_dust() {
        let mut position = Position::default();
        position.buy(0.3, 30.0);
        let profit = position.sell(0.299_999_999_999, 45.0).unwrap();
        assert!((profit - 15.0).abs() < 1e-6);
        assert_eq!(position.quantity, 0.0);
        assert_eq!(position.total_cost, 0.0);
    }

    #[test]
    fn test_small_average_price_keeps_five_decimals() {
        let mut data = AccountData::default();
        data.transactions = vec![tx("DOGEUSDC", true, 3.0, 0.370_41, ms(2025, 1, 1))];

        let report = calculator().calculate(&data, now());
        assert_eq!(report.holdings[0].average_price, 0.123_47);
    }

    #[test]
    fn test_distribution_includes_fiat_cash() {
        let mut data = AccountData::default();
        data.transactions = vec![
            tx("BTCUSDC", true, 0.5, 10_000.0, ms(2025, 1, 1)),
            tx("ETHUSDC", true, 1.0, 2_000.0, ms(2025, 1, 1)),
            tx("ETHUSDC", false, 1.0, 2_500.0, ms(2025, 1, 5)),
        ];
        data.prices.insert("BTC".into(), 30_000.0);
        data.prices.insert("ETH".into(), 2_600.0);
        data.balances.insert("EUR".into(), 120.456);
        data.balances.insert("USDC".into(), 999.0);

        let report = calculator().calculate(&data, now());
        let distribution = report.stats.distribution.unwrap();
        assert_eq!(
            distribution,
            vec![
                DistributionSlice { asset: "BTC".into(), value: 15_000.0 },
                DistributionSlice { asset: "EUR".into(), value: 120.46 },
            ]
        );
        assert_eq!(report.stats.total_value, Some(15_120.46));
    }

    #[test]
    fn test_monthly_profits_fill_gaps_until_now() {
        let mut data = AccountData::default();
        data.transactions = vec![
            tx("BTCUSDC", true, 2.0, 200.0, ms(2024, 11, 1)),
            tx("BTCUSDC", false, 1.0, 150.0, ms(2024, 11, 20)),
            tx("BTCUSDC", false, 0.5, 40.0, ms(2025, 1, 10)),
        ];

        let report = calculator().calculate(&data, now());
        let months: Vec<(String, f64)> = report
            .stats
            .monthly_profits
            .unwrap()
            .into_iter()
            .map(|m| (m.month, m.profit))
            .collect();
        assert_eq!(
            months,
            vec![
                ("2024-11".to_string(), 50.0),
                ("2024-12".to_string(), 0.0),
                ("2025-01".to_string(), -10.0),
                ("2025-02".to_string(), 0.0),
                ("2025-03".to_string(), 0.0),
            ]
        );
    }

    #[test]
    fn test_taxes_current_year_only() {
        let mut data = AccountData::default();
        data.transactions = vec![
            tx("BTCUSDC", true, 3.0, 300.0, ms(2024, 6, 1)),
            tx("BTCUSDC", false, 1.0, 1_100.0, ms(2024, 7, 1)),
            tx("BTCUSDC", false, 1.0, 200.0, ms(2025, 2, 1)),
        ];

        let taxes = calculator().calculate(&data, now()).taxes;
        assert_eq!(taxes.year, 2025);
        assert_eq!(taxes.yearly_profit, 100.0);
        assert_eq!(taxes.estimated_tax, 30.0);
    }

    #[test]
    fn test_yearly_loss_owes_no_tax() {
        let mut data = AccountData::default();
        data.transactions = vec![
            tx("ETHUSDC", true, 1.0, 3_000.0, ms(2025, 1, 1)),
            tx("ETHUSDC", false, 1.0, 2_000.0, ms(2025, 2, 1)),
        ];

        let taxes = calculator().calculate(&data, now()).taxes;
        assert_eq!(taxes.yearly_profit, -1_000.0);
        assert_eq!(taxes.estimated_tax, 0.0);
    }

    #[test]
    fn test_unconvertible_sale_time_is_skipped() {
        let mut data = AccountData::default();
        data.transactions = vec![
            tx("BTCUSDC", true, 2.0, 200.0, ms(2025, 1, 1)),
            tx("BTCUSDC", false, 1.0, 150.0, i64::MAX),
        ];

        let report = calculator().calculate(&data, now());
        assert_eq!(report.holdings[0].realized_profit, 50.0);
        assert_eq!(report.stats.monthly_profits, Some(vec![]));
        assert_eq!(report.taxes.yearly_profit, 0.0);
    }

    #[test]
    fn test_invested_capital_and_overall_profit() {
        let flow = |kind, value| CashFlow {
            kind,
            asset: "EUR".into(),
            amount: 1.0,
            value,
            time: ms(2025, 1, 1),
            method: None,
        };
        let mut data = AccountData::default();
        data.transactions = vec![tx("BTCUSDC", true, 0.1, 2_000.0, ms(2025, 1, 2))];
        data.prices.insert("BTC".into(), 30_000.0);
        data.cash_flows = vec![
            flow(CashFlowKind::FiatDeposit, Some(1_500.0)),
            flow(CashFlowKind::CryptoDeposit, Some(500.0)),
            flow(CashFlowKind::CryptoDeposit, None),
            flow(CashFlowKind::Withdrawal, None),
        ];

        let stats = calculator().calculate(&data, now()).stats;
        assert_eq!(stats.invested, Some(2_000.0));
        assert_eq!(stats.overall_profit, Some(1_000.0));

        data.cash_flows.clear();
        let stats = calculator().calculate(&data, now()).stats;
        assert_eq!(stats.invested, None);
        assert_eq!(stats.overall_profit, None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.234_567, 2), 1.23);
        assert_eq!(round_to(0.000_123_456, 5), 0.000_12);
    }
}
