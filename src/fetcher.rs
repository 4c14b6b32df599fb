//! Account data collection
//!
//! Gathers everything the portfolio calculation needs from Binance:
//! balances, deposits, withdrawals, trades, conversions and current prices.
//! Only pairs quoted in the configured quote asset are tracked.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

use crate::client::{
    ConvertRecord, DepositRecord, ExchangeApi, FiatOrder, MyTrade, WithdrawRecord, parse_decimal,
};
use crate::config::Config;
use crate::error::{PortfolioError, Result};
use crate::portfolio::round_to;
use crate::types::{AccountData, CashFlow, CashFlowKind, Transaction};
use crate::{log_info, log_warn};

/// Deposit status reported by Binance for a credited deposit
const DEPOSIT_SUCCESS: i64 = 1;

/// Withdrawal status reported by Binance once the transfer completed
const WITHDRAW_COMPLETED: i64 = 6;

const FIAT_ORDER_SUCCESS: &str = "Successful";

/// Collects raw account data for one sync
pub struct AccountFetcher<'a, C: ?Sized> {
    client: &'a C,
    config: &'a Config,
}

impl<'a, C: ExchangeApi + ?Sized> AccountFetcher<'a, C> {
    pub fn new(client: &'a C, config: &'a Config) -> Self {
        Self { client, config }
    }

    /// Fetch balances, history and prices.
    ///
    /// Exchange info and balances are required; every later step logs a
    /// warning and continues when it fails.
    pub async fn fetch(&self, now: DateTime<Utc>) -> Result<AccountData> {
        let quote = self.config.quote_asset.as_str();
        let (start, end) = convert_window(now, self.config.convert_lookback_days)?;

        let exchange_info = self.client.get_exchange_info().await?;
        let quoted_pairs: BTreeSet<String> = exchange_info
            .symbols
            .into_iter()
            .map(|s| s.symbol)
            .filter(|s| s.ends_with(quote))
            .collect();

        let account = self.client.get_account().await?;
        let balances: BTreeMap<String, f64> = account
            .balances
            .into_iter()
            .map(|b| (b.asset, parse_decimal(&b.free)))
            .filter(|(_, free)| *free > 0.0)
            .collect();

        let tracked = tracked_symbols(&balances, &quoted_pairs, self.config);
        log_info!("Tracked pairs: {:?}", tracked);

        let mut data = AccountData {
            balances,
            ..AccountData::default()
        };

        self.collect_deposits(&tracked, &mut data).await;
        self.collect_fiat_deposits(&mut data.cash_flows).await;
        self.collect_withdrawals(&mut data.cash_flows).await;
        data.cash_flows.sort_by_key(|f| f.time);

        for symbol in &tracked {
            match self.client.get_my_trades(symbol).await {
                Ok(trades) => data.transactions.extend(trades.iter().map(trade_transaction)),
                Err(e) => log_warn!("get_my_trades({}) failed: {}", symbol, e),
            }
        }

        match self.client.get_convert_trade_flow(start, end).await {
            Ok(flow) => data.transactions.extend(
                flow.list
                    .iter()
                    .filter_map(|c| convert_transaction(c, &tracked)),
            ),
            Err(e) => log_warn!("Convert history unavailable: {}", e),
        }

        for symbol in &tracked {
            let asset = symbol.strip_suffix(quote).unwrap_or(symbol);
            let price = match self.client.get_price(symbol).await {
                Ok(p) => p,
                Err(e) => {
                    log_warn!("Ticker unavailable for {}: {}", symbol, e);
                    0.0
                }
            };
            data.prices.insert(asset.to_string(), price);
        }
        for fiat in &self.config.fiat_assets {
            data.prices.insert(fiat.clone(), 1.0);
        }

        Ok(data)
    }

    /// Credited crypto deposits become cash flows. On tracked pairs they are
    /// also buys at the historical price.
    async fn collect_deposits(&self, tracked: &BTreeSet<String>, data: &mut AccountData) {
        let deposits = match self.client.get_deposit_history().await {
            Ok(d) => d,
            Err(e) => {
                log_warn!("Deposit history unavailable: {}", e);
                return;
            }
        };

        for deposit in deposits.iter().filter(|d| is_credited(d)) {
            let amount = parse_decimal(&deposit.amount);
            let value = if let Some(pair) = deposit_pair(deposit, tracked, &self.config.quote_asset) {
                match self.client.get_close_price_at(&pair, deposit.insert_time).await {
                    Ok(price) => {
                        let tx = deposit_transaction(deposit, pair, price);
                        let value = tx.quote_qty;
                        data.transactions.push(tx);
                        Some(value)
                    }
                    Err(e) => {
                        log_warn!("Historical price unavailable for {}: {}", pair, e);
                        data.transactions.push(deposit_transaction(deposit, pair, 0.0));
                        None
                    }
                }
            } else if self.config.is_cash_asset(&deposit.coin) {
                Some(amount)
            } else {
                None
            };

            data.cash_flows.push(CashFlow {
                kind: CashFlowKind::CryptoDeposit,
                asset: deposit.coin.clone(),
                amount,
                value,
                time: deposit.insert_time,
                method: None,
            });
        }
    }

    async fn collect_fiat_deposits(&self, out: &mut Vec<CashFlow>) {
        match self.client.get_fiat_deposits().await {
            Ok(orders) => out.extend(orders.iter().filter_map(fiat_cash_flow)),
            Err(e) => log_warn!("Fiat deposit history unavailable: {}", e),
        }
    }

    async fn collect_withdrawals(&self, out: &mut Vec<CashFlow>) {
        match self.client.get_withdraw_history().await {
            Ok(records) => out.extend(records.iter().filter_map(withdrawal_cash_flow)),
            Err(e) => log_warn!("Withdrawal history unavailable: {}", e),
        }
    }
}

/// `[now - days, now]` in milliseconds; out-of-range windows are a config error
fn convert_window(now: DateTime<Utc>, days: i64) -> Result<(i64, i64)> {
    let start = TimeDelta::try_days(days)
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .ok_or_else(|| {
            PortfolioError::Config(format!("convert lookback of {days} days is out of range"))
        })?;
    Ok((start.timestamp_millis(), now.timestamp_millis()))
}

/// `{asset}{quote}` for every held, non-cash asset whose pair is listed
pub fn tracked_symbols(
    balances: &BTreeMap<String, f64>,
    quoted_pairs: &BTreeSet<String>,
    config: &Config,
) -> BTreeSet<String> {
    balances
        .keys()
        .filter(|asset| !config.is_cash_asset(asset))
        .map(|asset| format!("{asset}{}", config.quote_asset))
        .filter(|pair| quoted_pairs.contains(pair))
        .collect()
}

fn is_credited(deposit: &DepositRecord) -> bool {
    deposit.status == DEPOSIT_SUCCESS && parse_decimal(&deposit.amount) > 0.0
}

fn deposit_pair(deposit: &DepositRecord, tracked: &BTreeSet<String>, quote: &str) -> Option<String> {
    let pair = format!("{}{quote}", deposit.coin);
    (is_credited(deposit) && tracked.contains(&pair)).then_some(pair)
}

fn deposit_transaction(deposit: &DepositRecord, pair: String, price: f64) -> Transaction {
    let amount = parse_decimal(&deposit.amount);
    Transaction {
        symbol: pair,
        is_buyer: true,
        qty: amount,
        price,
        quote_qty: round_to(price * amount, 8),
        commission: 0.0,
        commission_asset: Some(deposit.coin.clone()),
        time: deposit.insert_time,
        from_deposit: true,
        is_convert: false,
    }
}

/// Completed fiat orders count at face value
fn fiat_cash_flow(order: &FiatOrder) -> Option<CashFlow> {
    let amount = parse_decimal(&order.amount);
    (order.status == FIAT_ORDER_SUCCESS && amount > 0.0).then(|| CashFlow {
        kind: CashFlowKind::FiatDeposit,
        asset: order.fiat_currency.clone(),
        amount,
        value: Some(amount),
        time: order.create_time,
        method: order.method.clone(),
    })
}

fn withdrawal_cash_flow(record: &WithdrawRecord) -> Option<CashFlow> {
    if record.status != WITHDRAW_COMPLETED {
        return None;
    }
    let Ok(applied) = NaiveDateTime::parse_from_str(&record.apply_time, "%Y-%m-%d %H:%M:%S") else {
        log_warn!("Unreadable withdrawal time: {}", record.apply_time);
        return None;
    };
    Some(CashFlow {
        kind: CashFlowKind::Withdrawal,
        asset: record.coin.clone(),
        amount: parse_decimal(&record.amount),
        value: None,
        time: applied.and_utc().timestamp_millis(),
        method: None,
    })
}

fn trade_transaction(trade: &MyTrade) -> Transaction {
    Transaction {
        symbol: trade.symbol.clone(),
        is_buyer: trade.is_buyer,
        qty: parse_decimal(&trade.qty),
        price: parse_decimal(&trade.price),
        quote_qty: parse_decimal(&trade.quote_qty),
        commission: parse_decimal(&trade.commission),
        commission_asset: Some(trade.commission_asset.clone()),
        time: trade.time,
        from_deposit: false,
        is_convert: false,
    }
}

/// A conversion into a tracked asset, paid in the quote asset, is a buy
fn convert_transaction(record: &ConvertRecord, tracked: &BTreeSet<String>) -> Option<Transaction> {
    let pair = format!("{}{}", record.to_asset, record.from_asset);
    if !tracked.contains(&pair) {
        return None;
    }
    Some(Transaction {
        symbol: pair,
        is_buyer: true,
        qty: parse_decimal(&record.to_amount),
        price: parse_decimal(&record.ratio),
        quote_qty: parse_decimal(&record.from_amount),
        commission: 0.0,
        commission_asset: Some(record.from_asset.clone()),
        time: record.create_time,
        from_deposit: false,
        is_convert: true,
    })
}
