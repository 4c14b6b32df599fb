//! Binance Spot REST API client
//!
//! Implements the read-only endpoints needed to rebuild a portfolio:
//! - Exchange info and account balances
//! - Crypto and fiat deposits, withdrawals
//! - Trade and convert history
//! - Market data (ticker prices, klines)
//!
//! [`ExchangeApi`] is the seam the account fetcher depends on.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::auth::{API_KEY_HEADER, BinanceAuth, encode_query};
use crate::error::{PortfolioError, Result};

/// Binance API client
pub struct BinanceClient {
    auth: BinanceAuth,
    base_url: String,
    http: reqwest::Client,
}

/// Exchange info (only the symbol list is used)
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
}

/// Account response from Binance
#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub balances: Vec<AssetBalance>,
}

/// Balance of a single asset
#[derive(Debug, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub free: String,
    #[allow(dead_code)] // Present in the schema, only free balances count
    pub locked: String,
}

/// Crypto deposit record
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRecord {
    pub coin: String,
    pub amount: String,
    /// 1 = success
    pub status: i64,
    pub insert_time: i64,
}

/// Fiat order page (`/sapi/v1/fiat/orders`)
#[derive(Debug, Deserialize)]
pub struct FiatOrders {
    #[serde(default)]
    pub data: Vec<FiatOrder>,
}

/// One fiat deposit order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatOrder {
    pub fiat_currency: String,
    pub amount: String,
    /// e.g. "Successful", "Failed"
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
    pub create_time: i64,
}

/// Crypto withdrawal record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRecord {
    pub coin: String,
    pub amount: String,
    /// 6 = completed
    pub status: i64,
    /// UTC, formatted `YYYY-MM-DD HH:MM:SS`
    pub apply_time: String,
}

/// Executed trade on a symbol
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyTrade {
    pub symbol: String,
    pub price: String,
    pub qty: String,
    pub quote_qty: String,
    pub commission: String,
    pub commission_asset: String,
    pub time: i64,
    pub is_buyer: bool,
}

/// Convert trade flow page
#[derive(Debug, Deserialize)]
pub struct ConvertTradeFlow {
    #[serde(default)]
    pub list: Vec<ConvertRecord>,
}

/// One executed conversion
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRecord {
    pub from_asset: String,
    pub from_amount: String,
    pub to_asset: String,
    pub to_amount: String,
    /// toAmount / fromAmount as quoted by Binance
    pub ratio: String,
    pub create_time: i64,
}

/// Latest price for a symbol
#[derive(Debug, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}

/// Binance encodes decimals as strings; unparseable values count as zero
pub fn parse_decimal(value: &str) -> f64 {
    value.parse().unwrap_or(0.0)
}

/// Read-only account and market operations used during a sync
#[async_trait(?Send)]
pub trait ExchangeApi {
    /// All symbols listed on the exchange
    async fn get_exchange_info(&self) -> Result<ExchangeInfo>;

    /// Account balances
    async fn get_account(&self) -> Result<AccountInfo>;

    /// Crypto deposit history
    async fn get_deposit_history(&self) -> Result<Vec<DepositRecord>>;

    /// Fiat deposit orders
    async fn get_fiat_deposits(&self) -> Result<Vec<FiatOrder>>;

    /// Crypto withdrawal history
    async fn get_withdraw_history(&self) -> Result<Vec<WithdrawRecord>>;

    /// The account's trades on one symbol
    async fn get_my_trades(&self, symbol: &str) -> Result<Vec<MyTrade>>;

    /// Convert trades between two timestamps (ms)
    async fn get_convert_trade_flow(&self, start_ms: i64, end_ms: i64) -> Result<ConvertTradeFlow>;

    /// Current price for a symbol
    async fn get_price(&self, symbol: &str) -> Result<f64>;

    /// Close price of the 1-minute kline starting at `timestamp_ms`
    async fn get_close_price_at(&self, symbol: &str, timestamp_ms: i64) -> Result<f64>;
}

impl BinanceClient {
    /// Create new client with authentication
    pub fn new(auth: BinanceAuth, base_url: impl Into<String>) -> Self {
        Self {
            auth,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Perform unsigned GET request
    async fn public_get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let query = encode_query(params, None);
        let url = if query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query}", self.base_url)
        };

        let response = self.http.get(&url).send().await?;
        Self::handle_response(response).await
    }

    /// Perform GET request signed with the account secret
    async fn signed_get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let query = self.auth.signed_query(params, timestamp)?;
        let url = format!("{}{path}?{query}", self.base_url);

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, self.auth.api_key())
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response, checking for errors
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            return Err(PortfolioError::RateLimit(retry_after));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(PortfolioError::BinanceApi(format!("HTTP {status}: {error_text}")));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(PortfolioError::from)
    }
}

#[async_trait(?Send)]
impl ExchangeApi for BinanceClient {
    async fn get_exchange_info(&self) -> Result<ExchangeInfo> {
        self.public_get("/api/v3/exchangeInfo", &[]).await
    }

    async fn get_account(&self) -> Result<AccountInfo> {
        self.signed_get("/api/v3/account", &[]).await
    }

    async fn get_deposit_history(&self) -> Result<Vec<DepositRecord>> {
        self.signed_get("/sapi/v1/capital/deposit/hisrec", &[]).await
    }

    async fn get_fiat_deposits(&self) -> Result<Vec<FiatOrder>> {
        let orders: FiatOrders = self
            .signed_get("/sapi/v1/fiat/orders", &[("transactionType", "0".to_string())])
            .await?;
        Ok(orders.data)
    }

    async fn get_withdraw_history(&self) -> Result<Vec<WithdrawRecord>> {
        self.signed_get("/sapi/v1/capital/withdraw/history", &[]).await
    }

    async fn get_my_trades(&self, symbol: &str) -> Result<Vec<MyTrade>> {
        self.signed_get(
            "/api/v3/myTrades",
            &[("symbol", symbol.to_string()), ("limit", "1000".to_string())],
        )
        .await
    }

    async fn get_convert_trade_flow(&self, start_ms: i64, end_ms: i64) -> Result<ConvertTradeFlow> {
        self.signed_get(
            "/sapi/v1/convert/tradeFlow",
            &[
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", "1000".to_string()),
            ],
        )
        .await
    }

    async fn get_price(&self, symbol: &str) -> Result<f64> {
        let ticker: TickerPrice = self
            .public_get("/api/v3/ticker/price", &[("symbol", symbol.to_string())])
            .await?;
        ticker
            .price
            .parse()
            .map_err(|_| PortfolioError::BinanceApi(format!("Invalid price for {}", ticker.symbol)))
    }

    async fn get_close_price_at(&self, symbol: &str, timestamp_ms: i64) -> Result<f64> {
        let klines: Vec<Vec<serde_json::Value>> = self
            .public_get(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", "1m".to_string()),
                    ("startTime", timestamp_ms.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        kline_close(&klines).ok_or_else(|| {
            PortfolioError::BinanceApi(format!("No kline data for {symbol} at {timestamp_ms}"))
        })
    }
}

/// Close price (index 4) of the first kline
fn kline_close(klines: &[Vec<serde_json::Value>]) -> Option<f64> {
    let close = klines.first()?.get(4)?;
    match close {
        serde_json::Value::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kline_close_reads_fifth_column() {
        let klines: Vec<Vec<serde_json::Value>> = serde_json::from_str(
            r#"[[1499040000000,"0.016","0.8","0.015","0.0157",  "148976.1",1499644799999]]"#,
        )
        .unwrap();
        assert_eq!(kline_close(&klines), Some(0.0157));
        assert_eq!(kline_close(&[]), None);
    }

    #[test]
    fn test_deserialize_trade() {
        let trades: Vec<MyTrade> = serde_json::from_str(
            r#"[{"symbol":"BTCUSDC","id":28457,"orderId":100234,"price":"4.00000100","qty":"12.00000000",
                "quoteQty":"48.000012","commission":"10.10000000","commissionAsset":"BNB",
                "time":1499865549590,"isBuyer":true,"isMaker":false,"isBestMatch":true}]"#,
        )
        .unwrap();
        assert_eq!(trades[0].symbol, "BTCUSDC");
        assert!(trades[0].is_buyer);
        assert!((parse_decimal(&trades[0].quote_qty) - 48.000_012).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_convert_flow_without_list() {
        let flow: ConvertTradeFlow = serde_json::from_str(r#"{"moreData":false}"#).unwrap();
        assert!(flow.list.is_empty());
    }

    #[test]
    fn test_deserialize_fiat_orders_and_withdrawals() {
        let orders: FiatOrders = serde_json::from_str(
            r#"{"code":"000000","message":"success","data":[{"orderNo":"7d76d611","fiatCurrency":"EUR",
                "indicatedAmount":"10.00","amount":"10.00","totalFee":"0.00","method":"card",
                "status":"Successful","createTime":1626144956000,"updateTime":1626400907000}],
                "total":1,"success":true}"#,
        )
        .unwrap();
        assert_eq!(orders.data[0].fiat_currency, "EUR");
        assert_eq!(orders.data[0].method.as_deref(), Some("card"));

        let withdrawals: Vec<WithdrawRecord> = serde_json::from_str(
            r#"[{"id":"b6ae22b3","amount":"8.91000000","transactionFee":"0.004","coin":"USDT",
                "status":6,"address":"0x94df","txId":"0xb5ef","applyTime":"2019-10-12 11:12:02",
                "network":"ETH","transferType":0}]"#,
        )
        .unwrap();
        assert_eq!(withdrawals[0].status, 6);
        assert_eq!(withdrawals[0].apply_time, "2019-10-12 11:12:02");
    }

    #[test]
    fn test_parse_decimal_fallback() {
        assert_eq!(parse_decimal("1.5"), 1.5);
        assert_eq!(parse_decimal(""), 0.0);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let auth = BinanceAuth::new("k".into(), "s".into()).unwrap();
        let client = BinanceClient::new(auth, "https://api.binance.com/");
        assert_eq!(client.base_url, "https://api.binance.com");
    }
}
