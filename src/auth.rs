//! Binance API authentication
//!
//! Signed endpoints take a `timestamp` parameter and a `signature` equal to
//! the HMAC-SHA256 (hex) of the full query string, keyed by the API secret.
//! The API key travels in the `X-MBX-APIKEY` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::form_urlencoded;
use worker::Env;

use crate::error::{PortfolioError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the API key on every signed request
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Binance API authentication handler
pub struct BinanceAuth {
    api_key: String,
    api_secret: String,
}

impl BinanceAuth {
    /// Create auth handler from environment secrets
    pub fn from_env(env: &Env) -> Result<Self> {
        let api_key = env
            .secret("BINANCE_API_KEY")
            .map_err(|_| PortfolioError::Auth("BINANCE_API_KEY secret not found".into()))?
            .to_string();

        let api_secret = env
            .secret("BINANCE_API_SECRET")
            .map_err(|_| PortfolioError::Auth("BINANCE_API_SECRET secret not found".into()))?
            .to_string();

        Self::new(api_key, api_secret)
    }

    /// Create new auth handler
    pub fn new(api_key: String, api_secret: String) -> Result<Self> {
        if api_key.trim().is_empty() || api_secret.trim().is_empty() {
            return Err(PortfolioError::Auth("API key and secret must not be empty".into()));
        }
        Ok(Self { api_key, api_secret })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Hex HMAC-SHA256 of `payload`
    pub fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| PortfolioError::Auth(format!("Invalid API secret: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build the signed query string: params, then `timestamp`, then `signature`
    pub fn signed_query(&self, params: &[(&str, String)], timestamp_ms: i64) -> Result<String> {
        let query = encode_query(params, Some(timestamp_ms));
        let signature = self.sign(&query)?;
        Ok(format!("{query}&signature={signature}"))
    }
}

/// URL-encode parameters in order, appending `timestamp` when given
pub fn encode_query(params: &[(&str, String)], timestamp_ms: Option<i64>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    if let Some(ts) = timestamp_ms {
        serializer.append_pair("timestamp", &ts.to_string());
    }
    serializer.finish()
}
