use crate::{errors::FetchError, models::TokenQuote};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: u64 = 2;
const REQUEST_TIMEOUT: u64 = 10;

#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn get_quote(&self, token_id: &str) -> Result<TokenQuote, FetchError>;

    async fn get_price(&self, token_id: &str) -> Result<f64, FetchError> {
        Ok(self.get_quote(token_id).await?.price_usd)
    }
}

#[derive(Deserialize)]
struct TokensResponse {
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    chain_id: String,
    dex_id: String,
    #[serde(default)]
    url: Option<String>,
    base_token: PairToken,
    quote_token: PairToken,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    liquidity: Option<Liquidity>,
    #[serde(default)]
    fdv: Option<f64>,
    #[serde(default)]
    volume: Option<Volume>,
    #[serde(default)]
    pair_created_at: Option<i64>,
}

#[derive(Deserialize)]
struct PairToken {
    symbol: String,
}

#[derive(Deserialize)]
struct Liquidity {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Deserialize)]
struct Volume {
    #[serde(default)]
    h24: Option<f64>,
}

/// Cliente de la API pública de DexScreener.
pub struct DexScreenerClient {
    client: Client,
    base_url: String,
    retry_delay: Duration,
}

impl DexScreenerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_delay: Duration::from_secs(RETRY_DELAY),
        }
    }

    async fn fetch_pairs(&self, token_id: &str) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base_url, token_id);
        debug!("Consultando DexScreener: {}", url);

        let response = self.client
            .get(&url)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status: status.as_u16(), body });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PriceProvider for DexScreenerClient {
    async fn get_quote(&self, token_id: &str) -> Result<TokenQuote, FetchError> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                info!("Reintento {} de obtener precio para {}", attempt + 1, token_id);
                sleep(self.retry_delay).await;
            }

            match self.fetch_pairs(token_id).await {
                Ok(body) => {
                    // Un token sin pares no se arregla reintentando
                    let quote = parse_top_pair(token_id, &body)?;
                    info!("Precio obtenido para {} ({}): ${}", quote.symbol, token_id, quote.price_usd);
                    return Ok(quote);
                }
                Err(e) => {
                    error!("Error al obtener precio para {}: {}", token_id, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::NoPairs(token_id.to_string())))
    }
}

/// Elige el par con mayor liquidez en USD de la respuesta de `/tokens/{address}`.
pub fn parse_top_pair(token_id: &str, body: &str) -> Result<TokenQuote, FetchError> {
    let response: TokensResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Decode(e.to_string()))?;

    let pair = response.pairs
        .unwrap_or_default()
        .into_iter()
        .filter(|p| p.price_usd.is_some())
        .max_by(|a, b| liquidity_of(a).total_cmp(&liquidity_of(b)))
        .ok_or_else(|| FetchError::NoPairs(token_id.to_string()))?;

    let raw_price = pair.price_usd.clone().unwrap_or_default();
    let price_usd: f64 = raw_price.parse()
        .ok()
        .filter(|p: &f64| p.is_finite() && *p > 0.0)
        .ok_or_else(|| FetchError::InvalidPrice {
            token: token_id.to_string(),
            raw: raw_price.clone(),
        })?;

    Ok(TokenQuote {
        token_id: token_id.to_string(),
        symbol: pair.base_token.symbol,
        quote_symbol: pair.quote_token.symbol,
        price_usd,
        liquidity_usd: pair.liquidity.and_then(|l| l.usd),
        fdv: pair.fdv,
        volume_24h: pair.volume.and_then(|v| v.h24),
        chain_id: pair.chain_id,
        dex_id: pair.dex_id,
        url: pair.url,
        pair_created_at: pair.pair_created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
    })
}

fn liquidity_of(pair: &Pair) -> f64 {
    pair.liquidity
        .as_ref()
        .and_then(|l| l.usd)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CannedServer;

    const BODY: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "ethereum",
                "dexId": "uniswap",
                "url": "https://dexscreener.com/ethereum/0xpairsmall",
                "pairAddress": "0xpairsmall",
                "baseToken": {"address": "0xabc", "name": "Pepe", "symbol": "PEPE"},
                "quoteToken": {"address": "0xc02", "name": "Wrapped Ether", "symbol": "WETH"},
                "priceUsd": "0.00001100",
                "liquidity": {"usd": 1500.5, "base": 1, "quote": 2}
            },
            {
                "chainId": "ethereum",
                "dexId": "uniswap",
                "url": "https://dexscreener.com/ethereum/0xpairbig",
                "pairAddress": "0xpairbig",
                "baseToken": {"address": "0xabc", "name": "Pepe", "symbol": "PEPE"},
                "quoteToken": {"address": "0xa0b", "name": "USD Coin", "symbol": "USDC"},
                "priceUsd": "0.00001234",
                "liquidity": {"usd": 250000.0},
                "fdv": 5200000,
                "volume": {"h24": 81234.5, "h1": 120.0},
                "pairCreatedAt": 1700000000000
            },
            {
                "chainId": "ethereum",
                "dexId": "sushiswap",
                "baseToken": {"address": "0xabc", "name": "Pepe", "symbol": "PEPE"},
                "quoteToken": {"address": "0xdac", "name": "Tether", "symbol": "USDT"},
                "priceUsd": "0.00001300"
            }
        ]
    }"#;

    #[test]
    fn test_picks_pair_with_most_liquidity() {
        let quote = parse_top_pair("0xabc", BODY).unwrap();
        assert_eq!(quote.symbol, "PEPE");
        assert_eq!(quote.quote_symbol, "USDC");
        assert_eq!(quote.price_usd, 0.00001234);
        assert_eq!(quote.liquidity_usd, Some(250000.0));
        assert_eq!(quote.fdv, Some(5200000.0));
        assert_eq!(quote.volume_24h, Some(81234.5));
        assert_eq!(quote.url.as_deref(), Some("https://dexscreener.com/ethereum/0xpairbig"));
        assert_eq!(quote.pair_created_at.map(|t| t.timestamp()), Some(1700000000));
    }

    #[test]
    fn test_no_pairs() {
        assert!(matches!(
            parse_top_pair("0xabc", r#"{"schemaVersion":"1.0.0","pairs":null}"#),
            Err(FetchError::NoPairs(_))
        ));
        assert!(matches!(
            parse_top_pair("0xabc", r#"{"pairs":[]}"#),
            Err(FetchError::NoPairs(_))
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(parse_top_pair("0xabc", "<html>"), Err(FetchError::Decode(_))));
    }

    async fn client_for(responses: Vec<(u16, String)>) -> (DexScreenerClient, CannedServer) {
        let server = CannedServer::start(responses).await;
        let mut client = DexScreenerClient::new(format!("{}/latest/dex/tokens/", server.base_url));
        client.retry_delay = Duration::from_millis(1);
        (client, server)
    }

    #[tokio::test]
    async fn test_http_error_maps_to_status_after_all_attempts() {
        let (client, server) = client_for(vec![(500, "upstream down".to_string())]).await;

        match client.get_quote("0xabc").await {
            Err(FetchError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream down");
            }
            other => panic!("esperaba FetchError::Status: {:?}", other.map(|q| q.price_usd)),
        }
        assert_eq!(server.hits(), MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn test_retries_after_failure() {
        let (client, server) = client_for(vec![
            (429, "slow down".to_string()),
            (200, BODY.to_string()),
        ])
        .await;

        let quote = client.get_quote("0xabc").await.unwrap();
        assert_eq!(quote.symbol, "PEPE");
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn test_no_pairs_and_bad_body_are_not_retried() {
        let (client, server) = client_for(vec![(200, r#"{"pairs":null}"#.to_string())]).await;
        assert!(matches!(client.get_quote("0xabc").await, Err(FetchError::NoPairs(_))));
        assert_eq!(server.hits(), 1);

        let (client, server) = client_for(vec![(200, "<html>".to_string())]).await;
        assert!(matches!(client.get_quote("0xabc").await, Err(FetchError::Decode(_))));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_get_price_returns_top_pair_price() {
        let (client, _server) = client_for(vec![(200, BODY.to_string())]).await;
        assert_eq!(client.get_price("0xabc").await.unwrap(), 0.00001234);
    }

    #[test]
    fn test_invalid_price() {
        let body = r#"{"pairs":[{"chainId":"bsc","dexId":"pancake",
            "baseToken":{"symbol":"X"},"quoteToken":{"symbol":"WBNB"},"priceUsd":"0"}]}"#;
        assert!(matches!(parse_top_pair("0xabc", body), Err(FetchError::InvalidPrice { .. })));
    }
}
