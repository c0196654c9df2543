//! Crypto analysis handlers

use axum::{extract::State, Json};
use std::time::Instant;

use crate::market::CoinMarket;
use crate::models::{CoinsRequest, CryptoAnalysisResponse, CryptoComparisonResponse};
use crate::AppState;
use askforge_common::errors::{AppError, Result};

/// Analyze each requested coin
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<CoinsRequest>,
) -> Result<Json<CryptoAnalysisResponse>> {
    let start = Instant::now();
    let markets = fetch_markets(&state, &request).await?;

    let response = state.analyst.analyze(&markets).await?;

    tracing::info!(
        coins = markets.len(),
        analyses = response.analysis.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Analysis completed"
    );

    Ok(Json(response))
}

/// Pick the coin with the strongest outlook
pub async fn compare(
    State(state): State<AppState>,
    Json(request): Json<CoinsRequest>,
) -> Result<Json<CryptoComparisonResponse>> {
    let start = Instant::now();
    let markets = fetch_markets(&state, &request).await?;

    let response = state.analyst.compare(&markets).await?;

    tracing::info!(
        coins = markets.len(),
        winner = %response.comparison.winner,
        latency_ms = start.elapsed().as_millis() as u64,
        "Comparison completed"
    );

    Ok(Json(response))
}

async fn fetch_markets(state: &AppState, request: &CoinsRequest) -> Result<Vec<CoinMarket>> {
    let coin_ids = request.coin_ids()?;
    let markets = state.market.fetch_markets(&coin_ids).await?;

    if markets.is_empty() {
        return Err(AppError::NotFound {
            resource_type: "market data".to_string(),
            id: coin_ids.join(","),
        });
    }

    Ok(markets)
}

#[cfg(test)]
mod tests {
    use crate::analyst::Analyst;
    use crate::market::{CoinMarket, MarketDataSource};
    use crate::middleware::rate_limit::GlobalRateLimiter;
    use crate::{create_router, AppState};
    use askforge_common::config::AppConfig;
    use askforge_common::errors::{AppError, Result};
    use askforge_common::llm::{ChatMessage, ChatModel};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    struct FakeMarket {
        markets: Vec<CoinMarket>,
        fail: bool,
        requested: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl MarketDataSource for FakeMarket {
        async fn fetch_markets(&self, coin_ids: &[String]) -> Result<Vec<CoinMarket>> {
            self.requested.lock().unwrap().push(coin_ids.to_vec());
            if self.fail {
                return Err(AppError::MarketData {
                    message: "connection refused".to_string(),
                });
            }
            Ok(self.markets.clone())
        }
    }

    struct FakeAnalyst {
        reply: String,
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatModel for FakeAnalyst {
        async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "fake-analyst"
        }
    }

    struct Harness {
        app: Router,
        market: Arc<FakeMarket>,
        llm: Arc<FakeAnalyst>,
    }

    fn bitcoin() -> CoinMarket {
        CoinMarket {
            name: "Bitcoin".to_string(),
            symbol: "btc".to_string(),
            current_price: Some(67000.0),
            market_cap: Some(1.3e12),
            total_volume: Some(2.0e10),
            price_change_percentage_24h: Some(2.5),
        }
    }

    fn harness(markets: Vec<CoinMarket>, market_fails: bool, reply: &str) -> Harness {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;

        let market = Arc::new(FakeMarket {
            markets,
            fail: market_fails,
            requested: Mutex::new(Vec::new()),
        });
        let llm = Arc::new(FakeAnalyst {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        });

        let state = AppState {
            config: Arc::new(config),
            market: market.clone(),
            analyst: Arc::new(Analyst::new(llm.clone())),
            metrics: PrometheusBuilder::new().build_recorder().handle(),
        };
        let limiter = GlobalRateLimiter::new(&state.config.rate_limit);

        Harness {
            app: create_router(state, limiter),
            market,
            llm,
        }
    }

    async fn post(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    const ANALYSIS: &str = r#"{"analysis":[{"coin":"Bitcoin","summary":"Momentum is positive.",
        "sentiment":"bullish","key_factors":[{"factor":"24h change","impact":"Up 2.5%"}],
        "insights":[{"prediction":"Tests resistance","confidence":70}]}]}"#;

    #[tokio::test]
    async fn test_analyze_success() {
        let h = harness(vec![bitcoin()], false, ANALYSIS);
        let (status, body) = post(h.app, "/crypto/analyze", r#"{"coins":["bitcoin"]}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"][0]["sentiment"], "bullish");
        assert_eq!(body["analysis"][0]["insights"][0]["confidence"], 70);
        assert_eq!(h.market.requested.lock().unwrap()[0], vec!["bitcoin".to_string()]);

        let prompts = h.llm.prompts.lock().unwrap();
        assert!(prompts[0][0].content.contains("\"analysis\""));
        assert!(prompts[0][1].content.starts_with(" Here is the market data - "));
        assert!(prompts[0][1].content.contains("\"name\": \"Bitcoin\""));
    }

    #[tokio::test]
    async fn test_compare_success() {
        let reply = r#"{"comparison":{"winner":"Bitcoin","summary":"Strongest volume.",
            "reasons":["Liquidity","Momentum","Dominance"]}}"#;
        let h = harness(vec![bitcoin()], false, reply);
        let (status, body) =
            post(h.app, "/crypto/compare", r#"{"coins":["bitcoin","ethereum"]}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["comparison"]["winner"], "Bitcoin");
        assert_eq!(body["comparison"]["reasons"].as_array().unwrap().len(), 3);
        assert!(h.llm.prompts.lock().unwrap()[0][0].content.contains("\"comparison\""));
    }

    #[tokio::test]
    async fn test_empty_coins_rejected() {
        let h = harness(vec![bitcoin()], false, ANALYSIS);
        let (status, body) = post(h.app, "/crypto/analyze", r#"{"coins":[]}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(h.market.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_coins_not_found() {
        let h = harness(Vec::new(), false, ANALYSIS);
        let (status, _) = post(h.app, "/crypto/analyze", r#"{"coins":["notacoin"]}"#).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(h.llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_market_failure_is_bad_gateway() {
        let h = harness(Vec::new(), true, ANALYSIS);
        let (status, _) = post(h.app, "/crypto/compare", r#"{"coins":["bitcoin"]}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_invalid_llm_json() {
        let h = harness(vec![bitcoin()], false, "Sure! Here is the analysis: ...");
        let (status, body) = post(h.app, "/crypto/analyze", r#"{"coins":["bitcoin"]}"#).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["message"], "LLM did not return a valid JSON");
    }

    #[tokio::test]
    async fn test_llm_schema_violation() {
        let h = harness(vec![bitcoin()], false, r#"{"analysis":[{"coin":"Bitcoin"}]}"#);
        let (status, body) = post(h.app, "/crypto/analyze", r#"{"coins":["bitcoin"]}"#).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("LLM JSON Validation Failed - "));
    }
}
