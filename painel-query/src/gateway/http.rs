//! reqwest-backed gateway.
//!
//! Market data goes through a plain client. Session endpoints use a client
//! with a cookie store so the session cookie set by the auth service is sent
//! back on later calls.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::debug;

use painel_common::config::GatewayConfig;
use painel_common::logging::generate_trace_id;

use super::types::*;
use super::{AuthEffect, AuthGateway, GatewayError, GatewayResult, MarketGateway};

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the per-request trace id
pub const TRACE_HEADER: &str = "X-Trace-Id";

const CATEGORIES_ENDPOINT: &str = "/categorias";
const MARKET_OVERVIEW_ENDPOINT: &str = "/market-overview";
const MULTI_INFO_ENDPOINT: &str = "/multi-info";
const MULTI_HISTORY_ENDPOINT: &str = "/multi-history";
const PERIOD_PERFORMANCE_ENDPOINT: &str = "/period-performance";
const SEARCH_ENDPOINT: &str = "/search";
const LOOKUP_ENDPOINT: &str = "/lookup";
const HEALTH_ENDPOINT: &str = "/health";

const GOOGLE_AUTH_ENDPOINT: &str = "/google/auth-url";
const PROFILE_ENDPOINT: &str = "/profile";
const LOGOUT_ENDPOINT: &str = "/logout";
const REGISTER_ENDPOINT: &str = "/register";
const LOGIN_ENDPOINT: &str = "/login";

// ============================================================================
// HTTP Gateway
// ============================================================================

/// Gateway over the market-data, session and account HTTP services.
pub struct HttpGateway {
    market_data_url: String,
    auth_url: String,
    account_url: String,
    /// Client for market data
    client: reqwest::Client,
    /// Credentialed client for session and account calls
    auth_client: reqwest::Client,
}

impl HttpGateway {
    /// Build a gateway from the endpoint configuration.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build client: {}", e)))?;

        let auth_client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build auth client: {}", e)))?;

        Ok(Self {
            market_data_url: trim_base(&config.market_data_url),
            auth_url: trim_base(&config.auth_url),
            account_url: trim_base(&config.account_url),
            client,
            auth_client,
        })
    }

    pub fn market_data_url(&self) -> &str {
        &self.market_data_url
    }

    fn market(&self, path: &str) -> String {
        format!("{}{}", self.market_data_url, path)
    }

    fn ticker(&self, symbol: &str, resource: &str) -> String {
        format!("{}/{}/{}", self.market_data_url, symbol, resource)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> GatewayResult<T> {
        let request = self.client.get(&url).query(query);
        let body = execute(request, "GET", &url).await?;
        decode(&body)
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Send a request and return the body of a successful response.
async fn execute(
    request: reqwest::RequestBuilder,
    method: &str,
    url: &str,
) -> GatewayResult<Vec<u8>> {
    let trace_id = generate_trace_id();
    let started = Instant::now();

    let result = async {
        let response = request.header(TRACE_HEADER, &trace_id).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                detail: extract_detail(&body),
            });
        }
        Ok::<_, GatewayError>(body.to_vec())
    }
    .await;

    debug!(
        method,
        url,
        trace_id = %trace_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "Gateway request"
    );

    result
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> GatewayResult<T> {
    serde_json::from_slice(body).map_err(GatewayError::from)
}

/// Pull the `detail` field out of an error body.
///
/// FastAPI-style backends send either a string or a list of validation
/// errors; the latter is kept as compact JSON.
fn extract_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl MarketGateway for HttpGateway {
    async fn list_categories(&self) -> GatewayResult<CategoriesResponse> {
        self.get_json(self.market(CATEGORIES_ENDPOINT), &[]).await
    }

    async fn category_screening(
        &self,
        category: Category,
        options: &ScreeningOptions,
    ) -> GatewayResult<CategoryScreeningResponse> {
        let url = format!("{}{}/{}", self.market_data_url, CATEGORIES_ENDPOINT, category);
        self.get_json(url, &options.query_pairs()).await
    }

    async fn market_overview(&self, category: &str) -> GatewayResult<MarketOverviewResponse> {
        let url = format!("{}{}/{}", self.market_data_url, MARKET_OVERVIEW_ENDPOINT, category);
        self.get_json(url, &[]).await
    }

    async fn ticker_info(&self, symbol: &str) -> GatewayResult<TickerInfo> {
        self.get_json(self.ticker(symbol, "info"), &[]).await
    }

    async fn ticker_full_data(&self, symbol: &str) -> GatewayResult<serde_json::Value> {
        self.get_json(self.ticker(symbol, "fulldata"), &[]).await
    }

    async fn multi_ticker_info(&self, symbols: &str) -> GatewayResult<MultiTickerResponse> {
        self.get_json(
            self.market(MULTI_INFO_ENDPOINT),
            &[("symbols", symbols.to_string())],
        )
        .await
    }

    async fn history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> GatewayResult<HistoryResponse> {
        self.get_json(
            self.ticker(symbol, "history"),
            &[
                ("period", period.as_str().to_string()),
                ("interval", interval.as_str().to_string()),
            ],
        )
        .await
    }

    async fn multi_history(
        &self,
        symbols: &str,
        period: Period,
        interval: Interval,
    ) -> GatewayResult<serde_json::Value> {
        self.get_json(
            self.market(MULTI_HISTORY_ENDPOINT),
            &[
                ("symbols", symbols.to_string()),
                ("period", period.as_str().to_string()),
                ("interval", interval.as_str().to_string()),
            ],
        )
        .await
    }

    async fn news(&self, symbol: &str, num: u32) -> GatewayResult<Vec<NewsItem>> {
        self.get_json(self.ticker(symbol, "news"), &[("num", num.to_string())])
            .await
    }

    async fn dividends(&self, symbol: &str) -> GatewayResult<DividendInfo> {
        self.get_json(self.ticker(symbol, "dividends"), &[]).await
    }

    async fn recommendations(&self, symbol: &str) -> GatewayResult<RecommendationInfo> {
        self.get_json(self.ticker(symbol, "recommendations"), &[]).await
    }

    async fn calendar(&self, symbol: &str) -> GatewayResult<CalendarInfo> {
        self.get_json(self.ticker(symbol, "calendar"), &[]).await
    }

    async fn period_performance(&self, symbols: &str) -> GatewayResult<PeriodPerformanceResponse> {
        self.get_json(
            self.market(PERIOD_PERFORMANCE_ENDPOINT),
            &[("symbols", symbols.to_string())],
        )
        .await
    }

    async fn search(&self, query: &str, limit: u32) -> GatewayResult<SearchResponse> {
        self.get_json(
            self.market(SEARCH_ENDPOINT),
            &[("query", query.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn lookup(&self, query: &str, kind: &str, count: u32) -> GatewayResult<LookupResponse> {
        self.get_json(
            self.market(LOOKUP_ENDPOINT),
            &[
                ("query", query.to_string()),
                ("type", kind.to_string()),
                ("count", count.to_string()),
            ],
        )
        .await
    }

    async fn health(&self) -> GatewayResult<HealthStatus> {
        self.get_json(self.market(HEALTH_ENDPOINT), &[]).await
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn google_auth_url(&self) -> GatewayResult<AuthEffect> {
        let url = format!("{}{}", self.auth_url, GOOGLE_AUTH_ENDPOINT);
        let body = execute(self.auth_client.get(&url), "GET", &url).await?;
        let auth: AuthUrl = decode(&body)?;
        if auth.auth_url.is_empty() {
            return Err(GatewayError::Decode("empty auth_url".into()));
        }
        Ok(AuthEffect::Redirect(auth.auth_url))
    }

    async fn profile(&self) -> GatewayResult<UserProfile> {
        let url = format!("{}{}", self.auth_url, PROFILE_ENDPOINT);
        let body = execute(self.auth_client.get(&url), "GET", &url).await?;
        decode(&body)
    }

    async fn logout(&self) -> GatewayResult<()> {
        let url = format!("{}{}", self.auth_url, LOGOUT_ENDPOINT);
        execute(self.auth_client.post(&url), "POST", &url).await?;
        Ok(())
    }

    async fn register(&self, payload: &RegisterPayload) -> GatewayResult<UserProfile> {
        let url = format!("{}{}", self.account_url, REGISTER_ENDPOINT);
        let body = execute(self.auth_client.post(&url).json(payload), "POST", &url).await?;
        decode(&body)
    }

    async fn login(&self, payload: &LoginPayload) -> GatewayResult<LoginResponse> {
        let url = format!("{}{}", self.account_url, LOGIN_ENDPOINT);
        let body = execute(self.auth_client.post(&url).json(payload), "POST", &url).await?;
        decode(&body)
    }
}
