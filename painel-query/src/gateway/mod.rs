//! Remote data gateway.
//!
//! One async method per data category and parameter shape. Each call performs
//! exactly one HTTP request and yields a typed payload or a [`GatewayError`].
//! Caching and retries belong to the query layer, never to the gateway.

pub mod http;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpGateway;
pub use types::*;

// ============================================================================
// Gateway Error
// ============================================================================

/// Coarse classification of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Http4xx,
    Http5xx,
    Decode,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Http4xx => "http_4xx",
            Self::Http5xx => "http_5xx",
            Self::Decode => "decode",
        }
    }
}

/// Errors returned by a gateway call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// Network unreachable, connection reset or timeout
    #[error("Network error: {0}")]
    Transport(String),

    /// Non-success HTTP status; `detail` is the backend's `detail` field
    #[error("HTTP {status}{}", detail_suffix(.detail))]
    Http { status: u16, detail: Option<String> },

    /// Body could not be decoded into the expected payload
    #[error("Decode error: {0}")]
    Decode(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Network,
            Self::Http { status, .. } if *status >= 500 => ErrorKind::Http5xx,
            Self::Http { .. } => ErrorKind::Http4xx,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }

    /// True when the backend produced a response (as opposed to a transport failure).
    pub fn has_response(&self) -> bool {
        matches!(self, Self::Http { .. })
    }

    /// Backend `detail` message, when the error carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Http { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Side effect of a mutation that the caller must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEffect {
    /// Navigate the user agent to this URL
    Redirect(String),
}

// ============================================================================
// Gateway Traits
// ============================================================================

/// Read-only market data endpoints.
#[async_trait]
pub trait MarketGateway: Send + Sync {
    /// Available screening categories and their descriptions
    async fn list_categories(&self) -> GatewayResult<CategoriesResponse>;

    /// Screening results for one category
    async fn category_screening(
        &self,
        category: Category,
        options: &ScreeningOptions,
    ) -> GatewayResult<CategoryScreeningResponse>;

    /// Overview for one region (all, brasil, eua, europa, asia, moedas)
    async fn market_overview(&self, category: &str) -> GatewayResult<MarketOverviewResponse>;

    async fn ticker_info(&self, symbol: &str) -> GatewayResult<TickerInfo>;

    /// Unabridged upstream payload for one symbol; its shape varies by asset type
    async fn ticker_full_data(&self, symbol: &str) -> GatewayResult<serde_json::Value>;

    /// `symbols` is a comma-separated list
    async fn multi_ticker_info(&self, symbols: &str) -> GatewayResult<MultiTickerResponse>;

    async fn history(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> GatewayResult<HistoryResponse>;

    /// Histories for several tickers; the backend shape varies, so it stays untyped
    async fn multi_history(
        &self,
        symbols: &str,
        period: Period,
        interval: Interval,
    ) -> GatewayResult<serde_json::Value>;

    async fn news(&self, symbol: &str, num: u32) -> GatewayResult<Vec<NewsItem>>;

    async fn dividends(&self, symbol: &str) -> GatewayResult<DividendInfo>;

    async fn recommendations(&self, symbol: &str) -> GatewayResult<RecommendationInfo>;

    async fn calendar(&self, symbol: &str) -> GatewayResult<CalendarInfo>;

    async fn period_performance(&self, symbols: &str) -> GatewayResult<PeriodPerformanceResponse>;

    async fn search(&self, query: &str, limit: u32) -> GatewayResult<SearchResponse>;

    async fn lookup(&self, query: &str, kind: &str, count: u32) -> GatewayResult<LookupResponse>;

    async fn health(&self) -> GatewayResult<HealthStatus>;
}

/// Credentialed account and session endpoints.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// URL of the Google consent screen
    async fn google_auth_url(&self) -> GatewayResult<AuthEffect>;

    async fn profile(&self) -> GatewayResult<UserProfile>;

    async fn logout(&self) -> GatewayResult<()>;

    async fn register(&self, payload: &RegisterPayload) -> GatewayResult<UserProfile>;

    async fn login(&self, payload: &LoginPayload) -> GatewayResult<LoginResponse>;
}
