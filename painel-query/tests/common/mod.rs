//! Shared mock gateways for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use painel_query::gateway::*;

// ============================================================================
// Mock Market Gateway
// ============================================================================

/// Market gateway recording every screening request.
#[derive(Default)]
pub struct MockMarket {
    calls: AtomicU32,
    screenings: Mutex<Vec<(Category, Option<Sector>)>>,
    failing: Mutex<HashSet<Category>>,
    latency: Mutex<Duration>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every screening of `category` fail with a 500.
    pub fn fail_category(self, category: Category) -> Self {
        self.failing.lock().unwrap().insert(category);
        self
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = latency;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn screenings(&self) -> Vec<(Category, Option<Sector>)> {
        self.screenings.lock().unwrap().clone()
    }

    async fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

pub fn row(symbol: &str) -> CategoryItem {
    CategoryItem {
        symbol: Some(symbol.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl MarketGateway for MockMarket {
    async fn list_categories(&self) -> GatewayResult<CategoriesResponse> {
        self.hit().await;
        Ok(CategoriesResponse::default())
    }

    async fn category_screening(
        &self,
        category: Category,
        options: &ScreeningOptions,
    ) -> GatewayResult<CategoryScreeningResponse> {
        self.screenings
            .lock()
            .unwrap()
            .push((category, options.setor));
        self.hit().await;

        if self.failing.lock().unwrap().contains(&category) {
            return Err(GatewayError::Http {
                status: 500,
                detail: Some("screener unavailable".into()),
            });
        }

        let symbol = match options.setor {
            Some(sector) => format!("{}:{}", category.as_str(), sector.as_str()),
            None => category.as_str().to_string(),
        };
        Ok(CategoryScreeningResponse {
            categoria: Some(category.as_str().to_string()),
            resultados: vec![row(&symbol)],
            ..Default::default()
        })
    }

    async fn market_overview(&self, _category: &str) -> GatewayResult<MarketOverviewResponse> {
        self.hit().await;
        Ok(MarketOverviewResponse::default())
    }

    async fn ticker_info(&self, symbol: &str) -> GatewayResult<TickerInfo> {
        self.hit().await;
        Ok(TickerInfo {
            long_name: Some(symbol.to_string()),
            currency: Some("BRL".into()),
            ..Default::default()
        })
    }

    async fn ticker_full_data(&self, symbol: &str) -> GatewayResult<serde_json::Value> {
        self.hit().await;
        Ok(serde_json::json!({ "symbol": symbol }))
    }

    async fn multi_ticker_info(&self, _symbols: &str) -> GatewayResult<MultiTickerResponse> {
        self.hit().await;
        Ok(MultiTickerResponse::default())
    }

    async fn history(
        &self,
        _symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> GatewayResult<HistoryResponse> {
        self.hit().await;
        Ok(HistoryResponse::default())
    }

    async fn multi_history(
        &self,
        _symbols: &str,
        _period: Period,
        _interval: Interval,
    ) -> GatewayResult<serde_json::Value> {
        self.hit().await;
        Ok(serde_json::Value::Null)
    }

    async fn news(&self, _symbol: &str, _num: u32) -> GatewayResult<Vec<NewsItem>> {
        self.hit().await;
        Ok(Vec::new())
    }

    async fn dividends(&self, _symbol: &str) -> GatewayResult<DividendInfo> {
        self.hit().await;
        Ok(DividendInfo::default())
    }

    async fn recommendations(&self, _symbol: &str) -> GatewayResult<RecommendationInfo> {
        self.hit().await;
        Ok(RecommendationInfo::default())
    }

    async fn calendar(&self, _symbol: &str) -> GatewayResult<CalendarInfo> {
        self.hit().await;
        Ok(CalendarInfo::default())
    }

    async fn period_performance(&self, _symbols: &str) -> GatewayResult<PeriodPerformanceResponse> {
        self.hit().await;
        Ok(PeriodPerformanceResponse::default())
    }

    async fn search(&self, _query: &str, _limit: u32) -> GatewayResult<SearchResponse> {
        self.hit().await;
        Ok(SearchResponse::default())
    }

    async fn lookup(&self, _query: &str, _kind: &str, _count: u32) -> GatewayResult<LookupResponse> {
        self.hit().await;
        Ok(LookupResponse::default())
    }

    async fn health(&self) -> GatewayResult<HealthStatus> {
        self.hit().await;
        Ok(HealthStatus {
            status: Some("healthy".into()),
            ..Default::default()
        })
    }
}

// ============================================================================
// Mock Auth Gateway
// ============================================================================

/// Auth gateway with a single account, signed out until login.
#[derive(Default)]
pub struct MockAuth {
    signed_in: AtomicBool,
    reject_login: Option<GatewayError>,
    profile_calls: AtomicU32,
    login_calls: AtomicU32,
    logout_calls: AtomicU32,
}

impl MockAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in() -> Self {
        let auth = Self::default();
        auth.signed_in.store(true, Ordering::SeqCst);
        auth
    }

    pub fn rejecting_login(err: GatewayError) -> Self {
        Self {
            reject_login: Some(err),
            ..Self::default()
        }
    }

    pub fn profile_calls(&self) -> u32 {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> u32 {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> u32 {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

pub fn maria() -> UserProfile {
    UserProfile {
        id: Some(UserId::Number(7)),
        nome_completo: Some("Maria Souza".into()),
        email: Some("maria@example.com".into()),
        ..Default::default()
    }
}

#[async_trait]
impl AuthGateway for MockAuth {
    async fn google_auth_url(&self) -> GatewayResult<AuthEffect> {
        Ok(AuthEffect::Redirect("https://accounts.example.com/o/oauth2".into()))
    }

    async fn profile(&self) -> GatewayResult<UserProfile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if self.signed_in.load(Ordering::SeqCst) {
            Ok(maria())
        } else {
            Err(GatewayError::Http {
                status: 401,
                detail: Some("Not authenticated".into()),
            })
        }
    }

    async fn logout(&self) -> GatewayResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.signed_in.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn register(&self, payload: &RegisterPayload) -> GatewayResult<UserProfile> {
        Ok(UserProfile {
            nome_completo: Some(payload.nome_completo.clone()),
            email: Some(payload.email.clone()),
            ..Default::default()
        })
    }

    async fn login(&self, _payload: &LoginPayload) -> GatewayResult<LoginResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.reject_login {
            return Err(err.clone());
        }
        self.signed_in.store(true, Ordering::SeqCst);
        Ok(LoginResponse {
            nome_completo: maria().nome_completo,
            access_token: Some("token".into()),
            token_type: Some("bearer".into()),
        })
    }
}
