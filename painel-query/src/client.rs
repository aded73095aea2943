//! Typed queries over the market gateway.
//!
//! Each method binds a query key, a freshness policy and a gateway call into
//! a [`Query`] that can be fetched once or subscribed to.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::gateway::*;
use crate::query::{
    FreshnessPolicy, Orchestrator, ParamBag, QueryCategory, QueryKey, QueryState, Subscription,
};

type QueryFn<T> = Arc<dyn Fn() -> BoxFuture<'static, GatewayResult<T>> + Send + Sync>;

/// Default number of news items per ticker
pub const DEFAULT_NEWS_COUNT: u32 = 5;
/// Default number of search results
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;
/// Default lookup type and count
pub const DEFAULT_LOOKUP_TYPE: &str = "all";
pub const DEFAULT_LOOKUP_COUNT: u32 = 25;

// ============================================================================
// Query keys
// ============================================================================

/// Key builders shared by every consumer of a data category.
pub mod keys {
    use super::*;

    pub fn categories() -> QueryKey {
        QueryKey::new(["categories"])
    }

    pub fn category_screening(category: Category, options: &ScreeningOptions) -> QueryKey {
        QueryKey::new(["category-screening", category.as_str()]).with_params(
            ParamBag::new()
                .insert_opt("setor", options.setor.map(|s| s.as_str()))
                .insert_opt("limit", options.limit)
                .insert_opt("offset", options.offset)
                .insert_opt("sort_field", options.sort_field.clone())
                .insert_opt("sort_asc", options.sort_asc),
        )
    }

    pub fn market_overview(category: &str) -> QueryKey {
        QueryKey::new(["market-overview", category])
    }

    pub fn ticker_info(symbol: &str) -> QueryKey {
        QueryKey::new(["ticker-info", symbol])
    }

    pub fn ticker_full_data(symbol: &str) -> QueryKey {
        QueryKey::new(["ticker-full", symbol])
    }

    pub fn multi_tickers(symbols: &str) -> QueryKey {
        QueryKey::new(["tickers-multi", symbols])
    }

    pub fn history(symbol: &str, period: Period, interval: Interval) -> QueryKey {
        QueryKey::new(["history", symbol, period.as_str(), interval.as_str()])
    }

    pub fn multi_history(symbols: &str, period: Period, interval: Interval) -> QueryKey {
        QueryKey::new(["multi-history", symbols, period.as_str(), interval.as_str()])
    }

    pub fn news(symbol: &str, num: u32) -> QueryKey {
        QueryKey::new(["news".to_string(), symbol.to_string(), num.to_string()])
    }

    pub fn dividends(symbol: &str) -> QueryKey {
        QueryKey::new(["dividends", symbol])
    }

    pub fn recommendations(symbol: &str) -> QueryKey {
        QueryKey::new(["recommendations", symbol])
    }

    pub fn calendar(symbol: &str) -> QueryKey {
        QueryKey::new(["calendar", symbol])
    }

    pub fn performance(symbols: &str) -> QueryKey {
        QueryKey::new(["performance", symbols])
    }

    pub fn search(query: &str, limit: u32) -> QueryKey {
        QueryKey::new(["search".to_string(), query.to_string(), limit.to_string()])
    }

    pub fn lookup(query: &str, kind: &str, count: u32) -> QueryKey {
        QueryKey::new([
            "lookup".to_string(),
            query.to_string(),
            kind.to_string(),
            count.to_string(),
        ])
    }

    pub fn health() -> QueryKey {
        QueryKey::new(["health"])
    }

    pub fn user_profile() -> QueryKey {
        QueryKey::new(["user", "profile"])
    }
}

// ============================================================================
// Query
// ============================================================================

/// A bound query: key, policy and fetcher.
pub struct Query<T> {
    orchestrator: Orchestrator,
    key: QueryKey,
    policy: FreshnessPolicy,
    enabled: bool,
    fetcher: QueryFn<T>,
}

impl<T: Send + Sync + 'static> Query<T> {
    pub fn new<F, Fut>(
        orchestrator: Orchestrator,
        key: QueryKey,
        policy: FreshnessPolicy,
        fetcher: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<T>> + Send + 'static,
    {
        Self {
            orchestrator,
            key,
            policy,
            enabled: true,
            fetcher: Arc::new(move || fetcher().boxed()),
        }
    }

    /// Disabled queries never reach the gateway.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fetch through the cache. A disabled query returns the idle state.
    pub async fn fetch(&self) -> QueryState<T> {
        if !self.enabled {
            return QueryState::idle();
        }
        let fetcher = Arc::clone(&self.fetcher);
        self.orchestrator
            .fetch(self.key.clone(), self.policy, move || fetcher())
            .await
    }

    /// Subscribe to the query. A disabled query yields no subscription.
    pub fn subscribe(&self) -> Option<Subscription<T>> {
        if !self.enabled {
            return None;
        }
        let fetcher = Arc::clone(&self.fetcher);
        Some(
            self.orchestrator
                .subscribe(self.key.clone(), self.policy, move || fetcher()),
        )
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("enabled", &self.enabled)
            .finish()
    }
}

// ============================================================================
// Market Client
// ============================================================================

/// Market data queries, one method per data category.
#[derive(Clone)]
pub struct MarketClient {
    orchestrator: Orchestrator,
    gateway: Arc<dyn MarketGateway>,
}

impl MarketClient {
    pub fn new(orchestrator: Orchestrator, gateway: Arc<dyn MarketGateway>) -> Self {
        Self {
            orchestrator,
            gateway,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    fn policy(&self, category: QueryCategory) -> FreshnessPolicy {
        self.orchestrator.policies().get(category)
    }

    /// Build a query whose fetcher receives a gateway handle.
    fn query<T, F, Fut>(&self, key: QueryKey, policy: FreshnessPolicy, call: F) -> Query<T>
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<dyn MarketGateway>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<T>> + Send + 'static,
    {
        let gateway = Arc::clone(&self.gateway);
        Query::new(self.orchestrator.clone(), key, policy, move || {
            call(Arc::clone(&gateway))
        })
    }

    pub fn categories(&self) -> Query<CategoriesResponse> {
        self.query(
            keys::categories(),
            self.policy(QueryCategory::MarketData),
            |gw| async move { gw.list_categories().await },
        )
    }

    /// Single screening; uses the global default policy.
    pub fn category_screening(
        &self,
        category: Category,
        options: ScreeningOptions,
    ) -> Query<CategoryScreeningResponse> {
        let policy = self.orchestrator.policies().default_policy();
        self.category_screening_with_policy(category, options, policy)
    }

    pub fn category_screening_with_policy(
        &self,
        category: Category,
        options: ScreeningOptions,
        policy: FreshnessPolicy,
    ) -> Query<CategoryScreeningResponse> {
        let key = keys::category_screening(category, &options);
        self.query(key, policy, move |gw| {
            let options = options.clone();
            async move { gw.category_screening(category, &options).await }
        })
    }

    pub fn market_overview(&self, category: &str) -> Query<MarketOverviewResponse> {
        let category = category.to_string();
        self.query(
            keys::market_overview(&category),
            self.policy(QueryCategory::MarketData),
            move |gw| {
                let category = category.clone();
                async move { gw.market_overview(&category).await }
            },
        )
    }

    pub fn ticker_info(&self, symbol: &str) -> Query<TickerInfo> {
        let symbol = symbol.to_string();
        self.query(
            keys::ticker_info(&symbol),
            self.policy(QueryCategory::MarketData),
            move |gw| {
                let symbol = symbol.clone();
                async move { gw.ticker_info(&symbol).await }
            },
        )
    }

    pub fn ticker_full_data(&self, symbol: &str) -> Query<serde_json::Value> {
        let symbol = symbol.to_string();
        self.query(
            keys::ticker_full_data(&symbol),
            self.policy(QueryCategory::MarketData),
            move |gw| {
                let symbol = symbol.clone();
                async move { gw.ticker_full_data(&symbol).await }
            },
        )
    }

    /// `symbols` is a comma-separated list
    pub fn multi_tickers(&self, symbols: &str) -> Query<MultiTickerResponse> {
        let symbols = symbols.to_string();
        self.query(
            keys::multi_tickers(&symbols),
            self.policy(QueryCategory::MarketData),
            move |gw| {
                let symbols = symbols.clone();
                async move { gw.multi_ticker_info(&symbols).await }
            },
        )
    }

    /// Price history, refreshed once per bar for intraday and daily bars.
    pub fn history(&self, symbol: &str, period: Period, interval: Interval) -> Query<HistoryResponse> {
        let symbol = symbol.to_string();
        self.query(
            keys::history(&symbol, period, interval),
            self.orchestrator.policies().history(interval),
            move |gw| {
                let symbol = symbol.clone();
                async move { gw.history(&symbol, period, interval).await }
            },
        )
    }

    pub fn multi_history(
        &self,
        symbols: &str,
        period: Period,
        interval: Interval,
    ) -> Query<serde_json::Value> {
        let symbols = symbols.to_string();
        self.query(
            keys::multi_history(&symbols, period, interval),
            self.orchestrator.policies().history(interval),
            move |gw| {
                let symbols = symbols.clone();
                async move { gw.multi_history(&symbols, period, interval).await }
            },
        )
    }

    pub fn news(&self, symbol: &str, num: Option<u32>) -> Query<Vec<NewsItem>> {
        let symbol = symbol.to_string();
        let num = num.unwrap_or(DEFAULT_NEWS_COUNT);
        self.query(
            keys::news(&symbol, num),
            self.policy(QueryCategory::News),
            move |gw| {
                let symbol = symbol.clone();
                async move { gw.news(&symbol, num).await }
            },
        )
    }

    pub fn dividends(&self, symbol: &str) -> Query<DividendInfo> {
        let symbol = symbol.to_string();
        self.query(
            keys::dividends(&symbol),
            self.policy(QueryCategory::Dividends),
            move |gw| {
                let symbol = symbol.clone();
                async move { gw.dividends(&symbol).await }
            },
        )
    }

    pub fn recommendations(&self, symbol: &str) -> Query<RecommendationInfo> {
        let symbol = symbol.to_string();
        self.query(
            keys::recommendations(&symbol),
            self.policy(QueryCategory::Dividends),
            move |gw| {
                let symbol = symbol.clone();
                async move { gw.recommendations(&symbol).await }
            },
        )
    }

    pub fn calendar(&self, symbol: &str) -> Query<CalendarInfo> {
        let symbol = symbol.to_string();
        self.query(
            keys::calendar(&symbol),
            self.policy(QueryCategory::Calendar),
            move |gw| {
                let symbol = symbol.clone();
                async move { gw.calendar(&symbol).await }
            },
        )
    }

    pub fn period_performance(&self, symbols: &str) -> Query<PeriodPerformanceResponse> {
        let symbols = symbols.to_string();
        self.query(
            keys::performance(&symbols),
            self.policy(QueryCategory::Performance),
            move |gw| {
                let symbols = symbols.clone();
                async move { gw.period_performance(&symbols).await }
            },
        )
    }

    /// Free-text search; disabled while the query is empty.
    pub fn search(&self, query: &str, limit: Option<u32>) -> Query<SearchResponse> {
        let text = query.to_string();
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        self.query(
            keys::search(&text, limit),
            self.policy(QueryCategory::Search),
            move |gw| {
                let text = text.clone();
                async move { gw.search(&text, limit).await }
            },
        )
        .enabled(!query.is_empty())
    }

    /// Symbol lookup; disabled while the query is empty.
    pub fn lookup(&self, query: &str, kind: Option<&str>, count: Option<u32>) -> Query<LookupResponse> {
        let text = query.to_string();
        let kind = kind.unwrap_or(DEFAULT_LOOKUP_TYPE).to_string();
        let count = count.unwrap_or(DEFAULT_LOOKUP_COUNT);
        self.query(
            keys::lookup(&text, &kind, count),
            self.policy(QueryCategory::Search),
            move |gw| {
                let text = text.clone();
                let kind = kind.clone();
                async move { gw.lookup(&text, &kind, count).await }
            },
        )
        .enabled(!query.is_empty())
    }

    pub fn health(&self) -> Query<HealthStatus> {
        self.query(
            keys::health(),
            self.policy(QueryCategory::Health),
            |gw| async move { gw.health().await },
        )
    }
}

impl fmt::Debug for MarketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketClient")
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}
