//! Payload types for the market-data and auth gateways.
//!
//! Every field is optional on the wire; the backend omits fields freely
//! depending on the instrument. Defaulting happens in `crate::derive`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Screening categories and sectors
// ============================================================================

/// Predefined screening categories served by `/categorias/{categoria}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AltaDoDia,
    BaixaDoDia,
    MaisNegociadas,
    SmallCapsCrescimento,
    ValorDividendos,
    BaixoPe,
    AltaLiquidez,
    CrescimentoLucros,
    BaixoRisco,
    MercadoBr,
    MercadoTodo,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AltaDoDia => "alta_do_dia",
            Self::BaixaDoDia => "baixa_do_dia",
            Self::MaisNegociadas => "mais_negociadas",
            Self::SmallCapsCrescimento => "small_caps_crescimento",
            Self::ValorDividendos => "valor_dividendos",
            Self::BaixoPe => "baixo_pe",
            Self::AltaLiquidez => "alta_liquidez",
            Self::CrescimentoLucros => "crescimento_lucros",
            Self::BaixoRisco => "baixo_risco",
            Self::MercadoBr => "mercado_br",
            Self::MercadoTodo => "mercado_todo",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sector filter accepted by the screening endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "Basic Materials")]
    BasicMaterials,
    #[serde(rename = "Communication Services")]
    CommunicationServices,
    #[serde(rename = "Consumer Cyclical")]
    ConsumerCyclical,
    #[serde(rename = "Consumer Defensive")]
    ConsumerDefensive,
    Energy,
    #[serde(rename = "Financial Services")]
    FinancialServices,
    Healthcare,
    Industrials,
    #[serde(rename = "Real Estate")]
    RealEstate,
    Technology,
    Utilities,
}

impl Sector {
    pub const ALL: [Sector; 11] = [
        Self::BasicMaterials,
        Self::CommunicationServices,
        Self::ConsumerCyclical,
        Self::ConsumerDefensive,
        Self::Energy,
        Self::FinancialServices,
        Self::Healthcare,
        Self::Industrials,
        Self::RealEstate,
        Self::Technology,
        Self::Utilities,
    ];

    /// Value sent to the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BasicMaterials => "Basic Materials",
            Self::CommunicationServices => "Communication Services",
            Self::ConsumerCyclical => "Consumer Cyclical",
            Self::ConsumerDefensive => "Consumer Defensive",
            Self::Energy => "Energy",
            Self::FinancialServices => "Financial Services",
            Self::Healthcare => "Healthcare",
            Self::Industrials => "Industrials",
            Self::RealEstate => "Real Estate",
            Self::Technology => "Technology",
            Self::Utilities => "Utilities",
        }
    }

    /// Display label shown on the dashboard.
    pub fn label_pt(&self) -> &'static str {
        match self {
            Self::BasicMaterials => "Materiais Básicos",
            Self::CommunicationServices => "Serviços de Comunicação",
            Self::ConsumerCyclical => "Consumo Cíclico",
            Self::ConsumerDefensive => "Consumo Não Cíclico",
            Self::Energy => "Energia",
            Self::FinancialServices => "Serviços Financeiros",
            Self::Healthcare => "Saúde",
            Self::Industrials => "Industriais",
            Self::RealEstate => "Imobiliário",
            Self::Technology => "Tecnologia",
            Self::Utilities => "Utilidade Pública",
        }
    }

    /// Parse the API value (e.g. "Financial Services").
    pub fn from_api(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query options for a category screening.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreeningOptions {
    pub setor: Option<Sector>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_field: Option<String>,
    pub sort_asc: Option<bool>,
}

impl ScreeningOptions {
    /// Top-N ranking sorted on one field.
    pub fn ranked(limit: u32, sort_field: &str, sort_asc: bool) -> Self {
        Self {
            setor: None,
            limit: Some(limit),
            offset: None,
            sort_field: Some(sort_field.to_string()),
            sort_asc: Some(sort_asc),
        }
    }

    pub fn with_sector(mut self, setor: Option<Sector>) -> Self {
        self.setor = setor;
        self
    }

    /// Query-string pairs, absent options omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(setor) = self.setor {
            pairs.push(("setor", setor.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(ref field) = self.sort_field {
            pairs.push(("sort_field", field.clone()));
        }
        if let Some(asc) = self.sort_asc {
            pairs.push(("sort_asc", asc.to_string()));
        }
        pairs
    }
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoriesResponse {
    #[serde(default)]
    pub categorias: Vec<String>,
    #[serde(default)]
    pub descricoes: HashMap<String, String>,
}

/// One row of a screening result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryItem {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub pe_ratio: Option<f64>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
    #[serde(default, rename = "fiftyTwoWeekChangePercent")]
    pub fifty_two_week_change_percent: Option<f64>,
    #[serde(default)]
    pub avg_volume_3m: Option<f64>,
    #[serde(default, rename = "returnOnEquity")]
    pub return_on_equity: Option<f64>,
    #[serde(default)]
    pub book_value: Option<f64>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default, rename = "fullExchangeName")]
    pub full_exchange_name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ordering {
    #[serde(default)]
    pub campo: Option<String>,
    #[serde(default)]
    pub ascendente: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryScreeningResponse {
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default)]
    pub resultados: Vec<CategoryItem>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub total_disponivel: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub ordenacao: Option<Ordering>,
}

// ============================================================================
// Market overview
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketOverviewItem {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketOverviewResponse {
    /// One of all, brasil, eua, europa, asia, moedas
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub data: Vec<MarketOverviewItem>,
}

// ============================================================================
// Ticker info
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceAndVariation {
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub day_low: Option<f64>,
    pub day_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_change_percent: Option<f64>,
    pub regular_market_change_percent: Option<f64>,
    pub regular_market_change: Option<f64>,
    pub regular_market_open: Option<f64>,
    pub regular_market_day_range: Option<String>,
    pub fifty_two_week_range: Option<String>,
    pub fifty_day_average: Option<f64>,
    pub two_hundred_day_average: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeAndLiquidity {
    pub volume: Option<f64>,
    pub average_volume10days: Option<f64>,
    pub average_daily_volume3_month: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskAndMarketOpinion {
    pub beta: Option<f64>,
    pub recommendation_key: Option<String>,
    pub recommendation_mean: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub target_mean_price: Option<f64>,
    pub number_of_analyst_opinions: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Valuation {
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_sales_trailing12_months: Option<f64>,
    pub enterprise_to_revenue: Option<f64>,
    pub enterprise_to_ebitda: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rentability {
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub profit_margins: Option<f64>,
    pub gross_margins: Option<f64>,
    pub operating_margins: Option<f64>,
    pub ebitda_margins: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EfficiencyAndCashflow {
    pub revenue_per_share: Option<f64>,
    pub gross_profits: Option<f64>,
    pub ebitda: Option<f64>,
    pub operating_cashflow: Option<f64>,
    pub free_cashflow: Option<f64>,
    pub earnings_quarterly_growth: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub total_revenue: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebtAndSolvency {
    pub total_debt: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub current_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DividendSummary {
    pub dividend_rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub last_dividend_value: Option<f64>,
    pub ex_dividend_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShareholdingAndProfit {
    pub shares_outstanding: Option<f64>,
    pub float_shares: Option<f64>,
    pub held_percent_insiders: Option<f64>,
    pub held_percent_institutions: Option<f64>,
    pub eps_trailing_twelve_months: Option<f64>,
    pub eps_forward: Option<f64>,
    pub net_income_to_common: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyOfficer {
    pub name: Option<String>,
    pub title: Option<String>,
    pub age: Option<u32>,
    pub year_born: Option<u32>,
    pub fiscal_year: Option<u32>,
    pub total_pay: Option<f64>,
}

/// Full payload of `GET /{symbol}/info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerInfo {
    pub timestamp: Option<String>,
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub employees: Option<f64>,
    pub website: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "business_summary")]
    pub business_summary: Option<String>,
    pub full_exchange_name: Option<String>,
    /// EQUITY, INDEX, ETF...
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub currency: Option<String>,
    pub company_officers: Vec<CompanyOfficer>,
    pub logo: Option<String>,
    pub price_and_variation: PriceAndVariation,
    pub volume_and_liquidity: VolumeAndLiquidity,
    pub risk_and_market_opinion: RiskAndMarketOpinion,
    pub valuation: Valuation,
    pub rentability: Rentability,
    pub eficiency_and_cashflow: EfficiencyAndCashflow,
    pub debt_and_solvency: DebtAndSolvency,
    pub dividends: DividendSummary,
    #[serde(rename = "ShareholdingAndProfit")]
    pub shareholding_and_profit: ShareholdingAndProfit,
}

impl TickerInfo {
    pub fn is_index(&self) -> bool {
        self.kind.as_deref() == Some("INDEX")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiTickerResponse {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub results: HashMap<String, TickerInfo>,
}

// ============================================================================
// History
// ============================================================================

/// History lookback period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "5d")]
    D5,
    #[serde(rename = "1mo")]
    Mo1,
    #[serde(rename = "3mo")]
    Mo3,
    #[serde(rename = "6mo")]
    Mo6,
    #[serde(rename = "1y")]
    Y1,
    #[serde(rename = "2y")]
    Y2,
    #[serde(rename = "5y")]
    Y5,
    #[serde(rename = "10y")]
    Y10,
    #[serde(rename = "ytd")]
    Ytd,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::D1 => "1d",
            Self::D5 => "5d",
            Self::Mo1 => "1mo",
            Self::Mo3 => "3mo",
            Self::Mo6 => "6mo",
            Self::Y1 => "1y",
            Self::Y2 => "2y",
            Self::Y5 => "5y",
            Self::Y10 => "10y",
            Self::Ytd => "ytd",
            Self::Max => "max",
        }
    }
}

/// History bar interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "60m")]
    M60,
    #[serde(rename = "90m")]
    M90,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "5d")]
    D5,
    #[serde(rename = "1wk")]
    Wk1,
    #[serde(rename = "1mo")]
    Mo1,
    #[serde(rename = "3mo")]
    Mo3,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M2 => "2m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::M60 => "60m",
            Self::M90 => "90m",
            Self::H1 => "1h",
            Self::D1 => "1d",
            Self::D5 => "5d",
            Self::Wk1 => "1wk",
            Self::Mo1 => "1mo",
            Self::Mo3 => "3mo",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HistoryEntry {
    pub date: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub dividends: Option<f64>,
    pub stock_splits: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub data: Vec<HistoryEntry>,
}

// ============================================================================
// News, dividends, calendar, recommendations
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DividendPayment {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub dividend: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DividendInfo {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub dividends: Vec<DividendPayment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendation {
    pub date: Option<String>,
    pub firm: Option<String>,
    pub to_grade: Option<String>,
    pub from_grade: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationInfo {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EarningsEvent {
    pub date: Option<String>,
    pub eps_estimate: Option<f64>,
    pub eps_actual: Option<f64>,
    pub revenue: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarDividend {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub dividend: Option<f64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarDetail {
    #[serde(default)]
    pub earnings: Vec<EarningsEvent>,
    #[serde(default)]
    pub dividends: Vec<CalendarDividend>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarInfo {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub calendar: CalendarDetail,
}

// ============================================================================
// Performance
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodData {
    #[serde(default)]
    pub change_percent: Option<f64>,
    #[serde(default)]
    pub start_price: Option<f64>,
    #[serde(default)]
    pub end_price: Option<f64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerPerformance {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub performance: HashMap<String, Option<PeriodData>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<TickerPerformance>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodPerformanceResponse {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub symbols_count: Option<u64>,
    #[serde(default)]
    pub results: HashMap<String, PerformanceResult>,
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupResult {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub results: Vec<LookupResult>,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub test_ticker: Option<String>,
    #[serde(default)]
    pub test_successful: Option<bool>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.as_deref() == Some("healthy")
    }
}

// ============================================================================
// Auth
// ============================================================================

/// User ids are numeric in the account service and strings elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub nome_completo: Option<String>,
    #[serde(default)]
    pub data_nascimento: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterPayload {
    pub nome_completo: String,
    pub cpf: String,
    /// YYYY-MM-DD
    pub data_nascimento: String,
    pub email: String,
    pub senha: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub senha: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub nome_completo: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl LoginResponse {
    /// First word of the full name, used in the welcome notice.
    pub fn first_name(&self) -> Option<&str> {
        self.nome_completo
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthUrl {
    #[serde(default)]
    pub auth_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_info_decodes_nested_groups() {
        let json = r#"{
            "longName": "Petrobras",
            "type": "EQUITY",
            "currency": "BRL",
            "employees": 45000,
            "business_summary": "Oil and gas",
            "priceAndVariation": { "regularMarketChangePercent": 1.5, "regularMarketDayRange": "36.1 - 37.0" },
            "volumeAndLiquidity": { "averageDailyVolume3Month": 1000000 },
            "valuation": { "trailingPE": 4.2, "forwardPE": 5.1 },
            "ShareholdingAndProfit": { "epsForward": 7.3 }
        }"#;

        let info: TickerInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.long_name.as_deref(), Some("Petrobras"));
        assert_eq!(info.employees, Some(45000.0));
        assert_eq!(info.business_summary.as_deref(), Some("Oil and gas"));
        assert_eq!(info.price_and_variation.regular_market_change_percent, Some(1.5));
        assert_eq!(info.volume_and_liquidity.average_daily_volume3_month, Some(1_000_000.0));
        assert_eq!(info.valuation.trailing_pe, Some(4.2));
        assert_eq!(info.valuation.forward_pe, Some(5.1));
        assert_eq!(info.shareholding_and_profit.eps_forward, Some(7.3));
        assert!(info.rentability.return_on_equity.is_none());
        assert!(!info.is_index());
    }

    #[test]
    fn test_screening_options_query_pairs() {
        let opts = ScreeningOptions::ranked(5, "percentchange", false).with_sector(Some(Sector::Energy));
        let pairs = opts.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("setor", "Energy".to_string()),
                ("limit", "5".to_string()),
                ("sort_field", "percentchange".to_string()),
                ("sort_asc", "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_sector_roundtrip_names() {
        assert_eq!(Sector::from_api("Financial Services"), Some(Sector::FinancialServices));
        assert_eq!(Sector::from_api("Energia"), None);
        assert_eq!(Sector::RealEstate.label_pt(), "Imobiliário");
        let json = serde_json::to_string(&Sector::BasicMaterials).unwrap();
        assert_eq!(json, "\"Basic Materials\"");
    }

    #[test]
    fn test_user_id_untagged() {
        let p: UserProfile = serde_json::from_str(r#"{"id": 7, "email": "a@b.c"}"#).unwrap();
        assert_eq!(p.id, Some(UserId::Number(7)));
        let p: UserProfile = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(p.id, Some(UserId::Text("abc".into())));
    }

    #[test]
    fn test_login_first_name() {
        let resp = LoginResponse {
            nome_completo: Some("Maria Clara Souza".into()),
            ..Default::default()
        };
        assert_eq!(resp.first_name(), Some("Maria"));
    }
}
