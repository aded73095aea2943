//! View-model derivation for the asset page.
//!
//! Reshapes a raw [`TickerInfo`] into ordered, titled metric groups. Numeric
//! fields missing from the payload count as zero and zero-valued metrics are
//! hidden, except the daily change which is meaningful at zero. Analyst
//! fields and range strings have no default and are hidden when absent.

use std::sync::{Arc, Mutex};

use crate::gateway::{Sector, TickerInfo};
use crate::query::QueryState;

/// Metric shown even when its value is zero
pub const ZERO_EXEMPT_TITLE: &str = "Variação de hoje(%)";

// ============================================================================
// Metric entries
// ============================================================================

/// How a metric value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Currency,
    Percent,
    LargeNumber,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    fn is_zero(&self) -> bool {
        matches!(self, Self::Number(n) if *n == 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricEntry {
    pub title: &'static str,
    pub value: Option<MetricValue>,
    pub unit: MetricUnit,
}

impl MetricEntry {
    /// Number defaulting to zero when absent.
    fn number(title: &'static str, value: Option<f64>, unit: MetricUnit) -> Self {
        Self {
            title,
            value: Some(MetricValue::Number(value.unwrap_or(0.0))),
            unit,
        }
    }

    /// Number without a default.
    fn optional(title: &'static str, value: Option<f64>, unit: MetricUnit) -> Self {
        Self {
            title,
            value: value.map(MetricValue::Number),
            unit,
        }
    }

    fn text(title: &'static str, value: Option<&str>) -> Self {
        Self {
            title,
            value: value.map(|s| MetricValue::Text(s.to_string())),
            unit: MetricUnit::Text,
        }
    }

    pub fn is_visible(&self) -> bool {
        match &self.value {
            None => false,
            Some(v) => !v.is_zero() || self.title == ZERO_EXEMPT_TITLE,
        }
    }

    /// Render the value for display; `currency` is the ticker's display currency.
    pub fn display(&self, currency: &str) -> Option<String> {
        let value = self.value.as_ref()?;
        let rendered = match (value, self.unit) {
            (MetricValue::Text(s), _) => s.clone(),
            (MetricValue::Number(n), MetricUnit::Currency) => format_price(*n, currency),
            (MetricValue::Number(n), MetricUnit::Percent) => format_change(*n),
            (MetricValue::Number(n), MetricUnit::LargeNumber) => format_large_number(*n),
            (MetricValue::Number(n), MetricUnit::Text) => n.to_string(),
        };
        Some(rendered)
    }
}

/// Titled, ordered list of visible metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetricGroup {
    pub title: &'static str,
    pub entries: Vec<MetricEntry>,
}

impl DerivedMetricGroup {
    /// Build a group, keeping only visible entries in their given order.
    pub fn new(title: &'static str, entries: Vec<MetricEntry>) -> Self {
        Self {
            title,
            entries: entries.into_iter().filter(MetricEntry::is_visible).collect(),
        }
    }

    pub fn get(&self, title: &str) -> Option<&MetricEntry> {
        self.entries.iter().find(|e| e.title == title)
    }

    pub fn titles(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.title).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One label/value row of the company profile table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRow {
    pub label: &'static str,
    pub value: String,
}

// ============================================================================
// Ticker view model
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TickerViewModel {
    /// Currency used for currency metrics; empty for indices
    pub currency: String,
    pub market_data: DerivedMetricGroup,
    pub valuation: DerivedMetricGroup,
    pub rentability: DerivedMetricGroup,
    pub efficiency_and_cashflow: DerivedMetricGroup,
    pub debt_and_solvency: DerivedMetricGroup,
    pub dividends: DerivedMetricGroup,
    pub shareholding_and_profit: DerivedMetricGroup,
    pub analyst_opinion: DerivedMetricGroup,
    pub company_profile: Vec<InfoRow>,
}

impl TickerViewModel {
    pub fn from_info(info: &TickerInfo) -> Self {
        use MetricUnit::*;

        let pv = &info.price_and_variation;
        let vl = &info.volume_and_liquidity;
        let va = &info.valuation;
        let re = &info.rentability;
        let ec = &info.eficiency_and_cashflow;
        let ds = &info.debt_and_solvency;
        let dv = &info.dividends;
        let sp = &info.shareholding_and_profit;
        let ro = &info.risk_and_market_opinion;

        Self {
            currency: display_currency(info),
            market_data: DerivedMetricGroup::new(
                "Dados de Mercado",
                vec![
                    MetricEntry::number("Abertura", pv.regular_market_open, Currency),
                    MetricEntry::number("Ultimo Fechamento", pv.previous_close, Currency),
                    MetricEntry::number(ZERO_EXEMPT_TITLE, pv.regular_market_change_percent, Percent),
                    MetricEntry::text("Variações de hoje", pv.regular_market_day_range.as_deref()),
                    MetricEntry::text("Variações do ano", pv.fifty_two_week_range.as_deref()),
                    MetricEntry::number("Volume", vl.volume, LargeNumber),
                    MetricEntry::number(
                        "Volume médio 3 meses",
                        vl.average_daily_volume3_month,
                        LargeNumber,
                    ),
                ],
            ),
            valuation: DerivedMetricGroup::new(
                "Indicadores de Valuation",
                vec![
                    MetricEntry::number("Valor de mercado", va.market_cap, LargeNumber),
                    MetricEntry::number(
                        "Valor da firma (Enterprise Value)",
                        va.enterprise_value,
                        LargeNumber,
                    ),
                    MetricEntry::number("P/L (Trailing PE)", va.trailing_pe, Percent),
                    MetricEntry::number("P/L Projetado (Forward PE)", va.forward_pe, Percent),
                    MetricEntry::number("P/VPA (Price to Book)", va.price_to_book, Percent),
                ],
            ),
            rentability: DerivedMetricGroup::new(
                "Rentabilidade",
                vec![
                    MetricEntry::number("ROE (Retorno sobre Patrimônio)", re.return_on_equity, Percent),
                    MetricEntry::number("ROA (Retorno sobre Ativos)", re.return_on_assets, Percent),
                    MetricEntry::number("Margem Líquida", re.profit_margins, Percent),
                    MetricEntry::number("Margem Operacional", re.operating_margins, Percent),
                    MetricEntry::number("Margem EBITDA", re.ebitda_margins, Percent),
                ],
            ),
            efficiency_and_cashflow: DerivedMetricGroup::new(
                "Eficiência e Fluxo de Caixa",
                vec![
                    MetricEntry::number("Lucro Bruto", ec.gross_profits, LargeNumber),
                    MetricEntry::number("EBITDA", ec.ebitda, LargeNumber),
                    MetricEntry::number("Fluxo de Caixa Livre", ec.free_cashflow, LargeNumber),
                    MetricEntry::number("Receita Total", ec.total_revenue, LargeNumber),
                ],
            ),
            debt_and_solvency: DerivedMetricGroup::new(
                "Débito e Solvência",
                vec![
                    MetricEntry::number("Dívida Total", ds.total_debt, LargeNumber),
                    MetricEntry::number("Dívida / Patrimônio", ds.debt_to_equity, Percent),
                    MetricEntry::number("Quick Ratio", ds.quick_ratio, Percent),
                    MetricEntry::number("Current Ratio", ds.current_ratio, Percent),
                ],
            ),
            dividends: DerivedMetricGroup::new(
                "Dividendos",
                vec![
                    MetricEntry::number("Dividend Yield", dv.dividend_yield, Percent),
                    MetricEntry::number("Payout Ratio", dv.payout_ratio, Percent),
                    MetricEntry::number("Último Dividendo", dv.last_dividend_value, Currency),
                ],
            ),
            shareholding_and_profit: DerivedMetricGroup::new(
                "Participação e Lucro",
                vec![
                    MetricEntry::number("Lucro por Ação (EPS)", sp.eps_trailing_twelve_months, Currency),
                    MetricEntry::number("Lucro por Ação Estimado", sp.eps_forward, Currency),
                    MetricEntry::number("Lucro Líquido", sp.net_income_to_common, LargeNumber),
                ],
            ),
            analyst_opinion: DerivedMetricGroup::new(
                "Risco e Opinião de Mercado",
                vec![
                    MetricEntry::optional("Beta", ro.beta, Text),
                    MetricEntry::text("Recomendação", ro.recommendation_key.as_deref()),
                    MetricEntry::optional("Nota média", ro.recommendation_mean, Text),
                    MetricEntry::optional("Preço alvo (alto)", ro.target_high_price, Currency),
                    MetricEntry::optional("Preço alvo (baixo)", ro.target_low_price, Currency),
                    MetricEntry::optional("Preço alvo (médio)", ro.target_mean_price, Currency),
                    MetricEntry::optional("Nº de analistas", ro.number_of_analyst_opinions, LargeNumber),
                ],
            ),
            company_profile: company_profile(info),
        }
    }

    /// The eight metric groups in page order.
    pub fn groups(&self) -> [&DerivedMetricGroup; 8] {
        [
            &self.market_data,
            &self.valuation,
            &self.rentability,
            &self.efficiency_and_cashflow,
            &self.debt_and_solvency,
            &self.dividends,
            &self.shareholding_and_profit,
            &self.analyst_opinion,
        ]
    }
}

/// Currency for rendering prices; indices are shown without one.
pub fn display_currency(info: &TickerInfo) -> String {
    if info.is_index() {
        String::new()
    } else {
        info.currency.clone().unwrap_or_default()
    }
}

fn company_profile(info: &TickerInfo) -> Vec<InfoRow> {
    let sector = info
        .sector
        .as_deref()
        .and_then(Sector::from_api)
        .map(|s| s.label_pt().to_string());
    let employees = info
        .employees
        .filter(|n| *n != 0.0)
        .map(|n| format!("{}", n.round() as i64));
    let officers = info
        .company_officers
        .iter()
        .filter_map(|o| o.name.as_deref())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let rows: [(&'static str, Option<String>); 9] = [
        ("Nome", info.long_name.clone()),
        ("Sumário", info.business_summary.clone()),
        ("Setor", sector),
        ("Indústria", info.industry.clone()),
        ("Site", info.website.clone()),
        ("País", info.country.clone()),
        ("Bolsa", info.full_exchange_name.clone()),
        ("Num. Empregados", employees),
        ("Maiores Acionistas", Some(officers)),
    ];

    rows.into_iter()
        .filter_map(|(label, value)| {
            value
                .filter(|v| !v.is_empty())
                .map(|value| InfoRow { label, value })
        })
        .collect()
}

// ============================================================================
// Memoization
// ============================================================================

/// Caches the view model of the last payload seen.
///
/// Recomputes only when handed a different `Arc<TickerInfo>`.
#[derive(Debug, Default)]
pub struct DerivationCache {
    last: Mutex<Option<(Arc<TickerInfo>, Arc<TickerViewModel>)>>,
}

impl DerivationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(&self, info: &Arc<TickerInfo>) -> Arc<TickerViewModel> {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        if let Some((ref cached_info, ref model)) = *last {
            if Arc::ptr_eq(cached_info, info) {
                return Arc::clone(model);
            }
        }
        let model = Arc::new(TickerViewModel::from_info(info));
        *last = Some((Arc::clone(info), Arc::clone(&model)));
        model
    }

    /// View model for a query state; `None` until data arrives.
    pub fn derive_state(&self, state: &QueryState<TickerInfo>) -> Option<Arc<TickerViewModel>> {
        state.data.as_ref().map(|info| self.derive(info))
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Large numbers with pt-BR suffixes: `1,50 mi`, `250 bi`, `3,2 mil`.
pub fn format_large_number(value: f64) -> String {
    let abs = value.abs();
    let (base, suffix) = if abs >= 1e12 {
        (value / 1e12, " tri")
    } else if abs >= 1e9 {
        (value / 1e9, " bi")
    } else if abs >= 1e6 {
        (value / 1e6, " mi")
    } else if abs >= 1e3 {
        (value / 1e3, " mil")
    } else {
        return format_decimal_pt(value, 0, 3);
    };

    let min_digits = if base >= 100.0 { 0 } else { 2 };
    format!("{}{}", format_decimal_pt(base, min_digits, 2), suffix)
}

/// Signed two-decimal percentage: `+1.25%`, `-0.40%`, `0.00%`.
pub fn format_change(change: f64) -> String {
    let sign = if change > 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, change)
}

/// Price in pt-BR currency style; an empty currency prints the bare number.
pub fn format_price(price: f64, currency: &str) -> String {
    if currency.is_empty() {
        return price.to_string();
    }
    let symbol = match currency {
        "BRL" => "R$",
        "USD" => "US$",
        "EUR" => "€",
        "GBP" => "£",
        other => other,
    };
    let sign = if price < 0.0 { "-" } else { "" };
    format!("{}{}\u{a0}{}", sign, symbol, format_decimal_pt(price.abs(), 2, 2))
}

/// pt-BR decimal: `.` groups thousands, `,` separates decimals.
fn format_decimal_pt(value: f64, min_digits: usize, max_digits: usize) -> String {
    let fixed = format!("{:.*}", max_digits, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (fixed.clone(), String::new()),
    };

    let mut frac = frac_part;
    while frac.len() > min_digits && frac.ends_with('0') {
        frac.pop();
    }

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && (int_part.chars().any(|c| c != '0') || !frac.is_empty());
    let sign = if negative { "-" } else { "" };
    if frac.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{},{}", sign, grouped, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::CompanyOfficer;

    fn sample() -> TickerInfo {
        serde_json::from_str(
            r#"{
                "longName": "Petróleo Brasileiro S.A.",
                "sector": "Energy",
                "industry": "Oil & Gas Integrated",
                "employees": 0,
                "currency": "BRL",
                "type": "EQUITY",
                "priceAndVariation": {
                    "regularMarketOpen": 37.1,
                    "previousClose": 36.9,
                    "regularMarketChangePercent": 0,
                    "regularMarketDayRange": "36.5 - 37.4"
                },
                "volumeAndLiquidity": { "volume": 52000000 },
                "valuation": { "marketCap": 480000000000, "trailingPE": 4.1 },
                "riskAndMarketOpinion": { "recommendationKey": "buy", "targetMeanPrice": 45.2 }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_filter_keeps_daily_change() {
        let vm = TickerViewModel::from_info(&sample());
        assert_eq!(
            vm.market_data.titles(),
            vec![
                "Abertura",
                "Ultimo Fechamento",
                "Variação de hoje(%)",
                "Variações de hoje",
                "Volume"
            ]
        );
        assert_eq!(
            vm.market_data.get(ZERO_EXEMPT_TITLE).unwrap().value,
            Some(MetricValue::Number(0.0))
        );
        assert!(vm.rentability.is_empty());
        assert!(vm.market_data.get("Variações do ano").is_none());
    }

    #[test]
    fn test_analyst_fields_without_default() {
        let vm = TickerViewModel::from_info(&sample());
        assert_eq!(vm.analyst_opinion.titles(), vec!["Recomendação", "Preço alvo (médio)"]);
    }

    #[test]
    fn test_company_profile_rows() {
        let vm = TickerViewModel::from_info(&sample());
        let labels: Vec<_> = vm.company_profile.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["Nome", "Setor", "Indústria"]);
        assert_eq!(vm.company_profile[1].value, "Energia");
    }

    #[test]
    fn test_company_profile_lists_officers() {
        let mut info = sample();
        info.company_officers = vec![
            CompanyOfficer {
                name: Some("Jean Paul Prates".into()),
                ..Default::default()
            },
            CompanyOfficer::default(),
            CompanyOfficer {
                name: Some("Sergio Caetano Leite".into()),
                title: Some("CFO".into()),
                ..Default::default()
            },
        ];

        let vm = TickerViewModel::from_info(&info);
        let last = vm.company_profile.last().unwrap();
        assert_eq!(last.label, "Maiores Acionistas");
        assert_eq!(last.value, "Jean Paul Prates, Sergio Caetano Leite");
    }

    #[test]
    fn test_group_order() {
        let vm = TickerViewModel::from_info(&sample());
        let titles: Vec<_> = vm.groups().iter().map(|g| g.title).collect();
        assert_eq!(
            titles,
            [
                "Dados de Mercado",
                "Indicadores de Valuation",
                "Rentabilidade",
                "Eficiência e Fluxo de Caixa",
                "Débito e Solvência",
                "Dividendos",
                "Participação e Lucro",
                "Risco e Opinião de Mercado",
            ]
        );
    }

    #[test]
    fn test_index_has_no_currency() {
        let mut info = sample();
        info.kind = Some("INDEX".into());
        let vm = TickerViewModel::from_info(&info);
        assert_eq!(vm.currency, "");
        let open = vm.market_data.get("Abertura").unwrap();
        assert_eq!(open.display(&vm.currency).as_deref(), Some("37.1"));
    }

    #[test]
    fn test_memoized_by_pointer() {
        let cache = DerivationCache::new();
        let info = Arc::new(sample());

        let a = cache.derive(&info);
        let b = cache.derive(&info);
        assert!(Arc::ptr_eq(&a, &b));

        let copy = Arc::new(sample());
        let c = cache.derive(&copy);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(*a, *c);
    }

    #[test]
    fn test_format_large_number() {
        assert_eq!(format_large_number(1_500_000.0), "1,50 mi");
        assert_eq!(format_large_number(250_000_000_000.0), "250 bi");
        assert_eq!(format_large_number(123_456_000_000.0), "123,46 bi");
        assert_eq!(format_large_number(2_000_000_000_000.0), "2,00 tri");
        assert_eq!(format_large_number(3_200.0), "3,20 mil");
        assert_eq!(format_large_number(999.0), "999");
        assert_eq!(format_large_number(12.5), "12,5");
        assert_eq!(format_large_number(-4_500_000.0), "-4,50 mi");
    }

    #[test]
    fn test_format_change_and_price() {
        assert_eq!(format_change(1.256), "+1.26%");
        assert_eq!(format_change(-0.4), "-0.40%");
        assert_eq!(format_change(0.0), "0.00%");
        assert_eq!(format_price(1234.5, "BRL"), "R$\u{a0}1.234,50");
        assert_eq!(format_price(12.0, "USD"), "US$\u{a0}12,00");
        assert_eq!(format_price(128_500.25, ""), "128500.25");
    }
}
