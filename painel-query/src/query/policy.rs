//! Freshness policies.
//!
//! Each data category maps to refresh, stale and cache windows plus a retry
//! count. The table is a plain value: build it with [`PolicyTable::default`],
//! adjust it from configuration with [`PolicyTable::with_overrides`] and hand
//! it to the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use painel_common::config::{PolicyOverrideConfig, RetryConfig};
use painel_common::prelude::{Error, Result, ResultExt};

use crate::gateway::Interval;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

// ============================================================================
// Freshness Policy
// ============================================================================

/// Freshness rules for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// Background refetch period while subscribed (`None` = off)
    pub refetch_interval: Option<Duration>,
    /// Age after which cached data must be refetched before being trusted
    pub stale_time: Duration,
    /// Idle time without subscribers before the entry is evicted
    pub cache_time: Duration,
    /// Retries after the first failed attempt
    pub retry: u32,
    /// Refetch stale data when the application regains focus
    pub refetch_on_focus: bool,
}

impl FreshnessPolicy {
    pub const fn new(
        refetch_interval: Option<Duration>,
        stale_time: Duration,
        cache_time: Duration,
        retry: u32,
    ) -> Self {
        Self {
            refetch_interval,
            stale_time,
            cache_time,
            retry,
            refetch_on_focus: false,
        }
    }

    /// Policy for uncategorized queries: always stale, kept five minutes.
    pub const fn global_default() -> Self {
        Self::new(None, Duration::ZERO, Duration::from_secs(300), 1)
    }

    pub fn with_refetch_interval(mut self, interval: Option<Duration>) -> Self {
        self.refetch_interval = interval;
        self
    }

    pub fn with_refetch_on_focus(mut self, enabled: bool) -> Self {
        self.refetch_on_focus = enabled;
        self
    }

    /// Check `stale_time <= cache_time` and a non-zero refetch interval.
    pub fn validate(&self) -> Result<()> {
        if self.stale_time > self.cache_time {
            return Err(Error::Config(format!(
                "stale_time ({:?}) exceeds cache_time ({:?})",
                self.stale_time, self.cache_time
            )));
        }
        if self.refetch_interval == Some(Duration::ZERO) {
            return Err(Error::Config("refetch_interval must be positive".into()));
        }
        Ok(())
    }

    /// Apply a partial override from configuration.
    fn apply(&mut self, ov: &PolicyOverrideConfig) {
        if let Some(ms) = ov.refetch_interval_ms {
            self.refetch_interval = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(ms) = ov.stale_time_ms {
            self.stale_time = Duration::from_millis(ms);
        }
        if let Some(ms) = ov.cache_time_ms {
            self.cache_time = Duration::from_millis(ms);
        }
        if let Some(retry) = ov.retry {
            self.retry = retry;
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::global_default()
    }
}

// ============================================================================
// Categories
// ============================================================================

/// Data categories with their own freshness rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    /// Quotes, overviews, tickers, screenings
    MarketData,
    /// Company information and price history
    StaticData,
    Search,
    Performance,
    News,
    /// Dividend history and analyst recommendations
    Dividends,
    Calendar,
    Health,
    UserProfile,
}

impl QueryCategory {
    pub const ALL: [QueryCategory; 9] = [
        Self::MarketData,
        Self::StaticData,
        Self::Search,
        Self::Performance,
        Self::News,
        Self::Dividends,
        Self::Calendar,
        Self::Health,
        Self::UserProfile,
    ];

    /// Name used in the `policies` configuration section.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::StaticData => "static_data",
            Self::Search => "search",
            Self::Performance => "performance",
            Self::News => "news",
            Self::Dividends => "dividends",
            Self::Calendar => "calendar",
            Self::Health => "health",
            Self::UserProfile => "user_profile",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    fn default_policy(&self) -> FreshnessPolicy {
        match self {
            Self::MarketData => FreshnessPolicy::new(Some(MINUTE), 10 * SECOND, 5 * MINUTE, 2),
            Self::StaticData => FreshnessPolicy::new(None, HOUR, 24 * HOUR, 1),
            Self::Search => FreshnessPolicy::new(None, 5 * MINUTE, 10 * MINUTE, 0),
            Self::Performance => {
                FreshnessPolicy::new(Some(2 * MINUTE), 10 * SECOND, 5 * MINUTE, 2)
            }
            Self::News => FreshnessPolicy::new(Some(5 * MINUTE), 5 * MINUTE, 10 * MINUTE, 1),
            Self::Dividends | Self::Calendar => {
                FreshnessPolicy::new(Some(HOUR), HOUR, 24 * HOUR, 1)
            }
            Self::Health => FreshnessPolicy::new(Some(30 * SECOND), 5 * SECOND, 10 * SECOND, 0),
            Self::UserProfile => FreshnessPolicy::new(None, 15 * MINUTE, 30 * MINUTE, 2)
                .with_refetch_on_focus(true),
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refetch period for price history at a given bar interval.
///
/// Intraday and daily bars refresh once per bar; longer bars never refresh.
pub fn history_refetch_interval(interval: Interval) -> Option<Duration> {
    match interval {
        Interval::M1 => Some(MINUTE),
        Interval::M2 => Some(2 * MINUTE),
        Interval::M5 => Some(5 * MINUTE),
        Interval::M15 => Some(15 * MINUTE),
        Interval::M30 => Some(30 * MINUTE),
        Interval::M60 | Interval::H1 => Some(HOUR),
        Interval::D1 => Some(24 * HOUR),
        _ => None,
    }
}

// ============================================================================
// Retry Backoff
// ============================================================================

/// Exponential, capped delay between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based): `min(base * 2^attempt, max)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.checked_mul(factor).unwrap_or(self.max).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1_000),
            max: Duration::from_millis(30_000),
        }
    }
}

impl From<&RetryConfig> for Backoff {
    fn from(config: &RetryConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_delay_ms),
            max: Duration::from_millis(config.max_delay_ms),
        }
    }
}

// ============================================================================
// Policy Table
// ============================================================================

/// Category → policy mapping plus the shared retry backoff.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: HashMap<QueryCategory, FreshnessPolicy>,
    default_policy: FreshnessPolicy,
    backoff: Backoff,
}

impl Default for PolicyTable {
    fn default() -> Self {
        let policies = QueryCategory::ALL
            .iter()
            .map(|c| (*c, c.default_policy()))
            .collect();

        Self {
            policies,
            default_policy: FreshnessPolicy::global_default(),
            backoff: Backoff::default(),
        }
    }
}

impl PolicyTable {
    /// Build the table from the `retry` and `policies` configuration sections.
    pub fn from_config(
        retry: &RetryConfig,
        overrides: &HashMap<String, PolicyOverrideConfig>,
    ) -> Result<Self> {
        Self::default()
            .with_backoff(Backoff::from(retry))
            .with_overrides(overrides)
    }

    /// Apply per-category overrides, rejecting unknown categories and
    /// overrides that break `stale_time <= cache_time`.
    pub fn with_overrides(
        mut self,
        overrides: &HashMap<String, PolicyOverrideConfig>,
    ) -> Result<Self> {
        for (name, ov) in overrides {
            let category = QueryCategory::from_name(name)
                .ok_or_else(|| Error::Config(format!("unknown policy category: {}", name)))?;

            let policy = self
                .policies
                .entry(category)
                .or_insert_with(|| category.default_policy());
            policy.apply(ov);
            policy.validate().context(format!("policies.{}", name))?;
        }
        Ok(self)
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replace one category's policy.
    pub fn set(&mut self, category: QueryCategory, policy: FreshnessPolicy) {
        self.policies.insert(category, policy);
    }

    pub fn get(&self, category: QueryCategory) -> FreshnessPolicy {
        self.policies
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_policy())
    }

    /// Policy for queries outside every category.
    pub fn default_policy(&self) -> FreshnessPolicy {
        self.default_policy
    }

    /// Static-data policy with the refetch period derived from the bar interval.
    pub fn history(&self, interval: Interval) -> FreshnessPolicy {
        self.get(QueryCategory::StaticData)
            .with_refetch_interval(history_refetch_interval(interval))
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }
}
