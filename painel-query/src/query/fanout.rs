//! Multi-query fan-out for the home dashboard rankings.
//!
//! Several screening queries run in parallel, each cached under its own key.
//! The group exposes one aggregated status and a map from descriptor name to
//! the rows that descriptor returned.

use futures::future::{join_all, select_all, FutureExt};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::client::{MarketClient, Query};
use crate::gateway::{Category, CategoryItem, CategoryScreeningResponse, GatewayError, ScreeningOptions, Sector};

use super::orchestrator::{FetchStatus, QueryState, Subscription};
use super::policy::QueryCategory;

// ============================================================================
// Descriptors
// ============================================================================

/// One member of a fan-out group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreeningDescriptor {
    /// Category requested, also the name the results are keyed by
    pub category: Category,
    pub limit: u32,
    pub sort_field: &'static str,
    pub sort_asc: bool,
}

impl ScreeningDescriptor {
    pub fn name(&self) -> &'static str {
        self.category.as_str()
    }

    fn options(&self) -> ScreeningOptions {
        ScreeningOptions::ranked(self.limit, self.sort_field, self.sort_asc)
    }
}

/// Rankings shown on the home dashboard.
pub const HOME_SCREENINGS: [ScreeningDescriptor; 4] = [
    ScreeningDescriptor {
        category: Category::AltaDoDia,
        limit: 5,
        sort_field: "percentchange",
        sort_asc: false,
    },
    ScreeningDescriptor {
        category: Category::BaixaDoDia,
        limit: 5,
        sort_field: "percentchange",
        sort_asc: true,
    },
    ScreeningDescriptor {
        category: Category::MaisNegociadas,
        limit: 5,
        sort_field: "dayvolume",
        sort_asc: false,
    },
    ScreeningDescriptor {
        category: Category::ValorDividendos,
        limit: 5,
        sort_field: "forward_dividend_yield",
        sort_asc: false,
    },
];

// ============================================================================
// Sector filter
// ============================================================================

/// Sector selection applied to every member of the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectorFilter {
    /// Whole market, no sector parameter
    #[default]
    All,
    Sector(Sector),
    /// International view
    International,
}

impl SectorFilter {
    /// Parse a dashboard selection: empty or `brasil` for the whole market,
    /// `internacional`, or an API sector name such as `Energy`.
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("brasil") => Some(Self::All),
            Some("internacional") => Some(Self::International),
            Some(other) => Sector::from_api(other).map(Self::Sector),
        }
    }

    /// Category and sector actually requested for `descriptor`.
    ///
    /// The international view has no sector breakdown on the backend: every
    /// ranking is served from `mercado_todo` without a sector parameter.
    pub fn resolve(&self, descriptor: &ScreeningDescriptor) -> (Category, Option<Sector>) {
        match self {
            Self::All => (descriptor.category, None),
            Self::Sector(sector) => (descriptor.category, Some(*sector)),
            Self::International => (Category::MercadoTodo, None),
        }
    }
}

impl fmt::Display for SectorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Sector(sector) => f.write_str(sector.as_str()),
            Self::International => f.write_str("internacional"),
        }
    }
}

// ============================================================================
// Aggregate state
// ============================================================================

/// OR of the members' status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateFetchState {
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_error: bool,
}

impl AggregateFetchState {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = FetchStatus>,
    {
        statuses
            .into_iter()
            .fold(Self::default(), |acc, s| Self {
                is_loading: acc.is_loading || s.is_loading,
                is_fetching: acc.is_fetching || s.is_fetching,
                is_error: acc.is_error || s.is_error,
            })
    }
}

/// Merged view of a fan-out group.
#[derive(Debug, Clone, Default)]
pub struct FanOutResult {
    pub state: AggregateFetchState,
    /// Rows per descriptor name; empty until that member resolves
    pub data: BTreeMap<String, Vec<CategoryItem>>,
    /// Errors of the members that failed
    pub errors: BTreeMap<String, Arc<GatewayError>>,
}

impl FanOutResult {
    fn merge(members: &[(&'static str, QueryState<CategoryScreeningResponse>)]) -> Self {
        let state = AggregateFetchState::from_statuses(members.iter().map(|(_, s)| s.status));
        let data = members
            .iter()
            .map(|(name, s)| {
                let rows = s
                    .data
                    .as_ref()
                    .map(|d| d.resultados.clone())
                    .unwrap_or_default();
                (name.to_string(), rows)
            })
            .collect();
        let errors = members
            .iter()
            .filter(|(_, s)| s.status.is_error)
            .filter_map(|(name, s)| s.error.clone().map(|e| (name.to_string(), e)))
            .collect();

        Self {
            state,
            data,
            errors,
        }
    }

    pub fn rows(&self, name: &str) -> &[CategoryItem] {
        self.data.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ============================================================================
// Fan-out group
// ============================================================================

/// A group of screening queries sharing one sector filter.
#[derive(Clone)]
pub struct ScreeningFanOut {
    client: MarketClient,
    descriptors: Arc<[ScreeningDescriptor]>,
}

impl ScreeningFanOut {
    /// Group over the home dashboard rankings.
    pub fn home(client: MarketClient) -> Self {
        Self::with_descriptors(client, HOME_SCREENINGS.to_vec())
    }

    pub fn with_descriptors(client: MarketClient, descriptors: Vec<ScreeningDescriptor>) -> Self {
        Self {
            client,
            descriptors: descriptors.into(),
        }
    }

    pub fn descriptors(&self) -> &[ScreeningDescriptor] {
        &self.descriptors
    }

    /// Member queries for `filter`, paired with their descriptor names.
    pub fn queries(&self, filter: SectorFilter) -> Vec<(&'static str, Query<CategoryScreeningResponse>)> {
        let policy = self.client.orchestrator().policies().get(QueryCategory::MarketData);
        self.descriptors
            .iter()
            .map(|d| {
                let (category, sector) = filter.resolve(d);
                let options = d.options().with_sector(sector);
                let query = self
                    .client
                    .category_screening_with_policy(category, options, policy);
                (d.name(), query)
            })
            .collect()
    }

    /// Fetch every member in parallel and merge the results.
    pub async fn fetch(&self, filter: SectorFilter) -> FanOutResult {
        let queries = self.queries(filter);
        let states = join_all(queries.iter().map(|(_, q)| q.fetch())).await;
        let members: Vec<_> = queries
            .iter()
            .map(|(name, _)| *name)
            .zip(states)
            .collect();
        FanOutResult::merge(&members)
    }

    /// Subscribe to every member.
    pub fn subscribe(&self, filter: SectorFilter) -> FanOutSubscription {
        let members = self.subscribe_members(filter);
        FanOutSubscription {
            group: self.clone(),
            filter,
            members,
        }
    }

    fn subscribe_members(
        &self,
        filter: SectorFilter,
    ) -> Vec<(&'static str, Subscription<CategoryScreeningResponse>)> {
        self.queries(filter)
            .into_iter()
            .filter_map(|(name, q)| q.subscribe().map(|s| (name, s)))
            .collect()
    }
}

impl fmt::Debug for ScreeningFanOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreeningFanOut")
            .field("descriptors", &self.descriptors)
            .finish()
    }
}

/// Live subscription on a fan-out group.
pub struct FanOutSubscription {
    group: ScreeningFanOut,
    filter: SectorFilter,
    members: Vec<(&'static str, Subscription<CategoryScreeningResponse>)>,
}

impl FanOutSubscription {
    pub fn filter(&self) -> SectorFilter {
        self.filter
    }

    /// Current merged view.
    pub fn result(&self) -> FanOutResult {
        let members: Vec<_> = self
            .members
            .iter()
            .map(|(name, sub)| (*name, sub.state()))
            .collect();
        FanOutResult::merge(&members)
    }

    pub fn state(&self) -> AggregateFetchState {
        self.result().state
    }

    pub fn data(&self) -> BTreeMap<String, Vec<CategoryItem>> {
        self.result().data
    }

    /// Wait until any member broadcasts. Returns `false` when no member can change anymore.
    pub async fn changed(&mut self) -> bool {
        if self.members.is_empty() {
            return false;
        }
        let waits = self
            .members
            .iter_mut()
            .map(|(_, sub)| sub.changed().boxed());
        let (changed, _, _) = select_all(waits).await;
        changed
    }

    /// Wait until `predicate` holds for the merged view and return it.
    pub async fn wait_for<P>(&mut self, predicate: P) -> FanOutResult
    where
        P: Fn(&FanOutResult) -> bool,
    {
        loop {
            let result = self.result();
            if predicate(&result) {
                return result;
            }
            if !self.changed().await {
                return self.result();
            }
        }
    }

    /// Switch every member to a new sector filter.
    ///
    /// The previous members are detached; their entries stay cached under
    /// their own keys until evicted.
    pub fn set_filter(&mut self, filter: SectorFilter) {
        if filter == self.filter {
            return;
        }
        let members = self.group.subscribe_members(filter);
        self.members = members;
        self.filter = filter;
    }
}

impl fmt::Debug for FanOutSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOutSubscription")
            .field("filter", &self.filter)
            .field("members", &self.members.len())
            .finish()
    }
}
