//! Query layer: keys, freshness policies, the cache orchestrator and fan-out groups.

pub mod fanout;
pub mod key;
pub mod orchestrator;
pub mod policy;

pub use fanout::{
    AggregateFetchState, FanOutResult, FanOutSubscription, ScreeningDescriptor, ScreeningFanOut,
    SectorFilter, HOME_SCREENINGS,
};
pub use key::{KeyPattern, ParamBag, ParamValue, QueryKey};
pub use orchestrator::{CacheStats, FetchStatus, Orchestrator, QueryState, Subscription};
pub use policy::{history_refetch_interval, Backoff, FreshnessPolicy, PolicyTable, QueryCategory};
