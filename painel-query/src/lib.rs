//! Painel Query Library
//!
//! Query orchestration and freshness policies for the painel market dashboard.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        painel-query                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐      │
//! │  │  MarketClient   │  │  ScreeningFanOut│  │  AuthSession    │      │
//! │  │  typed queries  │  │  home rankings  │  │  profile/login  │      │
//! │  └────────┬────────┘  └────────┬────────┘  └────────┬────────┘      │
//! │           └───────────┬────────┴────────────────────┘               │
//! │              ┌────────▼────────┐   ┌─────────────────┐              │
//! │              │  Orchestrator   │◄──│  PolicyTable    │              │
//! │              │  cache + dedup  │   │  freshness      │              │
//! │              └────────┬────────┘   └─────────────────┘              │
//! │              ┌────────▼────────┐                                    │
//! │              │  HttpGateway    │  market data, auth, account        │
//! │              └─────────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Freshness policy
//! - **stale time**: how long a cached result is served without refetching
//! - **cache time**: how long an unobserved entry survives
//! - **refetch interval**: periodic refresh while somebody is subscribed
//!
//! ## Query key
//! - Scope segments plus named parameters, compared structurally
//! - Equal keys share one cache entry and one in-flight request

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod client;
pub mod derive;
pub mod gateway;
pub mod query;
pub mod session;

pub use client::{keys, MarketClient, Query};
pub use derive::{DerivationCache, DerivedMetricGroup, MetricEntry, TickerViewModel};
pub use gateway::{AuthGateway, GatewayError, GatewayResult, HttpGateway, MarketGateway};
pub use query::{
    FanOutSubscription, FreshnessPolicy, KeyPattern, Orchestrator, PolicyTable, QueryCategory,
    QueryKey, QueryState, ScreeningFanOut, SectorFilter, Subscription,
};
pub use session::{AuthFailure, AuthNotice, AuthSession};

use painel_common::Config;
use std::sync::Arc;

/// Wire the gateway, policy table and orchestrator from configuration.
pub fn build_client(config: &Config) -> anyhow::Result<(MarketClient, AuthSession)> {
    let policies = PolicyTable::from_config(&config.retry, &config.policies)?;
    let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
    let orchestrator = Orchestrator::new(policies);

    let market = MarketClient::new(orchestrator.clone(), gateway.clone());
    let session = AuthSession::new(orchestrator, gateway);
    Ok((market, session))
}
