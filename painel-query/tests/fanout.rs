//! Integration tests for the home rankings fan-out.

mod common;

use std::sync::Arc;

use common::MockMarket;
use painel_query::gateway::{Category, Sector};
use painel_query::query::{Orchestrator, PolicyTable, ScreeningFanOut, SectorFilter, HOME_SCREENINGS};
use painel_query::MarketClient;

fn setup(gateway: MockMarket) -> (Arc<MockMarket>, Orchestrator, ScreeningFanOut) {
    let gateway = Arc::new(gateway);
    let orch = Orchestrator::new(PolicyTable::default());
    let client = MarketClient::new(orch.clone(), gateway.clone());
    (gateway, orch, ScreeningFanOut::home(client))
}

#[tokio::test(start_paused = true)]
async fn test_one_failing_member_does_not_hide_the_others() {
    let (_gateway, _orch, group) = setup(MockMarket::new().fail_category(Category::ValorDividendos));

    let result = group.fetch(SectorFilter::All).await;

    assert!(result.state.is_error);
    assert!(!result.state.is_loading);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors.contains_key("valor_dividendos"));
    assert!(result.rows("valor_dividendos").is_empty());

    for name in ["alta_do_dia", "baixa_do_dia", "mais_negociadas"] {
        assert_eq!(result.rows(name).len(), 1, "rows for {}", name);
    }
}

#[tokio::test(start_paused = true)]
async fn test_sector_filter_uses_distinct_keys() {
    let (gateway, orch, group) = setup(MockMarket::new());

    let all = group.fetch(SectorFilter::All).await;
    let energy = group.fetch(SectorFilter::Sector(Sector::Energy)).await;

    assert_eq!(gateway.call_count(), 8);
    assert_eq!(orch.len(), 8);
    assert_eq!(all.rows("alta_do_dia")[0].symbol.as_deref(), Some("alta_do_dia"));
    assert_eq!(
        energy.rows("alta_do_dia")[0].symbol.as_deref(),
        Some("alta_do_dia:Energy")
    );

    let sectors: Vec<_> = gateway.screenings().into_iter().map(|(_, s)| s).collect();
    assert_eq!(sectors.iter().filter(|s| s.is_none()).count(), 4);
    assert_eq!(sectors.iter().filter(|s| **s == Some(Sector::Energy)).count(), 4);

    // Same filter again is served from cache
    group.fetch(SectorFilter::Sector(Sector::Energy)).await;
    assert_eq!(gateway.call_count(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_international_reads_whole_market() {
    let (gateway, _orch, group) = setup(MockMarket::new());

    let result = group.fetch(SectorFilter::International).await;

    let screenings = gateway.screenings();
    assert_eq!(screenings.len(), HOME_SCREENINGS.len());
    assert!(screenings
        .iter()
        .all(|(category, sector)| *category == Category::MercadoTodo && sector.is_none()));

    let names: Vec<_> = result.data.keys().cloned().collect();
    assert_eq!(
        names,
        ["alta_do_dia", "baixa_do_dia", "mais_negociadas", "valor_dividendos"]
    );
    assert_eq!(result.rows("mais_negociadas")[0].symbol.as_deref(), Some("mercado_todo"));
}

#[tokio::test(start_paused = true)]
async fn test_subscription_follows_filter_changes() {
    let (gateway, _orch, group) = setup(MockMarket::new());

    let mut sub = group.subscribe(SectorFilter::All);
    assert!(sub.state().is_loading);

    let result = sub.wait_for(|r| !r.state.is_fetching).await;
    assert!(!result.state.is_error);
    assert_eq!(result.data.len(), 4);
    assert_eq!(gateway.call_count(), 4);

    sub.set_filter(SectorFilter::Sector(Sector::Utilities));
    assert_eq!(sub.filter(), SectorFilter::Sector(Sector::Utilities));
    let result = sub.wait_for(|r| !r.state.is_fetching).await;
    assert_eq!(
        result.rows("baixa_do_dia")[0].symbol.as_deref(),
        Some("baixa_do_dia:Utilities")
    );
    assert_eq!(gateway.call_count(), 8);

    // Unchanged filter keeps the current members
    sub.set_filter(SectorFilter::Sector(Sector::Utilities));
    assert_eq!(gateway.call_count(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_subscription_refreshes_on_interval() {
    let (gateway, _orch, group) = setup(MockMarket::new());

    let mut sub = group.subscribe(SectorFilter::All);
    sub.wait_for(|r| !r.state.is_fetching).await;
    assert_eq!(gateway.call_count(), 4);

    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    assert_eq!(gateway.call_count(), 8);
}
