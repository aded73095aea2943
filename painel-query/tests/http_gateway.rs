//! Integration tests for the HTTP gateway against a mock server.

use painel_common::config::GatewayConfig;
use painel_query::gateway::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer) -> HttpGateway {
    let config = GatewayConfig {
        market_data_url: format!("{}/market-data/", server.uri()),
        auth_url: format!("{}/api/v1/auth", server.uri()),
        account_url: format!("{}/auth", server.uri()),
        timeout_secs: 5,
    };
    HttpGateway::new(&config).unwrap()
}

// ============================================================================
// Market data
// ============================================================================

#[tokio::test]
async fn test_screening_sends_options_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market-data/categorias/alta_do_dia"))
        .and(query_param("setor", "Energy"))
        .and(query_param("limit", "5"))
        .and(query_param("sort_field", "percentchange"))
        .and(query_param("sort_asc", "false"))
        .and(header_exists(http::TRACE_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "categoria": "alta_do_dia",
            "resultados": [{ "symbol": "PETR4.SA", "price": 37.2 }],
            "total": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let options = ScreeningOptions::ranked(5, "percentchange", false).with_sector(Some(Sector::Energy));
    let response = gateway
        .category_screening(Category::AltaDoDia, &options)
        .await
        .unwrap();

    assert_eq!(response.resultados.len(), 1);
    assert_eq!(response.resultados[0].symbol.as_deref(), Some("PETR4.SA"));
}

#[tokio::test]
async fn test_ticker_info_decodes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market-data/VALE3.SA/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "longName": "Vale S.A.",
            "currency": "BRL",
            "type": "EQUITY",
            "priceAndVariation": { "regularMarketOpen": 61.2 }
        })))
        .mount(&server)
        .await;

    let info = gateway_for(&server).ticker_info("VALE3.SA").await.unwrap();
    assert_eq!(info.long_name.as_deref(), Some("Vale S.A."));
    assert_eq!(info.price_and_variation.regular_market_open, Some(61.2));
}

#[tokio::test]
async fn test_full_data_keeps_raw_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market-data/ITUB4.SA/fulldata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "ITUB4.SA",
            "companyOfficers": [{ "name": "Milton Maluhy Filho" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let full = gateway_for(&server).ticker_full_data("ITUB4.SA").await.unwrap();
    assert_eq!(full["symbol"], "ITUB4.SA");
    assert_eq!(full["companyOfficers"][0]["name"], "Milton Maluhy Filho");
}

#[tokio::test]
async fn test_error_status_carries_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market-data/XXXX/info"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "Ticker não encontrado" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/market-data/health"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);

    let err = gateway.ticker_info("XXXX").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Http {
            status: 404,
            detail: Some("Ticker não encontrado".into()),
        }
    );
    assert_eq!(err.kind(), ErrorKind::Http4xx);

    let err = gateway.health().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Http5xx);
    assert!(err.detail().is_none());
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market-data/categorias"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = gateway_for(&server).list_categories().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let config = GatewayConfig {
        market_data_url: "http://127.0.0.1:9".into(),
        timeout_secs: 1,
        ..Default::default()
    };
    let err = HttpGateway::new(&config).unwrap().health().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(!err.has_response());
}

// ============================================================================
// Session
// ============================================================================

#[tokio::test]
async fn test_login_cookie_is_sent_with_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "maria@example.com", "senha": "segredo123" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc123; Path=/")
                .set_body_json(json!({
                    "nome_completo": "Maria Souza",
                    "access_token": "t",
                    "token_type": "bearer"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/profile"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "nome_completo": "Maria Souza",
            "email": "maria@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let login = gateway
        .login(&LoginPayload {
            email: "maria@example.com".into(),
            senha: "segredo123".into(),
        })
        .await
        .unwrap();
    assert_eq!(login.first_name(), Some("Maria"));

    let profile = gateway.profile().await.unwrap();
    assert_eq!(profile.id, Some(UserId::Number(7)));
}

#[tokio::test]
async fn test_google_auth_returns_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/google/auth-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth_url": "https://accounts.google.com/o/oauth2/auth?client_id=x"
        })))
        .mount(&server)
        .await;

    let effect = gateway_for(&server).google_auth_url().await.unwrap();
    assert_eq!(
        effect,
        AuthEffect::Redirect("https://accounts.google.com/o/oauth2/auth?client_id=x".into())
    );
}
