use anyhow::Result;
use earthdata_search::domain::ports::SystemTokenProvider;
use earthdata_search::serverless::service_options::ServiceOptionDefinition;
use earthdata_search::serverless::system_token::{LegacyTokenProvider, StaticTokenProvider};
use earthdata_search::{LambdaConfig, ProxyHandlers, ProxyRequest};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn config_for(server: &MockServer) -> LambdaConfig {
    LambdaConfig {
        cmr_host: server.base_url(),
        cwic_host: server.base_url(),
        cwic_client_id: "eed-edsc".to_string(),
        client_id: "clientId".to_string(),
        system_username: "edsc".to_string(),
        system_password: "secret".to_string(),
        request_timeout_seconds: 30,
    }
}

fn handlers_for(server: &MockServer) -> ProxyHandlers {
    ProxyHandlers::new(
        reqwest::Client::new(),
        &config_for(server),
        Arc::new(StaticTokenProvider::new("mocked-system-token")),
    )
}

#[tokio::test]
async fn test_granule_search_forwards_token_and_headers() -> Result<()> {
    let server = MockServer::start_async().await;
    let cmr = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/search/granules.json")
                .header("Echo-Token", "user-token")
                .x_www_form_urlencoded_tuple("echo_collection_id", "C10000005-EDSC")
                .x_www_form_urlencoded_tuple("exclude[concept_id][]", "G1-EDSC");
            then.status(200)
                .header("cmr-hits", "42")
                .json_body(json!({ "feed": { "entry": [] } }));
        })
        .await;

    let request = ProxyRequest::post(
        "/granules",
        json!({
            "requestId": "req-1",
            "params": {
                "echo_collection_id": "C10000005-EDSC",
                "page_num": 1,
                "page_size": 20,
                "exclude": { "concept_id": ["G1-EDSC"] }
            }
        }),
    )
    .with_header("Authorization", "Bearer user-token");

    let response = handlers_for(&server).handle(request).await;

    cmr.assert_async().await;
    assert_eq!(response.status_code, 200);
    assert_eq!(response.header("cmr-hits"), Some("42"));
    assert_eq!(response.header("jwt-token"), Some("user-token"));
    let body: serde_json::Value = serde_json::from_str(&response.body)?;
    assert_eq!(body, json!({ "feed": { "entry": [] } }));
    Ok(())
}

#[tokio::test]
async fn test_granule_search_requires_token() -> Result<()> {
    let server = MockServer::start_async().await;
    let request = ProxyRequest::post(
        "/granules",
        json!({ "requestId": "req-1", "params": { "echo_collection_id": "C1-EDSC" } }),
    );

    let response = handlers_for(&server).handle(request).await;

    assert_eq!(response.status_code, 401);
    Ok(())
}

#[tokio::test]
async fn test_upstream_status_is_passed_through() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/search/granules.json");
            then.status(400).json_body(json!({ "errors": ["bad request"] }));
        })
        .await;

    let request = ProxyRequest::post(
        "/granules",
        json!({ "requestId": "req-1", "params": { "echo_collection_id": "C1-EDSC" } }),
    )
    .with_header("authorization", "Bearer user-token");

    let response = handlers_for(&server).handle(request).await;

    assert_eq!(response.status_code, 400);
    assert!(response.body.contains("errors"));
    Ok(())
}

#[tokio::test]
async fn test_cwic_granule_search_returns_atom_feed() -> Result<()> {
    let server = MockServer::start_async().await;
    let atom = "<feed><opensearch:totalResults>0</opensearch:totalResults></feed>";
    let cwic = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/opensearch/granules.atom")
                .query_param("clientId", "eed-edsc")
                .query_param("datasetId", "C1597928934-NOAA_NCEI")
                .query_param("startIndex", "21")
                .query_param("count", "20")
                .query_param("boundingBox", "-77,37.9,-76,38.1");
            then.status(200).body(atom);
        })
        .await;

    let request = ProxyRequest::post(
        "/cwic/granules",
        json!({
            "requestId": "req-2",
            "params": {
                "echoCollectionId": "C1597928934-NOAA_NCEI",
                "boundingBox": "-77,37.9,-76,38.1",
                "pageNum": 2,
                "pageSize": 20
            }
        }),
    );

    let response = handlers_for(&server).handle(request).await;

    cwic.assert_async().await;
    assert_eq!(response.status_code, 200);
    assert_eq!(response.header("content-type"), Some("application/atom+xml"));
    assert_eq!(response.body, atom);
    Ok(())
}

#[tokio::test]
async fn test_ous_proxies_service_bridge() -> Result<()> {
    let server = MockServer::start_async().await;
    let bridge = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/service-bridge/ous/collection/C10000005-EDSC")
                .header("Echo-Token", "user-token")
                .query_param("format", "nc4")
                .query_param("granules", "G1-EDSC,G2-EDSC")
                .query_param("exclude_granules", "true");
            then.status(200)
                .json_body(json!({ "items": ["https://opendap.example.com/G1.nc4"] }));
        })
        .await;

    let request = ProxyRequest::post(
        "/ous",
        json!({
            "requestId": "req-3",
            "params": {
                "echo_collection_id": "C10000005-EDSC",
                "exclude_granules": true,
                "granules": ["G1-EDSC", "G2-EDSC"],
                "format": "nc4"
            }
        }),
    )
    .with_header("Authorization", "Bearer user-token");

    let response = handlers_for(&server).handle(request).await;

    bridge.assert_async().await;
    assert_eq!(response.status_code, 200);
    let body: serde_json::Value = serde_json::from_str(&response.body)?;
    assert_eq!(body, json!({ "items": ["https://opendap.example.com/G1.nc4"] }));
    Ok(())
}

#[tokio::test]
async fn test_get_service_option_definitions_keeps_input_order() -> Result<()> {
    let server = MockServer::start_async().await;
    for (id, form) in [
        ("service_option_def_guid_1", "mock echo form 1"),
        ("service_option_def_guid_2", "mock echo form 2"),
    ] {
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!(
                        "/legacy-services/rest/service_option_definitions/{}.json",
                        id
                    ))
                    .header("Echo-Token", "mocked-system-token");
                then.status(200)
                    .json_body(json!({ "service_option_definition": { "form": form } }));
            })
            .await;
    }

    let definitions = vec![
        ServiceOptionDefinition {
            id: "service_option_def_guid_1".to_string(),
            name: "Service Option Definition".to_string(),
        },
        ServiceOptionDefinition {
            id: "service_option_def_guid_2".to_string(),
            name: "Service Option Definition".to_string(),
        },
    ];

    let forms = handlers_for(&server)
        .get_service_option_definitions(&definitions)
        .await?;

    assert_eq!(
        forms,
        vec![
            json!({
                "esi0": {
                    "form": "mock echo form 1",
                    "service_option_definition": {
                        "id": "service_option_def_guid_1",
                        "name": "Service Option Definition"
                    }
                }
            }),
            json!({
                "esi1": {
                    "form": "mock echo form 2",
                    "service_option_definition": {
                        "id": "service_option_def_guid_2",
                        "name": "Service Option Definition"
                    }
                }
            }),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_service_option_route_requires_token_but_uses_system_token() -> Result<()> {
    let server = MockServer::start_async().await;
    let forms = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/legacy-services/rest/service_option_definitions/guid_1.json")
                .header("Echo-Token", "mocked-system-token");
            then.status(200)
                .json_body(json!({ "service_option_definition": { "form": "form 1" } }));
        })
        .await;
    let body = json!({
        "requestId": "req-5",
        "params": [{ "id": "guid_1", "name": "Service Option Definition" }]
    });

    let anonymous = handlers_for(&server)
        .handle(ProxyRequest::post("/service_option_definitions", body.clone()))
        .await;
    assert_eq!(anonymous.status_code, 401);
    forms.assert_hits_async(0).await;

    let signed_in = handlers_for(&server)
        .handle(
            ProxyRequest::post("/service_option_definitions", body)
                .with_header("Authorization", "Bearer user-token"),
        )
        .await;

    forms.assert_hits_async(1).await;
    assert_eq!(signed_in.status_code, 200);
    let forms_body: serde_json::Value = serde_json::from_str(&signed_in.body)?;
    assert_eq!(forms_body[0]["esi0"]["form"], json!("form 1"));
    Ok(())
}

#[tokio::test]
async fn test_legacy_token_provider_caches_token() -> Result<()> {
    let server = MockServer::start_async().await;
    let tokens = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/legacy-services/rest/tokens.json")
                .json_body_partial(r#"{ "token": { "username": "edsc", "client_id": "clientId" } }"#);
            then.status(201)
                .json_body(json!({ "token": { "id": "system-token-id" } }));
        })
        .await;

    let provider = LegacyTokenProvider::new(reqwest::Client::new(), &config_for(&server));

    assert_eq!(provider.system_token().await?, "system-token-id");
    assert_eq!(provider.system_token().await?, "system-token-id");
    tokens.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<()> {
    let server = MockServer::start_async().await;
    let mut request = ProxyRequest::post("/collections", json!({}));
    request.http_method = "GET".to_string();

    let response = handlers_for(&server).handle(request).await;

    assert_eq!(response.status_code, 404);
    assert!(response.body.contains("GET /collections"));
    Ok(())
}

#[tokio::test]
async fn test_malformed_collection_id_is_rejected() -> Result<()> {
    let server = MockServer::start_async().await;
    let request = ProxyRequest::post(
        "/ous",
        json!({ "requestId": "req-4", "params": { "echo_collection_id": "collectionId" } }),
    )
    .with_header("Authorization", "Bearer user-token");

    let response = handlers_for(&server).handle(request).await;

    assert_eq!(response.status_code, 400);
    assert!(response.body.contains("collectionId"));
    Ok(())
}
