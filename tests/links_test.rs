use anyhow::Result;
use earthdata_search::core::granules::GranuleActions;
use earthdata_search::domain::model::{Action, GranuleLinks, RetrievalCollection};
use earthdata_search::{ActionLog, EarthdataConfig};
use httpmock::prelude::*;
use serde_json::json;

fn actions_for(server: &MockServer) -> GranuleActions<EarthdataConfig> {
    let mut config = EarthdataConfig::default();
    config.cmr_host = server.base_url();
    config.api_host = server.base_url();
    GranuleActions::new(config)
}

fn granule_page(page: u32) -> serde_json::Value {
    json!({
        "feed": {
            "entry": [
                {
                    "id": format!("G{}-EDSC", page),
                    "links": [
                        {
                            "rel": "http://esipfed.org/ns/fedsearch/1.1/data#",
                            "href": format!("https://e4ftl01.cr.usgs.gov/page{}/granule.hdf", page)
                        },
                        {
                            "rel": "http://esipfed.org/ns/fedsearch/1.1/data#",
                            "href": "https://e4ftl01.cr.usgs.gov/collection-level",
                            "inherited": true
                        },
                        {
                            "rel": "http://esipfed.org/ns/fedsearch/1.1/browse#",
                            "href": "https://e4ftl01.cr.usgs.gov/browse.jpg"
                        }
                    ]
                }
            ]
        }
    })
}

fn download_retrieval() -> RetrievalCollection {
    serde_json::from_value(json!({
        "id": 3,
        "collection_id": "C10000005-EDSC",
        "access_method": { "type": "download" },
        "collection_metadata": {},
        "granule_params": {
            "echo_collection_id": "C10000005-EDSC",
            "bounding_box": "23.607421875,5.381262277997806,27.7965087890625,14.973184553280502"
        },
        "granule_count": 700
    }))
    .unwrap()
}

#[tokio::test]
async fn test_fetch_links_pages_through_granules() -> Result<()> {
    let server = MockServer::start_async().await;
    let first_page = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/granules")
                .header("Authorization", "Bearer token")
                .json_body_partial(r#"{ "params": { "page_num": 1, "page_size": 500 } }"#);
            then.status(200).header("cmr-hits", "700").json_body(granule_page(1));
        })
        .await;
    let second_page = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/granules")
                .json_body_partial(r#"{ "params": { "page_num": 2, "page_size": 500 } }"#);
            then.status(200).header("cmr-hits", "700").json_body(granule_page(2));
        })
        .await;

    let dispatch = ActionLog::new();
    let count = actions_for(&server)
        .fetch_retrieval_links(&dispatch, "token", &download_retrieval())
        .await?;

    first_page.assert_async().await;
    second_page.assert_async().await;
    assert_eq!(count, 2);
    assert_eq!(
        dispatch.actions(),
        vec![
            Action::UpdateGranuleLinks(GranuleLinks {
                id: 3,
                links: vec!["https://e4ftl01.cr.usgs.gov/page1/granule.hdf".to_string()],
            }),
            Action::UpdateGranuleLinks(GranuleLinks {
                id: 3,
                links: vec!["https://e4ftl01.cr.usgs.gov/page2/granule.hdf".to_string()],
            }),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_fetch_links_stops_on_failed_page() -> Result<()> {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(POST).path("/granules");
            then.status(500);
        })
        .await;

    let dispatch = ActionLog::new();
    let outcome = actions_for(&server)
        .fetch_links(&dispatch, "token", &download_retrieval())
        .await;

    failing.assert_hits_async(1).await;
    assert!(outcome.is_err());
    assert!(dispatch.actions().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_fetch_opendap_links_with_excluded_granules() -> Result<()> {
    let server = MockServer::start_async().await;
    let ous = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/ous")
                .header("Authorization", "Bearer token")
                .json_body_partial(
                    r#"{
                        "params": {
                            "echo_collection_id": "C10000005-EDSC",
                            "exclude_granules": true,
                            "granules": ["G10000404-EDSC"],
                            "format": "nc4",
                            "variables": ["V1000004-EDSC"]
                        }
                    }"#,
                );
            then.status(200).json_body(json!({
                "items": [
                    "https://opendap.example.com/granule1.nc4",
                    "https://opendap.example.com/granule2.nc4"
                ]
            }));
        })
        .await;

    let retrieval: RetrievalCollection = serde_json::from_value(json!({
        "id": 4,
        "collection_id": "C10000005-EDSC",
        "access_method": {
            "type": "OPeNDAP",
            "selectedVariables": ["V1000004-EDSC"],
            "selectedOutputFormat": "nc4"
        },
        "collection_metadata": {},
        "granule_params": {
            "echo_collection_id": "C10000005-EDSC",
            "exclude": { "concept_id": ["G10000404-EDSC"] }
        },
        "granule_count": 3
    }))?;

    let dispatch = ActionLog::new();
    let count = actions_for(&server)
        .fetch_retrieval_links(&dispatch, "token", &retrieval)
        .await?;

    ous.assert_async().await;
    assert_eq!(count, 2);
    assert_eq!(
        dispatch.actions(),
        vec![Action::UpdateGranuleLinks(GranuleLinks {
            id: 4,
            links: vec![
                "https://opendap.example.com/granule1.nc4".to_string(),
                "https://opendap.example.com/granule2.nc4".to_string(),
            ],
        })]
    );
    Ok(())
}

#[tokio::test]
async fn test_fetch_opendap_links_sends_bounding_box_for_spatial() -> Result<()> {
    let server = MockServer::start_async().await;
    let ous = server
        .mock_async(|when, then| {
            when.method(POST).path("/ous").json_body_partial(
                r#"{ "params": { "bounding_box": "-10,-5,10,5", "granules": ["G1-EDSC", "G2-EDSC"] } }"#,
            );
            then.status(200).json_body(json!({ "items": [] }));
        })
        .await;

    let retrieval: RetrievalCollection = serde_json::from_value(json!({
        "id": 5,
        "collection_id": "C10000005-EDSC",
        "access_method": { "type": "OPeNDAP" },
        "granule_params": {
            "echo_collection_id": "C10000005-EDSC",
            "bounding_box": "-10,-5,10,5",
            "concept_id": ["G1-EDSC", "G2-EDSC"]
        },
        "granule_count": 2
    }))?;

    let dispatch = ActionLog::new();
    let count = actions_for(&server)
        .fetch_opendap_links(&dispatch, "token", &retrieval)
        .await?;

    ous.assert_async().await;
    assert_eq!(count, 0);
    assert_eq!(
        dispatch.actions(),
        vec![Action::UpdateGranuleLinks(GranuleLinks { id: 5, links: vec![] })]
    );
    Ok(())
}
