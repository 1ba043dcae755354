use crate::core::granules::{update_granule_links, GranuleActions};
use crate::core::request::OusRequest;
use crate::core::spatial::mbr;
use crate::domain::model::{Granule, GranuleLinks, RetrievalCollection};
use crate::domain::ports::{Dispatch, EndpointConfig};
use crate::domain::search::{ExcludeConceptIds, GranuleSearchParams, OusParams};
use crate::utils::error::Result;
use serde_json::Value;

const DATA_REL: &str = "/data#";

/// Direct download hrefs of a granule, skipping links inherited from the
/// collection.
pub fn download_links(granule: &Granule) -> Vec<String> {
    let Some(links) = granule.get("links").and_then(Value::as_array) else {
        return Vec::new();
    };

    links
        .iter()
        .filter(|link| {
            let rel = link.get("rel").and_then(Value::as_str).unwrap_or_default();
            let inherited = link
                .get("inherited")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            rel.contains(DATA_REL) && !inherited
        })
        .filter_map(|link| link.get("href").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

fn page_count(granule_count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    granule_count.div_ceil(u64::from(page_size))
}

/// Builds the OUS request for a retrieval. The MBR stands in for whatever
/// spatial constraint the retrieval was saved with.
pub fn ous_params(retrieval: &RetrievalCollection) -> Result<OusParams> {
    let granule_params = &retrieval.granule_params;
    let bounding_box = mbr(&granule_params.spatial())?.map(|rectangle| rectangle.to_bounding_box());

    let excluded = granule_params.excluded_ids();
    let (exclude_granules, granules) = if !excluded.is_empty() {
        (Some(true), excluded.to_vec())
    } else {
        (None, granule_params.concept_id.clone())
    };

    let echo_collection_id = if granule_params.echo_collection_id.is_empty() {
        retrieval.collection_id.clone()
    } else {
        granule_params.echo_collection_id.clone()
    };

    Ok(OusParams {
        bounding_box,
        echo_collection_id,
        exclude_granules,
        granules,
        format: retrieval.access_method.selected_output_format.clone(),
        variables: retrieval.access_method.selected_variables.clone(),
    })
}

impl<C: EndpointConfig> GranuleActions<C> {
    fn link_search_params(
        &self,
        retrieval: &RetrievalCollection,
        page_num: u32,
        page_size: u32,
    ) -> GranuleSearchParams {
        let granule_params = &retrieval.granule_params;
        let echo_collection_id = if granule_params.echo_collection_id.is_empty() {
            retrieval.collection_id.clone()
        } else {
            granule_params.echo_collection_id.clone()
        };

        GranuleSearchParams {
            echo_collection_id,
            page_num,
            page_size,
            temporal: granule_params.temporal.clone(),
            bounding_box: granule_params.bounding_box.first().cloned(),
            polygon: granule_params.polygon.first().cloned(),
            point: granule_params.point.first().cloned(),
            circle: granule_params.circle.first().cloned(),
            concept_id: granule_params.concept_id.clone(),
            exclude: ExcludeConceptIds {
                concept_id: granule_params.excluded_ids().to_vec(),
            },
            ..Default::default()
        }
    }

    /// Pages through the retrieval's granules one page at a time, dispatching
    /// the download links of each page as soon as it arrives.
    pub async fn fetch_links(
        &self,
        dispatch: &dyn Dispatch,
        auth_token: &str,
        retrieval: &RetrievalCollection,
    ) -> Result<usize> {
        let page_size = self.config().link_page_size();
        let total_pages = page_count(retrieval.granule_count, page_size);
        let request = self.granule_request(auth_token);

        tracing::info!(
            "Fetching download links for retrieval collection {} ({} granules, {} pages)",
            retrieval.id,
            retrieval.granule_count,
            total_pages
        );

        let mut link_count = 0;
        for page_num in 1..=total_pages {
            let params = self.link_search_params(retrieval, page_num as u32, page_size);
            let response = match request.search(&params).await {
                Ok(response) => response,
                Err(e) => {
                    self.error_logger().report(&e, "fetchLinks", "granule links").await;
                    return Err(e);
                }
            };

            let links: Vec<String> = response.entries.iter().flat_map(download_links).collect();
            link_count += links.len();

            dispatch.dispatch(update_granule_links(GranuleLinks {
                id: retrieval.id,
                links,
            }));
        }

        Ok(link_count)
    }

    /// Asks OUS for subsetted OPeNDAP links covering the whole retrieval.
    pub async fn fetch_opendap_links(
        &self,
        dispatch: &dyn Dispatch,
        auth_token: &str,
        retrieval: &RetrievalCollection,
    ) -> Result<usize> {
        let outcome = match ous_params(retrieval) {
            Ok(params) => {
                OusRequest::new(self.client().clone(), self.config().api_host(), auth_token)
                    .search(&params)
                    .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(links) => {
                let link_count = links.len();
                tracing::info!(
                    "OUS returned {} links for retrieval collection {}",
                    link_count,
                    retrieval.id
                );
                dispatch.dispatch(update_granule_links(GranuleLinks {
                    id: retrieval.id,
                    links,
                }));
                Ok(link_count)
            }
            Err(e) => {
                self.error_logger()
                    .report(&e, "fetchOpendapLinks", "OPeNDAP links")
                    .await;
                Err(e)
            }
        }
    }

    /// Resolves links with whichever service the retrieval's access method
    /// calls for.
    pub async fn fetch_retrieval_links(
        &self,
        dispatch: &dyn Dispatch,
        auth_token: &str,
        retrieval: &RetrievalCollection,
    ) -> Result<usize> {
        if retrieval.access_method.is_opendap() {
            self.fetch_opendap_links(dispatch, auth_token, retrieval).await
        } else {
            self.fetch_links(dispatch, auth_token, retrieval).await
        }
    }
}
