use crate::core::request::{
    CmrGranuleRequest, CwicGranuleRequest, ErrorLogger, LambdaGranuleRequest,
};
use crate::core::size::populate_granule_results;
use crate::core::spatial::mbr;
use crate::domain::model::{
    Action, ExcludeGranulePayload, Granule, GranuleLinks, GranuleResults, LoadedPayload,
    SearchState, Spatial,
};
use crate::domain::ports::{Dispatch, EndpointConfig, EventEmitter, GranuleRequest};
use crate::domain::search::{
    CwicSearchParams, ExcludeConceptIds, GranuleSearchParams, GranuleSearchResponse,
};
use crate::utils::error::Result;
use reqwest::Client;
use serde_json::Value;
use std::time::Instant;

const DEFAULT_SORT_KEY: &str = "-start_date";

pub fn update_granule_results(payload: GranuleResults) -> Action {
    Action::UpdateGranuleResults(payload)
}

pub fn update_granule_links(payload: GranuleLinks) -> Action {
    Action::UpdateGranuleLinks(payload)
}

/// Which results list a search feeds. The two lists share one sequence but
/// use their own action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchKind {
    Focused,
    Project,
}

impl SearchKind {
    fn name(&self) -> &'static str {
        match self {
            SearchKind::Focused => "getSearchGranules",
            SearchKind::Project => "getProjectGranules",
        }
    }

    fn started_timer(&self, collection_id: &str) -> Action {
        match self {
            SearchKind::Focused => Action::StartedGranulesTimer(collection_id.to_string()),
            SearchKind::Project => Action::StartedProjectGranulesTimer(collection_id.to_string()),
        }
    }

    fn finished_timer(&self, collection_id: &str) -> Action {
        match self {
            SearchKind::Focused => Action::FinishedGranulesTimer(collection_id.to_string()),
            SearchKind::Project => Action::FinishedProjectGranulesTimer(collection_id.to_string()),
        }
    }

    fn loading(&self, collection_id: &str) -> Action {
        match self {
            SearchKind::Focused => Action::LoadingGranules(collection_id.to_string()),
            SearchKind::Project => Action::ProjectGranulesLoading(collection_id.to_string()),
        }
    }

    fn loaded(&self, collection_id: &str, loaded: bool) -> Action {
        let payload = LoadedPayload {
            collection_id: collection_id.to_string(),
            loaded,
        };
        match self {
            SearchKind::Focused => Action::LoadedGranules(payload),
            SearchKind::Project => Action::ProjectGranulesLoaded(payload),
        }
    }

    fn results(&self, payload: GranuleResults) -> Action {
        match self {
            SearchKind::Focused => update_granule_results(payload),
            SearchKind::Project => Action::UpdateProjectGranuleResults(payload),
        }
    }
}

fn tag_granules(entries: Vec<Granule>, is_cwic: bool) -> Vec<Granule> {
    entries
        .into_iter()
        .map(|mut granule| {
            granule.insert("isCwic".to_string(), Value::Bool(is_cwic));
            granule
        })
        .collect()
}

fn first(values: &[String]) -> Option<String> {
    values.first().cloned()
}

/// Granule search and link resolution for the search UI.
///
/// Each operation reads a snapshot of the search state and reports progress
/// only through the actions it dispatches.
pub struct GranuleActions<C: EndpointConfig> {
    config: C,
    client: Client,
}

impl<C: EndpointConfig> GranuleActions<C> {
    pub fn new(config: C) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: C, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// Logged-in users go through the lambda, everyone else straight to CMR.
    pub(crate) fn granule_request(&self, auth_token: &str) -> Box<dyn GranuleRequest> {
        if auth_token.is_empty() {
            Box::new(CmrGranuleRequest::new(
                self.client.clone(),
                self.config.cmr_host(),
            ))
        } else {
            Box::new(LambdaGranuleRequest::new(
                self.client.clone(),
                self.config.api_host(),
                auth_token,
            ))
        }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn error_logger(&self) -> ErrorLogger {
        ErrorLogger::new(self.client.clone(), self.config.api_host())
    }

    fn focused_params(&self, state: &SearchState, collection_id: &str) -> GranuleSearchParams {
        let query = &state.query.collection;
        let granule_query = query.by_id.get(collection_id).map(|q| &q.granules);

        let mut params = self.base_params(state, collection_id);
        params.page_num = granule_query.and_then(|q| q.page_num).unwrap_or(1);
        params.sort_key = Some(
            granule_query
                .and_then(|q| q.sort_key.clone())
                .unwrap_or_else(|| DEFAULT_SORT_KEY.to_string()),
        );
        params.exclude = ExcludeConceptIds {
            concept_id: state.excluded_granule_ids(collection_id),
        };
        params
    }

    fn project_params(&self, state: &SearchState, collection_id: &str) -> GranuleSearchParams {
        let granules = state
            .project
            .collections
            .by_id
            .get(collection_id)
            .map(|collection| collection.granules.clone())
            .unwrap_or_default();

        let mut params = self.base_params(state, collection_id);
        params.sort_key = Some(DEFAULT_SORT_KEY.to_string());
        params.concept_id = granules.added_granule_ids;
        params.exclude = ExcludeConceptIds {
            concept_id: granules.removed_granule_ids,
        };
        params
    }

    fn base_params(&self, state: &SearchState, collection_id: &str) -> GranuleSearchParams {
        let query = &state.query.collection;
        GranuleSearchParams {
            echo_collection_id: collection_id.to_string(),
            page_num: 1,
            page_size: self.config.granule_page_size(),
            temporal: query.temporal.to_cmr_param(),
            bounding_box: first(&query.spatial.bounding_box),
            polygon: first(&query.spatial.polygon),
            point: first(&query.spatial.point),
            circle: first(&query.spatial.circle),
            ..Default::default()
        }
    }

    /// CWIC only understands bounding boxes, so any other shape is replaced by
    /// its MBR. Polygons lose precision doing so and raise the warning.
    fn cwic_params(
        &self,
        dispatch: &dyn Dispatch,
        spatial: &Spatial,
        params: &GranuleSearchParams,
    ) -> Result<CwicSearchParams> {
        if spatial.bounding_box.is_empty() && !spatial.polygon.is_empty() {
            dispatch.dispatch(Action::ToggleSpatialPolygonWarning(true));
        }

        Ok(CwicSearchParams {
            echo_collection_id: params.echo_collection_id.clone(),
            bounding_box: mbr(spatial)?.map(|rectangle| rectangle.to_bounding_box()),
            temporal: params.temporal.clone(),
            page_num: params.page_num,
            page_size: params.page_size,
        })
    }

    async fn run_search(
        &self,
        dispatch: &dyn Dispatch,
        state: &SearchState,
        is_cwic: bool,
        params: &GranuleSearchParams,
    ) -> Result<GranuleSearchResponse> {
        if is_cwic {
            let cwic_params = self.cwic_params(dispatch, &state.query.collection.spatial, params)?;
            let request =
                CwicGranuleRequest::new(self.client.clone(), self.config.api_host(), &state.auth_token);
            let feed = request.search(&cwic_params).await?;
            return Ok(GranuleSearchResponse {
                entries: feed.entries,
                hits: feed.total_results,
                jwt_token: None,
            });
        }

        self.granule_request(&state.auth_token).search(params).await
    }

    async fn search_collection(
        &self,
        dispatch: &dyn Dispatch,
        state: &SearchState,
        kind: SearchKind,
        collection_id: &str,
        params: GranuleSearchParams,
    ) -> Result<GranuleResults> {
        let started = Instant::now();
        dispatch.dispatch(kind.started_timer(collection_id));
        dispatch.dispatch(kind.loading(collection_id));
        dispatch.dispatch(Action::ToggleSpatialPolygonWarning(false));

        let is_cwic = state.collection_metadata(collection_id).is_cwic();
        let outcome = self.run_search(dispatch, state, is_cwic, &params).await;

        dispatch.dispatch(kind.finished_timer(collection_id));
        tracing::info!(
            "{} for {} finished in {:?}",
            kind.name(),
            collection_id,
            started.elapsed()
        );

        match outcome {
            Ok(response) => {
                if let Some(token) = response.jwt_token {
                    dispatch.dispatch(Action::UpdateAuth(token));
                }
                dispatch.dispatch(kind.loaded(collection_id, true));

                let results = tag_granules(response.entries, is_cwic);
                dispatch.dispatch(Action::AddGranuleMetadata(results.clone()));

                let payload =
                    populate_granule_results(collection_id, is_cwic, results, response.hits);
                dispatch.dispatch(kind.results(payload.clone()));

                tracing::debug!(
                    "{} granules loaded for {} ({} hits)",
                    payload.results.len(),
                    collection_id,
                    payload.hits
                );
                Ok(payload)
            }
            Err(e) => {
                dispatch.dispatch(kind.loaded(collection_id, false));
                self.error_logger().report(&e, kind.name(), "granules").await;
                Err(e)
            }
        }
    }

    /// Searches granules for the focused collection.
    pub async fn get_search_granules(
        &self,
        dispatch: &dyn Dispatch,
        state: &SearchState,
    ) -> Result<GranuleResults> {
        let collection_id = state.focused_collection.clone();
        let params = self.focused_params(state, &collection_id);
        self.search_collection(dispatch, state, SearchKind::Focused, &collection_id, params)
            .await
    }

    /// Searches granules for every project collection, in project order. A
    /// failing collection does not stop the others.
    pub async fn get_project_granules(
        &self,
        dispatch: &dyn Dispatch,
        state: &SearchState,
    ) -> Vec<Result<GranuleResults>> {
        let mut outcomes = Vec::new();
        for collection_id in &state.project.collections.all_ids {
            let params = self.project_params(state, collection_id);
            outcomes.push(
                self.search_collection(dispatch, state, SearchKind::Project, collection_id, params)
                    .await,
            );
        }
        outcomes
    }

    /// Hides a granule from the focused results and searches again.
    pub async fn exclude_granule(
        &self,
        dispatch: &dyn Dispatch,
        events: &dyn EventEmitter,
        state: &mut SearchState,
        payload: ExcludeGranulePayload,
    ) -> Result<GranuleResults> {
        dispatch.dispatch(Action::ExcludeGranuleId(payload.clone()));

        state
            .query
            .collection
            .by_id
            .entry(payload.collection_id.clone())
            .or_default()
            .granules
            .excluded_granule_ids
            .push(payload.granule_id.clone());

        events.emit(
            &format!("map.layer.{}.stickygranule", payload.collection_id),
            serde_json::json!({ "granule": null }),
        );

        self.get_search_granules(dispatch, state).await
    }

    /// Restores the most recently excluded granule and searches again.
    pub async fn undo_exclude_granule(
        &self,
        dispatch: &dyn Dispatch,
        state: &mut SearchState,
        collection_id: &str,
    ) -> Result<GranuleResults> {
        dispatch.dispatch(Action::UndoExcludeGranuleId(collection_id.to_string()));

        if let Some(query) = state.query.collection.by_id.get_mut(collection_id) {
            query.granules.excluded_granule_ids.pop();
        }

        self.get_search_granules(dispatch, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EarthdataConfig;
    use crate::domain::model::{CollectionQueryById, GranuleQuery, Temporal};

    fn actions() -> GranuleActions<EarthdataConfig> {
        GranuleActions::new(EarthdataConfig::default())
    }

    #[test]
    fn test_update_granule_results_creates_action() {
        let payload = populate_granule_results("C1-EDSC", false, Vec::new(), 0);
        assert_eq!(
            update_granule_results(payload.clone()),
            Action::UpdateGranuleResults(payload)
        );
    }

    #[test]
    fn test_focused_params_carry_query_and_exclusions() {
        let mut state = SearchState {
            focused_collection: "C1-EDSC".to_string(),
            ..Default::default()
        };
        state.query.collection.temporal = Temporal {
            start_date: Some("2019-01-01T00:00:00Z".to_string()),
            end_date: Some("2019-02-01T00:00:00Z".to_string()),
        };
        state.query.collection.spatial.polygon = vec!["1,1,2,1,2,2,1,1".to_string()];
        state.query.collection.by_id.insert(
            "C1-EDSC".to_string(),
            CollectionQueryById {
                granules: GranuleQuery {
                    excluded_granule_ids: vec!["G1-EDSC".to_string()],
                    page_num: Some(3),
                    sort_key: None,
                },
            },
        );

        let params = actions().focused_params(&state, "C1-EDSC");

        assert_eq!(params.echo_collection_id, "C1-EDSC");
        assert_eq!(params.page_num, 3);
        assert_eq!(params.page_size, 20);
        assert_eq!(params.sort_key.as_deref(), Some("-start_date"));
        assert_eq!(
            params.temporal.as_deref(),
            Some("2019-01-01T00:00:00Z,2019-02-01T00:00:00Z")
        );
        assert_eq!(params.polygon.as_deref(), Some("1,1,2,1,2,2,1,1"));
        assert_eq!(params.exclude.concept_id, vec!["G1-EDSC".to_string()]);
    }

    #[test]
    fn test_project_params_use_added_and_removed_ids() {
        let mut state = SearchState::default();
        state.project.collections.all_ids = vec!["C1-EDSC".to_string()];
        let collection = state
            .project
            .collections
            .by_id
            .entry("C1-EDSC".to_string())
            .or_default();
        collection.granules.added_granule_ids = vec!["G2-EDSC".to_string()];
        collection.granules.removed_granule_ids = vec!["G3-EDSC".to_string()];

        let params = actions().project_params(&state, "C1-EDSC");

        assert_eq!(params.concept_id, vec!["G2-EDSC".to_string()]);
        assert_eq!(params.exclude.concept_id, vec!["G3-EDSC".to_string()]);
        assert_eq!(params.page_num, 1);
    }
}
