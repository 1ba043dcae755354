use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Granule metadata is passed through untouched apart from the `isCwic` tag.
pub type Granule = serde_json::Map<String, serde_json::Value>;

pub const CWIC_TAG: &str = "org.ceos.wgiss.cwic.granules.prod";

/// Accepts either `"a"` or `["a", "b"]` for list-valued query fields.
pub fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrSeq {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<StringOrSeq>::deserialize(deserializer)? {
        Some(StringOrSeq::One(value)) => vec![value],
        Some(StringOrSeq::Many(values)) => values,
        None => Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Search state snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchState {
    pub auth_token: String,
    pub metadata: MetadataState,
    pub project: ProjectState,
    pub focused_collection: String,
    pub query: QueryState,
}

impl SearchState {
    pub fn collection_metadata(&self, collection_id: &str) -> CollectionMetadata {
        self.metadata
            .collections
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn excluded_granule_ids(&self, collection_id: &str) -> Vec<String> {
        self.query
            .collection
            .by_id
            .get(collection_id)
            .map(|query| query.granules.excluded_granule_ids.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataState {
    pub collections: HashMap<String, CollectionMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionMetadata {
    #[serde(rename = "hasGranules", skip_serializing_if = "Option::is_none")]
    pub has_granules: Option<bool>,
    pub tags: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
}

impl CollectionMetadata {
    /// CWIC collections carry the CWIC tag and have no granules indexed in CMR.
    pub fn is_cwic(&self) -> bool {
        !self.has_granules.unwrap_or(true) && self.tags.contains_key(CWIC_TAG)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectState {
    pub collections: ProjectCollections,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectCollections {
    pub all_ids: Vec<String>,
    pub by_id: HashMap<String, ProjectCollection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectCollection {
    pub granules: ProjectGranules,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectGranules {
    pub added_granule_ids: Vec<String>,
    pub removed_granule_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryState {
    pub collection: CollectionQuery,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionQuery {
    pub temporal: Temporal,
    pub spatial: Spatial,
    pub by_id: HashMap<String, CollectionQueryById>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionQueryById {
    pub granules: GranuleQuery,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GranuleQuery {
    pub excluded_granule_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Temporal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Temporal {
    /// CMR form: `start,end`, either side may be empty.
    pub fn to_cmr_param(&self) -> Option<String> {
        if self.start_date.is_none() && self.end_date.is_none() {
            return None;
        }
        Some(format!(
            "{},{}",
            self.start_date.as_deref().unwrap_or_default(),
            self.end_date.as_deref().unwrap_or_default()
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Spatial {
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub bounding_box: Vec<String>,
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub polygon: Vec<String>,
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub point: Vec<String>,
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub circle: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapProjection {
    #[default]
    Geographic,
    Arctic,
    Antarctic,
}

impl MapProjection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapProjection::Geographic => "geographic",
            MapProjection::Arctic => "arctic",
            MapProjection::Antarctic => "antarctic",
        }
    }
}

// ---------------------------------------------------------------------------
// Retrievals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalCollection {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub access_method: AccessMethod,
    pub collection_id: String,
    pub collection_metadata: serde_json::Value,
    pub granule_params: RetrievalGranuleParams,
    pub granule_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessMethod {
    #[serde(rename = "type")]
    pub method_type: String,
    pub selected_variables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_output_format: Option<String>,
}

impl AccessMethod {
    pub fn is_opendap(&self) -> bool {
        self.method_type.eq_ignore_ascii_case("opendap")
    }
}

/// Granule query saved with a retrieval; keys follow CMR's snake_case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalGranuleParams {
    pub echo_collection_id: String,
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub bounding_box: Vec<String>,
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub polygon: Vec<String>,
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub point: Vec<String>,
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub circle: Vec<String>,
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub concept_id: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<ExcludeParams>,
}

impl RetrievalGranuleParams {
    pub fn spatial(&self) -> Spatial {
        Spatial {
            bounding_box: self.bounding_box.clone(),
            polygon: self.polygon.clone(),
            point: self.point.clone(),
            circle: self.circle.clone(),
        }
    }

    pub fn excluded_ids(&self) -> &[String] {
        self.exclude
            .as_ref()
            .map(|exclude| exclude.concept_id.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeParams {
    #[serde(deserialize_with = "string_or_seq")]
    pub concept_id: Vec<String>,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    StartedGranulesTimer(String),
    FinishedGranulesTimer(String),
    StartedProjectGranulesTimer(String),
    FinishedProjectGranulesTimer(String),
    LoadingGranules(String),
    LoadedGranules(LoadedPayload),
    ProjectGranulesLoading(String),
    ProjectGranulesLoaded(LoadedPayload),
    ToggleSpatialPolygonWarning(bool),
    UpdateAuth(String),
    AddGranuleMetadata(Vec<Granule>),
    UpdateGranuleResults(GranuleResults),
    UpdateProjectGranuleResults(GranuleResults),
    ExcludeGranuleId(ExcludeGranulePayload),
    UndoExcludeGranuleId(String),
    UpdateGranuleLinks(GranuleLinks),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedPayload {
    pub collection_id: String,
    pub loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludeGranulePayload {
    pub collection_id: String,
    pub granule_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GranuleLinks {
    pub id: u64,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GranuleResults {
    pub collection_id: String,
    pub results: Vec<Granule>,
    pub is_cwic: bool,
    pub hits: u64,
    pub single_granule_size: f64,
    pub total_size: TotalSize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalSize {
    pub size: String,
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actions_serialize_as_type_and_payload() {
        let action = Action::LoadedGranules(LoadedPayload {
            collection_id: "collectionId".to_string(),
            loaded: true,
        });

        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "type": "LOADED_GRANULES",
                "payload": { "collectionId": "collectionId", "loaded": true }
            })
        );

        let toggle = Action::ToggleSpatialPolygonWarning(false);
        assert_eq!(
            serde_json::to_value(&toggle).unwrap(),
            json!({ "type": "TOGGLE_SPATIAL_POLYGON_WARNING", "payload": false })
        );
    }

    #[test]
    fn test_spatial_accepts_string_or_list() {
        let single: Spatial =
            serde_json::from_value(json!({ "polygon": "-77,38,-77,38,-76,38,-77,38" })).unwrap();
        let list: Spatial =
            serde_json::from_value(json!({ "polygon": ["-77,38,-77,38,-76,38,-77,38"] })).unwrap();

        assert_eq!(single, list);
        assert!(single.bounding_box.is_empty());
    }

    #[test]
    fn test_cwic_detection_requires_tag_and_no_granules() {
        let cwic: CollectionMetadata = serde_json::from_value(json!({
            "hasGranules": false,
            "tags": { "org.ceos.wgiss.cwic.granules.prod": {} }
        }))
        .unwrap();
        assert!(cwic.is_cwic());

        let indexed: CollectionMetadata = serde_json::from_value(json!({
            "tags": { "org.ceos.wgiss.cwic.granules.prod": {} }
        }))
        .unwrap();
        assert!(!indexed.is_cwic());

        let untagged: CollectionMetadata =
            serde_json::from_value(json!({ "hasGranules": false })).unwrap();
        assert!(!untagged.is_cwic());
    }

    #[test]
    fn test_temporal_to_cmr_param() {
        let temporal = Temporal {
            start_date: Some("2019-01-01T00:00:00Z".to_string()),
            end_date: None,
        };
        assert_eq!(
            temporal.to_cmr_param().as_deref(),
            Some("2019-01-01T00:00:00Z,")
        );
        assert_eq!(Temporal::default().to_cmr_param(), None);
    }
}
