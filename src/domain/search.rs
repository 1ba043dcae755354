use crate::domain::model::Granule;
use serde::{Deserialize, Serialize};

/// Parameters for a CMR granule search, shared by the direct and lambda paths.
/// Missing paging fields fall back to the first page of twenty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GranuleSearchParams {
    pub echo_collection_id: String,
    pub page_num: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polygon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub concept_id: Vec<String>,
    #[serde(skip_serializing_if = "ExcludeConceptIds::is_empty")]
    pub exclude: ExcludeConceptIds,
}

impl Default for GranuleSearchParams {
    fn default() -> Self {
        Self {
            echo_collection_id: String::new(),
            page_num: 1,
            page_size: 20,
            sort_key: None,
            temporal: None,
            bounding_box: None,
            polygon: None,
            point: None,
            circle: None,
            concept_id: Vec::new(),
            exclude: ExcludeConceptIds::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeConceptIds {
    pub concept_id: Vec<String>,
}

impl ExcludeConceptIds {
    pub fn is_empty(&self) -> bool {
        self.concept_id.is_empty()
    }
}

impl GranuleSearchParams {
    /// Form pairs for CMR, using the bracketed array keys CMR expects.
    pub fn to_form_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (
                "echo_collection_id".to_string(),
                self.echo_collection_id.clone(),
            ),
            ("page_num".to_string(), self.page_num.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
        ];

        let optional = [
            ("sort_key", &self.sort_key),
            ("temporal", &self.temporal),
            ("bounding_box", &self.bounding_box),
            ("polygon", &self.polygon),
            ("point", &self.point),
            ("circle", &self.circle),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key.to_string(), value.clone()));
            }
        }

        for id in &self.concept_id {
            pairs.push(("concept_id[]".to_string(), id.clone()));
        }
        for id in &self.exclude.concept_id {
            pairs.push(("exclude[concept_id][]".to_string(), id.clone()));
        }

        pairs
    }
}

/// CWIC's adapter takes camelCase keys and has no polygon support.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CwicSearchParams {
    pub echo_collection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal: Option<String>,
    pub page_num: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GranuleSearchResponse {
    pub entries: Vec<Granule>,
    pub hits: u64,
    /// Refreshed token returned by the lambda in the `jwt-token` header.
    pub jwt_token: Option<String>,
}

/// OPeNDAP subsetting parameters. Field order is the order sent on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OusParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<String>,
    pub echo_collection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_granules: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub granules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<String>,
}

/// Body the browser client sends to every lambda proxy endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaEnvelope<P> {
    pub request_id: String,
    pub params: P,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_pairs_use_bracketed_array_keys() {
        let params = GranuleSearchParams {
            echo_collection_id: "C10000005-EDSC".to_string(),
            page_num: 1,
            page_size: 20,
            sort_key: Some("-start_date".to_string()),
            concept_id: vec!["G1-EDSC".to_string()],
            exclude: ExcludeConceptIds {
                concept_id: vec!["G2-EDSC".to_string(), "G3-EDSC".to_string()],
            },
            ..Default::default()
        };

        let pairs = params.to_form_pairs();

        assert_eq!(pairs[0], ("echo_collection_id".to_string(), "C10000005-EDSC".to_string()));
        assert!(pairs.contains(&("sort_key".to_string(), "-start_date".to_string())));
        assert!(pairs.contains(&("concept_id[]".to_string(), "G1-EDSC".to_string())));
        assert_eq!(
            pairs
                .iter()
                .filter(|(key, _)| key == "exclude[concept_id][]")
                .count(),
            2
        );
        assert!(!pairs.iter().any(|(key, _)| key == "polygon"));
    }

    #[test]
    fn test_missing_paging_defaults_to_first_page() {
        let params: GranuleSearchParams =
            serde_json::from_value(serde_json::json!({ "echo_collection_id": "C1-EDSC" }))
                .unwrap();

        assert_eq!(params.page_num, 1);
        assert_eq!(params.page_size, 20);
        assert!(params
            .to_form_pairs()
            .contains(&("page_size".to_string(), "20".to_string())));
    }

    #[test]
    fn test_ous_params_serialize_in_wire_order() {
        let params = OusParams {
            bounding_box: Some("1,2,3,4".to_string()),
            echo_collection_id: "C10000005-EDSC".to_string(),
            exclude_granules: Some(true),
            granules: vec!["G10000404-EDSC".to_string()],
            format: Some("nc4".to_string()),
            variables: vec!["V1000004-EDSC".to_string()],
        };

        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"bounding_box":"1,2,3,4","echo_collection_id":"C10000005-EDSC","exclude_granules":true,"granules":["G10000404-EDSC"],"format":"nc4","variables":["V1000004-EDSC"]}"#
        );
    }
}
