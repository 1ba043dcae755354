use crate::core::spatial::mbr;
use crate::domain::model::{CollectionMetadata, CollectionQuery, MapProjection};
use crate::utils::error::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

const OPEN_ALTIMETRY_ROOT: &str = "https://openaltimetry.org/data/icesat2/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffLink {
    pub title: String,
    pub href: String,
}

/// Calendar date of a temporal bound, accepting the formats the UI produces.
fn to_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|parsed| parsed.date())
        .or_else(|| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
}

/// Link that opens the current search in OpenAltimetry's ICESat-2 viewer.
pub fn fetch_open_altimetry_handoff_url(
    collection: &CollectionMetadata,
    search: &CollectionQuery,
    projection: MapProjection,
) -> Result<HandoffLink> {
    let mut query = form_urlencoded::Serializer::new(String::new());

    if let Some(short_name) = &collection.short_name {
        query.append_pair("product", short_name);
    }

    let temporal = &search.temporal;
    if let Some(start) = temporal.start_date.as_deref().and_then(to_date) {
        query.append_pair("start_date", &start.format("%Y-%m-%d").to_string());
    }
    if let Some(end) = temporal.end_date.as_deref().and_then(to_date) {
        query.append_pair("end_date", &end.format("%Y-%m-%d").to_string());
    }

    if let Some(rectangle) = mbr(&search.spatial)? {
        let [minx, miny, maxx, maxy] = rectangle.edge_labels();
        query.append_pair("minx", minx);
        query.append_pair("miny", miny);
        query.append_pair("maxx", maxx);
        query.append_pair("maxy", maxy);
    }

    query.append_pair("mapType", projection.as_str());

    Ok(HandoffLink {
        title: "Open Altimetry".to_string(),
        href: format!("{}?{}", OPEN_ALTIMETRY_ROOT, query.finish()),
    })
}
