use crate::domain::model::{Granule, GranuleResults, TotalSize};
use serde_json::Value;

const SIZE_UNITS: [&str; 5] = ["MB", "GB", "TB", "PB", "EB"];

/// Scales a size in megabytes to the largest unit that keeps it above 1024.
pub fn convert_size(megabytes: f64) -> TotalSize {
    let mut size = megabytes;
    let mut unit = 0;
    while size > 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    TotalSize {
        size: format!("{:.1}", size),
        unit: SIZE_UNITS[unit].to_string(),
    }
}

/// CMR reports `granule_size` in megabytes, as a number or numeric string.
fn granule_size(granule: &Granule) -> f64 {
    match granule.get("granule_size") {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Builds the results payload, estimating the full result size from the
/// average size of the page that came back.
pub fn populate_granule_results(
    collection_id: &str,
    is_cwic: bool,
    results: Vec<Granule>,
    hits: u64,
) -> GranuleResults {
    let single_granule_size = if results.is_empty() {
        0.0
    } else {
        results.iter().map(granule_size).sum::<f64>() / results.len() as f64
    };

    GranuleResults {
        collection_id: collection_id.to_string(),
        is_cwic,
        hits,
        single_granule_size,
        total_size: convert_size(single_granule_size * hits as f64),
        results,
    }
}
