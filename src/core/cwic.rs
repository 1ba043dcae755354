use crate::domain::model::Granule;
use crate::utils::error::{Result, SearchError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CwicFeed {
    pub total_results: u64,
    pub entries: Vec<Granule>,
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn attributes_to_json(element: &BytesStart<'_>) -> Result<Value> {
    let mut object = serde_json::Map::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        object.insert(key, Value::String(value));
    }
    Ok(Value::Object(object))
}

/// Repeated child elements become arrays, `link` always is one.
fn insert_field(entry: &mut Granule, key: String, value: Value) {
    match entry.get_mut(&key) {
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None if key == "link" => {
            entry.insert(key, Value::Array(vec![value]));
        }
        None => {
            entry.insert(key, value);
        }
    }
}

fn has_browse_link(entry: &Granule) -> bool {
    entry
        .get("link")
        .and_then(Value::as_array)
        .map(|links| {
            links
                .iter()
                .any(|link| link.get("rel").and_then(Value::as_str) == Some("icon"))
        })
        .unwrap_or(false)
}

/// Tags a parsed CWIC entry the way the results list expects.
fn finish_entry(mut entry: Granule) -> Granule {
    let browse_flag = has_browse_link(&entry);
    entry.insert("isCwic".to_string(), Value::Bool(true));
    entry.insert("browse_flag".to_string(), Value::Bool(browse_flag));
    entry
}

/// Parses a CWIC OpenSearch Atom feed into granule records.
///
/// Each direct child of `<entry>` becomes a key holding its text. Empty
/// elements such as `<link .../>` contribute their attributes instead.
pub fn parse_cwic_feed(xml: &str) -> Result<CwicFeed> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut feed = CwicFeed::default();
    let mut entry: Option<Granule> = None;
    let mut field: Option<(String, Value)> = None;
    let mut field_text = String::new();
    let mut nested_depth = 0usize;
    let mut in_total_results = false;
    let mut total_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                let name = element_name(&element);
                if entry.is_none() {
                    if name == "entry" {
                        entry = Some(Granule::new());
                    } else if name == "opensearch:totalResults" {
                        in_total_results = true;
                        total_text.clear();
                    }
                } else if field.is_none() {
                    let attributes = attributes_to_json(&element)?;
                    field = Some((name, attributes));
                    field_text.clear();
                    nested_depth = 0;
                } else {
                    nested_depth += 1;
                }
            }
            Ok(Event::Empty(element)) => {
                if let (Some(current), None) = (entry.as_mut(), field.as_ref()) {
                    let name = element_name(&element);
                    let attributes = attributes_to_json(&element)?;
                    insert_field(current, name, attributes);
                }
            }
            Ok(Event::Text(text)) => {
                if field.is_some() {
                    field_text.push_str(&text.unescape()?);
                } else if in_total_results {
                    total_text.push_str(&text.unescape()?);
                }
            }
            Ok(Event::CData(data)) => {
                if field.is_some() {
                    field_text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::End(element)) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                if field.is_some() && nested_depth > 0 {
                    nested_depth -= 1;
                } else if let Some((field_name, attributes)) = field.take() {
                    let value = if field_text.is_empty() {
                        attributes
                    } else {
                        Value::String(field_text.clone())
                    };
                    if let Some(current) = entry.as_mut() {
                        insert_field(current, field_name, value);
                    }
                } else if name == "entry" {
                    if let Some(finished) = entry.take() {
                        feed.entries.push(finish_entry(finished));
                    }
                } else if in_total_results {
                    in_total_results = false;
                    feed.total_results = total_text.trim().parse().map_err(|_| {
                        SearchError::ValidationError {
                            message: format!("Invalid CWIC totalResults: '{}'", total_text),
                        }
                    })?;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    Ok(feed)
}
