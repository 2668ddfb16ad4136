//! Normalizes the upstream JSON payloads into flat result records.
//!
//! Only the first [`MAX_RESULTS`] raw entries are normalized; anything past
//! that is counted but never inspected, so a malformed tail cannot fail a
//! listing.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const MAX_RESULTS: usize = 12;
pub const DEFAULT_IMAGE_TITLE: &str = "NASA Image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub image_url: String,
    pub title: String,
    pub date_created: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsteroidResult {
    pub name: String,
    pub max_diameter_km: String,
    pub speed_kmh: String,
    pub miss_distance_km: String,
    pub close_date: String,
    pub is_hazardous: bool,
}

/// A truncated listing. `total` is the upstream count before truncation and
/// before link-less items were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    pub total: usize,
    pub records: Vec<T>,
}

impl<T> Batch<T> {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// How forgiving image item parsing is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemShape {
    /// Missing `collection`/`data` fall back to defaults.
    Lenient,
    /// `collection` and each kept item's `data[0]` are required.
    Strict,
}

#[derive(Debug, Default, Deserialize)]
struct RawItem {
    #[serde(default)]
    links: Option<Vec<Option<RawLink>>>,
    #[serde(default)]
    data: Option<Vec<Option<RawItemData>>>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    #[serde(default)]
    href: Option<Value>,
}

// Upstream metadata is loosely typed; scalars are accepted and stringified.
#[derive(Debug, Deserialize)]
struct RawItemData {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    date_created: Option<Value>,
}

fn scalar_text(v: Option<Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Like [`scalar_text`], but `false`, `0` and `""` count as absent.
fn truthy_text(v: Option<Value>) -> Option<String> {
    match v? {
        Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => scalar_text(Some(other)).filter(|s| !s.is_empty()),
    }
}

pub fn search_results(body: &Value) -> Result<Batch<ImageResult>> {
    image_results(body, ItemShape::Lenient)
}

pub fn rover_results(body: &Value) -> Result<Batch<ImageResult>> {
    image_results(body, ItemShape::Strict)
}

pub fn image_results(body: &Value, shape: ItemShape) -> Result<Batch<ImageResult>> {
    let collection = body.get("collection");
    if collection.is_none() && shape == ItemShape::Strict {
        return Err(Error::msg("response has no 'collection'"));
    }
    let items = match collection.and_then(|c| c.get("items")) {
        None | Some(Value::Null) => return Ok(empty()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::msg(format!(
                "expected 'collection.items' to be an array, got {}",
                kind(other)
            )));
        }
    };

    let mut records = Vec::new();
    for (idx, raw) in items.iter().take(MAX_RESULTS).enumerate() {
        let item: RawItem = serde_json::from_value(raw.clone())
            .map_err(|e| Error::msg(format!("malformed image item #{idx}: {e}")))?;
        if let Some(rec) = normalize_image(item, shape)
            .map_err(|e| e.context(format!("image item #{idx}")))?
        {
            records.push(rec);
        }
    }
    Ok(Batch {
        total: items.len(),
        records,
    })
}

fn normalize_image(item: RawItem, shape: ItemShape) -> Result<Option<ImageResult>> {
    let Some(image_url) = item
        .links
        .and_then(|links| links.into_iter().next().flatten())
        .and_then(|l| truthy_text(l.href))
    else {
        return Ok(None);
    };

    let first = item.data.and_then(|d| d.into_iter().next().flatten());
    let (title, date_created) = match (first, shape) {
        (Some(d), ItemShape::Lenient) => (
            truthy_text(d.title).unwrap_or_else(|| DEFAULT_IMAGE_TITLE.to_string()),
            truthy_text(d.date_created).unwrap_or_default(),
        ),
        (None, ItemShape::Lenient) => (DEFAULT_IMAGE_TITLE.to_string(), String::new()),
        (Some(d), ItemShape::Strict) => (
            scalar_text(d.title).unwrap_or_default(),
            scalar_text(d.date_created).unwrap_or_default(),
        ),
        (None, ItemShape::Strict) => return Err(Error::msg("missing 'data[0]'")),
    };

    Ok(Some(ImageResult {
        image_url,
        title,
        date_created,
    }))
}

/// One flattened feed entry, still raw.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry<'a> {
    pub close_date: &'a str,
    pub raw: &'a Value,
}

/// Flattens the date-keyed `near_earth_objects` mapping in key order as
/// received, then array order within each key.
pub fn flatten_feed(neo: &Map<String, Value>) -> Result<Vec<FeedEntry<'_>>> {
    let mut out = Vec::new();
    for (date, list) in neo {
        let Some(list) = list.as_array() else {
            return Err(Error::msg(format!(
                "expected near_earth_objects['{date}'] to be an array, got {}",
                kind(list)
            )));
        };
        out.extend(list.iter().map(|raw| FeedEntry {
            close_date: date.as_str(),
            raw,
        }));
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct RawAsteroid {
    name: String,
    estimated_diameter: RawDiameters,
    close_approach_data: Vec<RawApproach>,
    is_potentially_hazardous_asteroid: bool,
}

#[derive(Debug, Deserialize)]
struct RawDiameters {
    kilometers: RawDiameterRange,
}

#[derive(Debug, Deserialize)]
struct RawDiameterRange {
    estimated_diameter_max: f64,
}

#[derive(Debug, Deserialize)]
struct RawApproach {
    relative_velocity: RawVelocity,
    miss_distance: RawMissDistance,
}

#[derive(Debug, Deserialize)]
struct RawVelocity {
    kilometers_per_hour: Decimal,
}

#[derive(Debug, Deserialize)]
struct RawMissDistance {
    kilometers: Decimal,
}

/// The feed encodes most magnitudes as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Decimal {
    Text(String),
    Number(serde_json::Number),
}

impl Decimal {
    fn integer_part(&self) -> String {
        match self {
            Decimal::Text(s) => truncate_decimal(s).to_string(),
            Decimal::Number(n) => truncate_decimal(&n.to_string()).to_string(),
        }
    }
}

/// Drops everything from the first `.`; never rounds.
pub fn truncate_decimal(s: &str) -> &str {
    s.split('.').next().unwrap_or(s)
}

/// Two-decimal fixed notation. Exact halves round away from zero, where
/// `{:.2}` would round them to even.
pub fn fixed_2(x: f64) -> String {
    // A value sits exactly between two hundredths only when it is an odd
    // number of eighths.
    let eighths = x * 8.0;
    let is_tie = x.is_finite() && eighths.fract() == 0.0 && eighths % 2.0 != 0.0;
    if !is_tie {
        return format!("{x:.2}");
    }
    let hundredths = (x.abs() * 100.0).ceil() as u64;
    let sign = if x < 0.0 { "-" } else { "" };
    format!("{sign}{}.{:02}", hundredths / 100, hundredths % 100)
}

/// `None` when the payload carries no `near_earth_objects` at all.
pub fn asteroid_results(body: &Value) -> Result<Option<Batch<AsteroidResult>>> {
    let neo = match body.get("near_earth_objects") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(m)) => m,
        Some(other) => {
            return Err(Error::msg(format!(
                "expected 'near_earth_objects' to be an object, got {}",
                kind(other)
            )));
        }
    };

    let entries = flatten_feed(neo)?;
    let mut records = Vec::new();
    for entry in entries.iter().take(MAX_RESULTS) {
        records.push(normalize_asteroid(entry)?);
    }
    Ok(Some(Batch {
        total: entries.len(),
        records,
    }))
}

pub fn normalize_asteroid(entry: &FeedEntry<'_>) -> Result<AsteroidResult> {
    let raw: RawAsteroid = serde_json::from_value(entry.raw.clone()).map_err(|e| {
        Error::msg(format!("malformed asteroid on {}: {e}", entry.close_date))
    })?;
    let Some(approach) = raw.close_approach_data.first() else {
        return Err(Error::msg(format!(
            "asteroid '{}' has no close_approach_data",
            raw.name
        )));
    };
    Ok(AsteroidResult {
        max_diameter_km: fixed_2(raw.estimated_diameter.kilometers.estimated_diameter_max),
        speed_kmh: approach.relative_velocity.kilometers_per_hour.integer_part(),
        miss_distance_km: approach.miss_distance.kilometers.integer_part(),
        close_date: entry.close_date.to_string(),
        is_hazardous: raw.is_potentially_hazardous_asteroid,
        name: raw.name,
    })
}

fn empty<T>() -> Batch<T> {
    Batch {
        total: 0,
        records: Vec::new(),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(href: &str, title: &str) -> Value {
        json!({
            "links": [{ "href": href }],
            "data": [{ "title": title, "date_created": "2020-01-01T00:00:00Z" }],
        })
    }

    fn asteroid(name: &str) -> Value {
        json!({
            "name": name,
            "estimated_diameter": { "kilometers": { "estimated_diameter_max": 1.23456 } },
            "close_approach_data": [{
                "relative_velocity": { "kilometers_per_hour": "1234.9876" },
                "miss_distance": { "kilometers": "98765.5" },
            }],
            "is_potentially_hazardous_asteroid": false,
        })
    }

    #[test]
    fn search_skips_linkless_items_and_defaults_title() {
        let body = json!({ "collection": { "items": [
            item("a.jpg", "A"),
            { "data": [{ "title": "no links" }] },
            { "links": [], "data": [] },
            { "links": [{ "href": "d.jpg" }], "data": [{ "title": "" }] },
            { "links": [{ "href": "e.jpg" }] },
        ]}});
        let batch = search_results(&body).unwrap();
        assert_eq!(batch.total, 5);
        let titles: Vec<&str> = batch.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", DEFAULT_IMAGE_TITLE, DEFAULT_IMAGE_TITLE]);
        assert_eq!(batch.records[2].date_created, "");
    }

    #[test]
    fn odd_item_metadata_does_not_sink_the_listing() {
        let body = json!({ "collection": { "items": [
            { "links": [{ "href": "a.jpg" }], "data": [{ "title": 42, "date_created": false }] },
            { "links": [{ "href": "b.jpg" }], "data": [null] },
            { "links": [null, { "href": "skipped.jpg" }], "data": [{ "title": "gone" }] },
            { "links": [{ "href": "c.jpg" }], "data": [{ "title": "ok", "date_created": 2020 }] },
        ]}});
        let batch = search_results(&body).unwrap();
        assert_eq!(batch.total, 4);
        let got: Vec<(&str, &str, &str)> = batch
            .records
            .iter()
            .map(|r| (r.image_url.as_str(), r.title.as_str(), r.date_created.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("a.jpg", "42", ""),
                ("b.jpg", DEFAULT_IMAGE_TITLE, ""),
                ("c.jpg", "ok", "2020"),
            ]
        );
    }

    #[test]
    fn rover_still_rejects_null_data_entry() {
        let body = json!({ "collection": { "items": [
            { "links": [{ "href": "a.jpg" }], "data": [null] },
        ]}});
        assert!(rover_results(&body).is_err());
    }

    #[test]
    fn search_without_collection_is_empty() {
        let batch = search_results(&json!({ "reason": "nope" })).unwrap();
        assert!(batch.is_empty());
        assert!(batch.records.is_empty());
    }

    #[test]
    fn listings_cap_at_twelve_raw_items() {
        let items: Vec<Value> = (0..20).map(|i| item(&format!("{i}.jpg"), "t")).collect();
        let batch = search_results(&json!({ "collection": { "items": items } })).unwrap();
        assert_eq!(batch.total, 20);
        assert_eq!(batch.records.len(), MAX_RESULTS);
        assert_eq!(batch.records[11].image_url, "11.jpg");
    }

    #[test]
    fn linkless_items_inside_the_window_are_not_backfilled() {
        let mut items: Vec<Value> = (0..14).map(|i| item(&format!("{i}.jpg"), "t")).collect();
        items[3] = json!({ "data": [{ "title": "hidden" }] });
        let batch = search_results(&json!({ "collection": { "items": items } })).unwrap();
        assert_eq!(batch.records.len(), 11);
        assert!(batch.records.iter().all(|r| r.image_url != "12.jpg"));
    }

    #[test]
    fn rover_requires_collection_and_data() {
        assert!(rover_results(&json!({})).is_err());
        assert!(rover_results(&json!({ "collection": {} })).unwrap().is_empty());

        let body = json!({ "collection": { "items": [
            item("a.jpg", "A"),
            { "links": [{ "href": "b.jpg" }] },
        ]}});
        let err = rover_results(&body).unwrap_err().to_string();
        assert!(err.contains("data[0]"), "unexpected err: {err}");
    }

    #[test]
    fn rover_keeps_blank_titles_blank() {
        let body = json!({ "collection": { "items": [
            { "links": [{ "href": "a.jpg" }], "data": [{}] },
        ]}});
        let batch = rover_results(&body).unwrap();
        assert_eq!(batch.records[0].title, "");
    }

    #[test]
    fn feed_flattens_in_key_then_array_order() {
        let body = json!({ "near_earth_objects": {
            "2024-01-02": [asteroid("c"), asteroid("d")],
            "2024-01-01": [asteroid("a"), asteroid("b")],
        }});
        let neo = body["near_earth_objects"].as_object().unwrap();
        let flat = flatten_feed(neo).unwrap();
        assert_eq!(flat.len(), 4);
        let got: Vec<(&str, &str)> = flat
            .iter()
            .map(|e| (e.close_date, e.raw["name"].as_str().unwrap()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("2024-01-02", "c"),
                ("2024-01-02", "d"),
                ("2024-01-01", "a"),
                ("2024-01-01", "b"),
            ]
        );
    }

    #[test]
    fn asteroid_magnitudes_truncate_not_round() {
        let body = json!({ "near_earth_objects": { "2024-01-01": [asteroid("x")] } });
        let batch = asteroid_results(&body).unwrap().unwrap();
        let a = &batch.records[0];
        assert_eq!(a.speed_kmh, "1234");
        assert_eq!(a.miss_distance_km, "98765");
        assert_eq!(a.max_diameter_km, "1.23");
        assert_eq!(a.close_date, "2024-01-01");
        assert!(!a.is_hazardous);
    }

    #[test]
    fn diameter_halves_round_away_from_zero() {
        assert_eq!(fixed_2(0.125), "0.13");
        assert_eq!(fixed_2(0.625), "0.63");
        assert_eq!(fixed_2(0.375), "0.38");
        assert_eq!(fixed_2(-0.125), "-0.13");
        assert_eq!(fixed_2(2.5), "2.50");
        assert_eq!(fixed_2(1.23456), "1.23");
        assert_eq!(fixed_2(0.0625), "0.06");

        let mut raw = asteroid("tie");
        raw["estimated_diameter"]["kilometers"]["estimated_diameter_max"] = json!(0.125);
        let body = json!({ "near_earth_objects": { "2024-01-01": [raw] } });
        let a = &asteroid_results(&body).unwrap().unwrap().records[0];
        assert_eq!(a.max_diameter_km, "0.13");
    }

    #[test]
    fn numeric_magnitudes_are_accepted() {
        let mut raw = asteroid("n");
        raw["close_approach_data"][0]["relative_velocity"]["kilometers_per_hour"] = json!(55.99);
        raw["close_approach_data"][0]["miss_distance"]["kilometers"] = json!(7);
        let body = json!({ "near_earth_objects": { "2024-01-01": [raw] } });
        let a = &asteroid_results(&body).unwrap().unwrap().records[0];
        assert_eq!(a.speed_kmh, "55");
        assert_eq!(a.miss_distance_km, "7");
    }

    #[test]
    fn missing_feed_is_none_and_malformed_asteroid_fails() {
        assert!(asteroid_results(&json!({})).unwrap().is_none());
        let body = json!({ "near_earth_objects": { "2024-01-01": [{ "name": "broken" }] } });
        assert!(asteroid_results(&body).is_err());
    }
}
