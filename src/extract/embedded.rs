//! Readers for machine-readable data embedded in product pages: JSON-LD
//! product blocks and variant/inventory records buried in script text.
//! Shared by the price chain and the multi-signal stock policy.

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use super::Probe;

/// One embedded variant/inventory record.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub available: bool,
    pub price: Option<f64>,
}

/// Find a JSON-LD `Product` block. A `script[type="application/ld+json"]`
/// element that fails to parse yields `Malformed` (unless another block
/// parses to a Product first).
pub fn structured_product(doc: &Html) -> Probe<Value> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    let mut saw_malformed = false;

    for script in doc.select(&sel) {
        let text: String = script.text().collect();
        let parsed: Value = match serde_json::from_str(text.trim()) {
            Ok(v) => v,
            Err(_) => {
                saw_malformed = true;
                continue;
            }
        };
        if let Some(product) = find_product(parsed) {
            return Probe::Found(product);
        }
    }

    if saw_malformed {
        Probe::Malformed
    } else {
        Probe::Absent
    }
}

fn find_product(v: Value) -> Option<Value> {
    match v {
        Value::Object(ref obj) => {
            if obj.get("@type").and_then(Value::as_str) == Some("Product") {
                Some(v)
            } else {
                None
            }
        }
        Value::Array(items) => items.into_iter().find_map(find_product),
        _ => None,
    }
}

/// The `offers` field of a Product block — an object, or the first element of
/// an offer array.
pub fn product_offer(product: &Value) -> Option<&Value> {
    match product.get("offers")? {
        v @ Value::Object(_) => Some(v),
        Value::Array(items) => items.first(),
        _ => None,
    }
}

/// Recover embedded variant records from script text. Tries the known
/// embedding shapes in order; a shape that matches but holds unparseable JSON
/// counts as Malformed rather than silently vanishing.
pub fn variant_records(doc: &Html) -> Probe<Vec<Variant>> {
    // Non-greedy brace capture mirrors how these blobs are actually embedded:
    // a single statement ending in `};` on e-commerce product pages.
    let object_patterns = [
        Regex::new(r"(?s)window\.__INITIAL_STATE__\s*=\s*(\{.*?\});").unwrap(),
        Regex::new(r"(?s)window\.productData\s*=\s*(\{.*?\});").unwrap(),
    ];
    let array_pattern = Regex::new(r#"(?s)"variants"\s*:\s*(\[.*?\])"#).unwrap();

    let sel = Selector::parse("script").unwrap();
    let mut saw_malformed = false;

    for script in doc.select(&sel) {
        let text: String = script.text().collect();
        if text.trim().is_empty() {
            continue;
        }

        for pattern in &object_patterns {
            if let Some(caps) = pattern.captures(&text) {
                match serde_json::from_str::<Value>(&caps[1]) {
                    Ok(obj) => {
                        if let Some(items) = obj.get("variants").and_then(Value::as_array) {
                            return Probe::Found(parse_variants(items));
                        }
                    }
                    Err(_) => saw_malformed = true,
                }
            }
        }

        if let Some(caps) = array_pattern.captures(&text) {
            match serde_json::from_str::<Value>(&caps[1]) {
                Ok(Value::Array(ref items)) => return Probe::Found(parse_variants(items)),
                Ok(_) => saw_malformed = true,
                Err(_) => saw_malformed = true,
            }
        }
    }

    if saw_malformed {
        Probe::Malformed
    } else {
        Probe::Absent
    }
}

fn parse_variants(items: &[Value]) -> Vec<Variant> {
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let flag = obj
                .get("available")
                .or_else(|| obj.get("inStock"))
                .or_else(|| obj.get("in_stock"));
            let price = obj
                .get("price")
                .or_else(|| obj.get("compare_at_price"))
                .and_then(numeric);
            Some(Variant {
                available: flag.map(truthy).unwrap_or(false),
                price,
            })
        })
        .collect()
}

/// Availability flags come through as booleans or as loosely-typed strings.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => {
            matches!(s.to_lowercase().as_str(), "true" | "in stock" | "available")
        }
        _ => false,
    }
}

/// Prices come through as numbers or as `$`/comma-decorated strings.
pub fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(['$', ','], "").trim().parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
