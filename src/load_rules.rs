//! Pallet-equivalent load derivation from raw shipment data.
//!
//! Shipment records arrive with inconsistent labelling and free-text
//! quantities. Resolution order is: manual override, site-reported count,
//! then rules over the raw metadata. The caller applies the final default.

use serde_json::{Map, Value};

/// Flower boxes that fit on one pallet.
pub const FLOWERS_PER_PALLET: u32 = 24;
/// Per-piece weight above which a piece is an oversize container.
pub const OVERSIZE_KG_PER_PIECE: f64 = 1500.0;
/// Per-piece weight from which a piece is a mid-size container.
pub const MIDSIZE_KG_PER_PIECE: f64 = 650.0;
pub const OVERSIZE_PALLETS_PER_PIECE: u32 = 6;
pub const MIDSIZE_PALLETS_PER_PIECE: u32 = 3;

const KG_PER_LB: f64 = 0.453_592_37;

/// Raw inputs for one shipment.
#[derive(Debug, Clone, Copy)]
pub struct LoadInput<'a> {
    pub manual_override: Option<i64>,
    pub site_pallets: Option<i64>,
    pub metadata: &'a Value,
}

/// Derives the pallet count, or `None` when nothing usable is present.
pub fn derive_pallets(input: &LoadInput<'_>) -> Option<u32> {
    positive(input.manual_override)
        .or_else(|| positive(input.site_pallets))
        .or_else(|| pallets_from_metadata(input.metadata))
}

/// Applies the metadata rules to a JSON object of raw fields.
pub fn pallets_from_metadata(metadata: &Value) -> Option<u32> {
    let fields = metadata.as_object()?;

    let pieces_fields = PIECES.matches(fields);
    let descriptions = DESCRIPTION.matches(fields);

    let skid_texts = descriptions.iter().chain(&pieces_fields).map(|field| field.text.as_str());
    if let Some(count) = skid_count(skid_texts) {
        return Some(count);
    }

    let pieces = pieces_fields.iter().find_map(|field| parse_piece_count(&field.text));
    let weight_kg = WEIGHT
        .matches(fields)
        .iter()
        .find_map(|field| parse_weight_kg(&field.key, &field.text));
    let kg_per_piece = match (pieces, weight_kg) {
        (Some(pieces), Some(weight)) if pieces > 0 && weight > 0.0 => Some(weight / f64::from(pieces)),
        _ => None,
    };
    let is_flowers = descriptions
        .iter()
        .any(|field| field.text.to_ascii_lowercase().contains("flower"));

    let pallets = match pieces {
        Some(pieces) if pieces > 0 && is_flowers => Some(pieces.div_ceil(FLOWERS_PER_PALLET)),
        Some(pieces) => match kg_per_piece {
            Some(kg) if kg > OVERSIZE_KG_PER_PIECE => Some(pieces.saturating_mul(OVERSIZE_PALLETS_PER_PIECE)),
            Some(kg) if kg >= MIDSIZE_KG_PER_PIECE => Some(pieces.saturating_mul(MIDSIZE_PALLETS_PER_PIECE)),
            _ => Some(pieces),
        },
        None => None,
    };

    pallets.filter(|count| *count > 0)
}

/// Lookup rule for one logical field.
///
/// Keys are normalised (lowercase, punctuation collapsed to `_`) before
/// matching. Exact keys are tried in order, then any remaining key that
/// contains one of the hints, skipping keys that contain an exclusion.
/// Callers parse candidates in that order and keep the first that parses.
struct FieldRule {
    exact: &'static [&'static str],
    contains: &'static [&'static str],
    excludes: &'static [&'static str],
}

const PIECES: FieldRule = FieldRule {
    exact: &[
        "packages",
        "pieces",
        "no_of_packages",
        "number_of_packages",
        "package_count",
        "pcs",
        "quantity",
        "qty",
    ],
    contains: &["package", "piece", "pcs", "qty", "quantity"],
    excludes: &["weight", "wgt", "desc"],
};

const WEIGHT: FieldRule = FieldRule {
    exact: &["weight", "weight_kg", "gross_weight", "total_weight", "chargeable_weight", "wt"],
    contains: &["weight", "wgt", "wt"],
    excludes: &[],
};

const DESCRIPTION: FieldRule = FieldRule {
    exact: &[
        "description",
        "unit_details",
        "goods_description",
        "commodity",
        "contents",
    ],
    contains: &["desc", "unit", "commodity", "content", "goods"],
    excludes: &["weight", "wgt"],
};

/// A matched field: normalised key and trimmed value text.
struct FieldMatch {
    key: String,
    text: String,
}

impl FieldRule {
    fn matches(&self, fields: &Map<String, Value>) -> Vec<FieldMatch> {
        let normalised: Vec<(String, &Value)> = fields
            .iter()
            .map(|(key, value)| (normalise_key(key), value))
            .collect();

        let mut used = vec![false; normalised.len()];
        let mut found = Vec::new();

        for exact in self.exact {
            for (position, (key, value)) in normalised.iter().enumerate() {
                if used[position] || key.as_str() != *exact {
                    continue;
                }
                used[position] = true;
                if let Some(text) = value_text(value) {
                    found.push(FieldMatch { key: key.clone(), text });
                }
            }
        }

        for (position, (key, value)) in normalised.iter().enumerate() {
            if used[position] || self.excludes.iter().any(|hint| key.contains(hint)) {
                continue;
            }
            if self.contains.iter().any(|hint| key.contains(hint)) {
                if let Some(text) = value_text(value) {
                    found.push(FieldMatch { key: key.clone(), text });
                }
            }
        }

        found
    }
}

fn normalise_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn positive(value: Option<i64>) -> Option<u32> {
    value
        .and_then(|count| u32::try_from(count).ok())
        .filter(|count| *count > 0)
}

/// Skid is the shippers' word for pallet: a leading count on skid text is
/// taken at face value.
fn skid_count<'a>(texts: impl Iterator<Item = &'a str>) -> Option<u32> {
    texts
        .filter(|text| text.to_ascii_lowercase().contains("skid"))
        .find_map(|text| leading_int(text).map(|(count, _)| count).filter(|count| *count > 0))
}

/// Piece count from forms like `"0 of 2"`, `"2 X SKID"` or `"12 cartons"`.
pub fn parse_piece_count(text: &str) -> Option<u32> {
    let lower = text.trim().to_ascii_lowercase();

    let tokens: Vec<&str> = lower.split_whitespace().collect();
    if let Some(position) = tokens.iter().position(|token| *token == "of") {
        let delivered = position.checked_sub(1).and_then(|before| tokens[before].parse::<u32>().ok());
        let total = tokens.get(position + 1).and_then(|after| after.parse::<u32>().ok());
        if let (Some(_), Some(total)) = (delivered, total) {
            return Some(total);
        }
    }

    if let Some((count, rest)) = leading_int(&lower) {
        if let Some(after) = rest.trim_start().strip_prefix('x') {
            if after.is_empty() || after.starts_with(|c: char| c.is_whitespace() || c.is_ascii_alphabetic()) {
                return Some(count);
            }
        }
    }

    first_number(&lower).map(|number| number as u32)
}

/// Weight in kilograms. Pounds are converted when either the field label
/// or the value says so.
pub fn parse_weight_kg(label: &str, text: &str) -> Option<f64> {
    let weight = first_number(text)?;
    let in_pounds = [label, text]
        .iter()
        .any(|part| part.to_ascii_lowercase().contains("lb"));
    let kg = if in_pounds { weight * KG_PER_LB } else { weight };
    (kg > 0.0).then_some(kg)
}

fn leading_int(text: &str) -> Option<(u32, &str)> {
    let text = text.trim_start();
    let end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    let count = text[..end].parse::<u32>().ok()?;
    Some((count, &text[end..]))
}

/// First decimal number in the text, thousands separators ignored.
fn first_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let mut digits = String::new();
    let mut seen_point = false;
    for c in text[start..].chars() {
        match c {
            '0'..='9' => digits.push(c),
            ',' => continue,
            '.' if !seen_point => {
                seen_point = true;
                digits.push(c);
            }
            _ => break,
        }
    }
    digits.trim_end_matches('.').parse::<f64>().ok()
}
