//! Field-level merge of archive snapshots with live submissions.

use crate::error::{ArchiveError, Result};
use crate::types::{FieldWhitelist, Item, LiveSubmission, VolatileFields};
use serde_json::Value;

pub fn item_id(item: &Item) -> Result<String> {
    match item.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(other) => Err(ArchiveError::MalformedItem {
            details: format!("id is not a string: {}", other),
        }
        .into()),
        None => Err(ArchiveError::MalformedItem {
            details: "missing id".to_string(),
        }
        .into()),
    }
}

/// Reads `created_utc`, which the archive sends as an integer, a float or a
/// numeric string depending on when the post was ingested.
pub fn created_utc(item: &Item) -> Result<i64> {
    let malformed = |details: String| ArchiveError::MalformedItem { details };

    let epoch = match item.get("created_utc") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| malformed(format!("created_utc out of range: {}", n)))?,
        Some(Value::String(s)) => s
            .parse::<f64>()
            .map(|f| f as i64)
            .map_err(|_| malformed(format!("created_utc is not numeric: {}", s)))?,
        Some(other) => return Err(malformed(format!("created_utc has wrong type: {}", other)).into()),
        None => return Err(malformed("missing created_utc".to_string()).into()),
    };
    Ok(epoch)
}

/// Reduces `item` to the whitelisted fields, in whitelist order. Fields the
/// item does not carry are skipped.
pub fn keep_whitelisted_fields(mut item: Item, whitelist: &FieldWhitelist) -> Item {
    let mut reduced = Item::new();
    for field in whitelist.fields() {
        if let Some(value) = item.remove(field) {
            reduced.insert(field.clone(), value);
        }
    }
    reduced
}

/// Overwrites every configured volatile field already present in `item` with
/// its live value. Never adds a field. Returns the number of fields written.
pub fn apply_live_fields(item: &mut Item, live: &LiveSubmission, fields: &VolatileFields) -> usize {
    let mut updated = 0;
    for field in fields.iter() {
        if let Some(slot) = item.get_mut(field.name()) {
            *slot = field.read(live);
            updated += 1;
        }
    }
    updated
}
