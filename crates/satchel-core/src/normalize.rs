//! Pure normalization passes over record collections.
//!
//! Everything here is deterministic and idempotent: no clock, no I/O, no
//! session state. The engine leans on that to re-run merges safely after
//! partial failures.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde_json::Value;

use crate::models::{Op, Record, RecordId};
use crate::util::value_millis;

const UPDATED_AT: &str = "updated_at";

/// A value counts as a date only when it is actually there: null, empty
/// strings, zero and false all mean the field is absent.
fn has_date(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(set) => *set,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(raw) => !raw.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn first_date<'r, 'f>(
    record: &'r Record,
    mut fields: impl Iterator<Item = &'f str>,
) -> Option<&'r Value> {
    fields.find_map(|field| record.get(field).filter(|value| has_date(value)))
}

/// Freshness of a record: the first present field from `fields`, parsed
/// to Unix millis. Missing or unparsable dates read as 0.
#[must_use]
pub fn freshness_millis(record: &Record, fields: &[String]) -> i64 {
    first_date(record, fields.iter().map(String::as_str))
        .and_then(value_millis)
        .unwrap_or(0)
}

/// Freshness with `updated_at` always tried first, used when two rows
/// with the same key race.
#[must_use]
pub fn modified_millis(record: &Record, date_fields_order: &[String]) -> i64 {
    let fields = std::iter::once(UPDATED_AT).chain(date_fields_order.iter().map(String::as_str));
    first_date(record, fields).and_then(value_millis).unwrap_or(0)
}

fn id_desc(a: &Record, b: &Record) -> Ordering {
    let (id_a, id_b) = (a.id(), b.id());
    if let (Some(num_a), Some(num_b)) = (
        id_a.as_ref().and_then(RecordId::as_number),
        id_b.as_ref().and_then(RecordId::as_number),
    ) {
        return num_b.total_cmp(&num_a);
    }
    let text_a = id_a.map(|id| id.to_string()).unwrap_or_default();
    let text_b = id_b.map(|id| id.to_string()).unwrap_or_default();
    text_b.cmp(&text_a)
}

fn compare_newest_first(a: &Record, b: &Record, date_fields_order: &[String]) -> Ordering {
    let millis_a = freshness_millis(a, date_fields_order);
    let millis_b = freshness_millis(b, date_fields_order);
    if millis_a != 0 && millis_b != 0 && millis_a != millis_b {
        return millis_b.cmp(&millis_a);
    }
    id_desc(a, b)
}

/// Sort newest first by the configured date fields.
///
/// A record's freshness is its first non-empty field in
/// `date_fields_order`. Rows that tie, or that have no parseable date,
/// fall back to id order: numeric descending when both ids read as
/// numbers, else descending on the string form. The sort is stable and
/// total for any input.
#[must_use]
pub fn sort_newest_first(records: &[Record], date_fields_order: &[String]) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| compare_newest_first(a, b, date_fields_order));
    sorted
}

fn base_changed(a: &Record, b: &Record, base_fields: &[String]) -> bool {
    base_fields
        .iter()
        .any(|field| a.get(field).unwrap_or(&Value::Null) != b.get(field).unwrap_or(&Value::Null))
}

/// A pending row that changed none of the configured base fields is a
/// no-op edit and defers to the confirmed copy. Unconfigured base fields
/// disable the exception.
fn is_noop_edit(pending: &Record, confirmed: &Record, base_fields: &[String]) -> bool {
    !base_fields.is_empty() && !base_changed(pending, confirmed, base_fields)
}

/// Survivor selection between two rows sharing a merge key. `challenger`
/// is the later-seen row; returns true when it replaces the incumbent.
fn replaces(
    challenger: &Record,
    incumbent: &Record,
    base_fields: &[String],
    date_fields_order: &[String],
) -> bool {
    match (challenger.is_pending(), incumbent.is_pending()) {
        (true, false) => {
            !(incumbent.is_synced() && is_noop_edit(challenger, incumbent, base_fields))
        }
        (false, true) => challenger.is_synced() && is_noop_edit(incumbent, challenger, base_fields),
        _ => {
            let challenger_at = modified_millis(challenger, date_fields_order);
            let incumbent_at = modified_millis(incumbent, date_fields_order);
            if challenger_at != incumbent_at {
                return challenger_at > incumbent_at;
            }
            // exact tie: the server snapshot copy wins over a local one
            challenger.is_from_server() && !incumbent.is_from_server()
        }
    }
}

/// Collapse rows sharing a merge key to one whole-record survivor.
///
/// Pending rows beat synced ones regardless of timestamps, with one
/// exception: a pending edit that changed none of `merge_base_fields`
/// defers to the explicitly synced copy. Rows with the same pending
/// state resolve newest-first, then by server origin. First-seen order
/// is preserved; rows without any key pass through untouched.
#[must_use]
pub fn dedupe_by_id_prefer_local(
    records: &[Record],
    merge_base_fields: &[String],
    date_fields_order: &[String],
) -> Vec<Record> {
    let mut out: Vec<Record> = Vec::with_capacity(records.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(key) = record.merge_key() else {
            out.push(record.clone());
            continue;
        };
        match index.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(record.clone());
            }
            Entry::Occupied(slot) => {
                let held = &mut out[*slot.get()];
                if replaces(record, held, merge_base_fields, date_fields_order) {
                    *held = record.clone();
                }
            }
        }
    }
    out
}

/// Field-level merge of two rows sharing a key: pending fields stay on
/// top; with equal pending state the newer whole row wins.
fn merge_for_view(held: &Record, incoming: &Record, date_fields_order: &[String]) -> Record {
    if incoming.is_pending() && !held.is_pending() {
        let mut merged = held.clone();
        merged.merge_from(incoming);
        return merged;
    }
    if held.is_pending() && !incoming.is_pending() {
        let mut merged = incoming.clone();
        merged.merge_from(held);
        return merged;
    }
    if modified_millis(incoming, date_fields_order) > modified_millis(held, date_fields_order) {
        incoming.clone()
    } else {
        held.clone()
    }
}

/// Collapse a collection into what the user should see.
///
/// Rows group by merge key and merge field-by-field with pending values
/// on top. Groups whose surviving row is a delete tombstone are dropped
/// entirely, then the result sorts newest first. Idempotent.
#[must_use]
pub fn normalize_for_view(records: &[Record], date_fields_order: &[String]) -> Vec<Record> {
    let mut merged: Vec<Record> = Vec::with_capacity(records.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(key) = record.merge_key() else {
            merged.push(record.clone());
            continue;
        };
        match index.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(record.clone());
            }
            Entry::Occupied(slot) => {
                let held = &mut merged[*slot.get()];
                *held = merge_for_view(held, record, date_fields_order);
            }
        }
    }

    let visible: Vec<Record> = merged
        .into_iter()
        .filter(|record| record.op() != Some(Op::Delete))
        .collect();
    sort_newest_first(&visible, date_fields_order)
}

fn search_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(raw)) => raw.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

/// Case-insensitive substring match across the configured fields.
///
/// An empty query matches everything.
#[must_use]
pub fn matches_search(record: &Record, query: &str, search_fields: &[String]) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let haystack = search_fields
        .iter()
        .map(|field| search_text(record.get(field)))
        .collect::<Vec<_>>()
        .join(" | ");
    haystack.contains(&needle)
}
