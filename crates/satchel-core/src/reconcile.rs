//! Server snapshot reconciliation.
//!
//! Pruning synced rows that a snapshot no longer contains is only safe
//! when the snapshot is known complete, so callers gate every reconcile
//! on `can_prune_cache`.

use std::collections::HashSet;

use serde_json::Value;

use crate::config::ResourceOptions;
use crate::models::{Record, Session};
use crate::normalize::{dedupe_by_id_prefer_local, sort_newest_first};
use crate::util::now_rfc3339;

/// Tag a row taken from a server response before it touches the cache.
///
/// Marks the snapshot origin, stamps the session owner, defaults the
/// timestamps, and coerces the configured numeric fields. `updated_at`
/// only defaults from a creation timestamp the server actually sent.
pub fn tag_server_row(record: &mut Record, session: &Session, options: &ResourceOptions) {
    let original_created = record.created_at().map(str::to_string);

    record.mark_from_server();
    record.set_synced(true);
    record.set_email(session.email());
    if record.created_at().is_none() {
        record.set_created_at(now_rfc3339());
    }
    if record.updated_at().is_none() {
        if let Some(created) = original_created {
            record.set_updated_at(created);
        }
    }
    for field in &options.numeric_fields {
        let coerced = to_number(record.get(field));
        record.set(field.clone(), coerced);
    }
}

fn to_number(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Number(number)) => Value::Number(number.clone()),
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            if let Ok(int) = trimmed.parse::<i64>() {
                Value::from(int)
            } else if let Ok(float) = trimmed.parse::<f64>() {
                serde_json::Number::from_f64(float).map_or_else(|| Value::from(0), Value::Number)
            } else {
                Value::from(0)
            }
        }
        _ => Value::from(0),
    }
}

/// Gate for snapshot pruning.
///
/// Only an unfiltered first page whose row count covered the advertised
/// total proves the snapshot is complete. A server that sent no total
/// never authorizes pruning.
#[must_use]
pub fn can_prune_cache(
    page: usize,
    search: &str,
    server_count: usize,
    server_total: Option<u64>,
) -> bool {
    let no_search = search.is_empty();
    let first_page = page == 1;
    let all_rows_returned = server_total
        .is_some_and(|total| u64::try_from(server_count).unwrap_or(u64::MAX) >= total);
    no_search && first_page && all_rows_returned
}

/// Merge a known-complete server snapshot into the cache collection.
///
/// Keeps pending rows, rows owned by other accounts, and synced rows the
/// server still returns. Synced owned rows absent from the snapshot were
/// deleted elsewhere and fall away. The snapshot then merges in through
/// the dedupe pass and the result sorts newest first.
#[must_use]
pub fn reconcile_with_server(
    cache: &[Record],
    server_rows: &[Record],
    session: &Session,
    options: &ResourceOptions,
) -> Vec<Record> {
    let server_ids: HashSet<String> = server_rows
        .iter()
        .filter_map(|row| row.id().map(|id| id.to_string()))
        .collect();

    let mut merged: Vec<Record> = cache
        .iter()
        .filter(|row| {
            if !session.owns(row) {
                return true;
            }
            if row.is_pending() {
                return true;
            }
            row.id()
                .is_some_and(|id| server_ids.contains(&id.to_string()))
        })
        .cloned()
        .collect();
    merged.extend_from_slice(server_rows);

    let deduped = dedupe_by_id_prefer_local(
        &merged,
        &options.merge_base_fields,
        &options.date_fields_order,
    );
    sort_newest_first(&deduped, &options.date_fields_order)
}
