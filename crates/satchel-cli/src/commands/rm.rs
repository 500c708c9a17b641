use satchel_core::config::ResourceOptions;
use satchel_core::resource::DeleteOutcome;
use satchel_core::{Record, RecordId};
use serde_json::Value;

use crate::commands::common::{
    build_client, confirm, normalize_record_id, record_preview, ClientEnv,
};
use crate::error::CliError;

pub async fn run_rm(
    resource: &str,
    id: &str,
    yes: bool,
    label: Option<&str>,
    client_env: &ClientEnv,
) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let mut client = build_client(resource, client_env, None)?;

    if !yes {
        let key = id.to_string();
        let records = client.cached_records();
        let row = records
            .iter()
            .find(|row| row.id().is_some_and(|rid| rid.to_string() == key));
        let prompt = delete_prompt(row, &id, label, client.options());
        if !confirm(&prompt)? {
            println!("Aborted.");
            return Ok(());
        }
    }

    match client.delete_data(&id).await? {
        DeleteOutcome::Deleted => println!("Deleted {id}"),
        DeleteOutcome::DeletedOffline => println!("Deleted {id} (pending sync)"),
    }
    Ok(())
}

/// Prompt text for the confirmation, with a one-line preview of the row
/// when the cache has one. `--label FIELD` overrides which field shows.
fn delete_prompt(
    row: Option<&Record>,
    id: &RecordId,
    label: Option<&str>,
    options: &ResourceOptions,
) -> String {
    let preview = row.map(|row| {
        label
            .and_then(|field| row.get(field))
            .map(|value| match value {
                Value::String(text) => text.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| record_preview(row, options, 40))
    });
    match preview {
        Some(preview) if !preview.is_empty() => format!("Delete {id} ({preview})?"),
        _ => format!("Delete {id}?"),
    }
}
