use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use chrono::Utc;
use satchel_core::config::ResourceOptions;
use satchel_core::connectivity::{Connectivity, Fixed, HttpProbe};
use satchel_core::normalize::modified_millis;
use satchel_core::remote::{HttpRemote, RemoteStore};
use satchel_core::resource::{SaveOutcome, SaveReceipt};
use satchel_core::store::{CacheStore, FileStore};
use satchel_core::{Op, Record, RecordId, ResourceClient, Session};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;
use crate::profile::CliConfig;

/// Base URL handed to forced-offline clients; never contacted because the
/// connectivity source reports offline.
const OFFLINE_BASE_URL: &str = "http://offline.invalid/api";

/// Flags shared by every resource command.
pub struct ClientEnv {
    pub offline: bool,
    pub data_dir: Option<PathBuf>,
}

/// Assemble a `ResourceClient` from the CLI configuration.
pub fn build_client(
    resource: &str,
    client_env: &ClientEnv,
    per_page: Option<usize>,
) -> Result<ResourceClient, CliError> {
    let config = CliConfig::load().map_err(CliError::Config)?;
    let mut options = ResourceOptions::new(resource);
    if let Some(per_page) = per_page {
        options = options.with_per_page(per_page);
    }

    let data_dir = resolve_data_dir(client_env.data_dir.clone(), &config);
    let mut store = FileStore::open(data_dir)?;
    let session = resolve_session(&config, &mut store, &options);

    let (remote, connectivity): (Box<dyn RemoteStore>, Box<dyn Connectivity>) =
        if client_env.offline {
            let remote = HttpRemote::new(OFFLINE_BASE_URL, resource, options.timeout())?;
            (Box::new(remote), Box::new(Fixed(false)))
        } else {
            let base = config.api_base_url().ok_or(CliError::ApiNotConfigured)?;
            let remote = HttpRemote::new(&base, resource, options.timeout())?;
            let probe = HttpProbe::new(&base)?;
            (Box::new(remote), Box::new(probe))
        };

    Ok(ResourceClient::new(
        options,
        session,
        Box::new(store),
        remote,
        connectivity,
    )?)
}

/// Resolve the owner session and write it back to the cache slot so the
/// next run (and any signed-out run) keeps the same owner.
pub fn resolve_session(
    config: &CliConfig,
    store: &mut FileStore,
    options: &ResourceOptions,
) -> Session {
    let last_known = store.get(&options.last_email_key);
    let session = Session::resolve(config.email(), last_known.clone());
    if last_known.as_deref() != Some(session.email()) {
        if let Err(error) = store.set(&options.last_email_key, session.email()) {
            tracing::warn!("Failed to persist session email: {}", error);
        }
    }
    session
}

pub fn resolve_data_dir(override_dir: Option<PathBuf>, config: &CliConfig) -> PathBuf {
    override_dir
        .or_else(|| env::var_os("SATCHEL_DATA_DIR").map(PathBuf::from))
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(default_data_dir)
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| panic!("Failed to resolve CLI data directory"))
        .join("satchel")
}

/// Build a record from `KEY=VALUE` assignments. Creates mint a
/// correlation id up front; edits carry the target id instead.
pub fn build_form(
    fields: &[String],
    id: Option<&RecordId>,
    options: &ResourceOptions,
) -> Result<Record, CliError> {
    if fields.is_empty() {
        return Err(CliError::EmptyForm);
    }
    let mut form = Record::new();
    for raw in fields {
        let (key, value) = parse_field(raw, options)?;
        form.set(key, value);
    }
    match id {
        Some(id) => form.set_id(id),
        None => form.ensure_local_id(),
    }
    Ok(form)
}

pub fn normalize_record_id(id: &str) -> Result<RecordId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyRecordId);
    }
    Ok(RecordId::from(trimmed))
}

pub fn parse_field(raw: &str, options: &ResourceOptions) -> Result<(String, Value), CliError> {
    let Some((key, raw_value)) = raw.split_once('=') else {
        return Err(CliError::InvalidField(raw.to_string()));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::InvalidField(raw.to_string()));
    }

    let value = if options.numeric_fields.iter().any(|field| field == key) {
        Value::from(parse_numeric_input(raw_value))
    } else {
        parse_value_input(raw_value)
    };
    Ok((key.to_string(), value))
}

/// Digit-only coercion for money-style fields ("Rp 12.000" -> 12000).
pub fn parse_numeric_input(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

fn parse_value_input(raw: &str) -> Value {
    let trimmed = raw.trim();
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

pub fn format_record_lines(records: &[Record], options: &ResourceOptions) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let id = record
                .id()
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            let status = record_status(record);
            let preview = record_preview(record, options, 40);
            let relative_time =
                format_relative_time(modified_millis(record, &options.date_fields_order), now_ms);
            format!("{id:<16}  {status:<15}  {preview:<40}  {relative_time}")
        })
        .collect()
}

pub fn record_status(record: &Record) -> String {
    if record.is_pending() {
        record.op().map_or_else(
            || "pending".to_string(),
            |op| format!("pending {}", op.as_str()),
        )
    } else {
        "synced".to_string()
    }
}

/// First non-empty searchable field, for one-line listings and prompts.
pub fn record_preview(record: &Record, options: &ResourceOptions, max_chars: usize) -> String {
    for field in &options.search_fields {
        if field == "id" || field == "email" {
            continue;
        }
        let Some(value) = record.get(field) else {
            continue;
        };
        let text = match value {
            Value::String(text) => text.trim().to_string(),
            Value::Number(number) => number.to_string(),
            _ => continue,
        };
        if !text.is_empty() {
            return truncate_preview(&text, max_chars);
        }
    }
    String::new()
}

fn truncate_preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn print_save_receipt(receipt: &SaveReceipt) {
    let id = receipt
        .id
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    match receipt.outcome {
        SaveOutcome::Created => println!("Created {id}"),
        SaveOutcome::Updated => println!("Updated {id}"),
        SaveOutcome::CreatedOffline => println!("Created {id} (pending sync)"),
        SaveOutcome::UpdatedOffline => println!("Updated {id} (pending sync)"),
    }
}

pub fn confirm(prompt: &str) -> Result<bool, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::ConfirmationRequired);
    }
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub resource: String,
    pub email: String,
    pub cached: usize,
    pub pending: usize,
    pub pending_creates: usize,
    pub pending_updates: usize,
    pub pending_deletes: usize,
}

pub fn status_report(client: &ResourceClient) -> StatusReport {
    let records = client.cached_records();
    let mut pending = 0;
    let mut creates = 0;
    let mut updates = 0;
    let mut deletes = 0;
    for record in &records {
        if !record.is_pending() {
            continue;
        }
        pending += 1;
        match record.op() {
            Some(Op::Create) => creates += 1,
            Some(Op::Update) => updates += 1,
            Some(Op::Delete) => deletes += 1,
            None => {}
        }
    }

    StatusReport {
        resource: client.options().resource.clone(),
        email: client.session().email().to_string(),
        cached: records.len(),
        pending,
        pending_creates: creates,
        pending_updates: updates,
        pending_deletes: deletes,
    }
}

pub fn format_status_lines(report: &StatusReport) -> Vec<String> {
    let pending = if report.pending == 0 {
        "none".to_string()
    } else {
        format!(
            "{} ({} create, {} update, {} delete)",
            report.pending, report.pending_creates, report.pending_updates, report.pending_deletes
        )
    };
    vec![
        format!("resource:  {}", report.resource),
        format!("owner:     {}", report.email),
        format!("cached:    {} rows", report.cached),
        format!("pending:   {pending}"),
    ]
}
