//! Replay of pending offline mutations.
//!
//! Each pending row is pushed to the server on its own; one failure
//! never blocks the rest. Rows that fail stay pending and get retried
//! on the next pass.

use crate::error::Error;
use crate::models::{Op, Record, Session};
use crate::remote::RemoteStore;

/// One pending row that could not be replayed.
#[derive(Debug)]
pub struct ReplayFailure {
    /// Merge key of the row, `?` when it had none.
    pub key: String,
    pub error: Error,
}

/// Outcome of one replay pass.
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<ReplayFailure>,
}

impl ReplayReport {
    /// Number of rows that stayed pending.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when every attempted row made it to the server.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Push every pending row owned by `session` to the server.
///
/// Pending rows under another account are left alone; rows without an
/// owner email count as owned. Deletes with a server id call the API and
/// drop the row; local-only deletes just drop it. Updates with a server
/// id are sent as updates (the response body is not merged back; the
/// next fetch refreshes the row). Everything else, creates included, is
/// sent as a create and the row adopts the server's identity while
/// keeping its correlation id.
///
/// The list is modified in place and left unsorted; callers persist it.
pub async fn replay_pending(
    records: &mut Vec<Record>,
    remote: &dyn RemoteStore,
    session: &Session,
) -> ReplayReport {
    let mut report = ReplayReport::default();
    if !records.iter().any(Record::is_pending) {
        return report;
    }

    let mut index = 0;
    while index < records.len() {
        if !records[index].is_pending() || !session.owns(&records[index]) {
            index += 1;
            continue;
        }
        report.attempted += 1;

        let key = records[index]
            .merge_key()
            .unwrap_or_else(|| "?".to_string());
        let outcome = replay_one(&mut records[index], remote, session).await;
        match outcome {
            Ok(keep) => {
                report.succeeded += 1;
                if keep {
                    index += 1;
                } else {
                    records.remove(index);
                }
            }
            Err(error) => {
                tracing::warn!("Replay of row {} failed, keeping it pending: {}", key, error);
                report.failures.push(ReplayFailure { key, error });
                index += 1;
            }
        }
    }

    report
}

/// Replay a single pending row. `Ok(false)` means the row is done and
/// should be removed from the cache.
async fn replay_one(
    record: &mut Record,
    remote: &dyn RemoteStore,
    session: &Session,
) -> crate::error::Result<bool> {
    match (record.op(), record.id()) {
        (Some(Op::Delete), id) => {
            if let Some(id) = id.filter(|id| !id.is_local()) {
                remote.delete(&id).await?;
            }
            Ok(false)
        }
        (Some(Op::Update), Some(id)) if !id.is_local() => {
            let payload = record.wire_payload(session.email());
            remote.update(&id, &payload).await?;
            record.set_synced(true);
            record.clear_op();
            Ok(true)
        }
        _ => {
            let payload = record.wire_payload(session.email());
            let server_item = remote.create(&payload).await?;
            let server_id = server_item.id();
            record.merge_from(&server_item);
            record.set_email(session.email());
            if let Some(id) = server_id {
                record.set_id(&id);
            }
            record.set_synced(true);
            record.clear_op();
            Ok(true)
        }
    }
}
