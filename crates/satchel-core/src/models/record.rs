//! Record model
//!
//! A record is a schemaless JSON object: domain fields pass through
//! untouched, while a handful of bookkeeping fields (identity, ownership,
//! pending state) are what the sync engine reads and writes.

// Numeric id comparison happens in f64, matching the JSON number model.
#![allow(clippy::cast_precision_loss)]

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::util::now_millis;

const FIELD_ID: &str = "id";
const FIELD_LOCAL_ID: &str = "local_id";
const FIELD_EMAIL: &str = "email";
const FIELD_CREATED_AT: &str = "created_at";
const FIELD_UPDATED_AT: &str = "updated_at";
const FIELD_SYNCED: &str = "synced";
const FIELD_OP: &str = "__op";
const FIELD_FROM: &str = "__from";

const FROM_SERVER: &str = "server";

/// Prefix of provisional ids minted while offline.
const LOCAL_ID_PREFIX: &str = "local_";

/// A record identifier, kept in the shape the server sent it.
///
/// Servers hand out integer ids; offline creates mint provisional string
/// ids prefixed with `local_`. Ids group by their string form, so `7` and
/// `"7"` name the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Mint a provisional id for a record created offline.
    #[must_use]
    pub fn local_now() -> Self {
        Self::Text(format!("{LOCAL_ID_PREFIX}{}", now_millis()))
    }

    /// Read an id out of a JSON value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(
                number
                    .as_i64()
                    .map_or_else(|| Self::Text(number.to_string()), Self::Int),
            ),
            Value::String(raw) => Some(Self::Text(raw.clone())),
            _ => None,
        }
    }

    /// The JSON form of this id.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(id) => Value::from(*id),
            Self::Text(id) => Value::String(id.clone()),
        }
    }

    /// True for provisional ids minted offline.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Text(id) if id.starts_with(LOCAL_ID_PREFIX))
    }

    /// Numeric reading of this id, when it has one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(id) => Some(*id as f64),
            Self::Text(id) => id.trim().parse().ok(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<&str> for RecordId {
    fn from(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map_or_else(|_| Self::Text(raw.to_string()), Self::Int)
    }
}

/// Pending operation tag carried by an unsynced record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Create,
    Update,
    Delete,
}

impl Op {
    /// Wire/cache form of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A schemaless record: domain fields plus sync bookkeeping.
///
/// Serializes as the bare JSON object, so cached collections and wire
/// payloads stay plain arrays and objects with no wrapper layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bare tombstone for deleting a row the cache never held.
    #[must_use]
    pub fn tombstone(id: &RecordId, email: &str, created_at: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.set_id(id);
        record.set_email(email);
        record.set_created_at(created_at);
        record.set_op(Op::Delete);
        record.set_synced(false);
        record
    }

    /// Raw field access.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a raw field.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Remove a raw field.
    pub fn unset(&mut self, field: &str) {
        self.fields.remove(field);
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .filter(|raw| !raw.trim().is_empty())
    }

    /// The record's id, when it has one.
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        RecordId::from_value(self.fields.get(FIELD_ID)?)
    }

    /// Replace the record's id.
    pub fn set_id(&mut self, id: &RecordId) {
        self.set(FIELD_ID, id.to_value());
    }

    /// True when the id is a provisional offline id.
    #[must_use]
    pub fn is_local_only(&self) -> bool {
        self.id().is_some_and(|id| id.is_local())
    }

    /// Correlation id preserved across identity adoption.
    #[must_use]
    pub fn local_id(&self) -> Option<&str> {
        self.text(FIELD_LOCAL_ID)
    }

    /// Set the correlation id.
    pub fn set_local_id(&mut self, local_id: impl Into<String>) {
        self.set(FIELD_LOCAL_ID, Value::String(local_id.into()));
    }

    /// Mint a correlation id when the record has none yet.
    pub fn ensure_local_id(&mut self) {
        if self.local_id().is_none() {
            self.set_local_id(Uuid::new_v4().to_string());
        }
    }

    /// Owner email, when set.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.text(FIELD_EMAIL)
    }

    /// Set the owner email.
    pub fn set_email(&mut self, email: impl Into<String>) {
        self.set(FIELD_EMAIL, Value::String(email.into()));
    }

    /// Creation timestamp, when set and non-empty.
    #[must_use]
    pub fn created_at(&self) -> Option<&str> {
        self.text(FIELD_CREATED_AT)
    }

    /// Set the creation timestamp.
    pub fn set_created_at(&mut self, value: impl Into<String>) {
        self.set(FIELD_CREATED_AT, Value::String(value.into()));
    }

    /// Last-update timestamp, when set and non-empty.
    #[must_use]
    pub fn updated_at(&self) -> Option<&str> {
        self.text(FIELD_UPDATED_AT)
    }

    /// Set the last-update timestamp.
    pub fn set_updated_at(&mut self, value: impl Into<String>) {
        self.set(FIELD_UPDATED_AT, Value::String(value.into()));
    }

    /// True only when the record is explicitly marked unsynced.
    ///
    /// Rows that never carried the flag (plain server rows) are not
    /// pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.fields.get(FIELD_SYNCED) == Some(&Value::Bool(false))
    }

    /// True only when the record is explicitly marked synced.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.fields.get(FIELD_SYNCED) == Some(&Value::Bool(true))
    }

    /// Flip the synced flag.
    pub fn set_synced(&mut self, synced: bool) {
        self.set(FIELD_SYNCED, Value::Bool(synced));
    }

    /// Pending operation tag, when present.
    #[must_use]
    pub fn op(&self) -> Option<Op> {
        Op::parse(self.text(FIELD_OP)?)
    }

    /// Tag the pending operation.
    pub fn set_op(&mut self, op: Op) {
        self.set(FIELD_OP, Value::String(op.as_str().to_string()));
    }

    /// Drop the pending operation tag after a successful replay.
    pub fn clear_op(&mut self) {
        self.unset(FIELD_OP);
    }

    /// True when the row came from a server snapshot.
    #[must_use]
    pub fn is_from_server(&self) -> bool {
        self.text(FIELD_FROM) == Some(FROM_SERVER)
    }

    /// Mark the row as taken from a server snapshot.
    pub fn mark_from_server(&mut self) {
        self.set(FIELD_FROM, Value::String(FROM_SERVER.to_string()));
    }

    /// Grouping key for dedupe and view merges: the id when present, else
    /// the correlation id. Records with neither cannot be grouped.
    #[must_use]
    pub fn merge_key(&self) -> Option<String> {
        self.id()
            .map(|id| id.to_string())
            .or_else(|| self.local_id().map(str::to_string))
    }

    /// Shallow merge: every field of `other` lands on top of this record.
    pub fn merge_from(&mut self, other: &Self) {
        for (field, value) in &other.fields {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    /// Fields sent to the server for create, update, and replay calls.
    ///
    /// Identity and bookkeeping keys stay local; the owner email is forced
    /// in so the server partitions rows correctly.
    #[must_use]
    pub fn wire_payload(&self, email: &str) -> Self {
        let mut payload = self.clone();
        payload.unset(FIELD_ID);
        payload.unset(FIELD_LOCAL_ID);
        payload.unset(FIELD_SYNCED);
        payload.unset(FIELD_OP);
        payload.unset(FIELD_FROM);
        payload.set_email(email);
        payload
    }
}
