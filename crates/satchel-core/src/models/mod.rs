//! Data models for Satchel

mod record;
mod session;

pub use record::{Op, Record, RecordId};
pub use session::{adopt_pending, Session, FALLBACK_EMAIL};
