pub mod add;
pub mod common;
pub mod edit;
pub mod list;
pub mod rm;
pub mod session;
pub mod sync;
