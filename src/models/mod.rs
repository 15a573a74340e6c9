//! Data models for REALMS

pub mod book;
pub mod record;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookQuery, CreateBook, UpdateBook};
pub use record::{BorrowRecord, LendingPolicy, RecordState};
pub use user::{Identity, PrivilegeLevel, User};
