pub mod entry;
pub mod role;
pub mod user;

pub use entry::{midnight_utc, EntryKind, EntryPatch, EntryView, LedgerEntry};
pub use role::{Role, RoleResponse};
pub use user::{User, UserResponse, UserStatus};
