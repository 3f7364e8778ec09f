pub mod entries;
pub mod roles;
pub mod summary;
pub mod users;

pub use entries::{EntryBody, EntryFields, ExpenseBody, IncomeBody};
pub use roles::CreateRoleRequest;
pub use summary::{SummaryParams, SummaryResponse};
pub use users::{ApproveUserRequest, LoginRequest, LoginResponse, RegisterRequest, UserEmailRequest};
