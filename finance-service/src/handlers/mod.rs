pub mod entries;
pub mod health;
pub mod roles;
pub mod summary;
pub mod users;
