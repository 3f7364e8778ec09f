//! Business logic for the finance service: authorization, summaries, token
//! handling and the MongoDB datastore.

pub mod authorization;
mod database;
pub mod error;
mod jwt;
pub mod metrics;
pub mod summary;

pub use authorization::{
    AuthorizationDecision, AuthorizationGate, BypassPolicy, MockRoleLookup, Principal, RoleLookup,
};
pub use database::MongoDb;
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, JwtService};
pub use metrics::{get_metrics, init_metrics};
pub use summary::{
    MockRecordStore, RecordStore, SummaryAggregator, SummaryError, SummaryOutcome, SummaryReport,
    SummaryWindow, WindowUnit,
};
