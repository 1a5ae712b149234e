//! CityWatch Client - Transition Gateway for the CityWatch API
//!
//! - [`Gateway`]: one method per lifecycle action; the role gate runs
//!   locally first and a refused action never reaches the network
//! - [`SessionStore`]: process-wide session with observers
//! - [`IssueBrowser`]: filtered issue list that only shows the newest query
//! - payment flows: record the payment, then request the entitlement

pub mod config;
pub mod error;
pub mod flows;
pub mod gateway;
pub mod http;
pub mod query;
pub mod session;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use flows::PaymentConfirmation;
pub use gateway::Gateway;
pub use http::{HttpClient, NetworkHttpClient};
pub use query::{BrowseFilters, IssueBrowser, QuerySequencer, Ticket};
pub use session::{CachedSession, Session, SessionStorage, SessionStore};

// Re-export shared types for convenience
pub use shared::models::{Issue, IssueListResponse, Payment, User};
pub use shared::{Action, Denial, ErrorCode};
