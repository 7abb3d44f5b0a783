//! CrickNet client library.
//!
//! Identity session, backend reconciliation, profile registry, and the
//! profile creation forms of the CrickNet cricket community client. UI
//! shells hold one [`state::ClientContext`] and drive everything through it.

pub mod backend;
pub mod config;
pub mod error;
pub mod forms;
pub mod identity;
pub mod profiles;
pub mod search;
pub mod state;
pub mod sync;
pub mod util;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{AuthError, NetworkError, ProfileError, SyncError};
pub use identity::{Principal, SessionManager};
pub use profiles::{Profile, ProfileRegistry, ProfileType};
pub use state::ClientContext;
