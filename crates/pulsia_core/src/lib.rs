//! Core of the Pulsia candidate dashboard.
//! Keeps an ordered, display-ready candidate collection in sync with the
//! authoritative candidate store.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod payload;
pub mod registry;
pub mod repo;
pub mod seed;
pub mod store;
pub mod view;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig, LoggingConfig, ReconnectPolicy, RegistryConfig};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status, LoggingError};
pub use model::candidate::{
    Candidate, CandidateId, CandidateRecord, CandidateStatus, ChatMessage, RadarPoint, Sender,
};
pub use model::change::{ChangeEvent, ChangeKind};
pub use payload::{PayloadError, RawChange};
pub use registry::collection::{ApplyOutcome, CandidateCollection};
pub use registry::error::RegistryError;
pub use registry::state::{RegistryState, RegistryView, SyncPhase};
pub use registry::{DeactivationHandle, Registry};
pub use store::local::LocalCandidateStore;
pub use store::{CandidateStore, ChangeFeed, StoreError, StoreResult, SubscriptionId};
pub use view::{derive_initials, relative_time_label, resolve_selection, to_view_model};

/// Health-check probe for embedders.
pub fn ping() -> &'static str {
    "pong"
}

pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
