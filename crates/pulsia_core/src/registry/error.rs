//! Registry error taxonomy.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failures surfaced to registry observers.
///
/// Neither variant is fatal: the collection is left empty (load) or stale
/// (subscription).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The snapshot read failed or timed out.
    LoadFailure { reason: String },
    /// The change channel could not be opened or was dropped.
    SubscriptionFailure { reason: String, attempts: u32 },
}

impl RegistryError {
    pub fn load(reason: impl Into<String>) -> Self {
        Self::LoadFailure {
            reason: reason.into(),
        }
    }

    pub fn subscription(reason: impl Into<String>, attempts: u32) -> Self {
        Self::SubscriptionFailure {
            reason: reason.into(),
            attempts,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::LoadFailure { .. } => "load_failure",
            Self::SubscriptionFailure { .. } => "subscription_failure",
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadFailure { reason } => write!(f, "candidate snapshot failed: {reason}"),
            Self::SubscriptionFailure { reason, attempts } => write!(
                f,
                "candidate change feed failed after {attempts} reconnect attempt(s): {reason}"
            ),
        }
    }
}

impl Error for RegistryError {}
