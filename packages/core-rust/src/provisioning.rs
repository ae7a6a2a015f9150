//! Resource provisioning state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a resource as reported to ARM clients.
///
/// `Succeeded`, `Failed`, and `Canceled` are terminal; every other state
/// means an operation is in flight and mutations must be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProvisioningState {
    Accepted,
    Provisioning,
    Updating,
    Deleting,
    #[default]
    Succeeded,
    Failed,
    Canceled,
}

impl ProvisioningState {
    /// Returns `true` once no further transitions are expected.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Returns the wire name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Provisioning => "Provisioning",
            Self::Updating => "Updating",
            Self::Deleting => "Deleting",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
