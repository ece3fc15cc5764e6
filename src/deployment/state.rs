// ABOUTME: Deployment lifecycle states and the legal transitions between them.
// ABOUTME: Forward edges drive operations; two reverse edges undo a failed stop or delete.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a deployment record.
///
/// ```text
/// UNDEPLOYED -> DEPLOYED -> STOPPING -> STOPPED -> DELETING
///                  ^            |          |          |
///                  +------------+          |          |
///                  +-----------------------+          |
///                              STOPPED <--------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    Undeployed,
    Deployed,
    Stopping,
    Stopped,
    Deleting,
}

impl DeploymentState {
    pub const ALL: [DeploymentState; 5] = [
        DeploymentState::Undeployed,
        DeploymentState::Deployed,
        DeploymentState::Stopping,
        DeploymentState::Stopped,
        DeploymentState::Deleting,
    ];

    /// Whether `self -> next` is a legal edge.
    pub fn can_transition_to(self, next: DeploymentState) -> bool {
        use DeploymentState::*;
        matches!(
            (self, next),
            (Undeployed, Deployed)
                | (Deployed, Stopping)
                | (Stopping, Stopped)
                | (Stopped, Deployed)
                | (Stopped, Deleting)
                // rollback of a failed stop
                | (Stopping, Deployed)
                // rollback of a failed delete
                | (Deleting, Stopped)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentState::Undeployed => "UNDEPLOYED",
            DeploymentState::Deployed => "DEPLOYED",
            DeploymentState::Stopping => "STOPPING",
            DeploymentState::Stopped => "STOPPED",
            DeploymentState::Deleting => "DELETING",
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempted move along an edge the state machine does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal deployment state transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: DeploymentState,
    pub to: DeploymentState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeploymentState::*;

    #[test]
    fn forward_path_is_legal() {
        assert!(Undeployed.can_transition_to(Deployed));
        assert!(Deployed.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Stopped));
        assert!(Stopped.can_transition_to(Deleting));
        assert!(Stopped.can_transition_to(Deployed));
    }

    #[test]
    fn rollback_edges_are_legal() {
        assert!(Stopping.can_transition_to(Deployed));
        assert!(Deleting.can_transition_to(Stopped));
    }

    #[test]
    fn skipping_states_is_illegal() {
        assert!(!Undeployed.can_transition_to(Stopped));
        assert!(!Deployed.can_transition_to(Stopped));
        assert!(!Deployed.can_transition_to(Deleting));
        assert!(!Deleting.can_transition_to(Deployed));
        assert!(!Stopped.can_transition_to(Undeployed));
    }

    #[test]
    fn self_transitions_are_illegal() {
        for state in DeploymentState::ALL {
            assert!(!state.can_transition_to(state), "{state} -> {state}");
        }
    }

    #[test]
    fn serializes_screaming_case() {
        assert_eq!(serde_json::to_string(&Stopping).unwrap(), "\"STOPPING\"");
    }
}
