/// Target state definitions for tracking crawl progress
///
/// Every frontier entry walks `Discovered -> Fetching -> {Fetched, Failed}`
/// and a fetched target then settles as `Extracted` or `Skipped`.
use crate::HarvestError;
use std::fmt;

/// Represents the current state of a target in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Target has been discovered and is waiting in the frontier
    Discovered,

    /// Target is currently being fetched
    Fetching,

    /// Target response is in hand and awaiting classification
    Fetched,

    /// Fetch failed after exhausting the retry budget
    Failed,

    /// Response was classified and its links or artifact were handled
    Extracted,

    /// Target was dropped (robots, off-site redirect, unexpected type, already stored)
    Skipped,
}

impl TargetState {
    /// Returns true if the state machine allows moving from `self` to `next`
    ///
    /// A discovered target may also be skipped before any request is made
    /// (robots denial or an artifact already on disk).
    pub fn can_transition_to(&self, next: TargetState) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::Fetching)
                | (Self::Discovered, Self::Skipped)
                | (Self::Fetching, Self::Fetched)
                | (Self::Fetching, Self::Failed)
                | (Self::Fetched, Self::Extracted)
                | (Self::Fetched, Self::Skipped)
        )
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow
    pub fn transition(self, next: TargetState) -> Result<TargetState, HarvestError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(HarvestError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::Failed => "failed",
            Self::Extracted => "extracted",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TargetState; 6] = [
        TargetState::Discovered,
        TargetState::Fetching,
        TargetState::Fetched,
        TargetState::Failed,
        TargetState::Extracted,
        TargetState::Skipped,
    ];

    #[test]
    fn test_happy_path() {
        let state = TargetState::Discovered
            .transition(TargetState::Fetching)
            .and_then(|s| s.transition(TargetState::Fetched))
            .and_then(|s| s.transition(TargetState::Extracted))
            .unwrap();
        assert_eq!(state, TargetState::Extracted);
    }

    #[test]
    fn test_failure_path() {
        let state = TargetState::Discovered
            .transition(TargetState::Fetching)
            .and_then(|s| s.transition(TargetState::Failed))
            .unwrap();
        assert_eq!(state, TargetState::Failed);
    }

    #[test]
    fn test_skip_before_fetch() {
        assert!(TargetState::Discovered.can_transition_to(TargetState::Skipped));
    }

    #[test]
    fn test_invalid_transitions() {
        let err = TargetState::Discovered
            .transition(TargetState::Extracted)
            .unwrap_err();
        assert!(matches!(
            err,
            HarvestError::InvalidTransition {
                from: TargetState::Discovered,
                to: TargetState::Extracted
            }
        ));

        assert!(!TargetState::Failed.can_transition_to(TargetState::Fetching));
        assert!(!TargetState::Fetched.can_transition_to(TargetState::Failed));
        assert!(!TargetState::Extracted.can_transition_to(TargetState::Skipped));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [TargetState::Failed, TargetState::Extracted, TargetState::Skipped] {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TargetState::Discovered.to_string(), "discovered");
        assert_eq!(TargetState::Skipped.to_string(), "skipped");
    }
}
