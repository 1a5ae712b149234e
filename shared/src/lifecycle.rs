//! Issue status machine
//!
//! ```text
//! pending ──► in-progress ──► resolved ──► closed   (forward skips allowed)
//!    └──► rejected (admin only)
//! ```
//!
//! Progress only moves forward. `resolved` counts as terminal for the
//! dashboards but may still be closed. Nothing leaves `closed` or `rejected`,
//! and nothing re-enters `pending`.

use crate::models::IssueStatus;

impl IssueStatus {
    /// Status every new issue starts in
    pub const INITIAL: IssueStatus = IssueStatus::Pending;

    /// resolved / closed / rejected
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed | Self::Rejected)
    }

    /// Position on the forward progress track; `rejected` is off-track
    fn progress_rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::InProgress => Some(1),
            Self::Resolved => Some(2),
            Self::Closed => Some(3),
            Self::Rejected => None,
        }
    }

    pub fn can_transition_to(&self, next: IssueStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Rejected) => true,
            (_, Self::Rejected) => false,
            _ => match (self.progress_rank(), next.progress_rank()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            },
        }
    }

    /// Statuses reachable in one step, in track order
    pub fn next_statuses(&self) -> Vec<IssueStatus> {
        IssueStatus::ALL
            .into_iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }
}

/// Default timeline text for a status change made by `actor`
pub fn timeline_message(status: IssueStatus, actor: &str) -> String {
    match status {
        IssueStatus::Pending => format!("Issue reported by {actor}"),
        IssueStatus::InProgress => format!("Work started on the issue by {actor}"),
        IssueStatus::Resolved => format!("Issue marked as resolved by {actor}"),
        IssueStatus::Closed => format!("Issue closed by {actor}"),
        IssueStatus::Rejected => format!("Issue rejected by {actor}"),
    }
}

pub fn assignment_message(staff: &str, admin: &str) -> String {
    format!("Issue assigned to staff {staff} by {admin}")
}

pub fn boost_message(payer: &str) -> String {
    format!("Issue priority boosted to high by {payer}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use IssueStatus::*;

    #[test]
    fn test_forward_transitions() {
        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Resolved));
        assert!(Pending.can_transition_to(Closed));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(InProgress.can_transition_to(Closed));
        assert!(Resolved.can_transition_to(Closed));
    }

    #[test]
    fn test_reject_only_from_pending() {
        assert!(Pending.can_transition_to(Rejected));
        assert!(!InProgress.can_transition_to(Rejected));
        assert!(!Resolved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Rejected));
    }

    #[test]
    fn test_no_backward_or_same_state_moves() {
        for status in IssueStatus::ALL {
            assert!(!status.can_transition_to(status), "{status} -> {status}");
            assert!(!status.can_transition_to(Pending), "{status} -> pending");
        }
        assert!(!Resolved.can_transition_to(InProgress));
        assert!(!Closed.can_transition_to(Resolved));
    }

    #[test]
    fn test_final_states_have_no_exit() {
        assert!(Closed.next_statuses().is_empty());
        assert!(Rejected.next_statuses().is_empty());
        assert_eq!(Resolved.next_statuses(), vec![Closed]);
        assert_eq!(
            Pending.next_statuses(),
            vec![InProgress, Resolved, Closed, Rejected]
        );
    }

    #[test]
    fn test_terminal_set() {
        assert!(!Pending.is_terminal());
        assert!(!InProgress.is_terminal());
        assert!(Resolved.is_terminal());
        assert!(Resolved.can_transition_to(Closed));
        assert!(Closed.next_statuses().is_empty());
        assert!(Rejected.next_statuses().is_empty());
        assert_eq!(IssueStatus::INITIAL, Pending);
    }

    #[test]
    fn test_timeline_message() {
        assert_eq!(
            timeline_message(Resolved, "s@city.test"),
            "Issue marked as resolved by s@city.test"
        );
    }
}
