//! Role gate
//!
//! A single predicate decides whether an actor may attempt a state-changing
//! action against a resource. The client consults it to hide or refuse
//! actions before any request is sent; the server re-runs it against the
//! freshly loaded record before mutating anything.
//!
//! Checks run in a fixed order: authentication, role, blocked / ownership,
//! then state preconditions. The first failing check is reported.

use thiserror::Error;

use crate::error::{AppError, ErrorCode};
use crate::models::{Issue, IssueStatus, Priority, Role, User};

/// Issues a non-premium citizen may have before the upgrade prompt
pub const FREE_TIER_ISSUE_LIMIT: usize = 3;

/// Who is acting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub email: String,
    pub role: Role,
    pub is_blocked: bool,
    pub is_premium: bool,
}

impl Actor {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
            is_blocked: false,
            is_premium: false,
        }
    }

    pub fn is(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            role: user.role,
            is_blocked: user.is_blocked,
            is_premium: user.is_premium,
        }
    }
}

/// Transition Gateway actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateIssue,
    EditIssue,
    DeleteIssue,
    Upvote,
    Boost,
    AssignStaff,
    Reject,
    UpdateStatus(IssueStatus),
    BlockUser,
    UnblockUser,
    Subscribe,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateIssue => "create issue",
            Self::EditIssue => "edit issue",
            Self::DeleteIssue => "delete issue",
            Self::Upvote => "upvote",
            Self::Boost => "boost",
            Self::AssignStaff => "assign staff",
            Self::Reject => "reject issue",
            Self::UpdateStatus(_) => "update status",
            Self::BlockUser => "block user",
            Self::UnblockUser => "unblock user",
            Self::Subscribe => "subscribe",
        }
    }

    /// Boost and Subscribe charge the caller
    pub fn moves_money(&self) -> bool {
        matches!(self, Self::Boost | Self::Subscribe)
    }
}

/// What the action targets
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// A report about to be filed; `existing_count` is the reporter's current total
    NewIssue { existing_count: usize },
    Issue(&'a Issue),
    /// Another account (block / unblock)
    User(&'a User),
    /// The caller's own account (subscribe)
    Account(&'a User),
}

/// Why the gate refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("Please sign in first")]
    NotAuthenticated,

    #[error("Please sign in again before making a payment")]
    SessionNotVerified,

    #[error("Role {role} cannot {action}")]
    RoleNotAllowed { role: Role, action: &'static str },

    #[error("Your account is blocked")]
    UserBlocked,

    #[error("Free plan allows {limit} issues, upgrade to premium to report more")]
    FreeTierLimitReached { limit: usize },

    #[error("Only the reporter can {action}")]
    NotOwner { action: &'static str },

    #[error("Only pending issues can be edited (issue is {status})")]
    IssueNotEditable { status: IssueStatus },

    #[error("You cannot upvote your own issue")]
    SelfUpvote,

    #[error("You have already upvoted this issue")]
    AlreadyUpvoted,

    #[error("Issue is already high priority")]
    AlreadyHighPriority,

    #[error("Issue is already assigned to {staff}")]
    IssueAlreadyAssigned { staff: String },

    #[error("Issue is already {status}")]
    IssueFinalized { status: IssueStatus },

    #[error("Cannot move issue from {from} to {to}")]
    InvalidStatusTransition { from: IssueStatus, to: IssueStatus },

    #[error("Issue is not assigned to you")]
    NotAssignee,

    #[error("Admin accounts cannot be modified")]
    CannotModifyAdmin,

    #[error("Account is already premium")]
    AlreadyPremium,

    #[error("Action {action} does not apply to this resource")]
    InvalidTarget { action: &'static str },
}

impl Denial {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotAuthenticated => ErrorCode::NotAuthenticated,
            Self::SessionNotVerified => ErrorCode::SessionNotVerified,
            Self::RoleNotAllowed { .. } => ErrorCode::RoleRequired,
            Self::UserBlocked => ErrorCode::UserBlocked,
            Self::FreeTierLimitReached { .. } => ErrorCode::FreeTierLimitReached,
            Self::NotOwner { .. } => ErrorCode::NotOwner,
            Self::IssueNotEditable { .. } => ErrorCode::IssueNotEditable,
            Self::SelfUpvote => ErrorCode::SelfUpvote,
            Self::AlreadyUpvoted => ErrorCode::AlreadyUpvoted,
            Self::AlreadyHighPriority => ErrorCode::AlreadyHighPriority,
            Self::IssueAlreadyAssigned { .. } => ErrorCode::IssueAlreadyAssigned,
            Self::IssueFinalized { .. } => ErrorCode::IssueFinalized,
            Self::InvalidStatusTransition { .. } => ErrorCode::InvalidStatusTransition,
            Self::NotAssignee => ErrorCode::NotAssignee,
            Self::CannotModifyAdmin => ErrorCode::CannotModifyAdmin,
            Self::AlreadyPremium => ErrorCode::AlreadyPremium,
            Self::InvalidTarget { .. } => ErrorCode::InvalidRequest,
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        let err = AppError::with_message(denial.code(), denial.to_string());
        match denial {
            Denial::FreeTierLimitReached { limit } => err.with_detail("limit", limit),
            Denial::InvalidStatusTransition { from, to } => err
                .with_detail("from", from.as_str())
                .with_detail("to", to.as_str()),
            _ => err,
        }
    }
}

/// Tunable gate parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    pub free_tier_issue_limit: usize,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            free_tier_issue_limit: FREE_TIER_ISSUE_LIMIT,
        }
    }
}

impl GatePolicy {
    pub fn new(free_tier_issue_limit: usize) -> Self {
        Self {
            free_tier_issue_limit,
        }
    }

    /// Most reports `actor` may hold; `None` when unlimited
    pub fn issue_cap(&self, actor: &Actor) -> Option<usize> {
        (!actor.is_premium).then_some(self.free_tier_issue_limit)
    }

    pub fn check(
        &self,
        action: Action,
        actor: Option<&Actor>,
        resource: Resource<'_>,
    ) -> Result<(), Denial> {
        let actor = actor.ok_or(Denial::NotAuthenticated)?;

        match (action, resource) {
            (Action::CreateIssue, Resource::NewIssue { existing_count }) => {
                require_role(actor, action, &[Role::Citizen])?;
                if actor.is_blocked {
                    return Err(Denial::UserBlocked);
                }
                if let Some(limit) = self.issue_cap(actor)
                    && existing_count >= limit
                {
                    return Err(Denial::FreeTierLimitReached { limit });
                }
                Ok(())
            }

            (Action::EditIssue, Resource::Issue(issue)) => {
                if !issue.is_reported_by(&actor.email) {
                    return Err(Denial::NotOwner {
                        action: action.name(),
                    });
                }
                if issue.status != IssueStatus::Pending {
                    return Err(Denial::IssueNotEditable {
                        status: issue.status,
                    });
                }
                Ok(())
            }

            // Allowed in any status
            (Action::DeleteIssue, Resource::Issue(issue)) => {
                if actor.role.is_admin() || issue.is_reported_by(&actor.email) {
                    Ok(())
                } else {
                    Err(Denial::NotOwner {
                        action: action.name(),
                    })
                }
            }

            (Action::Upvote, Resource::Issue(issue)) => {
                require_role(actor, action, &[Role::Citizen])?;
                if issue.is_reported_by(&actor.email) {
                    return Err(Denial::SelfUpvote);
                }
                if issue.has_upvote_from(&actor.email) {
                    return Err(Denial::AlreadyUpvoted);
                }
                Ok(())
            }

            (Action::Boost, Resource::Issue(issue)) => {
                if issue.priority == Priority::High {
                    return Err(Denial::AlreadyHighPriority);
                }
                Ok(())
            }

            (Action::AssignStaff, Resource::Issue(issue)) => {
                require_role(actor, action, &[Role::Admin])?;
                if let Some(staff) = &issue.assigned_staff {
                    return Err(Denial::IssueAlreadyAssigned {
                        staff: staff.clone(),
                    });
                }
                if issue.status.is_terminal() {
                    return Err(Denial::IssueFinalized {
                        status: issue.status,
                    });
                }
                Ok(())
            }

            (Action::Reject, Resource::Issue(issue))
            | (Action::UpdateStatus(IssueStatus::Rejected), Resource::Issue(issue)) => {
                require_role(actor, Action::Reject, &[Role::Admin])?;
                transition(issue.status, IssueStatus::Rejected)
            }

            (Action::UpdateStatus(next), Resource::Issue(issue)) => {
                require_role(actor, action, &[Role::Staff, Role::Admin])?;
                if actor.role == Role::Staff && !issue.is_assigned_to(&actor.email) {
                    return Err(Denial::NotAssignee);
                }
                transition(issue.status, next)
            }

            (Action::BlockUser | Action::UnblockUser, Resource::User(target)) => {
                require_role(actor, action, &[Role::Admin])?;
                if target.role.is_admin() {
                    return Err(Denial::CannotModifyAdmin);
                }
                Ok(())
            }

            (Action::Subscribe, Resource::Account(account)) => {
                require_role(actor, action, &[Role::Citizen])?;
                if !actor.is(&account.email) {
                    return Err(Denial::NotOwner {
                        action: action.name(),
                    });
                }
                if account.is_premium {
                    return Err(Denial::AlreadyPremium);
                }
                Ok(())
            }

            _ => Err(Denial::InvalidTarget {
                action: action.name(),
            }),
        }
    }

    /// Issue actions the actor may attempt right now, for UI visibility
    pub fn allowed_actions(&self, actor: Option<&Actor>, issue: &Issue) -> Vec<Action> {
        let mut candidates = vec![
            Action::EditIssue,
            Action::DeleteIssue,
            Action::Upvote,
            Action::Boost,
            Action::AssignStaff,
            Action::Reject,
        ];
        candidates.extend(
            issue
                .status
                .next_statuses()
                .into_iter()
                .filter(|s| *s != IssueStatus::Rejected)
                .map(Action::UpdateStatus),
        );

        candidates
            .into_iter()
            .filter(|action| self.check(*action, actor, Resource::Issue(issue)).is_ok())
            .collect()
    }
}

fn require_role(actor: &Actor, action: Action, allowed: &[Role]) -> Result<(), Denial> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(Denial::RoleNotAllowed {
            role: actor.role,
            action: action.name(),
        })
    }
}

fn transition(from: IssueStatus, to: IssueStatus) -> Result<(), Denial> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Denial::InvalidStatusTransition { from, to })
    }
}

/// [`GatePolicy::check`] with the default policy
pub fn can_perform(action: Action, actor: Option<&Actor>, resource: Resource<'_>) -> Result<(), Denial> {
    GatePolicy::default().check(action, actor, resource)
}

/// [`GatePolicy::allowed_actions`] with the default policy
pub fn allowed_actions(actor: Option<&Actor>, issue: &Issue) -> Vec<Action> {
    GatePolicy::default().allowed_actions(actor, issue)
}
