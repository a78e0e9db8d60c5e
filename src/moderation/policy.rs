//! Read-time visibility rules and the operator state machine.
//!
//! Everything here is pure: handlers load rows, run these functions, and
//! persist whatever comes back. The auto-approval window never mutates the
//! stored `approved` flag, it only widens what a public read returns.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::entity::comment;

/// Lifecycle label derived from the stored `(approved, archived)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentState {
    Pending,
    Approved,
    Archived,
}

impl CommentState {
    pub fn of(approved: bool, archived: bool) -> Self {
        if archived {
            Self::Archived
        } else if approved {
            Self::Approved
        } else {
            Self::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Archived => "ARCHIVED",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Archive,
    Unarchive,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("comment is archived, unarchive it first")]
    ApproveWhileArchived,
}

/// Apply an operator action to the stored flag pair, returning the new
/// `(approved, archived)` values.
///
/// Rules:
/// - approving an archived comment is a named guard violation;
/// - archiving retains the stored `approved` value;
/// - unarchiving resets the comment to pending review (approval does not
///   carry over);
/// - actions that would not change anything succeed as no-ops.
pub fn apply_action(
    approved: bool,
    archived: bool,
    action: ModerationAction,
) -> Result<(bool, bool), TransitionError> {
    match action {
        ModerationAction::Approve => {
            if archived {
                return Err(TransitionError::ApproveWhileArchived);
            }
            Ok((true, false))
        }
        ModerationAction::Archive => Ok((approved, true)),
        ModerationAction::Unarchive => {
            if archived {
                Ok((false, false))
            } else {
                Ok((approved, false))
            }
        }
    }
}

/// True iff the comment has aged past the configured window. Both
/// timestamps are server-issued; client clocks never feed this.
pub fn is_auto_approved_by_time(
    created: DateTime<Utc>,
    now: DateTime<Utc>,
    threshold_hours: i64,
) -> bool {
    now.signed_duration_since(created) >= Duration::hours(threshold_hours)
}

pub fn is_publicly_visible(c: &comment::Model, now: DateTime<Utc>, threshold_hours: i64) -> bool {
    if c.archived {
        return false;
    }
    c.approved || (!c.flagged && is_auto_approved_by_time(c.created, now, threshold_hours))
}

/// Project stored rows to what a public reader sees: archived rows dropped,
/// pending rows kept only once the window has elapsed and they are not
/// flagged, newest first (ids are monotonic, so equal timestamps fall back
/// to insertion order), truncated to `limit`.
pub fn visible_to_public(
    mut rows: Vec<comment::Model>,
    now: DateTime<Utc>,
    threshold_hours: i64,
    limit: usize,
) -> Vec<comment::Model> {
    rows.retain(|c| is_publicly_visible(c, now, threshold_hours));
    rows.sort_by(|a, b| b.created.cmp(&a.created).then(a.id.cmp(&b.id)));
    rows.truncate(limit);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, age_hours: i64, approved: bool, archived: bool, flagged: bool) -> comment::Model {
        comment::Model {
            id,
            post_id: "post-1".to_string(),
            author_name: "reader".to_string(),
            author_email: None,
            content: "hello".to_string(),
            created: Utc::now() - Duration::hours(age_hours),
            approved,
            archived,
            flagged,
        }
    }

    #[test]
    fn archived_never_visible() {
        let now = Utc::now();
        for approved in [false, true] {
            for age in [0, 100] {
                let c = row(1, age, approved, true, false);
                assert!(!is_publicly_visible(&c, now, 24));
            }
        }
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let now = Utc::now();
        let created = now - Duration::hours(24);
        assert!(is_auto_approved_by_time(created, now, 24));
        assert!(!is_auto_approved_by_time(created + Duration::seconds(1), now, 24));
    }

    #[test]
    fn pending_visible_only_after_window() {
        let now = Utc::now();
        assert!(!is_publicly_visible(&row(1, 23, false, false, false), now, 24));
        assert!(is_publicly_visible(&row(1, 25, false, false, false), now, 24));
    }

    #[test]
    fn flagged_excluded_even_after_window() {
        let now = Utc::now();
        let c = row(1, 100, false, false, true);
        assert!(!is_publicly_visible(&c, now, 24));
    }

    #[test]
    fn approved_visible_immediately() {
        let now = Utc::now();
        assert!(is_publicly_visible(&row(1, 0, true, false, false), now, 24));
    }

    #[test]
    fn projection_orders_newest_first_and_truncates() {
        let now = Utc::now();
        let rows = vec![
            row(1, 30, true, false, false),
            row(2, 10, true, false, false),
            row(3, 20, true, false, false),
            row(4, 5, false, true, false),
        ];
        let visible = visible_to_public(rows, now, 24, 2);
        assert_eq!(visible.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn projection_tiebreak_is_insertion_order() {
        let now = Utc::now();
        let ts = now - Duration::hours(1);
        let mut a = row(7, 0, true, false, false);
        let mut b = row(3, 0, true, false, false);
        a.created = ts;
        b.created = ts;
        let visible = visible_to_public(vec![a, b], now, 24, 10);
        assert_eq!(visible.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3, 7]);
    }

    #[test]
    fn approve_is_idempotent() {
        assert_eq!(apply_action(false, false, ModerationAction::Approve), Ok((true, false)));
        assert_eq!(apply_action(true, false, ModerationAction::Approve), Ok((true, false)));
    }

    #[test]
    fn approve_on_archived_is_guarded() {
        assert_eq!(
            apply_action(false, true, ModerationAction::Approve),
            Err(TransitionError::ApproveWhileArchived)
        );
        assert_eq!(
            apply_action(true, true, ModerationAction::Approve),
            Err(TransitionError::ApproveWhileArchived)
        );
    }

    #[test]
    fn archive_retains_approved_flag() {
        assert_eq!(apply_action(true, false, ModerationAction::Archive), Ok((true, true)));
        assert_eq!(apply_action(false, false, ModerationAction::Archive), Ok((false, true)));
        // already archived: no-op
        assert_eq!(apply_action(true, true, ModerationAction::Archive), Ok((true, true)));
    }

    #[test]
    fn unarchive_resets_to_pending() {
        assert_eq!(apply_action(true, true, ModerationAction::Unarchive), Ok((false, false)));
        assert_eq!(apply_action(false, true, ModerationAction::Unarchive), Ok((false, false)));
        // not archived: no-op, approval untouched
        assert_eq!(apply_action(true, false, ModerationAction::Unarchive), Ok((true, false)));
    }

    #[test]
    fn state_labels() {
        assert_eq!(CommentState::of(false, false), CommentState::Pending);
        assert_eq!(CommentState::of(true, false), CommentState::Approved);
        assert_eq!(CommentState::of(true, true), CommentState::Archived);
        assert_eq!(CommentState::of(false, true).as_str(), "ARCHIVED");
    }
}
