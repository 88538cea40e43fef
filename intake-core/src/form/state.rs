//! State types for the client form.

use serde::{Deserialize, Serialize};

use crate::record::ApplicationFields;

/// The locally cached copy of the client's own last submission.
///
/// Serialized verbatim under the `formSubmitted` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSubmission {
    pub submitted: bool,
    pub data: ApplicationFields,
    pub timestamp: String,
}

impl LocalSubmission {
    pub fn new(data: ApplicationFields, timestamp: impl Into<String>) -> Self {
        Self {
            submitted: true,
            data,
            timestamp: timestamp.into(),
        }
    }
}

/// Where the form is in its lifecycle.
///
/// The withdrawal flag only exists where it can vary: `Idle` has never used
/// it, `Withdrawn` always has.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormState {
    /// Never submitted, or reset. Fields are editable.
    #[default]
    Idle,

    /// Submission accepted by the server. Fields are locked.
    Submitted {
        submission: LocalSubmission,
        withdrawal_used: bool,
    },

    /// The one withdrawal has been spent. Fields are editable again and a
    /// new, independent submission may be made.
    Withdrawn,
}

impl FormState {
    pub fn is_editable(&self) -> bool {
        !matches!(self, FormState::Submitted { .. })
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, FormState::Submitted { .. })
    }

    pub fn withdrawal_used(&self) -> bool {
        match self {
            FormState::Idle => false,
            FormState::Submitted {
                withdrawal_used, ..
            } => *withdrawal_used,
            FormState::Withdrawn => true,
        }
    }

    pub fn can_withdraw(&self) -> bool {
        matches!(
            self,
            FormState::Submitted {
                withdrawal_used: false,
                ..
            }
        )
    }

    pub fn submission(&self) -> Option<&LocalSubmission> {
        match self {
            FormState::Submitted { submission, .. } => Some(submission),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FormState::Idle => "idle",
            FormState::Submitted { .. } => "submitted",
            FormState::Withdrawn => "withdrawn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A user-facing message produced by the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub content: String,
}

impl Notice {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            content: content.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}
