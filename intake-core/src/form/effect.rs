//! Effects (side effects as data).
//!
//! The transition function only describes these; `FormController` runs them.

use super::state::{LocalSubmission, Notice};
use crate::record::ApplicationFields;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// POST the submission to the server.
    SendSubmission { fields: ApplicationFields },

    /// Write the `formSubmitted` marker.
    SaveSubmission { submission: LocalSubmission },

    /// Remove the `formSubmitted` marker.
    ClearSubmission,

    /// Write the `formWithdrawn` marker.
    SaveWithdrawal,

    /// Remove the `formWithdrawn` marker.
    ClearWithdrawal,

    /// Empty every field.
    ClearFields,

    /// Show a message to the user.
    Notify { notice: Notice },

    /// Remove any message currently shown.
    ClearNotice,
}
