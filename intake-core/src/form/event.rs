//! Events that drive the form.

use crate::record::{ApplicationFields, SubmitResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    /// The user pressed submit with the current field values.
    SubmitRequested { fields: ApplicationFields },

    /// The server stored the submission.
    SubmissionAccepted {
        fields: ApplicationFields,
        response: SubmitResponse,
    },

    /// The submission did not reach the server or was refused by it.
    /// `error` is the server's explanation when there was one.
    SubmissionFailed { error: Option<String> },

    /// The user asked to withdraw the submitted application.
    WithdrawRequested,

    /// Clear all local state (debug affordance).
    ResetRequested,
}
