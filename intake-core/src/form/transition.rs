//! Pure state transition function for the form.

use super::effect::Effect;
use super::event::FormEvent;
use super::state::{FormState, LocalSubmission, Notice};

pub const ALREADY_SUBMITTED: &str =
    "You have already submitted an application and cannot submit again";
pub const RESTORED_SUBMISSION: &str =
    "Your application has been submitted. Please do not submit it again";
pub const DEFAULT_SUCCESS: &str =
    "Application received! We will process it as soon as possible";
pub const NETWORK_ERROR: &str = "Network error, please try again later";
pub const WITHDRAWN: &str =
    "Application withdrawn. You may edit it and submit again (only one withdrawal is allowed)";
pub const WITHDRAWAL_USED: &str = "You have already used your withdrawal and cannot withdraw again";
pub const NOTHING_TO_WITHDRAW: &str = "There is no submitted application to withdraw";

/// Result of a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub state: FormState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: FormState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }

    pub fn no_change(state: FormState) -> Self {
        Self {
            state,
            effects: vec![],
        }
    }

    fn notify(state: FormState, notice: Notice) -> Self {
        Self::new(state, vec![Effect::Notify { notice }])
    }
}

/// Given the current state and an event, return the new state and the
/// effects to execute. No I/O happens here.
pub fn transition(state: FormState, event: FormEvent) -> TransitionResult {
    match (&state, event) {
        // =====================================================================
        // Submission
        // =====================================================================
        (FormState::Submitted { .. }, FormEvent::SubmitRequested { .. }) => {
            TransitionResult::notify(state.clone(), Notice::error(ALREADY_SUBMITTED))
        }

        (_, FormEvent::SubmitRequested { fields }) => match fields.first_missing() {
            Some(field) => TransitionResult::notify(
                state.clone(),
                Notice::error(format!("Please fill in the {} field", field)),
            ),
            None => TransitionResult::new(
                state.clone(),
                vec![
                    Effect::ClearNotice,
                    Effect::SendSubmission { fields },
                ],
            ),
        },

        // A late acceptance cannot replace a submission we already hold.
        (FormState::Submitted { .. }, FormEvent::SubmissionAccepted { .. }) => {
            TransitionResult::no_change(state.clone())
        }

        (_, FormEvent::SubmissionAccepted { fields, response }) => {
            let withdrawal_used = state.withdrawal_used();
            let submission = LocalSubmission::new(fields, response.timestamp);
            let message = if response.message.is_empty() {
                DEFAULT_SUCCESS.to_string()
            } else {
                response.message
            };
            TransitionResult::new(
                FormState::Submitted {
                    submission: submission.clone(),
                    withdrawal_used,
                },
                vec![
                    Effect::SaveSubmission { submission },
                    Effect::Notify {
                        notice: Notice::success(message),
                    },
                ],
            )
        }

        (_, FormEvent::SubmissionFailed { error }) => {
            let content = error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| NETWORK_ERROR.to_string());
            TransitionResult::notify(state.clone(), Notice::error(content))
        }

        // =====================================================================
        // Withdrawal
        // =====================================================================
        (
            FormState::Submitted {
                withdrawal_used: false,
                ..
            },
            FormEvent::WithdrawRequested,
        ) => TransitionResult::new(
            FormState::Withdrawn,
            vec![
                Effect::SaveWithdrawal,
                Effect::ClearSubmission,
                Effect::Notify {
                    notice: Notice::success(WITHDRAWN),
                },
            ],
        ),

        (FormState::Idle, FormEvent::WithdrawRequested) => {
            TransitionResult::notify(state.clone(), Notice::error(NOTHING_TO_WITHDRAW))
        }

        (_, FormEvent::WithdrawRequested) => {
            TransitionResult::notify(state.clone(), Notice::error(WITHDRAWAL_USED))
        }

        // =====================================================================
        // Reset
        // =====================================================================
        (_, FormEvent::ResetRequested) => TransitionResult::new(
            FormState::Idle,
            vec![
                Effect::ClearSubmission,
                Effect::ClearWithdrawal,
                Effect::ClearFields,
                Effect::ClearNotice,
            ],
        ),
    }
}
