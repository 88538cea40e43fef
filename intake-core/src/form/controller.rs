//! Effect interpreter for the form.
//!
//! `FormController` owns the form's state, its field values and the message
//! currently shown, and is the only thing that touches local storage or the
//! network on the form's behalf.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::{info, warn};

use super::effect::Effect;
use super::event::FormEvent;
use super::state::{FormState, Notice};
use super::storage::{
    load_form_state, save_submission, KeyValueError, KeyValueStore, SUBMITTED_KEY, WITHDRAWN_KEY,
};
use super::transition::{transition, TransitionResult, ALREADY_SUBMITTED, RESTORED_SUBMISSION};
use crate::client::{ApplicationGateway, GatewayError};
use crate::record::{ApplicationFields, FormField, SubmissionInput};

#[derive(Debug, Error)]
pub enum FormError {
    /// The form refused the action; the notice is what the user should see.
    #[error("{}", .0.content)]
    Rejected(Notice),

    #[error("form produced no outcome")]
    NoOutcome,

    /// The server stored the submission but it could not be remembered
    /// locally. The form stays as it was before the submit.
    #[error("application was saved at {timestamp} but could not be remembered locally: {source}")]
    NotRemembered {
        timestamp: String,
        #[source]
        source: KeyValueError,
    },

    #[error(transparent)]
    Storage(#[from] KeyValueError),
}

pub struct FormController<S, G> {
    store: S,
    gateway: G,
    state: FormState,
    fields: ApplicationFields,
    notice: Option<Notice>,
}

impl<S, G> FormController<S, G>
where
    S: KeyValueStore,
    G: ApplicationGateway,
{
    /// Restore the form from local storage.
    ///
    /// A restored submission brings its field values back and shows the
    /// "already submitted" message.
    pub fn load(mut store: S, gateway: G) -> Result<Self, KeyValueError> {
        let state = load_form_state(&mut store)?;
        let (fields, notice) = match state.submission() {
            Some(submission) => (
                submission.data.clone(),
                Some(Notice::success(RESTORED_SUBMISSION)),
            ),
            None => (ApplicationFields::default(), None),
        };

        Ok(Self {
            store,
            gateway,
            state,
            fields,
            notice,
        })
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn fields(&self) -> &ApplicationFields {
        &self.fields
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// When the held submission was accepted, if there is one.
    pub fn submitted_at(&self) -> Option<&str> {
        self.state.submission().map(|s| s.timestamp.as_str())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) -> Result<(), FormError> {
        if !self.state.is_editable() {
            return Err(FormError::Rejected(Notice::error(ALREADY_SUBMITTED)));
        }
        self.fields.set(field, value);
        Ok(())
    }

    pub async fn submit(&mut self) -> Result<Notice, FormError> {
        let event = FormEvent::SubmitRequested {
            fields: self.fields.clone(),
        };
        let notice = self.dispatch(event).await?;
        outcome(notice)
    }

    pub async fn withdraw(&mut self) -> Result<Notice, FormError> {
        let notice = self.dispatch(FormEvent::WithdrawRequested).await?;
        outcome(notice)
    }

    /// Forget everything stored locally and start over.
    pub async fn reset(&mut self) -> Result<(), FormError> {
        self.dispatch(FormEvent::ResetRequested).await?;
        Ok(())
    }

    /// Run an event to quiescence: transition, execute effects, feed any
    /// result events back in. Returns the last notice raised along the way.
    ///
    /// A new state is only adopted once all of its effects have run, so a
    /// failed effect leaves the form in the state it was in.
    async fn dispatch(&mut self, event: FormEvent) -> Result<Option<Notice>, FormError> {
        let mut last_notice = None;
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let TransitionResult { state, effects } = transition(self.state.clone(), event);

            for effect in effects {
                if let Some(next) = self.execute(effect, &mut last_notice).await? {
                    pending.push_back(next);
                }
            }

            if state.name() != self.state.name() {
                info!("Form {} -> {}", self.state.name(), state.name());
            }
            self.state = state;
        }

        Ok(last_notice)
    }

    async fn execute(
        &mut self,
        effect: Effect,
        last_notice: &mut Option<Notice>,
    ) -> Result<Option<FormEvent>, FormError> {
        match effect {
            Effect::SendSubmission { fields } => {
                let input = SubmissionInput::from(fields.clone());
                let event = match self.gateway.submit(&input).await {
                    Ok(response) => FormEvent::SubmissionAccepted { fields, response },
                    Err(GatewayError::Transport(e)) => {
                        warn!("Submission did not reach the server: {}", e);
                        FormEvent::SubmissionFailed { error: None }
                    }
                    Err(e) => {
                        warn!("Submission refused: {}", e);
                        FormEvent::SubmissionFailed {
                            error: Some(e.to_string()),
                        }
                    }
                };
                return Ok(Some(event));
            }
            Effect::SaveSubmission { submission } => {
                if let Err(source) = save_submission(&mut self.store, &submission) {
                    warn!("Accepted submission could not be saved locally: {}", source);
                    return Err(FormError::NotRemembered {
                        timestamp: submission.timestamp,
                        source,
                    });
                }
            }
            Effect::ClearSubmission => self.store.remove(SUBMITTED_KEY)?,
            Effect::SaveWithdrawal => self.store.set(WITHDRAWN_KEY, "true")?,
            Effect::ClearWithdrawal => self.store.remove(WITHDRAWN_KEY)?,
            Effect::ClearFields => self.fields = ApplicationFields::default(),
            Effect::Notify { notice } => {
                self.notice = Some(notice.clone());
                *last_notice = Some(notice);
            }
            Effect::ClearNotice => self.notice = None,
        }
        Ok(None)
    }
}

fn outcome(notice: Option<Notice>) -> Result<Notice, FormError> {
    match notice {
        Some(notice) if notice.is_error() => Err(FormError::Rejected(notice)),
        Some(notice) => Ok(notice),
        None => Err(FormError::NoOutcome),
    }
}
