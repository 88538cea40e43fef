//! Client-side state machine for the application form.
//!
//! The form is a small state machine, split into:
//! - **State**: what the client knows (`FormState`)
//! - **Events**: what happened (`FormEvent`)
//! - **Effects**: what to do (`Effect`)
//! - **Transition**: pure function `(FormState, FormEvent) -> (FormState, Vec<Effect>)`
//!
//! `FormController` interprets effects against local storage and the
//! submission gateway. The one-submission, one-withdrawal rule lives here and
//! only here; the server accepts any number of submissions.

pub mod controller;
pub mod effect;
pub mod event;
pub mod state;
pub mod storage;
pub mod transition;

pub use controller::*;
pub use effect::*;
pub use event::*;
pub use state::*;
pub use storage::*;
pub use transition::*;
