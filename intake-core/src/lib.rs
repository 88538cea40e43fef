pub mod client;
pub mod form;
pub mod record;

pub use client::*;
pub use record::*;

/// Default port the intake server listens on.
pub const DEFAULT_PORT: u16 = 3001;
