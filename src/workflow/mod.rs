//! Sell workflow state machine: upload, poll, edit, publish.

mod controller;
mod error;
mod result_set;
mod state;

pub use controller::JobController;
pub use error::WorkflowError;
pub use result_set::{IndexOutOfRange, ResultSet};
pub use state::JobState;
