//! Recording session domain module

mod state;

pub use state::{CaptureSession, InvalidStateTransition, SessionState};
