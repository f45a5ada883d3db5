//! Application-level orchestration.
//!
//! This module owns the submission lifecycle (the `RunState` cell and every transition of
//! it) and post-submission processing such as writing the artifact for scripted runs.
//! UI/CLI layers only send commands in and read state out.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, SubmissionController, UiCommand};
pub(crate) use post_process::process_outcome;
