//! Job control
//!
//! The supervisor implements the job state machine
//! (`idle → running → {idle, error, cancelled, stopped}`); the manager
//! feeds it commands from an MQTT topic and publishes its transitions;
//! the standalone runner executes one job without any control plane.

mod manager;
mod protocol;
mod runner;
mod standalone;

pub use manager::{ControlManager, JobSupervisor, StatusPublisher};
pub use protocol::{Command, CommandKind, JobMode, JobState, JobStatus};
pub use runner::{execute_job, JobOutcome};
pub use standalone::run_standalone;
