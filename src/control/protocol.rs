//! Remote-control wire types
//!
//! Commands arrive as JSON on the command topic; status payloads go out
//! as JSON on the status topic, one per state transition and per
//! completed unit of work.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two remote commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Start,
    Stop,
}

/// What a job does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// Crawl the link graph and write the product-URL list
    Discovery,

    /// Extract rows from a previously discovered product-URL list and
    /// load them into the database
    #[default]
    Product,

    /// Discovery followed by product extraction
    Full,
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobMode::Discovery => "discovery",
            JobMode::Product => "product",
            JobMode::Full => "full",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for JobMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(JobMode::Discovery),
            "product" => Ok(JobMode::Product),
            "full" => Ok(JobMode::Full),
            other => Err(format!(
                "unknown job mode '{}' (expected discovery, product, or full)",
                other
            )),
        }
    }
}

/// Job lifecycle states
///
/// `Disconnected` is a control-plane availability note, not a job-state
/// transition: it never overrides the state of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Error,
    Cancelled,
    Stopped,
    Disconnected,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Error => "error",
            JobState::Cancelled => "cancelled",
            JobState::Stopped => "stopped",
            JobState::Disconnected => "disconnected",
        };
        write!(f, "{}", s)
    }
}

/// A command received on the command topic
#[derive(Debug, Clone, Deserialize)]
pub struct Command {
    pub command: CommandKind,

    /// Caller-chosen job id; a short one is generated when absent
    #[serde(default)]
    pub job_id: Option<String>,

    #[serde(default)]
    pub mode: JobMode,
}

/// A status payload published on the status topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: Option<String>,
    pub state: JobState,
    pub processed: u64,
    pub total_estimated: u64,
    pub message: String,
    /// ISO 8601
    pub timestamp: String,
}

impl JobStatus {
    /// Builds a status payload stamped with the current time
    pub fn now(
        job_id: Option<String>,
        state: JobState,
        processed: u64,
        total_estimated: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            state,
            processed,
            total_estimated,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
