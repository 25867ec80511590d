//! Core domain types shared across the pipeline.

pub mod alert;
pub mod message;
pub mod sample;
pub mod vitals;

use serde::{Deserialize, Serialize};

/// Identifier of a monitored user (channel id for realtime fan-out).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
