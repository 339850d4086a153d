//! The `{status, data, message}` wrapper returned by every source operation.

use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Uniform response shape. `data` is always serialized (as `null` on error)
/// so consumers can rely on the key being present.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Envelope<T> {
    pub status: Status,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl<T> From<Result<T, ScrapeError>> for Envelope<T> {
    fn from(result: Result<T, ScrapeError>) -> Self {
        match result {
            Ok(data) => Envelope::success(data),
            Err(e) => {
                log::warn!("{}", e);
                Envelope::error(e.to_string())
            }
        }
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn to_json(&self) -> String {
        // Envelope payloads are plain data structs; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","data":null,"message":"{}"}}"#, e)
        })
    }
}
