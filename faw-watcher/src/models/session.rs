//! Session identity and lifecycle state machine
//!
//! A session folder is named `{conversationId}_{groupId}`. The conversation
//! id keys the output CSV and the aggregate store; the group id names the
//! output subdirectory. One folder maps to exactly one worker for its
//! lifetime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session lifecycle state
///
/// Transitions are one-way: `Active → Finalizing → Terminated`. A worker
/// never processes frames after leaving `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    /// Frames arriving or within the idle window
    Active,
    /// Idle timeout exceeded, residual cleanup in progress
    Finalizing,
    /// Folder removed, worker exited
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Active => write!(f, "ACTIVE"),
            SessionState::Finalizing => write!(f, "FINALIZING"),
            SessionState::Terminated => write!(f, "TERMINATED"),
        }
    }
}

impl SessionState {
    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Active, SessionState::Finalizing)
                | (SessionState::Finalizing, SessionState::Terminated)
        )
    }
}

/// One conversation's frame-stream folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFolder {
    /// Absolute path of the session folder
    pub path: PathBuf,
    /// Conversation identifier (CSV file name, aggregate key)
    pub conversation_id: String,
    /// Logical grouping identifier (output subdirectory name)
    pub group_id: String,
}

impl SessionFolder {
    /// Parse a session folder from its path.
    ///
    /// The folder name splits at the FIRST underscore; conversation ids are
    /// opaque tokens without underscores, group ids may contain them.
    /// Returns `None` for names without an underscore or with an empty half.
    pub fn parse(path: &Path) -> Option<SessionFolder> {
        let name = path.file_name()?.to_str()?;
        let (conversation_id, group_id) = name.split_once('_')?;
        if conversation_id.is_empty() || group_id.is_empty() {
            return None;
        }
        Some(SessionFolder {
            path: path.to_path_buf(),
            conversation_id: conversation_id.to_string(),
            group_id: group_id.to_string(),
        })
    }

    /// Output CSV path for this session under `output_root`.
    pub fn output_csv(&self, output_root: &Path) -> PathBuf {
        output_root
            .join(&self.group_id)
            .join(format!("{}.csv", self.conversation_id))
    }
}

/// Whether a directory entry is an image frame (`.jpg` / `.png`,
/// case-insensitive).
pub fn is_image_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}
