use super::mutation::EditCommand;
use super::segment::SegmentId;
use super::selection::{ClickMode, SelectionEvent};
use super::session::TimelinePayload;
use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlates a dispatched request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        RequestId(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    /// Analyst interaction (pointer or toolbar).
    Input(InputEvent),
    /// A mutation request finished, one way or the other.
    Settled {
        request_id: RequestId,
        result: Result<TimelinePayload, SyncError>,
    },
    /// Answer to the `{db_id, check: true}` probe.
    UndoProbed(Result<bool, SyncError>),
}

#[derive(Debug, Clone)]
pub struct InputEvent {
    pub source: String,
    pub content: InputContent,
}

#[derive(Debug, Clone)]
pub enum InputContent {
    Selection(SelectionEvent),
    Command(EditCommand),
}

impl InputEvent {
    pub fn click(source: &str, id: u64, mode: ClickMode) -> Self {
        Self {
            source: source.to_string(),
            content: InputContent::Selection(SelectionEvent::Click { id: SegmentId(id), mode }),
        }
    }

    pub fn clear(source: &str) -> Self {
        Self {
            source: source.to_string(),
            content: InputContent::Selection(SelectionEvent::Clear),
        }
    }

    pub fn command(source: &str, command: EditCommand) -> Self {
        Self {
            source: source.to_string(),
            content: InputContent::Command(command),
        }
    }
}

impl From<InputEvent> for Event {
    fn from(input: InputEvent) -> Self {
        Event::Input(input)
    }
}
