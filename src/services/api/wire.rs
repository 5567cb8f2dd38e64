use crate::error::SyncError;
use crate::kernel::segment::{Cycle, DbId, Segment};
use crate::kernel::session::TimelinePayload;
use serde::{Deserialize, Serialize};

/// Body of every mutation response. Older endpoints nest the segment list
/// under `analysis_data`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MutationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Segment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_data: Option<AnalysisData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_events: Option<Vec<Cycle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiration_analysis: Option<serde_json::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AnalysisData {
    #[serde(default)]
    pub events: Vec<Segment>,
}

impl MutationResponse {
    /// Classifies the body. A success without a segment list is malformed.
    pub fn into_payload(self) -> Result<TimelinePayload, SyncError> {
        if self.success == Some(false) || (self.success.is_none() && self.error.is_some()) {
            let message = self
                .error
                .unwrap_or_else(|| "The server rejected the operation".to_string());
            return Err(SyncError::Server(message));
        }

        let events = self
            .events
            .or_else(|| self.analysis_data.map(|data| data.events))
            .ok_or_else(|| SyncError::Malformed("response carries no segment list".to_string()))?;

        Ok(TimelinePayload {
            events,
            cycles: self.cycle_events.unwrap_or_default(),
            table_html: self.table_html,
            respiration_analysis: self.respiration_analysis,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UndoCheckRequest {
    pub db_id: DbId,
    pub check: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UndoCheckResponse {
    #[serde(default)]
    pub undo_available: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UndoCheckResponse {
    pub fn into_availability(self) -> Result<bool, SyncError> {
        match (self.undo_available, self.error) {
            (Some(available), _) => Ok(available),
            (None, Some(message)) => Err(SyncError::Server(message)),
            (None, None) => Err(SyncError::Malformed("undo probe carries no undo_available".to_string())),
        }
    }
}

/// Error body of a non-2xx answer, when there is one.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::segment::PhaseType;

    #[test]
    fn nested_events_are_accepted() {
        let body = r#"{
            "success": true,
            "analysis_data": {"events": [{"id": 1, "start": 0, "end": 10, "type": "inhalation"}]},
            "table_html": "<table></table>"
        }"#;
        let payload = serde_json::from_str::<MutationResponse>(body).unwrap().into_payload().unwrap();
        assert_eq!(payload.events.len(), 1);
        assert_eq!(payload.events[0].phase, PhaseType::Inhalation);
        assert!(payload.cycles.is_empty());
    }

    #[test]
    fn success_without_events_is_malformed() {
        let body = r#"{"success": true, "table_html": ""}"#;
        let err = serde_json::from_str::<MutationResponse>(body).unwrap().into_payload().unwrap_err();
        assert!(matches!(err, SyncError::Malformed(_)));
    }

    #[test]
    fn failure_message_is_verbatim() {
        let body = r#"{"success": false, "error": "Segment 4 does not exist"}"#;
        let err = serde_json::from_str::<MutationResponse>(body).unwrap().into_payload().unwrap_err();
        assert_eq!(err, SyncError::Server("Segment 4 does not exist".to_string()));
    }

    #[test]
    fn undo_probe_body() {
        let req = serde_json::to_value(UndoCheckRequest { db_id: DbId(3), check: true }).unwrap();
        assert_eq!(req, serde_json::json!({"db_id": 3, "check": true}));

        let resp: UndoCheckResponse = serde_json::from_str(r#"{"undo_available": false}"#).unwrap();
        assert_eq!(resp.into_availability(), Ok(false));
    }
}
