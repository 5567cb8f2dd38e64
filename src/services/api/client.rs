use super::wire::{ErrorBody, MutationResponse, UndoCheckRequest, UndoCheckResponse};
use super::TimelineApi;
use crate::config::EngineConfig;
use crate::error::SyncError;
use crate::kernel::mutation::{MutationRequest, OperationKind};
use crate::kernel::segment::DbId;
use crate::kernel::session::TimelinePayload;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-over-POST client for the analysis server.
#[derive(Clone)]
pub struct HttpTimelineApi {
    client: Client,
    config: EngineConfig,
}

impl HttpTimelineApi {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_millis(config.request_timeout_ms)) // Network-level bound
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    async fn post<B, T>(&self, op: OperationKind, body: &B) -> Result<T, SyncError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.url_for(op);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Undecodable {} response: {}", op, e);
            SyncError::Malformed(e.to_string())
        })
    }

    fn classify(&self, e: reqwest::Error) -> SyncError {
        if e.is_timeout() {
            SyncError::Timeout(self.config.request_timeout_ms)
        } else if e.is_decode() {
            SyncError::Malformed(e.to_string())
        } else {
            SyncError::Transport(e.to_string())
        }
    }

    async fn status_error(response: Response) -> SyncError {
        let status = response.status().as_u16();
        match response.json::<ErrorBody>().await {
            Ok(ErrorBody { error: Some(message) }) => SyncError::Server(message),
            _ => SyncError::Status(status),
        }
    }
}

impl TimelineApi for HttpTimelineApi {
    async fn mutate(&self, request: &MutationRequest) -> Result<TimelinePayload, SyncError> {
        let body: MutationResponse = self.post(request.kind(), request).await?;
        body.into_payload()
    }

    async fn undo_available(&self, db_id: DbId) -> Result<bool, SyncError> {
        let check = UndoCheckRequest { db_id, check: true };
        let body: UndoCheckResponse = self.post(OperationKind::Undo, &check).await?;
        body.into_availability()
    }
}
