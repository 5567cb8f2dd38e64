//! Boundary to the authoritative timeline. Everything behind [`TimelineApi`]
//! is a suspension point for the editor.

pub mod client;
pub mod wire;

use crate::error::SyncError;
use crate::kernel::mutation::MutationRequest;
use crate::kernel::segment::DbId;
use crate::kernel::session::TimelinePayload;

pub use client::HttpTimelineApi;

#[allow(async_fn_in_trait)]
pub trait TimelineApi {
    /// Sends one state-changing request. `Ok` carries the full replacement
    /// timeline; anything else means nothing changed server-side.
    async fn mutate(&self, request: &MutationRequest) -> Result<TimelinePayload, SyncError>;

    /// The `{db_id, check: true}` probe.
    async fn undo_available(&self, db_id: DbId) -> Result<bool, SyncError>;
}

impl<T: TimelineApi> TimelineApi for std::sync::Arc<T> {
    async fn mutate(&self, request: &MutationRequest) -> Result<TimelinePayload, SyncError> {
        (**self).mutate(request).await
    }

    async fn undo_available(&self, db_id: DbId) -> Result<bool, SyncError> {
        (**self).undo_available(db_id).await
    }
}
