use crate::error::SyncError;
use crate::kernel::event::{Event, InputEvent};
use crate::kernel::reactor::Editor;
use crate::kernel::scheduler::{Notice, SideEffect};
use crate::services::api::TimelineApi;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type InFlight<'a> = Pin<Box<dyn Future<Output = Event> + 'a>>;

/// Executes the editor's side effects against a [`TimelineApi`] and feeds the
/// results back in. The only place that awaits.
pub struct EditorDriver<A> {
    pub editor: Editor,
    api: A,
    timeout: Duration,
}

impl<A: TimelineApi> EditorDriver<A> {
    pub fn new(editor: Editor, api: A, timeout: Duration) -> Self {
        Self { editor, api, timeout }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Feeds one input and runs every resulting request and probe to
    /// completion before returning the notices, in order.
    pub async fn handle(&mut self, input: InputEvent) -> Vec<Notice> {
        self.drive(vec![input.into()]).await
    }

    /// Runs the editor over `events` until no side effect is left.
    pub async fn drive(&mut self, mut events: Vec<Event>) -> Vec<Notice> {
        let mut notices = Vec::new();

        while !events.is_empty() {
            let effects = self.editor.step(std::mem::take(&mut events));
            for effect in effects {
                match effect {
                    SideEffect::Dispatch { request_id, request } => {
                        let result = with_timeout(self.timeout, self.api.mutate(&request)).await;
                        events.push(Event::Settled { request_id, result });
                    }
                    SideEffect::ProbeUndo { db_id } => {
                        let result = with_timeout(self.timeout, self.api.undo_available(db_id)).await;
                        events.push(Event::UndoProbed(result));
                    }
                    SideEffect::Notify(notice) => notices.push(notice),
                }
            }
        }

        notices
    }

    /// Long-lived loop: inputs arrive while requests are in flight, so a second
    /// command during `Pending` is answered with `Busy`.
    pub async fn run(
        self,
        mut inputs: mpsc::Receiver<InputEvent>,
        notices: mpsc::Sender<Notice>,
        cancel: CancellationToken,
    ) -> Editor {
        let EditorDriver { mut editor, api, timeout } = self;
        let api = &api;
        let mut in_flight: VecDeque<InFlight<'_>> = VecDeque::new();

        info!("Editor driver running for db_id {}", editor.state.session.db_id);

        loop {
            let events = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Editor driver cancelled");
                    break;
                }
                event = next_completion(&mut in_flight) => vec![event],
                input = inputs.recv() => match input {
                    Some(input) => vec![input.into()],
                    None => {
                        info!("Input channel closed");
                        break;
                    }
                },
            };

            for effect in editor.step(events) {
                match effect {
                    SideEffect::Dispatch { request_id, request } => {
                        in_flight.push_back(Box::pin(async move {
                            let result = with_timeout(timeout, api.mutate(&request)).await;
                            Event::Settled { request_id, result }
                        }));
                    }
                    SideEffect::ProbeUndo { db_id } => {
                        in_flight.push_back(Box::pin(async move {
                            Event::UndoProbed(with_timeout(timeout, api.undo_available(db_id)).await)
                        }));
                    }
                    SideEffect::Notify(notice) => {
                        if notices.send(notice).await.is_err() {
                            warn!("Notice receiver dropped, stopping driver");
                            drop(in_flight);
                            return editor;
                        }
                    }
                }
            }
        }

        drop(in_flight);
        editor
    }
}

async fn next_completion(queue: &mut VecDeque<InFlight<'_>>) -> Event {
    match queue.front_mut() {
        Some(fut) => {
            let event = fut.await;
            queue.pop_front();
            event
        }
        None => std::future::pending().await,
    }
}

async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, SyncError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Request exceeded {:?}", limit);
            Err(SyncError::Timeout(limit.as_millis() as u64))
        }
    }
}
