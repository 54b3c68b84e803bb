//! Outbox for remote progress calls
//!
//! Gameplay never waits on the network: calls are queued here, the platform
//! layer drains and performs them, and reports each result back by id.
//! Only play time is retried; it is re-queued locally when a flush fails.

use std::collections::{BTreeMap, VecDeque};

use super::progress::PlayerProgress;
use super::wire::{FlushReason, ProgressRequest, ProgressResponse};
use crate::error::RemoteError;

pub type RequestId = u64;

/// A queued call, ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub id: RequestId,
    pub request: ProgressRequest,
}

/// What a finished call means to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Loaded(PlayerProgress),
    LoadFailed(RemoteError),
    Acknowledged(ProgressRequest),
    Failed(ProgressRequest, RemoteError),
}

/// Something that answers progress calls synchronously (tests, native demo)
pub trait ProgressService {
    fn call(&mut self, request: &ProgressRequest) -> Result<ProgressResponse, RemoteError>;
}

#[derive(Debug, Default)]
pub struct RemoteSync {
    next_id: RequestId,
    outbox: VecDeque<OutgoingRequest>,
    in_flight: BTreeMap<RequestId, ProgressRequest>,
    /// Seconds played but not yet handed to a request
    unsent_seconds: u32,
}

impl RemoteSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, request: ProgressRequest) -> RequestId {
        self.next_id += 1;
        let id = self.next_id;
        log::debug!("Queued {} request #{}", request.kind(), id);
        self.outbox.push_back(OutgoingRequest { id, request });
        id
    }

    /// Hand every queued call to the transport
    pub fn drain(&mut self) -> Vec<OutgoingRequest> {
        let drained: Vec<OutgoingRequest> = self.outbox.drain(..).collect();
        for out in &drained {
            self.in_flight.insert(out.id, out.request.clone());
        }
        drained
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outbox.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn accumulate_time(&mut self, seconds: u32) {
        self.unsent_seconds = self.unsent_seconds.saturating_add(seconds);
    }

    /// Seconds not yet handed to a request
    pub fn unsent_seconds(&self) -> u32 {
        self.unsent_seconds
    }

    /// Queue the accumulated play time, if any
    pub fn flush_time(&mut self, reason: FlushReason) -> Option<RequestId> {
        if self.unsent_seconds == 0 {
            return None;
        }
        let seconds = std::mem::take(&mut self.unsent_seconds);
        Some(self.enqueue(ProgressRequest::AddTime { seconds, reason }))
    }

    /// Drop everything queued (used by a full reset). Loads already in
    /// flight are forgotten too, so their stale snapshots are never applied.
    pub fn discard_pending(&mut self) {
        self.outbox.clear();
        self.unsent_seconds = 0;
        let before = self.in_flight.len();
        self.in_flight
            .retain(|_, request| !matches!(request, ProgressRequest::Load));
        let dropped = before - self.in_flight.len();
        if dropped > 0 {
            log::debug!("Forgot {} in-flight load(s)", dropped);
        }
    }

    /// Report the result of a call. Unknown ids are ignored.
    pub fn complete(
        &mut self,
        id: RequestId,
        result: Result<ProgressResponse, RemoteError>,
    ) -> Option<Completion> {
        let Some(request) = self.in_flight.remove(&id) else {
            log::warn!("Response for unknown request #{}", id);
            return None;
        };

        let result = result.and_then(ProgressResponse::into_result);
        let completion = match (request, result) {
            (ProgressRequest::Load, Ok(response)) => Completion::Loaded(response.snapshot()),
            (ProgressRequest::Load, Err(e)) => {
                log::error!("Failed to load progress: {}", e);
                Completion::LoadFailed(e)
            }
            (request, Ok(_)) => Completion::Acknowledged(request),
            (request, Err(e)) => {
                log::error!("Remote {} failed: {}", request.kind(), e);
                if let ProgressRequest::AddTime { seconds, .. } = request {
                    self.unsent_seconds = self.unsent_seconds.saturating_add(seconds);
                    log::warn!(
                        "Re-queued {}s of play time ({}s pending)",
                        seconds,
                        self.unsent_seconds
                    );
                }
                Completion::Failed(request, e)
            }
        };
        Some(completion)
    }
}
