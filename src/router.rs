use async_trait::async_trait;

use crate::message::{NodeId, Request, Response};

/// Delivers a request to a named node and returns its typed response.
///
/// This is the only seam between the protocol roles and the transport.
/// Every delivery failure (unreachable peer, timeout, non-success status,
/// undecodable body) collapses to `None`; the caller treats all of them as
/// a missing vote and never learns why delivery failed. Fire-and-forget
/// kinds ([`Request::Log`]) resolve to `None` even on success.
///
/// Implementations must be freely shareable: the proposer issues its fan-out
/// calls concurrently through one `Arc<dyn Router>`.
#[async_trait]
pub trait Router: Send + Sync {
    async fn send(&self, to: NodeId, request: Request) -> Option<Response>;
}
