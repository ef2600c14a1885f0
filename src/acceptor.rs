use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::message::{
    LogRequest, NodeId, PrepareRequest, PrepareResponse, Proposal, ProposalId, ProposeRequest,
    ProposeResponse, Request,
};
use crate::router::Router;

/// Passive Paxos role: promises, accepts, and announces acceptances.
pub struct Acceptor {
    /// Identity of the node hosting this acceptor.
    node_id: NodeId,

    /// Learners notified whenever a proposal is accepted.
    learners: Vec<NodeId>,

    /// Transport used for the acceptance fan-out.
    router: Arc<dyn Router>,

    /// Highest proposal id this acceptor has promised. Never decreases.
    promised: ProposalId,

    /// The last proposal this acceptor has accepted.
    accepted: Option<Proposal>,
}

impl Acceptor {
    pub fn new(node_id: NodeId, learners: Vec<NodeId>, router: Arc<dyn Router>) -> Self {
        Self {
            node_id,
            learners,
            router,
            promised: ProposalId::FLOOR,
            accepted: None,
        }
    }

    /// Phase 1: promise not to accept anything older than the request's id.
    ///
    /// A stale id (not newer than the current promise) is ignored with no
    /// state change; `None` tells the proposer it did not get this vote.
    pub fn handle_prepare(&mut self, request: PrepareRequest) -> Option<PrepareResponse> {
        if request.proposal_id <= self.promised {
            debug!(
                node_id = self.node_id,
                requested = %request.proposal_id,
                promised = %self.promised,
                "ignoring stale prepare",
            );
            return None;
        }

        self.promised = request.proposal_id;

        Some(PrepareResponse {
            proposal: self.accepted.clone(),
        })
    }

    /// Phase 2: accept the proposal and announce it to every learner.
    ///
    /// The announcement fan-out is best-effort: the futures are all issued,
    /// awaited together, and their outcomes discarded. A lost announcement
    /// costs liveness, not safety; a later round re-drives the value.
    pub async fn handle_propose(&mut self, request: ProposeRequest) -> Option<ProposeResponse> {
        if request.proposal.id < self.promised {
            debug!(
                node_id = self.node_id,
                requested = %request.proposal.id,
                promised = %self.promised,
                "ignoring stale propose",
            );
            return None;
        }

        let proposal = request.proposal;
        self.accepted = Some(proposal.clone());

        let announcement = LogRequest {
            sender: self.node_id,
            proposal: proposal.clone(),
        };
        join_all(
            self.learners
                .iter()
                .map(|&learner| self.router.send(learner, Request::Log(announcement.clone()))),
        )
        .await;

        Some(ProposeResponse { proposal })
    }

    #[cfg(test)]
    pub(crate) fn promised(&self) -> ProposalId {
        self.promised
    }

    #[cfg(test)]
    pub(crate) fn accepted(&self) -> Option<&Proposal> {
        self.accepted.as_ref()
    }
}
