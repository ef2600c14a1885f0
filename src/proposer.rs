use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::message::{
    is_majority, NodeId, PrepareRequest, PrepareResponse, Proposal, ProposalId, ProposeRequest,
    ProposeResponse, Request, Response, Value,
};
use crate::router::Router;

/// Active Paxos role: drives Prepare/Promise and Accept/Accepted.
pub struct Proposer {
    /// Identity of the node hosting this proposer.
    node_id: NodeId,

    /// The full acceptor group, self included.
    acceptors: Vec<NodeId>,

    /// Transport for both phases' fan-out.
    router: Arc<dyn Router>,

    /// The id of the most recent attempt. Owned by this proposer (never a
    /// process-wide counter) and incremented before every attempt, so no
    /// two attempts ever reuse an id.
    current_proposal_id: ProposalId,
}

impl Proposer {
    pub fn new(node_id: NodeId, acceptors: Vec<NodeId>, router: Arc<dyn Router>) -> Self {
        Self {
            node_id,
            acceptors,
            router,
            current_proposal_id: ProposalId { round: 0, node_id },
        }
    }

    /// One attempt at both phases. Not a retry loop.
    ///
    /// Returns the value a majority accepted. If the promises surfaced a
    /// previously accepted proposal, that value is driven to acceptance
    /// instead of `value`. `None` means this attempt failed to reach a
    /// majority in one of the phases and the caller should retry with a
    /// fresh round.
    pub async fn propose_once(&mut self, value: Value) -> Option<Value> {
        self.current_proposal_id.round += 1;
        let proposal_id = self.current_proposal_id;

        // Phase 1: ask every acceptor to promise this round. All requests
        // are issued before any is awaited; failures count as missing votes.
        let request = PrepareRequest { proposal_id };
        let replies = join_all(
            self.acceptors
                .iter()
                .map(|&acceptor| self.router.send(acceptor, Request::Prepare(request.clone()))),
        )
        .await;
        let promises: Vec<PrepareResponse> = replies
            .into_iter()
            .flatten()
            .filter_map(|response| match response {
                Response::Prepare(promise) => Some(promise),
                _ => None,
            })
            .collect();
        if !is_majority(self.acceptors.len(), promises.len()) {
            warn!(
                node_id = self.node_id,
                proposal_id = %proposal_id,
                promises = promises.len(),
                acceptors = self.acceptors.len(),
                "no majority of promises",
            );
            return None;
        }

        // Safety rule: if any promise carried an accepted proposal, adopt
        // the value of the one with the greatest id, under our own id.
        let proposal = match promises
            .iter()
            .filter_map(|promise| promise.proposal.as_ref())
            .max_by_key(|accepted| accepted.id)
        {
            Some(accepted) => {
                debug!(
                    node_id = self.node_id,
                    adopted_from = %accepted.id,
                    value = %accepted.value,
                    "adopting previously accepted value",
                );
                Proposal {
                    id: proposal_id,
                    value: accepted.value.clone(),
                }
            }
            None => Proposal {
                id: proposal_id,
                value,
            },
        };

        // Phase 2: ask every acceptor to accept it.
        let request = ProposeRequest {
            proposal: proposal.clone(),
        };
        let replies = join_all(
            self.acceptors
                .iter()
                .map(|&acceptor| self.router.send(acceptor, Request::Propose(request.clone()))),
        )
        .await;
        let accepts: Vec<ProposeResponse> = replies
            .into_iter()
            .flatten()
            .filter_map(|response| match response {
                Response::Propose(accept) => Some(accept),
                _ => None,
            })
            .collect();
        if !is_majority(self.acceptors.len(), accepts.len()) {
            warn!(
                node_id = self.node_id,
                proposal_id = %proposal_id,
                accepts = accepts.len(),
                acceptors = self.acceptors.len(),
                "no majority of accepts",
            );
            return None;
        }

        Some(proposal.value)
    }
}
