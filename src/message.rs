//! Protocol identifiers and wire messages shared by every Paxos role.

use serde::{Deserialize, Serialize};

/// Identity of a participant, stable for the process lifetime.
///
/// Signed so that the [`ProposalId::FLOOR`] sentinel can carry a node id
/// that orders below every real participant (real ids are `0..n`).
pub type NodeId = i64;

/// The payload agreed on by a Paxos instance.
pub type Value = String;

/// Identifier for one round of a single Paxos instance.
///
/// Ordered lexicographically by `(round, node_id)`. The node id breaks ties
/// when two proposers pick the same round, which keeps the order total.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ProposalId {
    pub round: u64,
    pub node_id: NodeId,
}

impl ProposalId {
    /// Initial promise of an acceptor, below any id a proposer can send.
    pub const FLOOR: Self = Self {
        round: 0,
        node_id: -1,
    };
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.round, self.node_id)
    }
}

/// A round id paired with the value it tries to get chosen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareRequest {
    pub proposal_id: ProposalId,
}

/// Reply to a granted prepare. Carries the acceptor's accepted proposal, if
/// any, so the proposer can adopt it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareResponse {
    pub proposal: Option<Proposal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeRequest {
    pub proposal: Proposal,
}

/// Echoes the proposal the acceptor just accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeResponse {
    pub proposal: Proposal,
}

/// Acceptance announcement pushed from an acceptor to every learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRequest {
    pub sender: NodeId,
    pub proposal: Proposal,
}

/// Outbound request, tagged by kind.
///
/// The variant decides both the target endpoint and the response decoder at
/// the router call site.
#[derive(Debug, Clone)]
pub enum Request {
    Prepare(PrepareRequest),
    Propose(ProposeRequest),
    Log(LogRequest),
}

impl Request {
    /// Path of the internal endpoint handling this request kind.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Request::Prepare(_) => "internal/prepare",
            Request::Propose(_) => "internal/propose",
            Request::Log(_) => "internal/log",
        }
    }
}

/// Successful, non-ignored reply to a [`Request`].
///
/// Log requests are fire-and-forget and have no response variant.
#[derive(Debug, Clone)]
pub enum Response {
    Prepare(PrepareResponse),
    Propose(ProposeResponse),
}

/// Strict majority: more than half of `num_nodes`.
pub fn is_majority(num_nodes: usize, num_responses: usize) -> bool {
    num_responses > num_nodes / 2
}
