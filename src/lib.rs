//! Single-decree Paxos and a replicated log built from repeated instances.
//!
//! A fixed group of nodes agrees on one value per instance despite message
//! loss, duplicate delivery, and concurrent competing proposers, with no
//! permanent leader. Every node composes the three protocol roles
//! ([`proposer::Proposer`], [`acceptor::Acceptor`], [`learner::Learner`])
//! over an abstract [`router::Router`] transport; the replicated log runs
//! one instance per slot.

pub mod acceptor;
pub mod http;
pub mod learner;
pub mod log;
pub mod message;
pub mod node;
pub mod proposer;
pub mod router;
pub mod server;

pub use log::ReplicatedLog;
pub use message::{NodeId, Proposal, ProposalId, Value};
pub use node::Node;
pub use router::Router;
