use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::log::RouterFactory;
use crate::message::{NodeId, PrepareResponse, ProposeResponse, Request, Response};
use crate::router::Router;

/// A peer that takes longer than this counts as a missing vote.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// HTTP implementation of [`Router`]: one POST per request, endpoint and
/// decoder picked from the request kind.
pub struct HttpRouter {
    client: Client,
    /// Base URLs of every participant, indexed by node id.
    peers: Arc<Vec<String>>,
    /// Slot suffix appended to internal endpoints in replicated-log mode.
    slot: Option<u64>,
}

impl HttpRouter {
    pub fn new(peers: Vec<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .context("building http client")?,
            peers: Arc::new(peers),
            slot: None,
        })
    }

    /// Per-slot routers for a replicated log, sharing one client pool.
    pub fn factory(peers: Vec<String>) -> Result<RouterFactory> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building http client")?;
        let peers = Arc::new(peers);
        Ok(Box::new(move |slot| {
            Arc::new(HttpRouter {
                client: client.clone(),
                peers: Arc::clone(&peers),
                slot: Some(slot),
            }) as Arc<dyn Router>
        }))
    }

    fn url_for(&self, peer: &str, request: &Request) -> String {
        match self.slot {
            Some(slot) => format!("{}/{}/{}", peer, request.endpoint(), slot),
            None => format!("{}/{}", peer, request.endpoint()),
        }
    }
}

#[async_trait]
impl Router for HttpRouter {
    async fn send(&self, to: NodeId, request: Request) -> Option<Response> {
        let peer = usize::try_from(to).ok().and_then(|i| self.peers.get(i))?;
        let url = self.url_for(peer, &request);

        let result = match &request {
            Request::Prepare(body) => self.client.post(&url).json(body).send().await,
            Request::Propose(body) => self.client.post(&url).json(body).send().await,
            Request::Log(body) => self.client.post(&url).json(body).send().await,
        };
        let response = match result {
            Ok(response) => response,
            Err(error) => {
                debug!(%url, %error, "request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(%url, status = %response.status(), "non-success response");
            return None;
        }

        // The handler signals "ignored" as a null body; both that and an
        // undecodable body collapse to a missing vote.
        match request {
            Request::Prepare(_) => response
                .json::<Option<PrepareResponse>>()
                .await
                .map_err(|error| debug!(%url, %error, "decoding response failed"))
                .ok()
                .flatten()
                .map(Response::Prepare),
            Request::Propose(_) => response
                .json::<Option<ProposeResponse>>()
                .await
                .map_err(|error| debug!(%url, %error, "decoding response failed"))
                .ok()
                .flatten()
                .map(Response::Propose),
            Request::Log(_) => None,
        }
    }
}
