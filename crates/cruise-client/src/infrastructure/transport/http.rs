//! Request/response transport over HTTP (`reqwest`).
//!
//! Older controller firmware has no socket endpoint.  It exposes a few POST
//! routes (`/left`, `/right`) on port 8082 and answers each with a status
//! code.  Two things live here:
//!
//! - [`HttpControlClient`]: a thin `reqwest` wrapper with one method per
//!   controller route.  A status in `200..300` is success; anything else, or a
//!   failure to complete the request at all, is a [`TransportError`].
//! - [`HttpTransport`]: the same client behind the [`Transport`] trait.  Each
//!   text frame becomes `POST <base>/<frame>`.  Requests are issued one at a
//!   time by a worker task so they reach the controller in send order, and the
//!   first failure is reported as `Errored` and ends the adapter.
//!
//! # Frame routes
//!
//! The controller firmware only defines `/left` and `/right`.  The route used
//! for every other frame is this client's own convention, not something the
//! controller publishes: the whole frame becomes one percent-encoded path
//! segment (`"angle: 0.50"` → `POST /angle:%200.50`), and binary frames are
//! POSTed to the base URL as the request body.  A controller that wants
//! streamed commands over HTTP has to accept these routes explicitly.

use async_trait::async_trait;
use cruise_core::Nudge;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use crate::application::transport::{
    Transport, TransportError, TransportEvent, TransportEvents, TransportFactory,
};

/// Something that can nudge the steering one step left or right.
#[async_trait]
pub trait NudgeSender: Send + Sync {
    async fn nudge(&self, direction: Nudge) -> Result<(), TransportError>;
}

/// HTTP client for the controller's discrete routes.
#[derive(Debug, Clone)]
pub struct HttpControlClient {
    http: reqwest::Client,
    base: Url,
}

impl HttpControlClient {
    /// Creates a client for `base`, e.g. `http://raspberrypi.local:8082`.
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Creates a client that shares an existing `reqwest` connection pool.
    pub fn with_client(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `base` with `route` appended as one percent-encoded path segment.
    fn route_url(&self, route: &str) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::Request {
                route: route.to_string(),
                reason: format!("{} cannot carry a path", self.base),
            })?
            .pop_if_empty()
            .push(route);
        Ok(url)
    }

    /// Sends `POST <base>/<route>` with an optional body.
    ///
    /// # Errors
    ///
    /// [`TransportError::Status`] for a response outside `200..300`, and
    /// [`TransportError::Request`] when no response was received.
    pub async fn post(&self, route: &str, body: Option<Vec<u8>>) -> Result<(), TransportError> {
        let url = self.route_url(route)?;
        let mut request = self.http.post(url.clone());
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| TransportError::Request {
            route: route.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        if status.is_success() {
            debug!(%url, %status, "controller accepted request");
            Ok(())
        } else {
            warn!(%url, %status, "controller rejected request");
            Err(TransportError::Status {
                route: route.to_string(),
                status: status.as_u16(),
            })
        }
    }

    /// `POST /left`.
    pub async fn left(&self) -> Result<(), TransportError> {
        self.post(Nudge::Left.route(), None).await
    }

    /// `POST /right`.
    pub async fn right(&self) -> Result<(), TransportError> {
        self.post(Nudge::Right.route(), None).await
    }
}

#[async_trait]
impl NudgeSender for HttpControlClient {
    async fn nudge(&self, direction: Nudge) -> Result<(), TransportError> {
        match direction {
            Nudge::Left => self.left().await,
            Nudge::Right => self.right().await,
        }
    }
}

// ── Transport adapter ─────────────────────────────────────────────────────────

enum Request {
    Text(String),
    Binary(Vec<u8>),
}

enum Stage {
    Idle,
    Open(mpsc::UnboundedSender<Request>),
    Spent,
}

/// [`Transport`] that turns every frame into an HTTP request.
pub struct HttpTransport {
    client: HttpControlClient,
    stage: Stage,
}

impl HttpTransport {
    pub fn new(client: HttpControlClient) -> Self {
        Self {
            client,
            stage: Stage::Idle,
        }
    }

    fn enqueue(&self, request: Request) -> Result<(), TransportError> {
        match &self.stage {
            Stage::Open(tx) => tx
                .send(request)
                .map_err(|_| TransportError::Io("request worker has stopped".to_string())),
            Stage::Idle | Stage::Spent => Err(TransportError::NotOpen),
        }
    }
}

impl Transport for HttpTransport {
    /// There is no persistent link, so `Opened` is reported straight away.
    fn open(&mut self) -> Result<TransportEvents, TransportError> {
        if !matches!(self.stage, Stage::Idle) {
            return Err(TransportError::Spent);
        }
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_requests(self.client.clone(), request_rx, event_tx));
        self.stage = Stage::Open(request_tx);
        Ok(event_rx)
    }

    fn send_text(&self, message: String) -> Result<(), TransportError> {
        self.enqueue(Request::Text(message))
    }

    /// Binary frames are POSTed to the base URL as the request body.
    fn send_binary(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.enqueue(Request::Binary(bytes))
    }

    /// Lets queued requests finish, then reports `Closed`.
    fn close(&mut self) -> Result<(), TransportError> {
        match std::mem::replace(&mut self.stage, Stage::Spent) {
            Stage::Open(_) | Stage::Idle => Ok(()),
            Stage::Spent => Err(TransportError::Spent),
        }
    }

    fn endpoint(&self) -> &Url {
        self.client.base()
    }
}

async fn run_requests(
    client: HttpControlClient,
    mut requests: mpsc::UnboundedReceiver<Request>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let _ = events.send(TransportEvent::Opened);
    while let Some(request) = requests.recv().await {
        let sent = match request {
            Request::Text(route) => client.post(&route, None).await,
            Request::Binary(body) => client.post("", Some(body)).await,
        };
        if let Err(e) = sent {
            let _ = events.send(TransportEvent::Errored(e));
            return;
        }
    }
    // Every sender is gone: close() was called or the adapter was dropped.
    let _ = events.send(TransportEvent::Closed);
}

/// Builds an [`HttpTransport`] per connect attempt, sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpTransportFactory {
    http: reqwest::Client,
}

impl HttpTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self, endpoint: &Url) -> Box<dyn Transport> {
        let client = HttpControlClient::with_client(self.http.clone(), endpoint.clone());
        Box::new(HttpTransport::new(client))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
