//! Concrete `reqwest`-backed implementation of [`HttpCaller`]. The original
//! leaves the HTTP client pool as an external collaborator (§6); this crate
//! ships one real implementation so the gateway runs end to end without a
//! caller supplied by an embedder.
//!
//! Each `start_request` spawns its own task (the "N HTTP worker tasks"
//! spec §5 attributes to the caller) and reports the outcome on the
//! completion channel the caller was constructed with.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::collaborators::{HttpCaller, HttpCompletion, HttpMethod};
use crate::event::{Headers, RequestContext};

/// `reqwest::Client`-backed [`HttpCaller`]. Construct with [`ReqwestHttpCaller::new`],
/// which also returns the completion channel's receiving half to hand to the
/// reply pump (C7).
///
/// `completions` is `None` once [`signal_shutdown`](HttpCaller::signal_shutdown)
/// has run. Holding the sender behind a droppable `Option` (rather than a
/// flag alongside it) is what actually closes the channel: the reply pump
/// (`src/reply_pump.rs`) exits its `recv` loop only once every clone of the
/// sender is gone, mirroring how the original makes `http_receive_result`
/// return NULL once `http_caller_signal_shutdown` has run
/// (wap-appl.c:185, 700-702).
pub struct ReqwestHttpCaller {
    client: reqwest::Client,
    completions: Mutex<Option<mpsc::Sender<HttpCompletion>>>,
}

impl ReqwestHttpCaller {
    /// `completion_capacity` bounds the channel the reply pump drains; the
    /// original leaves this as an implementation detail of the caller.
    pub fn new(completion_capacity: usize) -> (Arc<Self>, mpsc::Receiver<HttpCompletion>) {
        let (tx, rx) = mpsc::channel(completion_capacity);
        (
            Arc::new(Self {
                client: reqwest::Client::new(),
                completions: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }
}

async fn perform(
    client: &reqwest::Client,
    method: HttpMethod,
    url: &str,
    headers: Headers,
    body: Vec<u8>,
) -> Result<(i32, String, Headers, Vec<u8>), reqwest::Error> {
    let mut builder = match method {
        HttpMethod::Get => client.get(url),
        HttpMethod::Post => client.post(url),
        HttpMethod::Head => client.head(url),
    };
    for (name, value) in &headers {
        builder = builder.header(name, value);
    }
    if !body.is_empty() {
        builder = builder.body(body);
    }

    let response = builder.send().await?;
    let status = response.status().as_u16() as i32;
    let final_url = response.url().to_string();
    let response_headers: Headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let body = response.bytes().await?.to_vec();
    Ok((status, final_url, response_headers, body))
}

#[async_trait]
impl HttpCaller for ReqwestHttpCaller {
    async fn start_request(
        &self,
        method: HttpMethod,
        url: String,
        headers: Headers,
        body: Vec<u8>,
        context: RequestContext,
    ) {
        let completions = match self.completions.lock().await.as_ref() {
            Some(tx) => tx.clone(),
            None => {
                debug!(%url, "dropping request submitted after shutdown");
                return;
            }
        };

        let client = self.client.clone();

        tokio::spawn(async move {
            let completion = match perform(&client, method, &url, headers, body).await {
                Ok((status, final_url, response_headers, response_body)) => HttpCompletion {
                    context,
                    status,
                    final_url,
                    headers: response_headers,
                    body: response_body,
                },
                Err(err) => {
                    warn!(%url, error = %err, "fetch failed");
                    HttpCompletion {
                        context,
                        status: -1,
                        final_url: url,
                        headers: Headers::new(),
                        body: Vec::new(),
                    }
                }
            };
            // The reply pump may already have exited at shutdown; a closed
            // channel here just means the completion is discarded, matching
            // spec §5's "in-flight requests at shutdown are drained and
            // their replies discarded".
            let _ = completions.send(completion).await;
        });
    }

    async fn signal_shutdown(&self) {
        // Dropping the sender is what actually closes the channel; the
        // reply pump's `recv` loop only sees `None` once every clone of it
        // (including the ones held by in-flight requests' spawned tasks) is
        // gone.
        self.completions.lock().await.take();
    }
}
