//! C7: the reply pump (`return_replies_thread`). Dedicated consumer of HTTP
//! caller completions; correlates each one via its [`RequestContext`] and
//! invokes C5. Ownership of the originating event, the augmented request
//! headers, and the context is released simply by letting `HttpCompletion`
//! (and the `ReplyInputs` built from it) drop at the end of each iteration —
//! Rust's ownership model makes the original's explicit free-on-every-path
//! bookkeeping unnecessary.

use std::sync::atomic::AtomicI64;

use tokio::sync::mpsc;

use crate::collaborators::{CookieStore, HttpCompletion, WspCollaborator};
use crate::config::GatewayConfig;
use crate::convert::ConverterRegistry;
use crate::reply::{self, ReplyInputs};

/// Run until the completion channel is closed (the HTTP caller shut down
/// and all in-flight requests drained) — the shutdown sentinel described in
/// spec §4.7 is simply the channel's `None`.
pub async fn run(
    mut completions: mpsc::Receiver<HttpCompletion>,
    converters: &ConverterRegistry<'_>,
    wsp: &dyn WspCollaborator,
    config: &GatewayConfig,
    fetch_counter: &AtomicI64,
    cookie_store: Option<&dyn CookieStore>,
) {
    while let Some(completion) = completions.recv().await {
        let HttpCompletion {
            context,
            status,
            final_url: _,
            headers,
            body,
        } = completion;

        let inputs = ReplyInputs {
            status,
            body: Some(body),
            headers,
            sdu_size: context.client_sdu_size,
            origin: context.origin,
            session_id: context.session_id,
            url: context.request_url,
            x_wap_tod: context.x_wap_tod,
            request_headers: context.request_headers,
        };

        reply::return_reply(inputs, converters, wsp, config, fetch_counter, cookie_store).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::tests::{NoopWmlScriptCompiler, RecordingWsp, UppercaseWmlCompiler};
    use crate::event::{AddrTuple, FetchOrigin, RequestContext};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn completion_is_correlated_and_decrements_counter() {
        let wml = UppercaseWmlCompiler;
        let wmlscript = NoopWmlScriptCompiler;
        let converters = ConverterRegistry::new(&wml, &wmlscript);
        let wsp = RecordingWsp::default();
        let config = GatewayConfig::default();
        let counter = AtomicI64::new(1);

        let (tx, rx) = mpsc::channel(4);
        let context = RequestContext {
            client_sdu_size: 0,
            origin: FetchOrigin::Unit {
                transaction_id: 9,
                addr_tuple: AddrTuple::default(),
            },
            session_id: -1,
            request_url: "http://x/y".to_string(),
            x_wap_tod: false,
            request_headers: Vec::new(),
        };
        tx.send(HttpCompletion {
            context,
            status: 200,
            final_url: "http://x/y".to_string(),
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: b"hi".to_vec(),
        })
        .await
        .unwrap();
        drop(tx);

        run(rx, &converters, &wsp, &config, &counter, None).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        match &wsp.unit_replies.lock().unwrap()[0] {
            crate::event::WspReply::UnitMethodResultReq {
                transaction_id,
                body,
                ..
            } => {
                assert_eq!(*transaction_id, 9);
                assert_eq!(body, b"hi");
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}
