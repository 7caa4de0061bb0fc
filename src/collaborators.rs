//! External collaborator interfaces (§6 of the spec this crate implements):
//! the WSP session layer, the Push Proxy Gateway, the HTTP client pool, the
//! WML/WMLScript compilers, and (feature-gated) the cookie store. All are
//! treated as black boxes — this crate only depends on these traits, never
//! on a concrete implementation, so the core stays testable without a real
//! WSP stack.

use crate::event::{AddrTuple, Headers, PpgEvent, RequestContext, WspReply};
use async_trait::async_trait;

/// The HTTP method of an outbound fetch, as assembled by C4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Head,
}

/// One completed (or failed) HTTP fetch, as delivered to the reply pump
/// (C7). `status < 0` signals that the HTTP layer failed to produce a
/// response at all (connection error, timeout, ...).
#[derive(Debug, Clone)]
pub struct HttpCompletion {
    pub context: RequestContext,
    pub status: i32,
    pub final_url: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// The HTTP client pool. Concurrency is entirely owned by the
/// implementation; this crate submits requests and receives completions
/// through the channel passed at construction — see
/// [`crate::http_caller::ReqwestHttpCaller`] for the concrete
/// implementation.
#[async_trait]
pub trait HttpCaller: Send + Sync {
    /// Submit a request; the eventual result arrives on the completion
    /// channel this caller was built with, carrying `context` unchanged.
    async fn start_request(
        &self,
        method: HttpMethod,
        url: String,
        headers: Headers,
        body: Vec<u8>,
        context: RequestContext,
    );

    /// Ask the caller to stop accepting new requests and let in-flight ones
    /// drain; corresponds to the original's `signal_shutdown`.
    async fn signal_shutdown(&self);
}

/// The WSP session layer: dispatch of replies, and the one field the core
/// reaches into a session machine for (the referer URL), exposed as a
/// narrow getter/setter per spec §9 rather than direct field access.
#[async_trait]
pub trait WspCollaborator: Send + Sync {
    async fn session_dispatch_event(&self, reply: WspReply);
    async fn unit_dispatch_event(&self, reply: WspReply);

    /// The session's stored referer URL, if any (`None` if the session is
    /// unknown to WSP, which the caller treats as "no referer").
    fn referer_url(&self, session_id: i64) -> Option<String>;

    /// Update the session's stored referer URL. Called only from C5, and
    /// only on a successful content conversion.
    fn set_referer_url(&self, session_id: i64, url: String);
}

/// The Push Proxy Gateway: dispatch of push events, and session lookups by
/// address tuple or session id.
#[async_trait]
pub trait PpgCollaborator: Send + Sync {
    async fn ppg_dispatch_event(&self, event: PpgEvent);
    fn have_push_session_for(&self, addr: &AddrTuple) -> bool;
    fn have_push_session_for_sid(&self, session_id: i64) -> bool;
}

/// The WML compiler, a pure black-box function: must not panic on
/// malformed input, returning `None` ("no result") instead.
pub trait WmlCompiler: Send + Sync {
    fn compile(&self, body: &[u8], charset: Option<&str>) -> Option<Vec<u8>>;

    /// Charsets this compiler accepts, for `add_charset_headers` (C3).
    fn charsets(&self) -> Vec<String>;
}

/// The WMLScript compiler, likewise a pure black-box function.
pub trait WmlScriptCompiler: Send + Sync {
    fn compile_data(&self, url: &str, body: &[u8]) -> Option<Vec<u8>>;
}

/// The optional cookie store. The trait itself carries no cost to define;
/// its call sites in the request assembler and reply dispatcher only run
/// when a store is actually wired in, which [`crate::gateway::Gateway`]
/// only does under the `cookies` feature (mirroring `#ifdef ENABLE_COOKIES`
/// in the original).
pub trait CookieStore: Send + Sync {
    fn get_cookies(&self, headers: &mut Headers, session_id: i64);
    fn set_cookies(&self, headers: &Headers, session_id: i64);
}

/// Mock collaborator implementations shared across this crate's unit tests.
#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    pub struct UppercaseWmlCompiler;
    impl WmlCompiler for UppercaseWmlCompiler {
        fn compile(&self, body: &[u8], _charset: Option<&str>) -> Option<Vec<u8>> {
            Some(body.to_ascii_uppercase())
        }
        fn charsets(&self) -> Vec<String> {
            vec!["utf-8".to_string(), "iso-8859-1".to_string()]
        }
    }

    pub struct FailingWmlCompiler;
    impl WmlCompiler for FailingWmlCompiler {
        fn compile(&self, _body: &[u8], _charset: Option<&str>) -> Option<Vec<u8>> {
            None
        }
        fn charsets(&self) -> Vec<String> {
            vec!["utf-8".to_string()]
        }
    }

    pub struct NoopWmlScriptCompiler;
    impl WmlScriptCompiler for NoopWmlScriptCompiler {
        fn compile_data(&self, _url: &str, _body: &[u8]) -> Option<Vec<u8>> {
            None
        }
    }

    /// Records every reply dispatched to it, for assertions in fetch/reply tests.
    #[derive(Default)]
    pub struct RecordingWsp {
        pub session_replies: Mutex<Vec<WspReply>>,
        pub unit_replies: Mutex<Vec<WspReply>>,
        pub referers: Mutex<std::collections::HashMap<i64, String>>,
    }

    #[async_trait]
    impl WspCollaborator for RecordingWsp {
        async fn session_dispatch_event(&self, reply: WspReply) {
            self.session_replies.lock().unwrap().push(reply);
        }
        async fn unit_dispatch_event(&self, reply: WspReply) {
            self.unit_replies.lock().unwrap().push(reply);
        }
        fn referer_url(&self, session_id: i64) -> Option<String> {
            self.referers.lock().unwrap().get(&session_id).cloned()
        }
        fn set_referer_url(&self, session_id: i64, url: String) {
            self.referers.lock().unwrap().insert(session_id, url);
        }
    }

    /// Records every event dispatched to it and answers configurable
    /// push-session membership queries, for push-adapter and event-loop tests.
    #[derive(Default)]
    pub struct RecordingPpg {
        pub events: Mutex<Vec<PpgEvent>>,
        pub sessions_by_addr: Mutex<Vec<AddrTuple>>,
        pub sessions_by_sid: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl PpgCollaborator for RecordingPpg {
        async fn ppg_dispatch_event(&self, event: PpgEvent) {
            self.events.lock().unwrap().push(event);
        }
        fn have_push_session_for(&self, addr: &AddrTuple) -> bool {
            self.sessions_by_addr.lock().unwrap().contains(addr)
        }
        fn have_push_session_for_sid(&self, session_id: i64) -> bool {
            self.sessions_by_sid.lock().unwrap().contains(&session_id)
        }
    }
}
