//! The event data model: the tagged union flowing through the event queue
//! (C6) and the structures correlated across the fetch pipeline (C4/C5/C7).

use std::collections::HashMap;

/// Process-wide lifecycle state of the gateway container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Limbo,
    Running,
    Terminating,
}

/// A pair of local/remote network addresses identifying a session endpoint.
/// Either side may be empty (no address known).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddrTuple {
    pub local: String,
    pub remote: String,
}

/// An ordered, possibly-repeating header list. Using a `Vec` rather than a
/// map preserves the source order and duplicate entries (headers such as
/// `Accept-Charset` are legitimately repeated).
pub type Headers = Vec<(String, String)>;

/// A fetched (or about-to-be-fetched) content bundle. Body is opaque bytes;
/// `content_type`/`charset` drive conversion in C2.
#[derive(Debug, Clone, Default)]
pub struct Content {
    pub url: String,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub charset: Option<String>,
}

/// Session-bound method invocation (`S_MethodInvoke_Ind`).
#[derive(Debug, Clone)]
pub struct MethodInvoke {
    pub server_transaction_id: u32,
    pub session_id: i64,
    pub request_uri: String,
    pub method: Method,
    pub request_headers: Headers,
    pub session_headers: Headers,
    pub request_body: Vec<u8>,
    pub addr_tuple: AddrTuple,
    pub client_sdu_size: u32,
}

/// Connectionless method invocation (`S_Unit_MethodInvoke_Ind`).
#[derive(Debug, Clone)]
pub struct UnitMethodInvoke {
    pub transaction_id: u32,
    pub request_uri: String,
    pub method: Method,
    pub request_headers: Headers,
    pub request_body: Vec<u8>,
    pub addr_tuple: AddrTuple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
    Other,
}

#[derive(Debug, Clone)]
pub struct ConnectInd {
    pub session_id: i64,
    pub addr_tuple: AddrTuple,
    pub client_headers: Headers,
    pub requested_capabilities: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DisconnectInd {
    pub session_id: i64,
    pub addr_tuple: AddrTuple,
    pub reason_code: i32,
    pub error_headers: Headers,
    pub error_body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SuspendInd {
    pub session_id: i64,
    pub reason: i32,
}

#[derive(Debug, Clone)]
pub struct ResumeInd {
    pub session_id: i64,
    pub addr_tuple: AddrTuple,
    pub client_headers: Headers,
}

#[derive(Debug, Clone)]
pub struct MethodAbortInd {
    pub session_id: i64,
    pub server_transaction_id: u32,
}

#[derive(Debug, Clone)]
pub struct PushAbortInd {
    pub session_id: i64,
    pub push_id: u32,
    pub reason: i32,
}

#[derive(Debug, Clone)]
pub struct ConfirmedPushCnf {
    pub session_id: i64,
    pub server_push_id: u32,
}

#[derive(Debug, Clone)]
pub struct MethodResultCnf {
    pub session_id: i64,
    pub server_transaction_id: u32,
}

#[derive(Debug, Clone)]
pub struct PomConnectRes {
    pub session_id: i64,
    pub negotiated_capabilities: Vec<String>,
}

/// Events consumed by the event loop (C6). Inbound variants arrive from the
/// WSP collaborator (session-control and unit events) or are synthesized
/// internally. The queue owns each event from the moment it is produced
/// until the loop (or the fetch pipeline it hands off to) destroys it.
#[derive(Debug, Clone)]
pub enum Event {
    MethodInvokeInd(MethodInvoke),
    UnitMethodInvokeInd(UnitMethodInvoke),
    ConnectInd(ConnectInd),
    DisconnectInd(DisconnectInd),
    SuspendInd(SuspendInd),
    ResumeInd(ResumeInd),
    MethodAbortInd(MethodAbortInd),
    PushAbortInd(PushAbortInd),
    ConfirmedPushCnf(ConfirmedPushCnf),
    MethodResultCnf(MethodResultCnf),
    PomConnectRes(PomConnectRes),
}

/// Reply events emitted back toward WSP.
#[derive(Debug, Clone)]
pub enum WspReply {
    MethodInvokeRes {
        server_transaction_id: u32,
        session_id: i64,
    },
    ConnectRes {
        session_id: i64,
        negotiated_capabilities: Vec<String>,
    },
    ResumeRes {
        session_id: i64,
        server_headers: Option<Headers>,
    },
    MethodResultReq {
        server_transaction_id: u32,
        session_id: i64,
        status: i32,
        headers: Headers,
        body: Vec<u8>,
    },
    UnitMethodResultReq {
        transaction_id: u32,
        addr_tuple: AddrTuple,
        status: i32,
        headers: Headers,
        body: Vec<u8>,
    },
}

/// Events emitted toward the Push Proxy Gateway.
#[derive(Debug, Clone)]
pub enum PpgEvent {
    PomConnectInd {
        addr_tuple: AddrTuple,
        requested_capabilities: Vec<String>,
        accept_application: Vec<String>,
        bearer_indication: Option<String>,
        push_headers: Headers,
        session_id: i64,
    },
    PomDisconnectInd {
        reason_code: i32,
        error_headers: Headers,
        error_body: Vec<u8>,
        session_handle: i64,
    },
    PoConfirmedPushCnf {
        server_push_id: u32,
        session_handle: i64,
    },
    PoPushAbortInd {
        push_id: u32,
        reason: i32,
        session_handle: i64,
    },
    PomSuspendInd {
        reason: i32,
        session_id: i64,
    },
    PomResumeInd {
        addr_tuple: AddrTuple,
        bearer_indication: Option<String>,
        client_headers: Headers,
        session_id: i64,
    },
}

/// The two invocation variants C4 (`start_fetch`) accepts, pulled out of
/// [`Event`] by the event loop before handing off to the fetch pipeline.
#[derive(Debug, Clone)]
pub enum FetchInvoke {
    Session(MethodInvoke),
    Unit(UnitMethodInvoke),
}

/// Which kind of invocation spawned a request-in-flight context; carries
/// exactly the fields `return_reply` (C5) needs to build the matching reply
/// variant.
#[derive(Debug, Clone)]
pub enum FetchOrigin {
    Session {
        server_transaction_id: u32,
        session_id: i64,
    },
    Unit {
        transaction_id: u32,
        addr_tuple: AddrTuple,
    },
}

/// Request-in-flight context (owned by the reply pump from submission to
/// `HttpCaller` until `return_reply` runs).
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub client_sdu_size: u32,
    pub origin: FetchOrigin,
    pub session_id: i64,
    pub request_url: String,
    pub x_wap_tod: bool,
    pub request_headers: Headers,
}

/// Per-session state the gateway needs that otherwise lives inside the WSP
/// session machine: only the referer URL (per spec §9, referer update
/// reaches into WSP through a narrow setter rather than direct field
/// access). Kept here as a local cache keyed by session id so the core does
/// not need to assume anything about the WSP collaborator's internals
/// beyond the trait in [`crate::collaborators`].
#[derive(Debug, Clone, Default)]
pub struct SessionReferers {
    by_session: HashMap<i64, String>,
}

impl SessionReferers {
    pub fn get(&self, session_id: i64) -> Option<&str> {
        self.by_session.get(&session_id).map(String::as_str)
    }

    pub fn set(&mut self, session_id: i64, url: String) {
        self.by_session.insert(session_id, url);
    }
}
