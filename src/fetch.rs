//! C4: the request assembler (`start_fetch`). Builds an outbound HTTP
//! request from a WSP invoke event, fast-paths the health URL, and submits
//! everything else to the HTTP caller.

use std::sync::atomic::{AtomicI64, Ordering};

use tracing::debug;

use crate::collaborators::{CookieStore, HttpCaller, HttpMethod, WspCollaborator};
use crate::config::GatewayConfig;
use crate::convert::ConverterRegistry;
use crate::event::{FetchInvoke, FetchOrigin, Headers, Method, RequestContext};
use crate::headers;
use crate::reply::{self, ReplyInputs};
use crate::urlmap::UrlMap;

/// Reserved magic URL whose GET is answered with the built-in health deck
/// instead of being fetched.
pub const HEALTH_URL: &str = "kannel:alive";

/// Everything `start_fetch` needs that isn't carried on the event itself.
pub struct FetchContext<'a> {
    pub url_map: &'a UrlMap,
    pub converters: &'a ConverterRegistry<'a>,
    pub http_caller: &'a dyn HttpCaller,
    pub wsp: &'a dyn WspCollaborator,
    pub config: &'a GatewayConfig,
    pub fetch_counter: &'a AtomicI64,
    pub host: &'a str,
    /// Present only when the gateway was built with cookie support wired
    /// in; `None` otherwise (including whenever the `cookies` feature is
    /// off, per spec §4.4 "if compiled with cookie support").
    pub cookie_store: Option<&'a dyn CookieStore>,
}

struct ExtractedInvoke {
    url: String,
    method: Method,
    request_body: Vec<u8>,
    session_headers: Headers,
    request_headers: Headers,
    addr_tuple: crate::event::AddrTuple,
    session_id: i64,
    client_sdu_size: u32,
    origin: FetchOrigin,
}

fn extract(invoke: FetchInvoke) -> ExtractedInvoke {
    match invoke {
        FetchInvoke::Session(mi) => ExtractedInvoke {
            url: mi.request_uri,
            method: mi.method,
            request_body: mi.request_body,
            session_headers: mi.session_headers,
            request_headers: mi.request_headers,
            addr_tuple: mi.addr_tuple,
            session_id: mi.session_id,
            client_sdu_size: mi.client_sdu_size,
            origin: FetchOrigin::Session {
                server_transaction_id: mi.server_transaction_id,
                session_id: mi.session_id,
            },
        },
        FetchInvoke::Unit(umi) => ExtractedInvoke {
            url: umi.request_uri,
            method: umi.method,
            request_body: umi.request_body,
            session_headers: Headers::new(),
            request_headers: umi.request_headers,
            addr_tuple: umi.addr_tuple.clone(),
            session_id: -1,
            client_sdu_size: 0,
            origin: FetchOrigin::Unit {
                transaction_id: umi.transaction_id,
                addr_tuple: umi.addr_tuple,
            },
        },
    }
}

/// Build the augmented header list for an outbound request, per spec step 4:
/// combine, strip hop-by-hop, track+remove `X-WAP.TOD`, then add Accept,
/// Accept-Charset, network info, SDU size, Via, referer, gateway version,
/// session id.
fn build_request_headers(extracted: &ExtractedInvoke, ctx: &FetchContext<'_>) -> (Headers, bool) {
    let mut actual_headers = extracted.session_headers.clone();
    actual_headers.extend(extracted.request_headers.clone());
    headers::strip_hop_by_hop_headers(&mut actual_headers);
    let x_wap_tod = headers::take_x_wap_tod(&mut actual_headers);

    headers::add_accept_headers(&mut actual_headers, ctx.converters);
    headers::add_charset_headers(&mut actual_headers, &ctx.converters.wml_charsets());
    headers::add_network_info(&mut actual_headers, &extracted.addr_tuple);
    headers::add_client_sdu_size(&mut actual_headers, extracted.client_sdu_size);
    headers::add_via(
        &mut actual_headers,
        ctx.host,
        &ctx.config.product_name,
        &ctx.config.product_version,
    );

    #[cfg(feature = "cookies")]
    if extracted.session_id != -1 {
        if let Some(store) = ctx.cookie_store {
            store.get_cookies(&mut actual_headers, extracted.session_id);
        }
    }

    if extracted.session_id != -1 {
        if let Some(referer) = ctx.wsp.referer_url(extracted.session_id) {
            headers::add_referer_url(&mut actual_headers, &referer);
        }
    }

    headers::add_gateway_version(
        &mut actual_headers,
        &ctx.config.product_name,
        &ctx.config.product_version,
    );
    headers::add_session_id(&mut actual_headers, extracted.session_id);

    (actual_headers, x_wap_tod)
}

/// Entry point for both `S_MethodInvoke_Ind` and `S_Unit_MethodInvoke_Ind`.
/// Ownership of the originating event passes into the request context (and
/// from there to the reply pump) unless a synthetic reply is dispatched
/// immediately.
pub async fn start_fetch(invoke: FetchInvoke, ctx: &FetchContext<'_>) {
    ctx.fetch_counter.fetch_add(1, Ordering::SeqCst);

    let mut extracted = extract(invoke);
    extracted.url = ctx.url_map.rewrite(&extracted.url);

    let (actual_headers, x_wap_tod) = build_request_headers(&extracted, ctx);

    if extracted.method == Method::Get && extracted.url == HEALTH_URL {
        debug!("serving built-in health deck");
        let inputs = ReplyInputs {
            status: 200,
            body: Some(reply::health_deck().into_bytes()),
            headers: vec![("Content-Type".to_string(), "text/vnd.wap.wml".to_string())],
            sdu_size: extracted.client_sdu_size,
            origin: extracted.origin,
            session_id: extracted.session_id,
            url: extracted.url,
            x_wap_tod,
            request_headers: actual_headers,
        };
        reply::return_reply(inputs, ctx.converters, ctx.wsp, ctx.config, ctx.fetch_counter, ctx.cookie_store)
            .await;
        return;
    }

    match extracted.method {
        Method::Get | Method::Head => {
            dispatch_to_caller(extracted, actual_headers, x_wap_tod, Vec::new(), ctx).await;
        }
        Method::Post => {
            let body = extracted.request_body.clone();
            dispatch_to_caller(extracted, actual_headers, x_wap_tod, body, ctx).await;
        }
        Method::Other => {
            debug!("unsupported method, replying 501");
            let inputs = ReplyInputs {
                status: 501,
                body: Some(Vec::new()),
                headers: Vec::new(),
                sdu_size: extracted.client_sdu_size,
                origin: extracted.origin,
                session_id: extracted.session_id,
                url: extracted.url,
                x_wap_tod,
                request_headers: actual_headers,
            };
            reply::return_reply(inputs, ctx.converters, ctx.wsp, ctx.config, ctx.fetch_counter, ctx.cookie_store)
                .await;
        }
    }
}

async fn dispatch_to_caller(
    extracted: ExtractedInvoke,
    actual_headers: Headers,
    x_wap_tod: bool,
    body: Vec<u8>,
    ctx: &FetchContext<'_>,
) {
    let http_method = match extracted.method {
        Method::Get => HttpMethod::Get,
        Method::Head => HttpMethod::Head,
        Method::Post => HttpMethod::Post,
        Method::Other => unreachable!("Other is handled by the caller before dispatch"),
    };

    let request_context = RequestContext {
        client_sdu_size: extracted.client_sdu_size,
        origin: extracted.origin,
        session_id: extracted.session_id,
        request_url: extracted.url.clone(),
        x_wap_tod,
        request_headers: actual_headers.clone(),
    };

    ctx.http_caller
        .start_request(
            http_method,
            extracted.url,
            actual_headers,
            body,
            request_context,
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::tests::{NoopWmlScriptCompiler, RecordingWsp, UppercaseWmlCompiler};
    use crate::event::{AddrTuple, MethodInvoke, UnitMethodInvoke};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCaller {
        requests: Mutex<Vec<(HttpMethod, String)>>,
    }

    #[async_trait]
    impl HttpCaller for RecordingCaller {
        async fn start_request(
            &self,
            method: HttpMethod,
            url: String,
            _headers: Headers,
            _body: Vec<u8>,
            _context: RequestContext,
        ) {
            self.requests.lock().unwrap().push((method, url));
        }
        async fn signal_shutdown(&self) {}
    }

    fn registry<'a>(
        wml: &'a UppercaseWmlCompiler,
        wmlscript: &'a NoopWmlScriptCompiler,
    ) -> ConverterRegistry<'a> {
        ConverterRegistry::new(wml, wmlscript)
    }

    #[tokio::test]
    async fn health_url_is_answered_without_hitting_caller() {
        let url_map = UrlMap::new();
        let wml = UppercaseWmlCompiler;
        let wmlscript = NoopWmlScriptCompiler;
        let converters = registry(&wml, &wmlscript);
        let caller = RecordingCaller::default();
        let wsp = RecordingWsp::default();
        let config = GatewayConfig::default();
        let counter = AtomicI64::new(0);

        let ctx = FetchContext {
            url_map: &url_map,
            converters: &converters,
            http_caller: &caller,
            wsp: &wsp,
            config: &config,
            fetch_counter: &counter,
            host: "gw.example",
            cookie_store: None,
        };

        let invoke = FetchInvoke::Session(MethodInvoke {
            server_transaction_id: 42,
            session_id: 7,
            request_uri: HEALTH_URL.to_string(),
            method: Method::Get,
            request_headers: Headers::new(),
            session_headers: Headers::new(),
            request_body: Vec::new(),
            addr_tuple: AddrTuple::default(),
            client_sdu_size: 0,
        });

        start_fetch(invoke, &ctx).await;

        assert!(caller.requests.lock().unwrap().is_empty());
        let replies = wsp.session_replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            crate::event::WspReply::MethodResultReq {
                status,
                headers,
                body,
                server_transaction_id,
                session_id,
                ..
            } => {
                assert_eq!(*status, 200);
                assert_eq!(*server_transaction_id, 42);
                assert_eq!(*session_id, 7);
                // The health deck still goes through C2 like any other WML
                // reply, so it comes back compiled (uppercased by the
                // `UppercaseWmlCompiler` stub) with a wmlc content-type.
                assert_eq!(*body, crate::errors::health_deck().to_ascii_uppercase().into_bytes());
                assert!(headers
                    .iter()
                    .any(|(n, v)| n == "Content-Type" && v == "application/vnd.wap.wmlc"));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_method_yields_501() {
        let url_map = UrlMap::new();
        let wml = UppercaseWmlCompiler;
        let wmlscript = NoopWmlScriptCompiler;
        let converters = registry(&wml, &wmlscript);
        let caller = RecordingCaller::default();
        let wsp = RecordingWsp::default();
        let config = GatewayConfig::default();
        let counter = AtomicI64::new(0);

        let ctx = FetchContext {
            url_map: &url_map,
            converters: &converters,
            http_caller: &caller,
            wsp: &wsp,
            config: &config,
            fetch_counter: &counter,
            host: "gw.example",
            cookie_store: None,
        };

        let invoke = FetchInvoke::Unit(UnitMethodInvoke {
            transaction_id: 1,
            request_uri: "http://x/y".to_string(),
            method: Method::Other,
            request_headers: Headers::new(),
            request_body: Vec::new(),
            addr_tuple: AddrTuple::default(),
        });

        start_fetch(invoke, &ctx).await;

        let replies = wsp.unit_replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            crate::event::WspReply::UnitMethodResultReq { status, body, .. } => {
                assert_eq!(*status, 501);
                assert!(body.is_empty());
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_is_submitted_to_caller_with_rewritten_url() {
        let mut url_map = UrlMap::new();
        url_map.config_add("http://a/*", "http://b/*").unwrap();
        let wml = UppercaseWmlCompiler;
        let wmlscript = NoopWmlScriptCompiler;
        let converters = registry(&wml, &wmlscript);
        let caller = RecordingCaller::default();
        let wsp = RecordingWsp::default();
        let config = GatewayConfig::default();
        let counter = AtomicI64::new(0);

        let ctx = FetchContext {
            url_map: &url_map,
            converters: &converters,
            http_caller: &caller,
            wsp: &wsp,
            config: &config,
            fetch_counter: &counter,
            host: "gw.example",
            cookie_store: None,
        };

        let invoke = FetchInvoke::Unit(UnitMethodInvoke {
            transaction_id: 1,
            request_uri: "http://a/page".to_string(),
            method: Method::Get,
            request_headers: Headers::new(),
            request_body: Vec::new(),
            addr_tuple: AddrTuple::default(),
        });

        start_fetch(invoke, &ctx).await;

        let requests = caller.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, "http://b/page");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
