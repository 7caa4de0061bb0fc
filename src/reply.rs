//! C5: the reply dispatcher (`return_reply`). Transforms fetched content,
//! enforces the client's SDU size, and emits the matching WSP reply event.
//!
//! Grounded on the original's `return_reply()`: the failure/success arms
//! (smart-error fallback vs. ordinary conversion+referer update) followed by
//! the finalization steps common to every reply (hop-by-hop stripping,
//! `X-WAP.TOD`, accept-filter fallback, SDU enforcement).

use std::sync::atomic::{AtomicI64, Ordering};

use tracing::info;

use crate::collaborators::{CookieStore, WspCollaborator};
use crate::config::GatewayConfig;
use crate::convert::{ConverterRegistry, ConvertOutcome};
use crate::errors;
use crate::event::{Content, FetchOrigin, Headers, WspReply};
use crate::headers as header_utils;

/// Everything `return_reply` needs, gathered either by C4 (synthetic
/// replies) or C7 (HTTP completions) before calling in.
pub struct ReplyInputs {
    /// Negative iff the HTTP layer failed to produce a response at all.
    pub status: i32,
    pub body: Option<Vec<u8>>,
    pub headers: Headers,
    /// Client's advertised SDU size; `0` means unlimited.
    pub sdu_size: u32,
    pub origin: FetchOrigin,
    pub session_id: i64,
    pub url: String,
    /// Whether the outbound request carried `X-WAP.TOD`.
    pub x_wap_tod: bool,
    /// The augmented headers the outbound request was sent with, used only
    /// to read back what the client originally told us it accepts.
    pub request_headers: Headers,
}

fn content_type_header(headers: &Headers) -> Option<(String, Option<String>)> {
    let (_, value) = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))?;
    let mut parts = value.splitn(2, ';');
    let mime = parts.next()?.trim().to_ascii_lowercase();
    let charset = parts.next().and_then(|rest| {
        rest.split(';')
            .find_map(|param| param.trim().strip_prefix("charset="))
            .map(|c| c.trim_matches('"').to_string())
    });
    Some((mime, charset))
}

fn set_content_type_header(headers: &mut Headers, content_type: &str) {
    headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
    headers.push(("Content-Type".to_string(), content_type.to_string()));
}

fn client_accepts(request_headers: &Headers, content_type: &str) -> bool {
    request_headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("accept"))
        .any(|(_, value)| value.eq_ignore_ascii_case(content_type))
}

/// Resolve the referer used by the smart-error deck: the session's stored
/// referer first, then the configured `device_home`, else no link.
fn smart_error_referer(
    wsp: &dyn WspCollaborator,
    config: &GatewayConfig,
    session_id: i64,
) -> Option<String> {
    if session_id != -1 {
        if let Some(referer) = wsp.referer_url(session_id) {
            return Some(referer);
        }
    }
    config.device_home.clone()
}

pub async fn return_reply(
    inputs: ReplyInputs,
    converters: &ConverterRegistry<'_>,
    wsp: &dyn WspCollaborator,
    config: &GatewayConfig,
    fetch_counter: &AtomicI64,
    cookie_store: Option<&dyn CookieStore>,
) {
    let ReplyInputs {
        mut status,
        body,
        mut headers,
        sdu_size,
        origin,
        session_id,
        url,
        x_wap_tod,
        request_headers,
    } = inputs;

    let mut body = body.unwrap_or_default();
    #[cfg(not(feature = "cookies"))]
    let _ = cookie_store;

    if status < 0 {
        if config.wsp_smart_errors {
            status = 200;
            let referer = smart_error_referer(wsp, config, session_id);
            let deck = match referer {
                Some(r) => errors::requesting_back(&r),
                None => errors::requesting(),
            };
            let mut content = Content {
                url: url.clone(),
                body: deck.into_bytes(),
                content_type: Some("text/vnd.wap.wml".to_string()),
                charset: None,
            };
            if converters.convert(&mut content) == ConvertOutcome::Converted {
                set_content_type_header(&mut headers, content.content_type.as_deref().unwrap());
            } else {
                set_content_type_header(&mut headers, "text/vnd.wap.wml");
            }
            body = content.body;
        } else {
            status = 502;
            set_content_type_header(&mut headers, "text/plain");
            body = Vec::new();
        }
    } else {
        let (content_type, charset) = content_type_header(&headers).unzip();
        let charset = charset.flatten();
        info!(
            url = %url,
            content_type = content_type.as_deref().unwrap_or(""),
            charset = charset.as_deref().unwrap_or(""),
            status,
            "fetch completed"
        );

        #[cfg(feature = "cookies")]
        if session_id != -1 {
            if let Some(store) = cookie_store {
                store.set_cookies(&headers, session_id);
            }
        }

        if let Some(ref ct) = content_type {
            let mut content = Content {
                url: url.clone(),
                body,
                content_type: Some(ct.clone()),
                charset,
            };
            if converters.convert(&mut content) == ConvertOutcome::Converted {
                set_content_type_header(&mut headers, content.content_type.as_deref().unwrap());
                if session_id != -1 {
                    wsp.set_referer_url(session_id, url.clone());
                }
            }
            body = content.body;
        }
    }

    header_utils::strip_hop_by_hop_headers(&mut headers);
    header_utils::take_x_wap_tod(&mut headers);
    if x_wap_tod {
        header_utils::add_x_wap_tod(&mut headers);
    }

    let is_success = (200..300).contains(&status);
    if !is_success {
        if let Some((content_type, _)) = content_type_header(&headers) {
            if !client_accepts(&request_headers, &content_type) {
                body = Vec::new();
                set_content_type_header(&mut headers, "text/plain");
            }
        }
    }

    if sdu_size > 0 && body.len() as u64 > sdu_size as u64 {
        if is_success {
            status = 502;
        }
        body = Vec::new();
        set_content_type_header(&mut headers, "text/plain");
    }

    match origin {
        FetchOrigin::Session {
            server_transaction_id,
            session_id,
        } => {
            wsp.session_dispatch_event(WspReply::MethodResultReq {
                server_transaction_id,
                session_id,
                status,
                headers,
                body,
            })
            .await;
        }
        FetchOrigin::Unit {
            transaction_id,
            addr_tuple,
        } => {
            wsp.unit_dispatch_event(WspReply::UnitMethodResultReq {
                transaction_id,
                addr_tuple,
                status,
                headers,
                body,
            })
            .await;
        }
    }

    fetch_counter.fetch_sub(1, Ordering::SeqCst);
}

/// The fixed health-check deck served for `kannel:alive` (C4 fast-path).
pub fn health_deck() -> String {
    errors::health_deck()
}
