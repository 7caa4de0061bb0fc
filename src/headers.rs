//! C3: header utilities — gateway-injected request headers, hop-by-hop
//! stripping, and push-header split/decode.
//!
//! Grounded on the original's `add_kannel_version`/`add_charset_headers`/
//! `add_accept_headers`/`add_network_info`/`add_session_id`/
//! `add_client_sdu_size`/`add_via`/`add_x_wap_tod`/`add_referer_url`,
//! `split_header_list`, `check_application_headers` and
//! `decode_bearer_indication`.

use crate::convert::ConverterRegistry;
use crate::error::HeaderDecodeError;
use crate::event::{AddrTuple, Headers};
use crate::wina;
use chrono::Utc;
use tracing::warn;

/// Header names that must never be forwarded between hops (RFC 2616
/// §13.5.1), plus whatever the `Connection` header itself names.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn header_name_eq(name: &str, target: &str) -> bool {
    name.eq_ignore_ascii_case(target)
}

/// Strip all hop-by-hop headers, including any header named by a
/// `Connection` header's value.
pub fn strip_hop_by_hop_headers(headers: &mut Headers) {
    let mut extra: Vec<String> = Vec::new();
    for (name, value) in headers.iter() {
        if header_name_eq(name, "connection") {
            extra.extend(value.split(',').map(|s| s.trim().to_ascii_lowercase()));
        }
    }
    headers.retain(|(name, _)| {
        let lower = name.to_ascii_lowercase();
        !HOP_BY_HOP.contains(&lower.as_str()) && !extra.contains(&lower)
    });
}

/// `X-WAP-Gateway: <product>/<version>`.
pub fn add_gateway_version(headers: &mut Headers, product: &str, version: &str) {
    headers.push(("X-WAP-Gateway".to_string(), format!("{product}/{version}")));
}

/// One `Accept-Charset` per charset the WML compiler accepts, skipping any
/// already present.
pub fn add_charset_headers(headers: &mut Headers, wml_charsets: &[String]) {
    for charset in wml_charsets {
        let already = headers
            .iter()
            .any(|(n, v)| header_name_eq(n, "Accept-Charset") && v.eq_ignore_ascii_case(charset));
        if !already {
            headers.push(("Accept-Charset".to_string(), charset.clone()));
        }
    }
}

/// Advertise the source MIME type for each converter whose result type is
/// already accepted and whose source type is not.
pub fn add_accept_headers(headers: &mut Headers, registry: &ConverterRegistry) {
    let accepted: Vec<String> = headers
        .iter()
        .filter(|(n, _)| header_name_eq(n, "Accept"))
        .map(|(_, v)| v.to_ascii_lowercase())
        .collect();

    for result_type in registry.result_types() {
        let result_accepted = accepted.iter().any(|v| v == result_type);
        if !result_accepted {
            continue;
        }
        let Some(source_type) = registry.source_type_for_result(result_type) else {
            continue;
        };
        let source_accepted = accepted.iter().any(|v| v == source_type);
        if !source_accepted {
            headers.push(("Accept".to_string(), source_type.to_string()));
        }
    }
}

/// `X_Network_Info` (underscore, not hyphen) iff the remote address is non-empty.
pub fn add_network_info(headers: &mut Headers, addr_tuple: &AddrTuple) {
    if !addr_tuple.remote.is_empty() {
        headers.push(("X_Network_Info".to_string(), addr_tuple.remote.clone()));
    }
}

/// `X-WAP-Session-ID` iff `session_id != -1`.
pub fn add_session_id(headers: &mut Headers, session_id: i64) {
    if session_id != -1 {
        headers.push(("X-WAP-Session-ID".to_string(), session_id.to_string()));
    }
}

/// `X-WAP-Client-SDU-Size` iff greater than zero.
pub fn add_client_sdu_size(headers: &mut Headers, sdu_size: u32) {
    if sdu_size > 0 {
        headers.push(("X-WAP-Client-SDU-Size".to_string(), sdu_size.to_string()));
    }
}

/// `Via: WAP/1.1 <host> (<product>/<version>)`.
pub fn add_via(headers: &mut Headers, host: &str, product: &str, version: &str) {
    headers.push((
        "Via".to_string(),
        format!("WAP/1.1 {host} ({product}/{version})"),
    ));
}

/// `X-WAP.TOD`: HTTP-date of the current time.
pub fn add_x_wap_tod(headers: &mut Headers) {
    let now = Utc::now();
    headers.push((
        "X-WAP.TOD".to_string(),
        now.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
    ));
}

/// `Referer` iff non-empty.
pub fn add_referer_url(headers: &mut Headers, referer: &str) {
    if !referer.is_empty() {
        headers.push(("Referer".to_string(), referer.to_string()));
    }
}

/// Partition headers by field name into `(extracted, remaining)`.
pub fn split_header_list(headers: Headers, name: &str) -> (Headers, Headers) {
    headers
        .into_iter()
        .partition(|(n, _)| header_name_eq(n, name))
}

/// Remove and return every `X-WAP.TOD` header, reporting whether at least
/// one was present.
pub fn take_x_wap_tod(headers: &mut Headers) -> bool {
    let before = headers.len();
    headers.retain(|(n, _)| !header_name_eq(n, "X-WAP.TOD"));
    headers.len() != before
}

/// If no `Accept-Application` header is present, synthesize
/// `Accept-Application: wml ua`. Otherwise translate each numeric WINA
/// application-id value, dropping and logging unknowns.
pub fn check_application_headers(push_headers: &Headers) -> Vec<String> {
    let values: Vec<&str> = push_headers
        .iter()
        .filter(|(n, _)| header_name_eq(n, "Accept-Application"))
        .map(|(_, v)| v.as_str())
        .collect();

    if values.is_empty() {
        return vec!["wml ua".to_string()];
    }

    values
        .into_iter()
        .filter_map(|raw| {
            let id: u32 = raw.trim().parse().ok()?;
            match wina::application_id_to_name(id) {
                Some(name) => Some(name.to_string()),
                None => {
                    warn!(application_id = id, "dropping unknown WINA application id");
                    None
                }
            }
        })
        .collect()
}

/// Decode the (at most one) `Bearer-Indication` header. More than one is an
/// error; value `0` or unrecognized is rejected.
pub fn decode_bearer_indication(
    push_headers: &Headers,
) -> Result<Option<String>, HeaderDecodeError> {
    let mut values = push_headers
        .iter()
        .filter(|(n, _)| header_name_eq(n, "Bearer-Indication"))
        .map(|(_, v)| v.as_str());

    let Some(raw) = values.next() else {
        return Ok(None);
    };
    if values.next().is_some() {
        return Err(HeaderDecodeError::DuplicateBearerIndication);
    }

    let value: u8 = raw
        .trim()
        .parse()
        .map_err(|_| HeaderDecodeError::UnknownBearerIndication(0))?;
    wina::bearer_indication_to_name(value)
        .map(|name| Some(name.to_string()))
        .ok_or(HeaderDecodeError::UnknownBearerIndication(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_and_connection_named_headers_are_stripped() {
        let mut headers: Headers = vec![
            ("Connection".to_string(), "X-Custom".to_string()),
            ("X-Custom".to_string(), "keep".to_string()),
            ("Keep-Alive".to_string(), "timeout=5".to_string()),
            ("Content-Type".to_string(), "text/plain".to_string()),
        ];
        strip_hop_by_hop_headers(&mut headers);

        assert_eq!(
            headers,
            vec![("Content-Type".to_string(), "text/plain".to_string())]
        );
    }

    #[test]
    fn session_id_skipped_when_minus_one() {
        let mut headers = Headers::new();
        add_session_id(&mut headers, -1);
        assert!(headers.is_empty());

        add_session_id(&mut headers, 7);
        assert_eq!(headers, vec![("X-WAP-Session-ID".to_string(), "7".to_string())]);
    }

    #[test]
    fn via_formats_per_spec() {
        let mut headers = Headers::new();
        add_via(&mut headers, "gw.example", "wap-appl-gateway", "1.0");
        assert_eq!(
            headers[0].1,
            "WAP/1.1 gw.example (wap-appl-gateway/1.0)"
        );
    }

    #[test]
    fn check_application_headers_defaults_to_wml_ua() {
        let push_headers = Headers::new();
        assert_eq!(check_application_headers(&push_headers), vec!["wml ua"]);
    }

    #[test]
    fn check_application_headers_translates_and_drops_unknown() {
        let push_headers = vec![
            ("Accept-Application".to_string(), "0".to_string()),
            ("Accept-Application".to_string(), "255".to_string()),
        ];
        assert_eq!(check_application_headers(&push_headers), vec!["wml ua"]);
    }

    #[test]
    fn bearer_indication_duplicate_is_error() {
        let push_headers = vec![
            ("Bearer-Indication".to_string(), "9".to_string()),
            ("Bearer-Indication".to_string(), "8".to_string()),
        ];
        assert_eq!(
            decode_bearer_indication(&push_headers),
            Err(HeaderDecodeError::DuplicateBearerIndication)
        );
    }

    #[test]
    fn bearer_indication_zero_is_rejected() {
        let push_headers = vec![("Bearer-Indication".to_string(), "0".to_string())];
        assert_eq!(
            decode_bearer_indication(&push_headers),
            Err(HeaderDecodeError::UnknownBearerIndication(0))
        );
    }

    #[test]
    fn bearer_indication_absent_is_none() {
        assert_eq!(decode_bearer_indication(&Headers::new()), Ok(None));
    }
}
