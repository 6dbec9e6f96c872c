//! Header filtering between caller, render backend and origin.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Drop headers the outbound client must set itself (Host, Accept-Encoding)
//! - Drop body framing headers from decoded backend responses

use axum::http::{header, HeaderMap, HeaderName};

/// Hop-by-hop headers (RFC 9110 §7.6.1) plus the legacy `keep-alive` family.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy `headers` without hop-by-hop entries or anything named in the
/// `Connection` header.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let connection_listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || connection_listed.iter().any(|c| c == name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers forwarded from the caller to the render backend.
pub fn backend_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = strip_hop_by_hop(inbound);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    // The client negotiates and decodes compression itself.
    headers.remove(header::ACCEPT_ENCODING);
    headers
}

/// Headers copied from the render backend response to the caller. The body
/// is re-encoded from decoded text, so framing headers are dropped.
pub fn caller_response_headers(backend: &HeaderMap) -> HeaderMap {
    let mut headers = strip_hop_by_hop(backend);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_ENCODING);
    headers
}
