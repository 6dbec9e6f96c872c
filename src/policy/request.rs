//! Per-request view used by the decision engine and event handlers.

use axum::http::{header, HeaderMap, Method, Request, Uri};

/// Everything the policy needs to know about an inbound request.
///
/// Built once per request from the request head; the body is never read.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Absolute URL, including the query string.
    pub url: String,
    pub path: String,
    pub query: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// Value of the configured forwarded-URL header, if the request carried it.
    pub forwarded_url: Option<String>,
    pub headers: HeaderMap,
}

impl RequestDescriptor {
    /// Describe a request. `forwarded_url_header` is the configured header
    /// name carrying the externally visible URL, if any.
    pub fn from_request<B>(req: &Request<B>, forwarded_url_header: Option<&str>) -> Self {
        Self::from_parts(req.method(), req.uri(), req.headers(), forwarded_url_header)
    }

    pub fn from_parts(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        forwarded_url_header: Option<&str>,
    ) -> Self {
        let forwarded_url = forwarded_url_header
            .and_then(|name| header_str(headers, name))
            .map(str::to_string);

        Self {
            method: method.clone(),
            url: absolute_url(uri, headers),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            user_agent: header_str(headers, header::USER_AGENT.as_str()).map(str::to_string),
            referer: header_str(headers, header::REFERER.as_str()).map(str::to_string),
            forwarded_url,
            headers: headers.clone(),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Rebuild the absolute URL the client asked for. Servers usually see
/// origin-form targets (`/path?q`), so scheme and host are filled in from the
/// `Host` header.
fn absolute_url(uri: &Uri, headers: &HeaderMap) -> String {
    let scheme = uri.scheme_str().unwrap_or("http");
    let host = uri
        .authority()
        .map(|a| a.as_str())
        .or_else(|| header_str(headers, header::HOST.as_str()))
        .unwrap_or("localhost");
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    format!("{scheme}://{host}{path_and_query}")
}
