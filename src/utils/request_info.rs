// Client details for request logs

use axum::http::HeaderMap;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Originating client address behind a proxy, if one reported it.
///
/// `X-Forwarded-For` wins over `X-Real-IP`; only the first hop is kept.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::to_string)
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "user-agent").map(str::to_string)
}
