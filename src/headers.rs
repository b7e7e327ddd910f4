//! Common request headers attached to every remote call.
//!
//! The mini-game API expects browser-like headers from the Telegram
//! web-app origin. Built once per process and cloned into each
//! per-account client.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};

const UA: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

/// The default header set for the mini-game API.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(UA));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://app.kiloex.io"));
    headers.insert(REFERER, HeaderValue::from_static("https://app.kiloex.io/"));
    headers
}
