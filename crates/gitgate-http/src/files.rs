//! Static responder for repository files.
//!
//! Serves loose objects, packfiles, indexes, and the informational text
//! files with protocol-mandated content types. Byte transfer, including
//! range and conditional request handling, is delegated to tower-http's
//! `ServeFile`, which derives `Content-Length` and `Last-Modified` from the
//! file's metadata.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Request, Response},
};
use chrono::{TimeZone, Utc};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::routes::{not_found, HandlerContext};

/// Seconds in the forever-cache window (one year).
const CACHE_FOREVER_SECS: i64 = 31_536_000;

/// Cache policy for a static response.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CachePolicy {
    /// Force revalidation on every request (mutable files: HEAD,
    /// alternates, ref listings).
    NoCache,
    /// Cache for a year. Valid for content-addressed files, which never
    /// change once written.
    Forever,
}

impl CachePolicy {
    pub(crate) fn apply(&self, headers: &mut HeaderMap) {
        match self {
            CachePolicy::NoCache => {
                headers.insert(
                    header::EXPIRES,
                    HeaderValue::from_static("Fri, 01 Jan 1980 00:00:00 GMT"),
                );
                headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
                headers.insert(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache, max-age=0, must-revalidate"),
                );
            }
            CachePolicy::Forever => {
                let now = Utc::now();
                set_date_header(headers, header::DATE, now.timestamp());
                set_date_header(
                    headers,
                    header::EXPIRES,
                    now.timestamp() + CACHE_FOREVER_SECS,
                );
                headers.insert(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("public, max-age=31536000"),
                );
            }
        }
    }
}

/// Inserts an RFC 7231 HTTP-date header for the given unix timestamp.
fn set_date_header(headers: &mut HeaderMap, name: header::HeaderName, timestamp: i64) {
    let Some(date) = Utc.timestamp_opt(timestamp, 0).single() else {
        return;
    };
    let value = date.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(name, value);
    }
}

/// Serves the repository-relative file with the given content type and
/// cache policy. Missing files are a 404 with the error logged for
/// operators only.
pub(crate) async fn send_file(
    ctx: HandlerContext,
    content_type: &'static str,
    cache: CachePolicy,
) -> Response<Body> {
    let path = ctx.repo_root.join(&ctx.file);

    if let Err(e) = tokio::fs::metadata(&path).await {
        debug!(error = %e, path = %path.display(), "requested file missing");
        return not_found();
    }

    let request = Request::from_parts(ctx.parts, Body::empty());
    let served = ServeFile::new(&path)
        .oneshot(request)
        .await
        .unwrap_or_else(|err| match err {});

    let mut response = served.map(Body::new);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    cache.apply(headers);
    response
}
