//! The stateless-rpc process bridge and ref advertisement.
//!
//! Both endpoints commit a 200 response before the git process is known to
//! succeed: the smart protocol has no envelope for reporting an error once
//! streaming has begun, so process failures after that point are logged and
//! surface to the client as truncation.

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
};
use gitgate_git::{advertisement_preamble, GitRunner, Service};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

use crate::access;
use crate::files::CachePolicy;
use crate::routes::{forbidden, HandlerContext};

/// `POST .../git-upload-pack` and `POST .../git-receive-pack`.
///
/// Pipes the request body into `git <service> --stateless-rpc <repo>` and
/// streams the process output back without buffering it.
pub(crate) async fn service_rpc(runner: &GitRunner, ctx: HandlerContext) -> Response<Body> {
    let Some(service) = ctx.service else {
        return forbidden();
    };

    let content_type = ctx
        .parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if !access::allowed(
        runner,
        Some(service),
        content_type.as_deref(),
        ctx.write_access,
        true,
        &ctx.repo_root,
    )
    .await
    {
        return forbidden();
    }

    // The whole body is read up front; stateless-rpc exchanges are
    // request/response, not interleaved.
    let input = match axum::body::to_bytes(ctx.body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, %service, "failed to read rpc request body");
            bytes::Bytes::new()
        }
    };

    let mut child = match runner.stateless_rpc_command(&ctx.repo_root, service).spawn() {
        Ok(child) => child,
        Err(e) => {
            // The response is committed regardless; the client sees an
            // empty, truncated result.
            error!(error = %e, %service, git = %runner.binary().display(), "failed to spawn git");
            return rpc_response(service, Body::empty());
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(&input).await {
            warn!(error = %e, %service, "failed to write rpc input to git");
        }
        // Dropping stdin signals EOF to the child.
    }

    let body = match child.stdout.take() {
        Some(stdout) => Body::from_stream(ReaderStream::new(stdout)),
        None => Body::empty(),
    };

    // Reap the child once its output is drained so no zombie is left
    // behind, even if the client abandons the response.
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if !status.success() => {
                warn!(%status, "git rpc process exited with non-zero status");
            }
            Err(e) => {
                error!(error = %e, "failed to wait on git rpc process");
            }
            _ => {}
        }
    });

    rpc_response(service, body)
}

/// `GET .../info/refs?service=git-<name>`.
///
/// Writes the pkt-line service announcement, a flush packet, then the raw
/// advertisement bytes produced by `--advertise-refs`.
pub(crate) async fn info_refs(runner: &GitRunner, ctx: HandlerContext) -> Response<Body> {
    let service = ctx
        .parts
        .uri
        .query()
        .and_then(|q| query_param(q, "service"))
        .and_then(Service::from_query);

    if !access::allowed(runner, service, None, ctx.write_access, false, &ctx.repo_root).await {
        return forbidden();
    }
    let Some(service) = service else {
        return forbidden();
    };

    let refs = match runner.advertise_refs(&ctx.repo_root, service).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, %service, repo = %ctx.repo_root.display(), "ref advertisement failed");
            Vec::new()
        }
    };

    let mut body = advertisement_preamble(service.name());
    body.extend_from_slice(&refs);

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, service.advertisement_content_type())
        .body(Body::from(body))
        .unwrap();
    CachePolicy::NoCache.apply(response.headers_mut());
    response
}

fn rpc_response(service: Service, body: Body) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, service.result_content_type())
        .body(body)
        .unwrap()
}

/// First value for `key` in a raw query string. The service parameter never
/// carries percent-escapes, so no decoding is done here.
fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then_some(v)
    })
}
