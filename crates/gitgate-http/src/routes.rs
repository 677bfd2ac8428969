//! Route table and dispatcher.
//!
//! An ordered list of prefix-anchored matchers, evaluated first-match-wins.
//! Path matching happens before method matching; a path that matches a rule
//! with the wrong method is "method not allowed", never "not found". That
//! ordering is load-bearing for protocol compatibility and must not change.

use axum::{
    body::Body,
    http::{request::Parts, Method, Request, Response, StatusCode, Version},
};
use gitgate_git::{GitRunner, Service};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::files::{self, CachePolicy};
use crate::rpc;

/// One route rule: method, path pattern, optional sub-protocol, handler.
struct Route {
    method: Method,
    pattern: Regex,
    service: Option<Service>,
    kind: RouteKind,
}

/// Handler selector for a matched route.
#[derive(Debug, Clone, Copy)]
enum RouteKind {
    Rpc,
    InfoRefs,
    TextFile,
    InfoPacks,
    LooseObject,
    PackFile,
    IdxFile,
}

impl Route {
    fn new(method: Method, pattern: &str, service: Option<Service>, kind: RouteKind) -> Self {
        Self {
            method,
            // Patterns are source literals, compiled once at table init.
            pattern: Regex::new(pattern).expect("invalid route pattern"),
            service,
            kind,
        }
    }
}

/// The process-wide route table. Built once, never mutated.
static ROUTES: Lazy<Vec<Route>> = Lazy::new(|| {
    use RouteKind::*;
    vec![
        Route::new(
            Method::POST,
            r"^(.*?)/git-upload-pack$",
            Some(Service::UploadPack),
            Rpc,
        ),
        Route::new(
            Method::POST,
            r"^(.*?)/git-receive-pack$",
            Some(Service::ReceivePack),
            Rpc,
        ),
        Route::new(Method::GET, r"^(.*?)/info/refs$", None, InfoRefs),
        Route::new(Method::GET, r"^(.*?)/HEAD$", None, TextFile),
        Route::new(Method::GET, r"^(.*?)/objects/info/alternates$", None, TextFile),
        Route::new(
            Method::GET,
            r"^(.*?)/objects/info/http-alternates$",
            None,
            TextFile,
        ),
        Route::new(Method::GET, r"^(.*?)/objects/info/packs$", None, InfoPacks),
        Route::new(Method::GET, r"^(.*?)/objects/info/[^/]*$", None, TextFile),
        Route::new(
            Method::GET,
            r"^(.*?)/objects/[0-9a-f]{2}/[0-9a-f]{38}$",
            None,
            LooseObject,
        ),
        Route::new(
            Method::GET,
            r"^(.*?)/objects/pack/pack-[0-9a-f]{40}\.pack$",
            None,
            PackFile,
        ),
        Route::new(
            Method::GET,
            r"^(.*?)/objects/pack/pack-[0-9a-f]{40}\.idx$",
            None,
            IdxFile,
        ),
    ]
});

/// Per-request context handed to a handler. Owned by exactly one handler
/// invocation and dropped with it.
pub(crate) struct HandlerContext {
    pub(crate) parts: Parts,
    pub(crate) body: Body,
    pub(crate) service: Option<Service>,
    pub(crate) repo_root: PathBuf,
    pub(crate) file: String,
    pub(crate) write_access: bool,
}

/// The smart HTTP gateway.
///
/// Stateless apart from the injected git binary path; safe to share across
/// request tasks. The caller supplies the repository root and a precomputed
/// write-access decision per request and must authenticate beforehand - the
/// gateway trusts the flag completely.
pub struct Gateway {
    runner: GitRunner,
}

impl Gateway {
    /// Creates a gateway that invokes the given git binary.
    pub fn new(git_bin: impl Into<PathBuf>) -> Self {
        Self {
            runner: GitRunner::new(git_bin),
        }
    }

    /// The underlying git runner.
    pub fn runner(&self) -> &GitRunner {
        &self.runner
    }

    /// Dispatches one request against one repository.
    ///
    /// Always produces a definite response; filesystem and process errors
    /// are logged for operators and mapped to 404/403, never propagated.
    pub async fn handle(
        &self,
        request: Request<Body>,
        repo_root: &Path,
        write_access: bool,
    ) -> Response<Body> {
        let path = request.uri().path().to_string();

        for route in ROUTES.iter() {
            let Some(caps) = route.pattern.captures(&path) else {
                continue;
            };

            if route.method != request.method() {
                return method_not_allowed(request.version());
            }

            if let Err(e) = tokio::fs::metadata(repo_root).await {
                warn!(error = %e, repo = %repo_root.display(), "repository root missing");
                return not_found();
            }

            // Strip the matched base plus one separator to get the
            // repository-relative file path.
            let base_end = caps.get(1).map(|m| m.end()).unwrap_or(0);
            let file = path[base_end..].trim_start_matches('/').to_string();

            let (parts, body) = request.into_parts();
            let ctx = HandlerContext {
                parts,
                body,
                service: route.service,
                repo_root: repo_root.to_path_buf(),
                file,
                write_access,
            };

            return match route.kind {
                RouteKind::Rpc => rpc::service_rpc(&self.runner, ctx).await,
                RouteKind::InfoRefs => rpc::info_refs(&self.runner, ctx).await,
                RouteKind::TextFile => {
                    files::send_file(ctx, "text/plain", CachePolicy::NoCache).await
                }
                RouteKind::InfoPacks => {
                    files::send_file(ctx, "text/plain; charset=utf-8", CachePolicy::Forever).await
                }
                RouteKind::LooseObject => {
                    files::send_file(ctx, "application/x-git-loose-object", CachePolicy::Forever)
                        .await
                }
                RouteKind::PackFile => {
                    files::send_file(ctx, "application/x-git-packed-objects", CachePolicy::Forever)
                        .await
                }
                RouteKind::IdxFile => {
                    files::send_file(
                        ctx,
                        "application/x-git-packed-objects-toc",
                        CachePolicy::Forever,
                    )
                    .await
                }
            };
        }

        not_found()
    }
}

/// 404 with the fixed literal body.
pub(crate) fn not_found() -> Response<Body> {
    plain(StatusCode::NOT_FOUND, "Not Found")
}

/// 403 with the fixed literal body. The denial reason is never disclosed.
pub(crate) fn forbidden() -> Response<Body> {
    plain(StatusCode::FORBIDDEN, "Forbidden")
}

/// Method mismatch on a matched path. HTTP/1.1 clients get a proper 405;
/// older protocol versions get 400, which is what legacy git clients expect.
fn method_not_allowed(version: Version) -> Response<Body> {
    if version == Version::HTTP_11 {
        plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else {
        plain(StatusCode::BAD_REQUEST, "Bad Request")
    }
}

fn plain(status: StatusCode, body: &'static str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(body))
        .unwrap()
}
