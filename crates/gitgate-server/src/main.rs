//! Standalone smart HTTP server.
//!
//! A thin shell around the gateway core: resolves the repository from the
//! first path segment under `--root` and forwards the request. Write access
//! is granted globally via `--enable-push`; anything finer-grained (per-user
//! auth, tokens) belongs in a reverse proxy or embedding application in
//! front of this binary, which trusts its caller completely.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use gitgate_http::Gateway;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Gitgate - git smart HTTP gateway
#[derive(Parser, Debug)]
#[command(name = "gitgate-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8418")]
    listen: SocketAddr,

    /// Directory containing the served repositories
    #[arg(long, default_value = "./repositories")]
    root: PathBuf,

    /// Path to the git executable
    #[arg(long, default_value = "/usr/bin/git")]
    git_bin: PathBuf,

    /// Allow pushes (git-receive-pack) for all callers
    #[arg(long)]
    enable_push: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

struct ServerState {
    gateway: Gateway,
    root: PathBuf,
    enable_push: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gitgate={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %args.listen,
        root = %args.root.display(),
        git_bin = %args.git_bin.display(),
        enable_push = args.enable_push,
        "starting gitgate"
    );

    let state = Arc::new(ServerState {
        gateway: Gateway::new(&args.git_bin),
        root: args.root,
        enable_push: args.enable_push,
    });

    let router = Router::new()
        .route("/health", get(health_check))
        .fallback(git_http)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// All git protocol traffic lands here; the gateway's own route table does
/// the real dispatch.
async fn git_http(State(state): State<Arc<ServerState>>, request: Request<Body>) -> Response {
    let Some(repo) = repo_name(request.uri().path()) else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    let repo_root = state.root.join(repo);
    state
        .gateway
        .handle(request, &repo_root, state.enable_push)
        .await
}

/// First path segment, rejected if empty or escaping the root.
fn repo_name(path: &str) -> Option<&str> {
    let name = path.trim_start_matches('/').split('/').next()?;
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return None;
    }
    Some(name)
}
