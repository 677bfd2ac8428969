//! Access policy for smart HTTP requests.
//!
//! A pure decision over (sub-protocol, content type, write access,
//! repository config). The only I/O is the repository config lookup, which
//! shells out to git. Denial reasons are logged here and never disclosed to
//! the caller; every denial surfaces as the same 403.

use gitgate_git::{GitRunner, Service};
use std::path::Path;
use tracing::debug;

/// Decides whether a request may proceed.
///
/// RPC routes pass `check_content_type = true` and must carry the
/// protocol-mandated request content type. The ref-advertisement route
/// passes `false` and instead consults repository configuration for
/// upload-pack.
pub async fn allowed(
    runner: &GitRunner,
    service: Option<Service>,
    content_type: Option<&str>,
    write_access: bool,
    check_content_type: bool,
    repo_root: &Path,
) -> bool {
    let Some(service) = service else {
        debug!("denied: unknown or missing sub-protocol");
        return false;
    };

    if check_content_type && content_type != Some(service.request_content_type().as_str()) {
        debug!(%service, ?content_type, "denied: content type mismatch");
        return false;
    }

    match service {
        // Pushes require the caller-supplied write flag; there is no
        // repository-level override.
        Service::ReceivePack => {
            if !write_access {
                debug!("denied: receive-pack without write access");
            }
            write_access
        }
        // Fetches over the RPC route are always allowed. The advertisement
        // route additionally honors the repository's http.uploadpack
        // setting.
        Service::UploadPack => {
            if check_content_type {
                true
            } else {
                config_setting_allows(runner, service, repo_root).await
            }
        }
    }
}

/// Consults the repository config key derived from the service name.
///
/// `http.uploadpack` denies only when literally "false"; every other
/// setting must be literally "true" to allow. The asymmetry matches what
/// git clients expect and is kept deliberately.
pub async fn config_setting_allows(runner: &GitRunner, service: Service, repo_root: &Path) -> bool {
    let setting = runner.config(repo_root, &service.config_key()).await;

    match service {
        Service::UploadPack => setting != "false",
        _ => setting == "true",
    }
}
