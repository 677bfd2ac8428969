//! Smart HTTP sub-protocols.
//!
//! Only two services exist in the smart protocol: `upload-pack` (fetch and
//! clone) and `receive-pack` (push). Everything else a client asks for is
//! rejected by the access policy.

use std::fmt;

/// A git smart HTTP sub-protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Serves fetch/clone requests.
    UploadPack,
    /// Serves push requests.
    ReceivePack,
}

impl Service {
    /// Resolves a service from its bare name (`upload-pack`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "upload-pack" => Some(Self::UploadPack),
            "receive-pack" => Some(Self::ReceivePack),
            _ => None,
        }
    }

    /// Resolves a service from an `info/refs` query value.
    ///
    /// The value must carry the literal `git-` prefix; anything else
    /// resolves to no service.
    pub fn from_query(value: &str) -> Option<Self> {
        value.strip_prefix("git-").and_then(Self::from_name)
    }

    /// The bare service name, as passed to the git executable.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UploadPack => "upload-pack",
            Self::ReceivePack => "receive-pack",
        }
    }

    /// Content type an RPC request must carry.
    pub fn request_content_type(&self) -> String {
        format!("application/x-git-{}-request", self.name())
    }

    /// Content type of an RPC response.
    pub fn result_content_type(&self) -> String {
        format!("application/x-git-{}-result", self.name())
    }

    /// Content type of a ref advertisement response.
    pub fn advertisement_content_type(&self) -> String {
        format!("application/x-git-{}-advertisement", self.name())
    }

    /// Repository config key consulted by the access policy: the service
    /// name with hyphens removed, under the `http` namespace.
    pub fn config_key(&self) -> String {
        format!("http.{}", self.name().replace('-', ""))
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_known_services() {
        assert_eq!(Service::from_name("upload-pack"), Some(Service::UploadPack));
        assert_eq!(
            Service::from_name("receive-pack"),
            Some(Service::ReceivePack)
        );
        assert_eq!(Service::from_name("archive"), None);
    }

    #[test]
    fn from_query_requires_git_prefix() {
        assert_eq!(
            Service::from_query("git-upload-pack"),
            Some(Service::UploadPack)
        );
        assert_eq!(Service::from_query("upload-pack"), None);
        assert_eq!(Service::from_query("git-archive"), None);
        assert_eq!(Service::from_query(""), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(
            Service::UploadPack.request_content_type(),
            "application/x-git-upload-pack-request"
        );
        assert_eq!(
            Service::ReceivePack.result_content_type(),
            "application/x-git-receive-pack-result"
        );
        assert_eq!(
            Service::UploadPack.advertisement_content_type(),
            "application/x-git-upload-pack-advertisement"
        );
    }

    #[test]
    fn config_key_strips_hyphens() {
        assert_eq!(Service::UploadPack.config_key(), "http.uploadpack");
        assert_eq!(Service::ReceivePack.config_key(), "http.receivepack");
    }
}
