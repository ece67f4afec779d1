//! Identifier types shared across the view and proof pipelines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix for fingerprints derived from an authenticated user id.
pub const USER_FINGERPRINT_PREFIX: &str = "user_";

/// Prefix for fingerprints derived from the request's network origin.
pub const IP_FINGERPRINT_PREFIX: &str = "ip_";

/// Opaque asset identifier, as issued by the asset-creation workflow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifies the viewing client for deduplication.
///
/// Either `user_<userId>` for authenticated viewers or `ip_<address>` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint for an authenticated viewer.
    pub fn user(user_id: &str) -> Self {
        Self(format!("{USER_FINGERPRINT_PREFIX}{user_id}"))
    }

    /// Fingerprint for an anonymous viewer identified by network origin.
    pub fn ip(address: &str) -> Self {
        Self(format!("{IP_FINGERPRINT_PREFIX}{address}"))
    }

    /// Accept an already-resolved fingerprint. Blank input is rejected.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(raw))
    }

    /// The user id, when this fingerprint was derived from one.
    pub fn user_id(&self) -> Option<&str> {
        self.0
            .strip_prefix(USER_FINGERPRINT_PREFIX)
            .filter(|id| !id.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_constructors() {
        assert_eq!(Fingerprint::user("42").as_str(), "user_42");
        assert_eq!(Fingerprint::ip("1.2.3.4").as_str(), "ip_1.2.3.4");
    }

    #[test]
    fn test_fingerprint_user_id() {
        assert_eq!(Fingerprint::user("42").user_id(), Some("42"));
        assert_eq!(Fingerprint::ip("1.2.3.4").user_id(), None);
        assert_eq!(Fingerprint::parse("user_").unwrap().user_id(), None);
    }

    #[test]
    fn test_fingerprint_parse_rejects_blank() {
        assert!(Fingerprint::parse("").is_none());
        assert!(Fingerprint::parse("   ").is_none());
        assert!(Fingerprint::parse("ip_::1").is_some());
    }

    #[test]
    fn test_asset_id_serializes_transparently() {
        let id = AssetId::new("A1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"A1\"");
    }
}
