//! Zero-knowledge web proof types.
//!
//! A proof attests that a set of witnesses observed a given HTTP response
//! (here, the view-count endpoint) and signed a claim over it. The layout
//! follows the Reclaim protocol's JSON format so proofs produced by that
//! prover network can be stored and re-verified as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Extraction pattern capturing the reported view count as the `view` group.
pub const VIEWS_EXTRACTION_PATTERN: &str = r#""views":(?<view>\d+)"#;

/// What the prover is asked to fetch and attest to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkFetchRequest {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub response_matches: Vec<ResponseMatch>,
    pub response_redactions: Vec<ResponseRedaction>,
}

impl ZkFetchRequest {
    /// A GET of `url` with the view count extracted and everything else redacted.
    pub fn view_count(url: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers,
            response_matches: vec![ResponseMatch {
                kind: "regex".to_string(),
                value: VIEWS_EXTRACTION_PATTERN.to_string(),
            }],
            response_redactions: vec![ResponseRedaction {
                regex: VIEWS_EXTRACTION_PATTERN.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMatch {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRedaction {
    pub regex: String,
}

/// Claim signed by the witnesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimData {
    pub provider: String,
    pub parameters: String,
    pub owner: String,
    #[serde(rename = "timestampS")]
    pub timestamp_s: u64,
    #[serde(default)]
    pub context: String,
    pub identifier: String,
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessData {
    /// Witness address (hex, 0x-prefixed).
    pub id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkProof {
    pub identifier: String,
    pub claim_data: ClaimData,
    pub signatures: Vec<String>,
    pub witnesses: Vec<WitnessData>,
    #[serde(default)]
    pub extracted_parameter_values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_data: Option<serde_json::Value>,
}

impl ZkProof {
    /// The view count captured by the `view` extraction group, if present.
    pub fn extracted_views(&self) -> Option<u64> {
        self.extracted_parameter_values
            .get("view")
            .and_then(|v| v.trim().parse().ok())
    }
}

/// Proof reshaped for submission to an on-chain verifier contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnchainProof {
    pub claim_info: ClaimInfo,
    pub signed_claim: SignedClaim,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimInfo {
    pub provider: String,
    pub parameters: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaim {
    pub claim: CompleteClaim,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteClaim {
    pub identifier: String,
    pub owner: String,
    #[serde(rename = "timestampS")]
    pub timestamp_s: u64,
    pub epoch: u64,
}
