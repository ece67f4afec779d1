//! Witness-signed claim verification
//!
//! A claim is valid when its identifier is the keccak256 of
//! `provider\nparameters\ncontext`, and the set of addresses recovered from
//! the EIP-191 signatures over `identifier\nowner\ntimestampS\nepoch` equals
//! the proof's declared witness set. When a trusted witness list is
//! configured every signer must also be on it.

use std::collections::BTreeSet;
use std::str::FromStr;

use alloy::primitives::{keccak256, Address, PrimitiveSignature};
use thiserror::Error;
use tracing::warn;

use crate::domain::{ClaimData, ClaimInfo, CompleteClaim, OnchainProof, SignedClaim, ZkProof};
use crate::infra::ProofVerifier;

/// Why a proof was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofRejection {
    #[error("proof carries no signatures")]
    NoSignatures,

    #[error("proof identifier does not match its claim")]
    IdentifierMismatch,

    #[error("claim identifier does not hash from provider, parameters and context")]
    ClaimHashMismatch,

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("malformed witness address: {0}")]
    MalformedWitness(String),

    #[error("signer {0} is not a declared witness")]
    UnexpectedSigner(Address),

    #[error("witness {0} did not sign the claim")]
    MissingWitnessSignature(Address),

    #[error("witness {0} is not trusted")]
    UntrustedWitness(Address),
}

/// Identifier of a claim: `0x`-prefixed keccak256 over its provider,
/// parameters and context.
pub fn claim_identifier(provider: &str, parameters: &str, context: &str) -> String {
    let digest = keccak256(format!("{provider}\n{parameters}\n{context}"));
    format!("0x{}", hex::encode(digest))
}

/// The message witnesses sign (EIP-191 personal message).
pub fn claim_sign_payload(claim: &ClaimData) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        claim.identifier,
        claim.owner.to_lowercase(),
        claim.timestamp_s,
        claim.epoch
    )
}

#[derive(Debug, Clone, Default)]
pub struct ClaimVerifier {
    trusted_witnesses: Option<BTreeSet<Address>>,
}

impl ClaimVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trusted_witnesses(mut self, witnesses: impl IntoIterator<Item = Address>) -> Self {
        self.trusted_witnesses = Some(witnesses.into_iter().collect());
        self
    }

    /// Parse a comma-separated witness allowlist. Blank input means no allowlist.
    pub fn from_witness_list(list: Option<&str>) -> Result<Self, ProofRejection> {
        let Some(list) = list.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::new());
        };
        let witnesses = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_address)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new().with_trusted_witnesses(witnesses))
    }

    /// Full check with the rejection reason.
    pub fn check(&self, proof: &ZkProof) -> Result<(), ProofRejection> {
        let claim = &proof.claim_data;

        if proof.signatures.is_empty() {
            return Err(ProofRejection::NoSignatures);
        }
        if !proof.identifier.eq_ignore_ascii_case(&claim.identifier) {
            return Err(ProofRejection::IdentifierMismatch);
        }
        let expected = claim_identifier(&claim.provider, &claim.parameters, &claim.context);
        if !expected.eq_ignore_ascii_case(&claim.identifier) {
            return Err(ProofRejection::ClaimHashMismatch);
        }

        let witnesses = proof
            .witnesses
            .iter()
            .map(|w| parse_address(&w.id))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let payload = claim_sign_payload(claim);
        let mut signers = BTreeSet::new();
        for raw in &proof.signatures {
            let signer = recover_signer(raw, &payload)?;
            if !witnesses.contains(&signer) {
                return Err(ProofRejection::UnexpectedSigner(signer));
            }
            if let Some(trusted) = &self.trusted_witnesses {
                if !trusted.contains(&signer) {
                    return Err(ProofRejection::UntrustedWitness(signer));
                }
            }
            signers.insert(signer);
        }

        if let Some(missing) = witnesses.difference(&signers).next() {
            return Err(ProofRejection::MissingWitnessSignature(*missing));
        }

        Ok(())
    }
}

impl ProofVerifier for ClaimVerifier {
    fn verify(&self, proof: &ZkProof) -> bool {
        match self.check(proof) {
            Ok(()) => true,
            Err(reason) => {
                warn!(identifier = %proof.identifier, %reason, "Proof rejected");
                false
            }
        }
    }

    fn transform_for_onchain(&self, proof: &ZkProof) -> OnchainProof {
        let claim = &proof.claim_data;
        OnchainProof {
            claim_info: ClaimInfo {
                provider: claim.provider.clone(),
                parameters: claim.parameters.clone(),
                context: claim.context.clone(),
            },
            signed_claim: SignedClaim {
                claim: CompleteClaim {
                    identifier: claim.identifier.clone(),
                    owner: claim.owner.clone(),
                    timestamp_s: claim.timestamp_s,
                    epoch: claim.epoch,
                },
                signatures: proof.signatures.clone(),
            },
        }
    }
}

fn parse_address(raw: &str) -> Result<Address, ProofRejection> {
    Address::from_str(raw.trim()).map_err(|_| ProofRejection::MalformedWitness(raw.to_string()))
}

fn recover_signer(raw: &str, payload: &str) -> Result<Address, ProofRejection> {
    let bytes = hex::decode(raw.trim().trim_start_matches("0x"))
        .map_err(|e| ProofRejection::MalformedSignature(e.to_string()))?;
    let signature = PrimitiveSignature::try_from(bytes.as_slice())
        .map_err(|e| ProofRejection::MalformedSignature(e.to_string()))?;
    signature
        .recover_address_from_msg(payload.as_bytes())
        .map_err(|e| ProofRejection::MalformedSignature(e.to_string()))
}
