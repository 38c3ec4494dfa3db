//! DID resolution interface backed by the certification smart contract.
//!
//! A resolver implementation talks to one chain and serves three kinds of
//! lookups: verification methods (by relationship), credential status
//! entries, and the on-chain trust certifications of an account.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::did::DIDURL;
use crate::ldp::Proof;
use crate::vc::Status;

pub const TYPE_DID_LD_JSON: &str = "application/did+ld+json";

/// Upper bound on the number of certifications walked while checking an
/// issuer's chain of trust.
pub const CHAIN_OF_TRUST_MAX_LENGTH: usize = 10;

pub const VERIFICATION_METHOD_TYPE: &str = "EcdsaSecp256k1RecoveryMethod2020";

// https://www.w3.org/TR/did-spec-registries/#errors
pub const ERROR_INVALID_DID: &str = "invalid-did";
pub const ERROR_NOT_FOUND: &str = "not-found";
pub const ERROR_METHOD_NOT_SUPPORTED: &str = "method-not-supported";
pub const ERROR_REPRESENTATION_NOT_SUPPORTED: &str = "representation-not-supported";
pub const ERROR_INTERNAL: &str = "internal-error";

/// A resolution failure, carrying one of the registry error kinds above.
#[derive(ThisError, Debug, Clone)]
#[error("{message}")]
pub struct ResolutionError {
    pub kind: String,
    pub message: String,
}

impl ResolutionError {
    pub fn new(kind: &str, message: impl Into<String>) -> Self {
        ResolutionError {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ERROR_NOT_FOUND, message)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionInputMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
}

/// A verification method from a resolved DID document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethodMap {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub controller: String,
    /// CAIP-10 account identifier, e.g. `eip155:1337:0x...`.
    pub blockchain_account_id: String,
}

/// Resolved revocation state of a credential status entry.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct RevocationStatus {
    pub revoked: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustCertificationStatus {
    Valid,
    Deactivated,
    Revoked,
}

/// One certification credential read back from the chain: `issuer` vouches
/// for the certified account.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrustCertification {
    pub issuer: String,
    pub issuance_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub credential_status: Status,
    pub certification_status: TrustCertificationStatus,
    pub proof: Proof,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrustChain {
    pub trust_chain: Vec<TrustCertification>,
}

/// Resolves DID URLs and trust data for one chain.
#[async_trait]
pub trait DIDResolver: Send + Sync {
    /// The chain the resolver is connected to. DIDs for other chains are
    /// rejected before resolution is attempted.
    fn chain_id(&self) -> u64;

    /// The trust certifications issued *to* `entity` (an account address).
    async fn resolve_chain(&self, entity: &str) -> Result<TrustChain, ResolutionError>;

    /// Dereference an authentication verification method.
    async fn resolve_authentication(
        &self,
        did_url: &DIDURL,
        input_metadata: &ResolutionInputMetadata,
    ) -> Result<VerificationMethodMap, ResolutionError>;

    /// Dereference an assertion method.
    async fn resolve_assertion_method(
        &self,
        did_url: &DIDURL,
        input_metadata: &ResolutionInputMetadata,
    ) -> Result<VerificationMethodMap, ResolutionError>;

    /// Look up the revocation state of a credential status entry.
    async fn resolve_credential_status(
        &self,
        did_url: &DIDURL,
    ) -> Result<RevocationStatus, ResolutionError>;
}
