//! Linked data proofs using the EcdsaSecp256k1RecoverySignature2020 suite.
//!
//! A proof signs the canonical form of the document (with the `proof`
//! property removed) as a detached unencoded-payload JWS. The verification
//! method is a DID URL that dereferences to an
//! `EcdsaSecp256k1RecoveryMethod2020` entry carrying a CAIP-10 account
//! identifier; the account recovered from the signature must match it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::caip10::BlockchainAccountId;
use crate::datetime;
use crate::did::{validate_did_url, DIDURL};
use crate::did_resolve::{
    DIDResolver, ResolutionInputMetadata, VerificationMethodMap, TYPE_DID_LD_JSON,
    VERIFICATION_METHOD_TYPE,
};
use crate::error::Error;
use crate::jsonld::{Canonicalizer, DocumentLoader};
use crate::jws;
use crate::keccak_hash::address_from_secret_key;

pub const PROOF_TYPE: &str = "EcdsaSecp256k1RecoverySignature2020";

const REQUIRED_PROOF_PROPERTIES: [&str; 5] =
    ["type", "created", "verificationMethod", "proofPurpose", "jws"];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    AssertionMethod,
    Authentication,
}

impl fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofPurpose::AssertionMethod => write!(f, "assertionMethod"),
            ProofPurpose::Authentication => write!(f, "authentication"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub type_: String,
    pub created: String,
    pub verification_method: String,
    pub proof_purpose: ProofPurpose,
    pub jws: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

pub struct ProofCreationOptions {
    /// 32-byte secp256k1 secret key of the account controlling the
    /// verification method.
    pub private_key: Vec<u8>,
    /// DID URL of the verification method to embed in the proof.
    pub verification_method: String,
    pub proof_purpose: ProofPurpose,
    pub domain: Option<String>,
    pub challenge: Option<String>,
    pub document_loader: Option<Arc<dyn DocumentLoader>>,
}

pub struct ProofVerificationOptions {
    pub expected_proof_purpose: ProofPurpose,
    /// Expected `domain` value; `None` skips the check.
    pub expected_domain: Option<String>,
    /// Expected `challenge` value; `None` skips the check.
    pub expected_challenge: Option<String>,
    pub document_loader: Option<Arc<dyn DocumentLoader>>,
}

impl Default for ProofVerificationOptions {
    fn default() -> Self {
        ProofVerificationOptions {
            expected_proof_purpose: ProofPurpose::AssertionMethod,
            expected_domain: None,
            expected_challenge: None,
            document_loader: None,
        }
    }
}

/// Creates and verifies EcdsaSecp256k1RecoverySignature2020 proofs.
pub struct EcdsaSecp256k1ProofManager {
    resolver: Arc<dyn DIDResolver>,
    canonicalizer: Arc<dyn Canonicalizer>,
}

impl EcdsaSecp256k1ProofManager {
    pub fn new(resolver: Arc<dyn DIDResolver>, canonicalizer: Arc<dyn Canonicalizer>) -> Self {
        EcdsaSecp256k1ProofManager {
            resolver,
            canonicalizer,
        }
    }

    async fn dereference_verification_method(
        &self,
        did_url: &DIDURL,
        purpose: ProofPurpose,
    ) -> Result<VerificationMethodMap, Error> {
        let input_metadata = ResolutionInputMetadata {
            accept: Some(TYPE_DID_LD_JSON.to_string()),
        };
        let verification_method = match purpose {
            ProofPurpose::AssertionMethod => {
                self.resolver
                    .resolve_assertion_method(did_url, &input_metadata)
                    .await?
            }
            ProofPurpose::Authentication => {
                self.resolver
                    .resolve_authentication(did_url, &input_metadata)
                    .await?
            }
        };
        if verification_method.type_ != VERIFICATION_METHOD_TYPE {
            return Err(Error::invalid_proof(format!(
                "Unsupported verification method type '{}'. Only {} is supported",
                verification_method.type_, VERIFICATION_METHOD_TYPE
            )));
        }
        Ok(verification_method)
    }

    fn expected_account(&self, verification_method: &VerificationMethodMap) -> Result<String, Error> {
        let account_id = BlockchainAccountId::from_str(&verification_method.blockchain_account_id)?;
        account_id.eip155_address(self.resolver.chain_id())
    }

    /// Sign `document` (which must not contain a `proof` property) and return
    /// the resulting proof.
    pub async fn create_proof(
        &self,
        document: &Value,
        options: &ProofCreationOptions,
    ) -> Result<Proof, Error> {
        let did_url = DIDURL::from_str(&options.verification_method)
            .and_then(|url| {
                validate_did_url(&url, self.resolver.chain_id()).map(|_| url)
            })
            .map_err(|_| {
                Error::InvalidArgument(format!(
                    "The verification method '{}' is not a valid DID URL",
                    options.verification_method
                ))
            })?;

        let verification_method = self
            .dereference_verification_method(&did_url, options.proof_purpose)
            .await
            .map_err(|e| match e {
                unsupported @ Error::InvalidProof { .. } => unsupported,
                other => Error::InvalidArgument(format!(
                    "The verification method '{}' cannot be dereferenced: {}",
                    options.verification_method, other
                )),
            })?;
        let expected_account = self.expected_account(&verification_method)?;
        let signing_account = address_from_secret_key(&options.private_key)?;
        if !signing_account.eq_ignore_ascii_case(&expected_account) {
            return Err(Error::InvalidArgument(
                "The verification method resolves to an account different from the signer's one"
                    .to_string(),
            ));
        }

        let canonical_document = self
            .canonicalizer
            .canonize(document, options.document_loader.as_deref())
            .await?;
        let jws = jws::encode(&canonical_document, &options.private_key)?;

        Ok(Proof {
            type_: PROOF_TYPE.to_string(),
            created: datetime::now_iso_seconds(),
            verification_method: options.verification_method.clone(),
            proof_purpose: options.proof_purpose,
            jws,
            domain: options.domain.clone(),
            challenge: options.challenge.clone(),
        })
    }

    /// Verify `proof` over `document` (which must not contain a `proof`
    /// property).
    pub async fn verify_proof(
        &self,
        document: &Value,
        proof: &Proof,
        options: &ProofVerificationOptions,
    ) -> Result<(), Error> {
        if proof.type_ != PROOF_TYPE {
            return Err(Error::invalid_proof(format!(
                "Unsupported proof type '{}'. Only {} is supported",
                proof.type_, PROOF_TYPE
            )));
        }

        let created = datetime::parse_iso(&proof.created).ok_or_else(|| {
            Error::invalid_proof("The proof 'created' property is not a valid ISO-8601 date")
        })?;
        if datetime::is_in_future(&created) {
            return Err(Error::invalid_proof("The proof creation date is in the future"));
        }

        if proof.proof_purpose != options.expected_proof_purpose {
            return Err(Error::invalid_proof(format!(
                "The proof purpose is '{}', but '{}' was expected",
                proof.proof_purpose, options.expected_proof_purpose
            )));
        }
        if let Some(ref expected_domain) = options.expected_domain {
            if proof.domain.as_deref() != Some(expected_domain.as_str()) {
                return Err(Error::invalid_proof(
                    "The proof 'domain' property does not match the expected one",
                ));
            }
        }
        if let Some(ref expected_challenge) = options.expected_challenge {
            if proof.challenge.as_deref() != Some(expected_challenge.as_str()) {
                return Err(Error::invalid_proof(
                    "The proof 'challenge' property does not match the expected one",
                ));
            }
        }

        let did_url = DIDURL::from_str(&proof.verification_method)
            .and_then(|url| {
                validate_did_url(&url, self.resolver.chain_id()).map(|_| url)
            })
            .map_err(|_| {
                Error::invalid_proof("The proof verification method is not a valid DID URL")
            })?;
        let verification_method = self
            .dereference_verification_method(&did_url, options.expected_proof_purpose)
            .await
            .map_err(|e| {
                Error::invalid_proof_caused(
                    "The proof verification method cannot be dereferenced",
                    e,
                )
            })?;
        let expected_account = self.expected_account(&verification_method).map_err(|e| {
            Error::invalid_proof_caused(
                "The verification method does not contain a valid blockchain account identifier",
                e,
            )
        })?;

        let canonical_document = self
            .canonicalizer
            .canonize(document, options.document_loader.as_deref())
            .await?;
        jws::verify(&proof.jws, &canonical_document, &expected_account)
            .map_err(|e| Error::invalid_proof_caused("The proof is invalid", e))
    }

    /// Structural validation of a raw `proof` JSON object, used by the
    /// credential and presentation parsers before deserializing.
    pub fn check_structure_validity(proof: &Map<String, Value>) -> Result<(), Error> {
        let missing: Vec<String> = REQUIRED_PROOF_PROPERTIES
            .iter()
            .filter(|property| !proof.contains_key(**property))
            .map(|property| property.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingProofProperties(missing));
        }

        if proof["type"].as_str() != Some(PROOF_TYPE) {
            return Err(Error::invalid_proof(format!(
                "The proof 'type' property must be '{}'",
                PROOF_TYPE
            )));
        }
        for property in ["created", "verificationMethod", "jws"] {
            if !proof[property].is_string() {
                return Err(Error::invalid_proof(format!(
                    "The '{}' property must be a string in a valid {} proof",
                    property, PROOF_TYPE
                )));
            }
        }
        match proof["proofPurpose"].as_str() {
            Some("assertionMethod") | Some("authentication") => {}
            _ => {
                return Err(Error::invalid_proof(
                    "The 'proofPurpose' property must be either 'assertionMethod' or 'authentication'",
                ))
            }
        }
        for property in ["domain", "challenge"] {
            if let Some(value) = proof.get(property) {
                if !value.is_string() {
                    return Err(Error::invalid_proof(format!(
                        "The '{}' property must be a string in a valid {} proof",
                        property, PROOF_TYPE
                    )));
                }
            }
        }
        Ok(())
    }
}
