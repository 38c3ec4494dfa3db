//! Verifiable credentials and presentations.
//!
//! Follows the W3C Verifiable Credentials Data Model v1.1 field names, with
//! the additions used by the chain-of-trust ecosystem: string issuers that
//! are `did:ssi-cot-eth` DIDs, `RevocationList2023` status entries, and
//! EcdsaSecp256k1RecoverySignature2020 proofs.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::datetime;
use crate::did::validate_did;
use crate::did_resolve::{
    DIDResolver, TrustCertification, TrustCertificationStatus, CHAIN_OF_TRUST_MAX_LENGTH,
};
use crate::error::Error;
use crate::jsonld::document_for_signing;
use crate::ldp::{
    EcdsaSecp256k1ProofManager, Proof, ProofCreationOptions, ProofVerificationOptions,
};
use crate::one_or_many::OneOrMany;
use crate::revocation::CredentialStatusManager;

pub const DEFAULT_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

pub const CREDENTIAL_TYPE: &str = "VerifiableCredential";
pub const PRESENTATION_TYPE: &str = "VerifiablePresentation";

const CREDENTIAL_REQUIRED_PROPERTIES: [&str; 6] = [
    "@context",
    "type",
    "credentialSubject",
    "issuer",
    "issuanceDate",
    "proof",
];

/// A JSON-LD context entry: a URI or an inline context definition.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Context {
    URI(String),
    Object(Map<String, Value>),
}

impl Context {
    pub fn uri(uri: &str) -> Self {
        Context::URI(uri.to_string())
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Context::URI(uri) => Some(uri),
            Context::Object(_) => None,
        }
    }
}

/// A `credentialStatus` entry. Scheme-specific properties are validated by
/// the status manager before deserialization, so only the common ones are
/// kept here.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Status {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential<T> {
    #[serde(rename = "@context")]
    pub context: Vec<Context>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: Vec<String>,
    pub credential_subject: T,
    pub issuer: String,
    pub issuance_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<Status>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VerifiableCredential<T> {
    #[serde(flatten)]
    pub credential: Credential<T>,
    pub proof: Proof,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(rename = "@context")]
    pub context: Vec<Context>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifiable_credential: Option<OneOrMany<VerifiableCredential<Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
}

impl Presentation {
    /// The embedded credentials in order, whether the
    /// `verifiableCredential` property held a single value or an array.
    pub fn credentials(&self) -> impl Iterator<Item = &VerifiableCredential<Value>> {
        self.verifiable_credential
            .iter()
            .flat_map(|credentials| credentials.into_iter())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VerifiablePresentation {
    #[serde(flatten)]
    pub presentation: Presentation,
    pub proof: Proof,
}

/// The issuers a verifier is willing to accept.
#[derive(Debug, Clone, Default)]
pub struct TrustedIssuers {
    /// Accepted as-is, without walking any chain of trust.
    pub direct_issuers: HashSet<String>,
    /// Accepted when found anywhere in the issuer's chain of trust.
    pub chain_issuers: HashSet<String>,
    /// Always rejected, wherever they appear.
    pub blacklisted_issuers: HashSet<String>,
}

/// Policy hook invoked when a revoked trust certification is found while
/// walking a chain of trust. Arguments: the credential issuer, the entity
/// whose chain is being examined, the revoked certification and the full
/// chain it belongs to. Returning `true` continues the walk.
pub type RevokedCertificationHook =
    Box<dyn Fn(&str, &str, &TrustCertification, &[TrustCertification]) -> bool + Send + Sync>;

#[derive(Default)]
pub struct CredentialVerificationOptions {
    pub trusted_issuers: TrustedIssuers,
    pub on_revoked_certification: Option<RevokedCertificationHook>,
}

pub struct CredentialCreationOptions<T> {
    /// Contexts appended after the base credentials context, deduplicated.
    pub additional_contexts: Vec<Context>,
    pub id: Option<String>,
    /// Types appended after `VerifiableCredential`, deduplicated.
    pub additional_types: Vec<String>,
    pub credential_subject: T,
    pub issuer: String,
    pub expiration_date: Option<DateTime<Utc>>,
    pub credential_status: Option<Status>,
}

pub struct PresentationCreationOptions {
    pub additional_contexts: Vec<Context>,
    pub id: Option<String>,
    pub additional_types: Vec<String>,
    /// Elided from the presentation when empty.
    pub verifiable_credentials: Vec<VerifiableCredential<Value>>,
    pub holder: Option<String>,
}

/// Validates the issuer identifier of a credential before it is used.
#[async_trait]
pub trait IssuerValidityChecker: Send + Sync {
    async fn check_validity(&self, issuer: &str) -> Result<(), Error>;
}

/// Accepts issuers that are valid `did:ssi-cot-eth` DIDs on the resolver's
/// chain.
pub struct DidIssuerValidityChecker {
    resolver: Arc<dyn DIDResolver>,
}

impl DidIssuerValidityChecker {
    pub fn new(resolver: Arc<dyn DIDResolver>) -> Self {
        DidIssuerValidityChecker { resolver }
    }
}

#[async_trait]
impl IssuerValidityChecker for DidIssuerValidityChecker {
    async fn check_validity(&self, issuer: &str) -> Result<(), Error> {
        validate_did(issuer, self.resolver.chain_id())
            .map_err(|_| Error::InvalidDid("The issuer DID is not a valid DID".to_string()))
    }
}

fn merged_contexts(base: &str, additional: &[Context]) -> Vec<Context> {
    let mut contexts = vec![Context::uri(base)];
    for context in additional {
        if !contexts.contains(context) {
            contexts.push(context.clone());
        }
    }
    contexts
}

fn merged_types(base: &str, additional: &[String]) -> Vec<String> {
    let mut types = vec![base.to_string()];
    for type_ in additional {
        if !types.contains(type_) {
            types.push(type_.clone());
        }
    }
    types
}

fn is_array_of(value: &Value, predicate: fn(&Value) -> bool) -> bool {
    match value.as_array() {
        Some(values) => values.iter().all(predicate),
        None => false,
    }
}

/// Creates, parses and verifies verifiable credentials.
pub struct VerifiableCredentialManager {
    resolver: Arc<dyn DIDResolver>,
    issuer_validity_checker: Arc<dyn IssuerValidityChecker>,
    proof_manager: EcdsaSecp256k1ProofManager,
    credential_status_manager: Option<Arc<dyn CredentialStatusManager>>,
}

impl VerifiableCredentialManager {
    pub fn new(
        resolver: Arc<dyn DIDResolver>,
        issuer_validity_checker: Arc<dyn IssuerValidityChecker>,
        proof_manager: EcdsaSecp256k1ProofManager,
        credential_status_manager: Option<Arc<dyn CredentialStatusManager>>,
    ) -> Self {
        VerifiableCredentialManager {
            resolver,
            issuer_validity_checker,
            proof_manager,
            credential_status_manager,
        }
    }

    /// Assemble and sign a credential. The issuance date is the current
    /// time; contexts and types are deduplicated with the base entries
    /// first.
    pub async fn create_verifiable_credential<T: Serialize>(
        &self,
        options: CredentialCreationOptions<T>,
        proof_creation_options: &ProofCreationOptions,
    ) -> Result<VerifiableCredential<T>, Error> {
        self.issuer_validity_checker
            .check_validity(&options.issuer)
            .await?;
        if let Some(ref status) = options.credential_status {
            let manager = self.credential_status_manager.as_ref().ok_or_else(|| {
                Error::InvalidArgument(
                    "Cannot insert the specified credential status in the verifiable credential because no credential status manager has been configured".to_string(),
                )
            })?;
            if !manager.can_handle_type(&status.type_) {
                return Err(Error::InvalidArgument(format!(
                    "The credential status manager cannot handle credential statuses with type {}",
                    status.type_
                )));
            }
        }

        let credential = Credential {
            context: merged_contexts(DEFAULT_CONTEXT, &options.additional_contexts),
            id: options.id,
            type_: merged_types(CREDENTIAL_TYPE, &options.additional_types),
            credential_subject: options.credential_subject,
            issuer: options.issuer,
            issuance_date: datetime::now_iso_seconds(),
            expiration_date: options
                .expiration_date
                .as_ref()
                .map(datetime::to_iso_seconds),
            credential_status: options.credential_status,
        };

        let document = serde_json::to_value(&credential)?;
        let proof = self
            .proof_manager
            .create_proof(&document, proof_creation_options)
            .await?;
        Ok(VerifiableCredential { credential, proof })
    }

    /// Parse a JSON string as a verifiable credential, validating its
    /// structure before deserializing. `subject_validator` decides whether
    /// the raw `credentialSubject` object has the shape of `T`.
    pub fn parse_credential<T, F>(
        &self,
        value: &str,
        subject_validator: F,
    ) -> Result<VerifiableCredential<T>, Error>
    where
        T: DeserializeOwned,
        F: Fn(&Map<String, Value>) -> bool,
    {
        let parsed: Value = serde_json::from_str(value).map_err(|e| {
            Error::invalid_credential_caused("The specified value is not a valid JSON", e.into())
        })?;
        self.parse_credential_value(&parsed, subject_validator)
    }

    /// Like [`parse_credential`](Self::parse_credential), for an
    /// already-parsed JSON value.
    pub fn parse_credential_value<T, F>(
        &self,
        value: &Value,
        subject_validator: F,
    ) -> Result<VerifiableCredential<T>, Error>
    where
        T: DeserializeOwned,
        F: Fn(&Map<String, Value>) -> bool,
    {
        let object = value.as_object().ok_or_else(|| {
            Error::invalid_credential("The specified value is not a JSON object")
        })?;

        let missing: Vec<String> = CREDENTIAL_REQUIRED_PROPERTIES
            .iter()
            .filter(|property| !object.contains_key(**property))
            .map(|property| property.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingCredentialProperties(missing));
        }

        if !is_array_of(&object["@context"], |v| v.is_string() || v.is_object()) {
            return Err(Error::invalid_credential(
                "The '@context' property must be an array of strings and/or JSON-LD context definitions",
            ));
        }
        if let Some(id) = object.get("id") {
            if !id.is_string() {
                return Err(Error::invalid_credential("The 'id' property must be a string"));
            }
        }
        if !is_array_of(&object["type"], Value::is_string) {
            return Err(Error::invalid_credential(
                "The 'type' property must be an array of strings",
            ));
        }
        if !object["issuer"].is_string() {
            return Err(Error::invalid_credential("The 'issuer' property must be a string"));
        }
        if !object["issuanceDate"].is_string() {
            return Err(Error::invalid_credential(
                "The 'issuanceDate' property must be a string",
            ));
        }
        if let Some(expiration_date) = object.get("expirationDate") {
            if !expiration_date.is_string() {
                return Err(Error::invalid_credential(
                    "The 'expirationDate' property must be a string",
                ));
            }
        }

        let subject = object["credentialSubject"].as_object().ok_or_else(|| {
            Error::invalid_credential("The 'credentialSubject' property must be an object")
        })?;
        if !subject_validator(subject) {
            return Err(Error::invalid_credential(
                "The 'credentialSubject' property is not valid",
            ));
        }

        if let Some(status) = object.get("credentialStatus") {
            let manager = self.credential_status_manager.as_ref().ok_or_else(|| {
                Error::invalid_credential(
                    "The verifiable credential contains a 'credentialStatus' property, but no credential status manager has been configured",
                )
            })?;
            let status_object = status.as_object().ok_or_else(|| {
                Error::invalid_credential("The 'credentialStatus' property must be an object")
            })?;
            manager.check_structure_validity(status_object).map_err(|e| {
                Error::invalid_credential_caused(
                    "The 'credentialStatus' property is not valid",
                    e,
                )
            })?;
        }

        let proof = object["proof"].as_object().ok_or_else(|| {
            Error::invalid_credential("The 'proof' property must be an object")
        })?;
        EcdsaSecp256k1ProofManager::check_structure_validity(proof).map_err(|e| {
            Error::invalid_credential_caused(
                "The 'proof' property does not contain a valid proof",
                e,
            )
        })?;

        // Unknown extra properties are tolerated and dropped.
        serde_json::from_value(value.clone()).map_err(|e| {
            Error::invalid_credential_caused(
                "Unable to decode the specified value as a verifiable credential",
                e.into(),
            )
        })
    }

    /// Verify a credential: context and type, issuer validity and trust,
    /// dates, revocation status, and finally the proof.
    pub async fn verify_credential<T: Serialize>(
        &self,
        verifiable_credential: &VerifiableCredential<T>,
        options: &CredentialVerificationOptions,
        proof_verification_options: &ProofVerificationOptions,
    ) -> Result<(), Error> {
        let credential = &verifiable_credential.credential;

        if credential.context.first().and_then(Context::as_uri) != Some(DEFAULT_CONTEXT) {
            return Err(Error::invalid_credential(format!(
                "Any valid verifiable credential must specify '{}' as the first context",
                DEFAULT_CONTEXT
            )));
        }
        if !credential.type_.iter().any(|t| t == CREDENTIAL_TYPE) {
            return Err(Error::invalid_credential(format!(
                "Any valid verifiable credential must contain the type '{}'",
                CREDENTIAL_TYPE
            )));
        }

        self.issuer_validity_checker
            .check_validity(&credential.issuer)
            .await?;

        let issuance_date = datetime::parse_iso(&credential.issuance_date).ok_or_else(|| {
            Error::invalid_credential("Invalid verifiable credential issuance date")
        })?;
        if datetime::is_in_future(&issuance_date) {
            return Err(Error::invalid_credential(
                "The verifiable credential was issued in the future",
            ));
        }
        if let Some(ref expiration) = credential.expiration_date {
            let expiration_date = datetime::parse_iso(expiration).ok_or_else(|| {
                Error::invalid_credential("Invalid verifiable credential expiration date")
            })?;
            if datetime::is_in_past(&expiration_date) {
                return Err(Error::invalid_credential("The verifiable credential is expired"));
            }
        }

        if let Some(ref status) = credential.credential_status {
            let manager = self.credential_status_manager.as_ref().ok_or_else(|| {
                Error::InvalidArgument(
                    "Cannot verify the status of the verifiable credential because no credential status manager has been configured".to_string(),
                )
            })?;
            if !manager.can_handle_type(&status.type_) {
                return Err(Error::InvalidArgument(format!(
                    "The credential status manager cannot handle credential statuses with type {}",
                    status.type_
                )));
            }
            manager.verify_status(status).await?;
        }

        self.check_issuer_trust(&credential.issuer, options).await?;

        let document = document_for_signing(&serde_json::to_value(verifiable_credential)?);
        self.proof_manager
            .verify_proof(
                &document,
                &verifiable_credential.proof,
                proof_verification_options,
            )
            .await
            .map_err(|e| {
                Error::invalid_credential_caused(
                    "The integrity of the verifiable credential cannot be validated",
                    e,
                )
            })
    }

    /// Walk the issuer's chain of trust until a trusted chain issuer is
    /// found. The walk is bounded: at most [`CHAIN_OF_TRUST_MAX_LENGTH`]
    /// certifications are examined and each entity is visited once, so
    /// cyclic certification graphs terminate.
    async fn check_issuer_trust(
        &self,
        issuer: &str,
        options: &CredentialVerificationOptions,
    ) -> Result<(), Error> {
        let trusted = &options.trusted_issuers;
        if trusted.blacklisted_issuers.contains(issuer) {
            return Err(Error::invalid_credential(
                "The issuer of the verifiable credential is blacklisted",
            ));
        }
        if trusted.direct_issuers.contains(issuer) {
            debug!("issuer {} accepted as a direct issuer", issuer);
            return Ok(());
        }

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(issuer.to_string());
        let mut pending: VecDeque<String> = VecDeque::new();
        pending.push_back(issuer.to_string());
        let mut examined = 0usize;

        while let Some(entity) = pending.pop_front() {
            let chain = self
                .resolver
                .resolve_chain(&entity)
                .await
                .map_err(|e| {
                    let mut message = format!("Cannot retrieve the chain of trust of '{}'", entity);
                    if entity != issuer {
                        message.push_str(&format!(
                            ", which belongs to the chain of trust of '{}',",
                            issuer
                        ));
                    }
                    message.push_str(&format!(": {}", e));
                    Error::invalid_credential(message)
                })?
                .trust_chain;

            for certification in &chain {
                let certification_issuer = &certification.issuer;
                if trusted.blacklisted_issuers.contains(certification_issuer) {
                    return Err(Error::invalid_credential(format!(
                        "The entity '{}' in the chain of trust of '{}' is blacklisted",
                        certification_issuer, issuer
                    )));
                }
                if certification.certification_status == TrustCertificationStatus::Revoked {
                    let continue_walk = match options.on_revoked_certification {
                        Some(ref hook) => hook(issuer, &entity, certification, &chain),
                        None => false,
                    };
                    if !continue_walk {
                        return Err(Error::invalid_credential(format!(
                            "The trust certification of the entity '{}', which belongs to the chain of trust of '{}', has been revoked",
                            certification_issuer, issuer
                        )));
                    }
                }
                if trusted.chain_issuers.contains(certification_issuer) {
                    debug!(
                        "issuer {} accepted through chain issuer {}",
                        issuer, certification_issuer
                    );
                    return Ok(());
                }

                examined += 1;
                if examined >= CHAIN_OF_TRUST_MAX_LENGTH {
                    debug!("chain-of-trust walk for {} hit the traversal bound", issuer);
                    return Err(Error::invalid_credential(
                        "The issuer of the verifiable credential is not trusted",
                    ));
                }
                if visited.insert(certification_issuer.clone()) {
                    pending.push_back(certification_issuer.clone());
                }
            }
        }

        Err(Error::invalid_credential(
            "The issuer of the verifiable credential is not trusted",
        ))
    }
}

/// Creates and verifies verifiable presentations.
pub struct VerifiablePresentationManager {
    resolver: Arc<dyn DIDResolver>,
    proof_manager: EcdsaSecp256k1ProofManager,
}

impl VerifiablePresentationManager {
    pub fn new(resolver: Arc<dyn DIDResolver>, proof_manager: EcdsaSecp256k1ProofManager) -> Self {
        VerifiablePresentationManager {
            resolver,
            proof_manager,
        }
    }

    pub async fn create_verifiable_presentation(
        &self,
        options: PresentationCreationOptions,
        proof_creation_options: &ProofCreationOptions,
    ) -> Result<VerifiablePresentation, Error> {
        if let Some(ref holder) = options.holder {
            validate_did(holder, self.resolver.chain_id())
                .map_err(|_| Error::InvalidDid("The holder is not a valid DID".to_string()))?;
        }

        let presentation = Presentation {
            context: merged_contexts(DEFAULT_CONTEXT, &options.additional_contexts),
            id: options.id,
            type_: merged_types(PRESENTATION_TYPE, &options.additional_types),
            verifiable_credential: if options.verifiable_credentials.is_empty() {
                None
            } else {
                Some(options.verifiable_credentials.into())
            },
            holder: options.holder,
        };

        let document = serde_json::to_value(&presentation)?;
        let proof = self
            .proof_manager
            .create_proof(&document, proof_creation_options)
            .await?;
        Ok(VerifiablePresentation {
            presentation,
            proof,
        })
    }

    /// Verify the envelope of a presentation: context, type, holder DID and
    /// proof. The embedded credentials must be verified separately with a
    /// [`VerifiableCredentialManager`].
    pub async fn verify_presentation(
        &self,
        verifiable_presentation: &VerifiablePresentation,
        proof_verification_options: &ProofVerificationOptions,
    ) -> Result<(), Error> {
        let presentation = &verifiable_presentation.presentation;

        if presentation.context.first().and_then(Context::as_uri) != Some(DEFAULT_CONTEXT) {
            return Err(Error::invalid_presentation(format!(
                "Any valid verifiable presentation must specify '{}' as the first context",
                DEFAULT_CONTEXT
            )));
        }
        if !presentation.type_.iter().any(|t| t == PRESENTATION_TYPE) {
            return Err(Error::invalid_presentation(format!(
                "Any valid verifiable presentation must contain the type '{}'",
                PRESENTATION_TYPE
            )));
        }
        if let Some(ref holder) = presentation.holder {
            validate_did(holder, self.resolver.chain_id())
                .map_err(|_| Error::InvalidArgument("The holder is not a valid DID".to_string()))?;
        }

        let document = document_for_signing(&serde_json::to_value(verifiable_presentation)?);
        self.proof_manager
            .verify_proof(
                &document,
                &verifiable_presentation.proof,
                proof_verification_options,
            )
            .await
            .map_err(|e| {
                Error::invalid_presentation_caused(
                    "The integrity of the verifiable presentation cannot be validated",
                    e,
                )
            })
    }
}
