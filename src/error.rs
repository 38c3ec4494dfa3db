use crate::did_resolve::ResolutionError;
use thiserror::Error;

/// Error type for the `ssi-cot` crate.
///
/// Validation failures always carry a human-readable reason; failures caused
/// by a lower layer (JWS decoding, canonicalization, DID resolution) keep the
/// original error attached as their source instead of swallowing it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Caller misuse: malformed DID URL, missing status manager, unsupported
    /// credential status type, key/verification-method mismatch.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Malformed DID, or a DID anchored to a different chain.
    #[error("Invalid DID: {0}")]
    InvalidDid(String),
    #[error("Invalid verifiable credential: {reason}")]
    InvalidCredential {
        reason: String,
        #[source]
        source: Option<Box<Error>>,
    },
    /// Aggregated missing-key rejection from the structural validator.
    #[error("The verifiable credential is missing the following required properties: {}", .0.join(", "))]
    MissingCredentialProperties(Vec<String>),
    #[error("Invalid verifiable presentation: {reason}")]
    InvalidPresentation {
        reason: String,
        #[source]
        source: Option<Box<Error>>,
    },
    #[error("Invalid proof: {reason}")]
    InvalidProof {
        reason: String,
        #[source]
        source: Option<Box<Error>>,
    },
    #[error("The 'proof' property is missing the following properties required by the EcdsaSecp256k1RecoverySignature2020 suite: {}", .0.join(", "))]
    MissingProofProperties(Vec<String>),
    #[error("Invalid JWS: {reason}")]
    InvalidJws {
        reason: String,
        #[source]
        source: Option<Box<Error>>,
    },
    #[error("Invalid credential status: {0}")]
    InvalidCredentialStatus(String),
    /// Any canonicalization failure: unresolvable context, malformed JSON-LD.
    #[error("Unable to canonicalize the document: {0}")]
    Canonicalization(String),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Signature(#[from] k256::ecdsa::Error),
}

impl Error {
    pub fn invalid_credential(reason: impl Into<String>) -> Self {
        Error::InvalidCredential {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn invalid_credential_caused(reason: impl Into<String>, cause: Error) -> Self {
        Error::InvalidCredential {
            reason: reason.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn invalid_presentation(reason: impl Into<String>) -> Self {
        Error::InvalidPresentation {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn invalid_presentation_caused(reason: impl Into<String>, cause: Error) -> Self {
        Error::InvalidPresentation {
            reason: reason.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn invalid_proof(reason: impl Into<String>) -> Self {
        Error::InvalidProof {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn invalid_proof_caused(reason: impl Into<String>, cause: Error) -> Self {
        Error::InvalidProof {
            reason: reason.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn invalid_jws(reason: impl Into<String>) -> Self {
        Error::InvalidJws {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn invalid_jws_caused(reason: impl Into<String>, cause: Error) -> Self {
        Error::InvalidJws {
            reason: reason.into(),
            source: Some(Box::new(cause)),
        }
    }
}
