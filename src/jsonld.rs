//! JSON-LD context URIs and the canonicalization seam used by the proof
//! suite.
//!
//! Canonicalization itself is pluggable: signing and verification only need
//! a deterministic serialization of the document, so the algorithm (URDNA2015
//! or any other) is supplied by the embedder through [`Canonicalizer`].

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;

pub const CREDENTIALS_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const SECP256K1_RECOVERY_2020_V2_CONTEXT: &str =
    "https://identity.foundation/EcdsaSecp256k1RecoverySignature2020/lds-ecdsa-secp256k1-recovery2020-2.0.jsonld";
pub const CERTIFICATION_CREDENTIAL_CONTEXT: &str =
    "https://www.ssicot.com/certification-credential";
pub const REVOCATION_LIST_2023_CONTEXT: &str = "https://www.ssicot.com/RevocationList2023";

/// Resolves a context URL to its JSON-LD context document, typically from an
/// offline cache so that canonicalization does not hit the network.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<Value, Error>;
}

/// Produces the canonical textual form of a JSON document, to be signed or
/// verified as the detached JWS payload.
#[async_trait]
pub trait Canonicalizer: Send + Sync {
    async fn canonize(
        &self,
        document: &Value,
        loader: Option<&dyn DocumentLoader>,
    ) -> Result<String, Error>;
}

/// A copy of `document` with its `proof` property removed. Proofs always
/// sign the document without the proof itself.
pub fn document_for_signing(document: &Value) -> Value {
    let mut copy = document.clone();
    if let Some(object) = copy.as_object_mut() {
        object.remove("proof");
    }
    copy
}
