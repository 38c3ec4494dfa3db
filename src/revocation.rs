//! Credential status checking.
//!
//! A credential may carry a `credentialStatus` entry; the manager configured
//! for its `type` validates the entry's structure at parse time and resolves
//! its revocation state at verification time. The only built-in scheme is
//! `RevocationList2023`, backed by the on-chain revocation service that the
//! status `id` DID URL points to.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::did::{validate_did_url, DIDURL};
use crate::did_resolve::DIDResolver;
use crate::error::Error;
use crate::vc::Status;

pub const REVOCATION_LIST_2023_TYPE: &str = "RevocationList2023";

/// Pluggable handler for one credential status scheme.
#[async_trait]
pub trait CredentialStatusManager: Send + Sync {
    /// Whether this manager handles `credentialStatus` entries of this type.
    fn can_handle_type(&self, status_type: &str) -> bool;

    /// Structural validation of a raw `credentialStatus` JSON object.
    fn check_structure_validity(&self, status: &Map<String, Value>) -> Result<(), Error>;

    /// Resolve the status entry; `Err` if the credential has been revoked or
    /// the status cannot be determined.
    async fn verify_status(&self, status: &Status) -> Result<(), Error>;
}

pub struct RevocationList2023Manager {
    resolver: Arc<dyn DIDResolver>,
}

impl RevocationList2023Manager {
    pub fn new(resolver: Arc<dyn DIDResolver>) -> Self {
        RevocationList2023Manager { resolver }
    }
}

#[async_trait]
impl CredentialStatusManager for RevocationList2023Manager {
    fn can_handle_type(&self, status_type: &str) -> bool {
        status_type == REVOCATION_LIST_2023_TYPE
    }

    fn check_structure_validity(&self, status: &Map<String, Value>) -> Result<(), Error> {
        // A RevocationList2023 entry carries the two mandatory properties and
        // nothing else.
        if status.len() != 2 {
            return Err(Error::InvalidCredentialStatus(format!(
                "A {} credential status must contain only the 'id' and 'type' properties",
                REVOCATION_LIST_2023_TYPE
            )));
        }
        match status.get("id") {
            Some(id) if id.is_string() => {}
            _ => {
                return Err(Error::InvalidCredentialStatus(
                    "The 'credentialStatus.id' property must be a string".to_string(),
                ))
            }
        }
        match status.get("type").and_then(Value::as_str) {
            Some(REVOCATION_LIST_2023_TYPE) => {}
            _ => {
                return Err(Error::InvalidCredentialStatus(format!(
                    "The 'credentialStatus.type' property must be '{}'",
                    REVOCATION_LIST_2023_TYPE
                )))
            }
        }
        Ok(())
    }

    async fn verify_status(&self, status: &Status) -> Result<(), Error> {
        let did_url = DIDURL::from_str(&status.id)
            .and_then(|url| validate_did_url(&url, self.resolver.chain_id()).map(|_| url))
            .map_err(|_| {
                Error::InvalidArgument(
                    "The 'credentialStatus.id' property is not a valid DID URL".to_string(),
                )
            })?;
        let revocation_status = self.resolver.resolve_credential_status(&did_url).await?;
        if revocation_status.revoked {
            return Err(Error::invalid_credential(
                "The verifiable credential has been revoked",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did_resolve::{
        ResolutionError, ResolutionInputMetadata, RevocationStatus, TrustChain,
        VerificationMethodMap,
    };
    use serde_json::json;

    struct FixedStatusResolver {
        revoked: bool,
    }

    #[async_trait]
    impl DIDResolver for FixedStatusResolver {
        fn chain_id(&self) -> u64 {
            1337
        }

        async fn resolve_chain(&self, _entity: &str) -> Result<TrustChain, ResolutionError> {
            Err(ResolutionError::not_found("no chain"))
        }

        async fn resolve_authentication(
            &self,
            _did_url: &DIDURL,
            _input_metadata: &ResolutionInputMetadata,
        ) -> Result<VerificationMethodMap, ResolutionError> {
            Err(ResolutionError::not_found("no method"))
        }

        async fn resolve_assertion_method(
            &self,
            _did_url: &DIDURL,
            _input_metadata: &ResolutionInputMetadata,
        ) -> Result<VerificationMethodMap, ResolutionError> {
            Err(ResolutionError::not_found("no method"))
        }

        async fn resolve_credential_status(
            &self,
            _did_url: &DIDURL,
        ) -> Result<RevocationStatus, ResolutionError> {
            Ok(RevocationStatus {
                revoked: self.revoked,
            })
        }
    }

    fn manager(revoked: bool) -> RevocationList2023Manager {
        RevocationList2023Manager::new(Arc::new(FixedStatusResolver { revoked }))
    }

    fn valid_status_object() -> Map<String, Value> {
        json!({
            "id": "did:ssi-cot-eth:1337:d14dac2057bd0bebf442fa3c5be5b2b69bbcbe35#revoc-1",
            "type": REVOCATION_LIST_2023_TYPE
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn valid_structure_accepted() {
        manager(false)
            .check_structure_validity(&valid_status_object())
            .unwrap();
    }

    #[test]
    fn extra_property_rejected() {
        let mut status = valid_status_object();
        status.insert("note".to_string(), json!("extra"));
        manager(false).check_structure_validity(&status).unwrap_err();
    }

    #[test]
    fn wrong_type_rejected() {
        let mut status = valid_status_object();
        status.insert("type".to_string(), json!("RevocationList2020"));
        manager(false).check_structure_validity(&status).unwrap_err();
    }

    #[async_std::test]
    async fn unrevoked_status_accepted() {
        let status = Status {
            id: "did:ssi-cot-eth:1337:d14dac2057bd0bebf442fa3c5be5b2b69bbcbe35#revoc-1"
                .to_string(),
            type_: REVOCATION_LIST_2023_TYPE.to_string(),
        };
        manager(false).verify_status(&status).await.unwrap();
    }

    #[async_std::test]
    async fn revoked_status_rejected() {
        let status = Status {
            id: "did:ssi-cot-eth:1337:d14dac2057bd0bebf442fa3c5be5b2b69bbcbe35#revoc-1"
                .to_string(),
            type_: REVOCATION_LIST_2023_TYPE.to_string(),
        };
        let err = manager(true).verify_status(&status).await.unwrap_err();
        assert!(err.to_string().contains("revoked"));
    }

    #[async_std::test]
    async fn invalid_status_id_rejected() {
        let status = Status {
            id: "not-a-did-url".to_string(),
            type_: REVOCATION_LIST_2023_TYPE.to_string(),
        };
        manager(false).verify_status(&status).await.unwrap_err();
    }
}
