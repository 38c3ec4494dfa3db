//! DID and DID URL syntax for the `ssi-cot-eth` method.
//!
//! A method-specific identifier is `<chain-id>:<account>`, where `chain-id`
//! is the decimal EIP-155 chain identifier of the registry the DID document
//! lives on and `account` is the 20-byte blockchain account in lowercase hex
//! without the `0x` prefix:
//!
//! ```text
//! did:ssi-cot-eth:1337:d14dac2057bd0bebf442fa3c5be5b2b69bbcbe35
//! ```

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

pub const DID_METHOD_NAME: &str = "ssi-cot-eth";

const ACCOUNT_HEX_LENGTH: usize = 40;

/// A DID URL: a DID optionally followed by `?query` and/or `#fragment`.
///
/// <https://www.w3.org/TR/did-core/#did-url-syntax>
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DIDURL {
    pub did: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl FromStr for DIDURL {
    type Err = Error;

    fn from_str(did_url: &str) -> Result<Self, Self::Err> {
        let (before_fragment, fragment) = match did_url.split_once('#') {
            Some((before, fragment)) => (before, Some(fragment.to_string())),
            None => (did_url, None),
        };
        let (did, query) = match before_fragment.split_once('?') {
            Some((did, query)) => (did, Some(query.to_string())),
            None => (before_fragment, None),
        };
        if did.is_empty() {
            return Err(Error::InvalidDid(
                "The DID URL does not contain a DID".to_string(),
            ));
        }
        Ok(DIDURL {
            did: did.to_string(),
            query,
            fragment,
        })
    }
}

impl fmt::Display for DIDURL {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.did)?;
        if let Some(ref query) = self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(ref fragment) = self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

/// Check that `did` is a syntactically valid `did:ssi-cot-eth` DID anchored
/// on the chain identified by `chain_id`.
pub fn validate_did(did: &str, chain_id: u64) -> Result<(), Error> {
    let mut parts = did.split(':');
    match (parts.next(), parts.next()) {
        (Some("did"), Some(method)) if method == DID_METHOD_NAME => {}
        (Some("did"), Some(method)) => {
            return Err(Error::InvalidDid(format!(
                "Unsupported DID method '{}'. Only '{}' is supported",
                method, DID_METHOD_NAME
            )))
        }
        _ => {
            return Err(Error::InvalidDid(format!(
                "'{}' does not start with the 'did' scheme",
                did
            )))
        }
    }
    let chain = parts
        .next()
        .and_then(|part| part.parse::<u64>().ok())
        .ok_or_else(|| {
            Error::InvalidDid("The DID does not contain a valid chain identifier".to_string())
        })?;
    if chain != chain_id {
        return Err(Error::InvalidDid(format!(
            "The DID is anchored on chain {}, but the resolver operates on chain {}",
            chain, chain_id
        )));
    }
    let account = parts.next().ok_or_else(|| {
        Error::InvalidDid("The DID does not contain a blockchain account".to_string())
    })?;
    if parts.next().is_some() {
        return Err(Error::InvalidDid(
            "The DID contains too many ':'-separated parts".to_string(),
        ));
    }
    if account.len() != ACCOUNT_HEX_LENGTH
        || !account
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return Err(Error::InvalidDid(format!(
            "The account part of the DID must be {} lowercase hex characters",
            ACCOUNT_HEX_LENGTH
        )));
    }
    Ok(())
}

/// Check that the DID part of a DID URL is valid for `chain_id`.
pub fn validate_did_url(did_url: &DIDURL, chain_id: u64) -> Result<(), Error> {
    validate_did(&did_url.did, chain_id)
}

/// The blockchain account embedded in a DID, as a lowercase `0x` hex string.
/// The DID is assumed to have been validated first.
pub fn did_account_address(did: &str) -> Option<String> {
    did.rsplit(':').next().map(|hex| format!("0x{}", hex))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DID: &str = "did:ssi-cot-eth:1337:d14dac2057bd0bebf442fa3c5be5b2b69bbcbe35";

    #[test]
    fn did_url_round_trip() {
        let url_str = format!("{}?service=revoc#assert-key-1", DID);
        let url = DIDURL::from_str(&url_str).unwrap();
        assert_eq!(url.did, DID);
        assert_eq!(url.query.as_deref(), Some("service=revoc"));
        assert_eq!(url.fragment.as_deref(), Some("assert-key-1"));
        assert_eq!(url.to_string(), url_str);
    }

    #[test]
    fn bare_did_url() {
        let url = DIDURL::from_str(DID).unwrap();
        assert_eq!(url.did, DID);
        assert_eq!(url.query, None);
        assert_eq!(url.fragment, None);
    }

    #[test]
    fn empty_did_rejected() {
        assert!(DIDURL::from_str("#frag").is_err());
    }

    #[test]
    fn valid_did() {
        validate_did(DID, 1337).unwrap();
    }

    #[test]
    fn wrong_chain_rejected() {
        let err = validate_did(DID, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidDid(_)));
    }

    #[test]
    fn wrong_method_rejected() {
        validate_did("did:ethr:0x1234", 1337).unwrap_err();
        validate_did("not-a-did", 1337).unwrap_err();
    }

    #[test]
    fn bad_account_rejected() {
        // too short
        validate_did("did:ssi-cot-eth:1337:abcd", 1337).unwrap_err();
        // uppercase hex
        validate_did(
            "did:ssi-cot-eth:1337:D14DAC2057BD0BEBF442FA3C5BE5B2B69BBCBE35",
            1337,
        )
        .unwrap_err();
    }

    #[test]
    fn account_address() {
        assert_eq!(
            did_account_address(DID).unwrap(),
            "0xd14dac2057bd0bebf442fa3c5be5b2b69bbcbe35"
        );
    }
}
