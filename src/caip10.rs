//! CAIP-10 blockchain account identifiers, as carried in the
//! `blockchainAccountId` property of `EcdsaSecp256k1RecoveryMethod2020`
//! verification methods.
//!
//! <https://github.com/ChainAgnostic/CAIPs/blob/master/CAIPs/caip-10.md>

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// A `namespace:reference:address` account identifier, e.g.
/// `eip155:1337:0xd14dac2057bd0bebf442fa3c5be5b2b69bbcbe35`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockchainAccountId {
    pub namespace: String,
    pub chain_reference: String,
    pub account_address: String,
}

fn valid_namespace(s: &str) -> bool {
    // namespace: [-a-z0-9]{3,8}
    (3..=8).contains(&s.len())
        && s.chars()
            .all(|c| c == '-' || c.is_ascii_lowercase() || c.is_ascii_digit())
}

fn valid_reference(s: &str) -> bool {
    // reference: [-a-zA-Z0-9]{1,32}
    (1..=32).contains(&s.len())
        && s.chars().all(|c| c == '-' || c.is_ascii_alphanumeric())
}

fn valid_address(s: &str) -> bool {
    // address: [-.%a-zA-Z0-9]{1,128}
    (1..=128).contains(&s.len())
        && s.chars()
            .all(|c| c == '-' || c == '.' || c == '%' || c.is_ascii_alphanumeric())
}

impl FromStr for BlockchainAccountId {
    type Err = Error;

    fn from_str(account_id: &str) -> Result<Self, Self::Err> {
        let mut parts = account_id.splitn(3, ':');
        let (namespace, chain_reference, account_address) =
            match (parts.next(), parts.next(), parts.next()) {
                (Some(ns), Some(reference), Some(address)) => (ns, reference, address),
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "'{}' is not a valid CAIP-10 account identifier",
                        account_id
                    )))
                }
            };
        if !valid_namespace(namespace) {
            return Err(Error::InvalidArgument(format!(
                "Invalid CAIP-10 namespace '{}'",
                namespace
            )));
        }
        if !valid_reference(chain_reference) {
            return Err(Error::InvalidArgument(format!(
                "Invalid CAIP-10 chain reference '{}'",
                chain_reference
            )));
        }
        if !valid_address(account_address) {
            return Err(Error::InvalidArgument(format!(
                "Invalid CAIP-10 account address '{}'",
                account_address
            )));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            chain_reference: chain_reference.to_string(),
            account_address: account_address.to_string(),
        })
    }
}

impl fmt::Display for BlockchainAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.namespace, self.chain_reference, self.account_address
        )
    }
}

impl BlockchainAccountId {
    /// Extract the Ethereum account address from an `eip155` account
    /// identifier, checking that it belongs to the expected chain. The
    /// address is returned lowercased for case-insensitive comparison with
    /// addresses recovered from signatures.
    pub fn eip155_address(&self, expected_chain_id: u64) -> Result<String, Error> {
        if self.namespace != "eip155" {
            return Err(Error::InvalidArgument(format!(
                "Expected an 'eip155' account identifier, found namespace '{}'",
                self.namespace
            )));
        }
        match self.chain_reference.parse::<u64>() {
            Ok(chain) if chain == expected_chain_id => {}
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "The account identifier '{}' does not belong to chain {}",
                    self, expected_chain_id
                )))
            }
        }
        if !self.account_address.starts_with("0x") || self.account_address.len() != 42 {
            return Err(Error::InvalidArgument(format!(
                "'{}' is not a valid Ethereum account address",
                self.account_address
            )));
        }
        Ok(self.account_address.to_lowercase())
    }
}
