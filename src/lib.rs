//! Verifiable credentials and presentations anchored to an Ethereum
//! chain-of-trust registry.
//!
//! The crate implements the W3C Verifiable Credentials Data Model with the
//! `did:ssi-cot-eth` DID method, EcdsaSecp256k1RecoverySignature2020 linked
//! data proofs carried as detached unencoded-payload JWSs, RevocationList2023
//! credential status entries, and issuer trust decisions based on on-chain
//! chains of trust.
//!
//! Resolution of DID documents and trust chains, as well as JSON-LD
//! canonicalization, are pluggable: embedders supply a
//! [`did_resolve::DIDResolver`] for their chain and a
//! [`jsonld::Canonicalizer`] for their canonicalization algorithm.

pub mod caip10;
pub mod datetime;
pub mod did;
pub mod did_resolve;
pub mod error;
pub mod jsonld;
pub mod jws;
pub mod keccak_hash;
pub mod ldp;
pub mod one_or_many;
pub mod revocation;
pub mod vc;

pub use error::Error;
pub use one_or_many::OneOrMany;
