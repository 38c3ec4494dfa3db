//! Ethereum account address derivation from secp256k1 keys.

use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use keccak_hash::keccak;

use crate::error::Error;

pub fn bytes_to_lowerhex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Derive the Ethereum account address of a public key: the last 20 bytes of
/// the Keccak-256 hash of the uncompressed SEC1 point without its `0x04` tag,
/// as a lowercase `0x` hex string.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Result<String, Error> {
    let public_key = k256::PublicKey::from_sec1_bytes(&key.to_bytes())
        .map_err(|_| Error::InvalidArgument("The public key is not a valid SEC1 point".to_string()))?;
    let point = public_key.to_encoded_point(false);
    let point_bytes = point.as_bytes();
    let hash = keccak(&point_bytes[1..65]).to_fixed_bytes();
    Ok(bytes_to_lowerhex(&hash[12..32]))
}

/// Derive the Ethereum account address controlled by a 32-byte secret key.
pub fn address_from_secret_key(secret_key: &[u8]) -> Result<String, Error> {
    let signing_key = SigningKey::from_bytes(secret_key)?;
    address_from_verifying_key(&signing_key.verify_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_address() {
        // Key pair from the EcdsaSecp256k1RecoverySignature2020 test vectors.
        let secret_key =
            hex::decode("278a5de700e29faae8e40e366ec5012b5ec63d36ec77e8a2417154cc1d25383f")
                .unwrap();
        let address = address_from_secret_key(&secret_key).unwrap();
        assert_eq!(address, "0xf3beac30c498d9e26865f34fcaa57dbb935b0d74");
    }

    #[test]
    fn lowerhex() {
        assert_eq!(bytes_to_lowerhex(&[0xab, 0x00, 0x12]), "0xab0012");
    }
}
