//! Detached JWS with unencoded payload, as used by the
//! EcdsaSecp256k1RecoverySignature2020 proof suite.
//!
//! This is not standard compact JWS: the payload is detached and *not*
//! base64url-encoded (RFC 7797 `b64: false`), the middle segment is empty,
//! and the signature is the 65-byte Ethereum-style recoverable form
//! `r || s || (recovery_id + 27)`. Verification recovers the signer's
//! account address from the signature instead of taking a public key.
//
// RFC 7515 - JSON Web Signature (JWS)
// RFC 7797 - JSON Web Signature (JWS) Unencoded Payload Option

use std::convert::TryFrom;

use k256::ecdsa::signature::DigestSigner;
use k256::ecdsa::{recoverable, SigningKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::keccak_hash::address_from_verifying_key;

pub const JWS_ALGORITHM: &str = "ES256K-R";

const SIGNATURE_LENGTH: usize = 65;

/// The JOSE header of an unencoded-payload JWS. Exactly these three
/// parameters are legal; `deny_unknown_fields` also rejects duplicates.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Header {
    pub alg: String,
    pub b64: bool,
    pub crit: Vec<String>,
}

impl Header {
    fn unencoded_payload() -> Self {
        Header {
            alg: JWS_ALGORITHM.to_string(),
            b64: false,
            crit: vec!["b64".to_string()],
        }
    }
}

/// The decoded parts of a detached unencoded-payload JWS.
#[derive(Debug, Clone)]
pub struct DecodedJws {
    pub encoded_header: String,
    pub header: Header,
    /// The middle segment. Empty for a detached payload.
    pub payload: String,
    /// 65 bytes: `r || s || v` with `v = recovery_id + 27`.
    pub signature: Vec<u8>,
}

fn base64_url_encode(data: impl AsRef<[u8]>) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Sign `payload` with a 32-byte secp256k1 secret key, producing
/// `headerB64..signatureB64`.
pub fn encode(payload: &str, private_key: &[u8]) -> Result<String, Error> {
    let header_json = serde_json::to_string(&Header::unencoded_payload())?;
    let encoded_header = base64_url_encode(header_json);

    // The payload is not re-encoded: unencoded payload per RFC 7797.
    let signing_input = format!("{}.{}", encoded_header, payload);
    let digest = Sha256::new().chain(signing_input.as_bytes());

    let signing_key = SigningKey::from_bytes(private_key)?;
    let signature: recoverable::Signature = signing_key.try_sign_digest(digest)?;
    let signature_bytes = signature.as_ref();

    let mut wire_signature = signature_bytes[..64].to_vec();
    wire_signature.push(signature_bytes[64] + 27);

    Ok(format!(
        "{}..{}",
        encoded_header,
        base64_url_encode(&wire_signature)
    ))
}

/// Decode and validate a detached JWS without verifying its signature.
pub fn decode(jws: &str) -> Result<DecodedJws, Error> {
    let segments: Vec<&str> = jws.split('.').collect();
    if segments.len() != 3 {
        return Err(Error::invalid_jws(
            "The specified JWS does not contain three parts",
        ));
    }
    let encoded_header = segments[0];
    let encoded_signature = segments[2];

    let header_bytes = base64::decode_config(encoded_header, base64::URL_SAFE_NO_PAD)
        .map_err(|e| Error::invalid_jws_caused("Invalid JWS encoding", e.into()))?;
    let header_value: Value = serde_json::from_slice(&header_bytes)
        .map_err(|e| Error::invalid_jws_caused("The JWS header is not a valid JSON object", e.into()))?;
    let header_object = header_value
        .as_object()
        .ok_or_else(|| Error::invalid_jws("The JWS header is not a JSON object"))?;
    if header_object.len() != 3 {
        return Err(Error::invalid_jws(format!(
            "The JWS header object must contain exactly 3 fields, but {} {} present",
            header_object.len(),
            if header_object.len() == 1 { "is" } else { "are" }
        )));
    }
    for parameter in ["alg", "crit", "b64"] {
        if !header_object.contains_key(parameter) {
            return Err(Error::invalid_jws(format!(
                "The JWS header does not contain the '{}' Header Parameter",
                parameter
            )));
        }
    }
    if !header_object["alg"].is_string() {
        return Err(Error::invalid_jws(
            "The 'alg' JWS Header Parameter must be a string",
        ));
    }
    if !header_object["crit"].is_array() {
        return Err(Error::invalid_jws(
            "The 'crit' JWS Header Parameter must be an array of strings",
        ));
    }
    if !header_object["b64"].is_boolean() {
        return Err(Error::invalid_jws(
            "The 'b64' JWS Header Parameter must be a boolean value",
        ));
    }
    // Re-parse as the typed header. The shape checks above have passed, so
    // the only remaining failure mode is a duplicated Header Parameter
    // (serde_json collapses duplicates inside a Value).
    let header: Header = serde_json::from_slice(&header_bytes)
        .map_err(|e| Error::invalid_jws_caused("The JWS header contains duplicated keys", e.into()))?;

    if header.alg != JWS_ALGORITHM {
        return Err(Error::invalid_jws(format!(
            "Unsupported JWS signing algorithm '{}'. Only {} is supported",
            header.alg, JWS_ALGORITHM
        )));
    }
    if header.crit.len() != 1 || header.crit[0] != "b64" {
        return Err(Error::invalid_jws(
            "The 'crit' Header Parameter of the JWS must contain only the value \"b64\"",
        ));
    }
    if header.b64 {
        return Err(Error::invalid_jws(
            "The JWS must use the unencoded payload option",
        ));
    }

    let signature = base64::decode_config(encoded_signature, base64::URL_SAFE_NO_PAD)
        .map_err(|e| Error::invalid_jws_caused("Invalid JWS encoding", e.into()))?;
    if signature.len() != SIGNATURE_LENGTH {
        return Err(Error::invalid_jws(
            "The JWS signature must be 65 bytes long",
        ));
    }

    Ok(DecodedJws {
        encoded_header: encoded_header.to_string(),
        header,
        payload: segments[1].to_string(),
        signature,
    })
}

/// Recover the account address that signed `signing_input`.
fn recover_address(signing_input: &str, signature: &[u8]) -> Result<String, Error> {
    let recovery_byte = signature[SIGNATURE_LENGTH - 1];
    let recovery_id = recovery_byte.checked_sub(27).ok_or_else(|| {
        Error::invalid_jws("The JWS signature recovery identifier is out of range")
    })?;
    let id = recoverable::Id::new(recovery_id)?;
    let inner = k256::ecdsa::Signature::try_from(&signature[..64])?;
    let recoverable_signature = recoverable::Signature::new(&inner, id)?;
    let digest = Sha256::new().chain(signing_input.as_bytes());
    let verifying_key = recoverable_signature.recover_verify_key_from_digest(digest)?;
    address_from_verifying_key(&verifying_key)
}

/// Verify a detached JWS over `payload`, checking that the recovered signer
/// address equals `expected_signer_address` (case-insensitively).
pub fn verify(jws: &str, payload: &str, expected_signer_address: &str) -> Result<(), Error> {
    let decoded = decode(jws)?;
    let signing_input = format!("{}.{}", decoded.encoded_header, payload);
    let signing_account = recover_address(&signing_input, &decoded.signature).map_err(|e| match e
    {
        already_jws @ Error::InvalidJws { .. } => already_jws,
        other => Error::invalid_jws_caused("The JWS signature cannot be verified", other),
    })?;
    if !signing_account.eq_ignore_ascii_case(expected_signer_address) {
        return Err(Error::invalid_jws(
            "The account that has signed the JWS is not the expected one",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keccak_hash::address_from_secret_key;

    const PAYLOAD: &str = "<did:ssi-cot-eth:1337:0000> <http://example.org/p> \"o\" .\n";

    fn secret_key() -> Vec<u8> {
        hex::decode("278a5de700e29faae8e40e366ec5012b5ec63d36ec77e8a2417154cc1d25383f").unwrap()
    }

    #[test]
    fn encode_decode_round_trip() {
        let jws = encode(PAYLOAD, &secret_key()).unwrap();
        let decoded = decode(&jws).unwrap();
        assert_eq!(decoded.header.alg, "ES256K-R");
        assert_eq!(decoded.header.crit, vec!["b64".to_string()]);
        assert!(!decoded.header.b64);
        assert_eq!(decoded.payload, "");
        assert_eq!(decoded.signature.len(), 65);
        assert!(decoded.signature[64] == 27 || decoded.signature[64] == 28);
    }

    #[test]
    fn verify_round_trip() {
        let key = secret_key();
        let address = address_from_secret_key(&key).unwrap();
        let jws = encode(PAYLOAD, &key).unwrap();
        verify(&jws, PAYLOAD, &address).unwrap();
        // Checksummed case must also be accepted.
        verify(&jws, PAYLOAD, &address.to_uppercase().replace("0X", "0x")).unwrap();
    }

    #[test]
    fn tampered_signature_rejected() {
        let key = secret_key();
        let address = address_from_secret_key(&key).unwrap();
        let jws = encode(PAYLOAD, &key).unwrap();
        let (head, sig_b64) = jws.rsplit_once('.').unwrap();
        let mut sig = base64::decode_config(sig_b64, base64::URL_SAFE_NO_PAD).unwrap();
        sig[10] ^= 0x01;
        let tampered = format!(
            "{}.{}",
            head,
            base64::encode_config(&sig, base64::URL_SAFE_NO_PAD)
        );
        let err = verify(&tampered, PAYLOAD, &address).unwrap_err();
        assert!(matches!(err, Error::InvalidJws { .. }));
    }

    #[test]
    fn wrong_payload_rejected() {
        let key = secret_key();
        let address = address_from_secret_key(&key).unwrap();
        let jws = encode(PAYLOAD, &key).unwrap();
        verify(&jws, "something else", &address).unwrap_err();
    }

    #[test]
    fn wrong_signer_rejected() {
        let jws = encode(PAYLOAD, &secret_key()).unwrap();
        let err = verify(
            &jws,
            PAYLOAD,
            "0x0000000000000000000000000000000000000000",
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("is not the expected one"));
    }

    fn jws_with_header(header_json: &str) -> String {
        let header_b64 = base64::encode_config(header_json, base64::URL_SAFE_NO_PAD);
        let sig_b64 = base64::encode_config(&[0u8; 65][..], base64::URL_SAFE_NO_PAD);
        format!("{}..{}", header_b64, sig_b64)
    }

    #[test]
    fn segment_count_enforced() {
        decode("onlyonepart").unwrap_err();
        decode("a.b").unwrap_err();
        decode("a.b.c.d").unwrap_err();
    }

    #[test]
    fn encoded_payload_rejected() {
        let err =
            decode(&jws_with_header("{\"alg\":\"ES256K-R\",\"b64\":true,\"crit\":[\"b64\"]}"))
                .unwrap_err();
        assert!(err.to_string().contains("unencoded payload"));
    }

    #[test]
    fn unsupported_algorithm_rejected() {
        decode(&jws_with_header("{\"alg\":\"ES256K\",\"b64\":false,\"crit\":[\"b64\"]}"))
            .unwrap_err();
    }

    #[test]
    fn extra_header_parameter_rejected() {
        decode(&jws_with_header(
            "{\"alg\":\"ES256K-R\",\"b64\":false,\"crit\":[\"b64\"],\"kid\":\"k\"}",
        ))
        .unwrap_err();
    }

    #[test]
    fn missing_header_parameter_rejected() {
        let err = decode(&jws_with_header("{\"alg\":\"ES256K-R\",\"b64\":false}")).unwrap_err();
        assert!(err.to_string().contains("exactly 3 fields"));
    }

    #[test]
    fn duplicated_header_parameter_rejected() {
        let err = decode(&jws_with_header(
            "{\"alg\":\"ES256K-R\",\"alg\":\"ES256K-R\",\"b64\":false,\"crit\":[\"b64\"]}",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("duplicated"));
    }

    #[test]
    fn bad_crit_rejected() {
        decode(&jws_with_header(
            "{\"alg\":\"ES256K-R\",\"b64\":false,\"crit\":[\"b64\",\"alg\"]}",
        ))
        .unwrap_err();
        decode(&jws_with_header("{\"alg\":\"ES256K-R\",\"b64\":false,\"crit\":[]}")).unwrap_err();
    }

    #[test]
    fn short_signature_rejected() {
        let header_b64 = base64::encode_config(
            "{\"alg\":\"ES256K-R\",\"b64\":false,\"crit\":[\"b64\"]}",
            base64::URL_SAFE_NO_PAD,
        );
        let sig_b64 = base64::encode_config(&[0u8; 64][..], base64::URL_SAFE_NO_PAD);
        let err = decode(&format!("{}..{}", header_b64, sig_b64)).unwrap_err();
        assert!(err.to_string().contains("65 bytes"));
    }
}
