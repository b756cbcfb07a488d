//! Transport encoding for big unsigned integers.
//!
//! Public DH values cross the relay as base64 of their minimal big-endian
//! byte representation. The encoding is exact: `decode(encode(x)) == x` for
//! every non-negative integer.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use num_bigint::BigUint;
use thiserror::Error;

/// Errors from decoding a transport-encoded key value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input is not valid base64 or decodes to an empty byte sequence.
    #[error("malformed key encoding: {reason}")]
    MalformedKeyEncoding {
        /// Why the input was rejected.
        reason: String,
    },
}

/// Encode a big unsigned integer as base64 of its big-endian bytes.
///
/// Zero still produces one byte (`num-bigint` renders zero as `[0]`), so
/// every value has a non-empty encoding.
pub fn encode_biguint(value: &BigUint) -> String {
    STANDARD.encode(value.to_bytes_be())
}

/// Decode a base64 transport string back into a big unsigned integer.
///
/// # Errors
///
/// Returns [`CodecError::MalformedKeyEncoding`] when the input is not valid
/// base64 or decodes to zero bytes.
pub fn decode_biguint(text: &str) -> Result<BigUint, CodecError> {
    let bytes = STANDARD
        .decode(text)
        .map_err(|e| CodecError::MalformedKeyEncoding { reason: e.to_string() })?;

    if bytes.is_empty() {
        return Err(CodecError::MalformedKeyEncoding {
            reason: "decoded to an empty byte sequence".to_string(),
        });
    }

    Ok(BigUint::from_bytes_be(&bytes))
}

#[cfg(test)]
mod tests {
    use num_traits::Zero;

    use super::*;

    #[test]
    fn zero_roundtrips_with_nonempty_encoding() {
        let zero = BigUint::zero();
        let encoded = encode_biguint(&zero);

        assert!(!encoded.is_empty());
        assert_eq!(decode_biguint(&encoded).unwrap(), zero);
    }

    #[test]
    fn small_values_roundtrip() {
        for n in [1u32, 2, 255, 256, 65_535, 1_000_000] {
            let value = BigUint::from(n);
            let decoded = decode_biguint(&encode_biguint(&value)).unwrap();
            assert_eq!(decoded, value, "roundtrip failed for {n}");
        }
    }

    #[test]
    fn large_value_roundtrips() {
        // 2048-bit value with a leading high byte
        let value = BigUint::from_bytes_be(&[0xFF; 256]);
        assert_eq!(decode_biguint(&encode_biguint(&value)).unwrap(), value);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let result = decode_biguint("not!!valid@@base64");
        assert!(matches!(result, Err(CodecError::MalformedKeyEncoding { .. })));
    }

    #[test]
    fn empty_input_is_rejected() {
        // "" is valid base64 but decodes to zero bytes
        let result = decode_biguint("");
        assert!(matches!(result, Err(CodecError::MalformedKeyEncoding { .. })));
    }

    #[test]
    fn encoding_is_minimal_big_endian() {
        // 0x0100 = 256 must encode as exactly two bytes, no leading zeros
        let encoded = encode_biguint(&BigUint::from(256u32));
        let raw = STANDARD.decode(encoded).unwrap();
        assert_eq!(raw, vec![0x01, 0x00]);
    }
}
