//! Property-based tests for the codec and the key exchange.

use num_bigint::BigUint;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sealink_crypto::{DhGroup, KeyPair, decode_biguint, encode_biguint};

proptest! {
    /// decode(encode(x)) == x for arbitrary non-negative integers.
    #[test]
    fn codec_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let value = BigUint::from_bytes_be(&bytes);
        let decoded = decode_biguint(&encode_biguint(&value)).unwrap();
        prop_assert_eq!(decoded, value);
    }

    /// Round-trip also holds for machine-word sized values.
    #[test]
    fn codec_roundtrip_u128(n in any::<u128>()) {
        let value = BigUint::from(n);
        let decoded = decode_biguint(&encode_biguint(&value)).unwrap();
        prop_assert_eq!(decoded, value);
    }

    /// Garbage input never panics, it either decodes or errors.
    #[test]
    fn decode_arbitrary_strings_never_panics(text in ".{0,128}") {
        let _ = decode_biguint(&text);
    }
}

proptest! {
    // Modular exponentiation over the 2048-bit group dominates runtime;
    // a reduced case count keeps the property meaningful and the suite fast.
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Independently generated pairs always derive the same shared secret.
    #[test]
    fn shared_secret_is_symmetric(seed in any::<u64>()) {
        let group = DhGroup::rfc3526_group14();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        let alice = KeyPair::generate_with_rng(&group, 256, &mut rng);
        let bob = KeyPair::generate_with_rng(&group, 256, &mut rng);

        let bob_public = bob.public_value().clone();
        let alice_public = alice.public_value().clone();

        let secret_a = alice.into_shared_secret(&group, &bob_public).unwrap();
        let secret_b = bob.into_shared_secret(&group, &alice_public).unwrap();

        prop_assert_eq!(secret_a, secret_b);
    }

    /// Public values survive the transport encoding unchanged.
    #[test]
    fn public_value_roundtrips_through_transport(seed in any::<u64>()) {
        let group = DhGroup::rfc3526_group14();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        let pair = KeyPair::generate_with_rng(&group, 256, &mut rng);
        let decoded = decode_biguint(&encode_biguint(pair.public_value())).unwrap();
        prop_assert_eq!(&decoded, pair.public_value());
    }
}
