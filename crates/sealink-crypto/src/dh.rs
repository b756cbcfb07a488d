//! Diffie-Hellman key pairs over a fixed modular group.
//!
//! A [`KeyPair`] is created fresh per handshake attempt. The secret exponent
//! never leaves this module: it is not serializable, its `Debug` output is
//! redacted, and it is overwritten with zero when the pair is dropped or
//! consumed by [`KeyPair::into_shared_secret`].

use std::fmt;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors from key generation and shared-secret computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyExchangeError {
    /// The OS entropy source is unavailable. Fatal for the handshake; key
    /// generation is never downgraded to a non-cryptographic source.
    #[error("insufficient entropy: OS random source unavailable")]
    InsufficientEntropy,

    /// The peer's public value lies in a trivial subgroup (`0`, `1` or
    /// `p-1`) and would make the shared secret predictable.
    #[error("invalid peer key: value lies in a trivial subgroup")]
    InvalidPeerKey,
}

/// Fixed `(modulus, generator)` parameters for the exchange.
///
/// A pre-agreed system constant shared by both parties, not negotiated per
/// handshake. Production deployments use [`DhGroup::rfc3526_group14`]
/// (2048-bit modulus); smaller groups are only suitable for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhGroup {
    modulus: BigUint,
    generator: BigUint,
}

/// RFC 3526 group 14: 2048-bit MODP prime.
const MODP_2048_HEX: &[u8] = b"\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E08\
8A67CC74020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B\
302B0A6DF25F14374FE1356D6D51C245E485B576625E7EC6F44C42E9\
A637ED6B0BFF5CB6F406B7EDEE386BFB5A899FA5AE9F24117C4B1FE6\
49286651ECE45B3DC2007CB8A163BF0598DA48361C55D39A69163FA8\
FD24CF5F83655D23DCA3AD961C62F356208552BB9ED529077096966D\
670C354E4ABC9804F1746C08CA18217C32905E462E36CE3BE39E772C\
180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFF\
FFFFFFFF";

impl DhGroup {
    /// Create a group from explicit parameters.
    pub fn new(modulus: BigUint, generator: BigUint) -> Self {
        Self { modulus, generator }
    }

    /// The RFC 3526 2048-bit MODP group (group 14), generator 2.
    ///
    /// The default production group; large enough to resist discrete-log
    /// attacks on the exchanged values.
    #[allow(clippy::expect_used)]
    pub fn rfc3526_group14() -> Self {
        let modulus = BigUint::parse_bytes(MODP_2048_HEX, 16)
            .expect("invariant: RFC 3526 modulus constant is valid hex");
        Self { modulus, generator: BigUint::from(2u32) }
    }

    /// The group modulus `p`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// The group generator `g`.
    pub fn generator(&self) -> &BigUint {
        &self.generator
    }
}

/// Shared secret derived from one local key pair and one peer public value.
///
/// Equal on both ends by DH commutativity: `(g^a)^b == (g^b)^a (mod p)`.
/// Scoped per chat and held in memory; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(BigUint);

impl SharedSecret {
    /// The secret as a big unsigned integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Big-endian bytes of the secret, for downstream key derivation.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.set_zero();
    }
}

/// Ephemeral private/public key pair for one handshake attempt.
pub struct KeyPair {
    private_exponent: BigUint,
    public_value: BigUint,
}

impl KeyPair {
    /// Generate a key pair from OS entropy.
    ///
    /// Draws `bit_length` bits and reduces them into `[2, p-2]`, avoiding
    /// the degenerate exponents `0` and `1`. The public value is
    /// `g^a mod p`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyExchangeError::InsufficientEntropy`] if the OS entropy
    /// source fails.
    pub fn generate(group: &DhGroup, bit_length: usize) -> Result<Self, KeyExchangeError> {
        let mut buf = Zeroizing::new(vec![0u8; bit_length.div_ceil(8)]);
        getrandom::fill(&mut buf).map_err(|_| KeyExchangeError::InsufficientEntropy)?;
        Ok(Self::from_entropy(group, &buf))
    }

    /// Generate a key pair from a caller-supplied cryptographic RNG.
    ///
    /// Same reduction as [`KeyPair::generate`]; used with a seeded RNG for
    /// deterministic tests.
    pub fn generate_with_rng<R>(group: &DhGroup, bit_length: usize, rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng,
    {
        let mut buf = Zeroizing::new(vec![0u8; bit_length.div_ceil(8)]);
        rng.fill_bytes(&mut buf);
        Self::from_entropy(group, &buf)
    }

    /// Reduce raw entropy into an exponent in `[2, p-2]` and derive the
    /// public value.
    fn from_entropy(group: &DhGroup, entropy: &[u8]) -> Self {
        let raw = BigUint::from_bytes_be(entropy);
        // span = p - 3, so 2 + (raw mod span) lies in [2, p-2]
        let span = group.modulus() - BigUint::from(3u32);
        let private_exponent = BigUint::from(2u32) + raw % span;
        let public_value = group.generator().modpow(&private_exponent, group.modulus());
        Self { private_exponent, public_value }
    }

    /// The shareable public value `g^a mod p`.
    pub fn public_value(&self) -> &BigUint {
        &self.public_value
    }

    /// Compute the shared secret from the peer's public value, consuming
    /// the pair.
    ///
    /// Consumption enforces the one-handshake lifetime of the private
    /// exponent: it is zeroed when the pair drops at the end of this call,
    /// on both the success and the rejection path.
    ///
    /// # Errors
    ///
    /// Returns [`KeyExchangeError::InvalidPeerKey`] unless
    /// `1 < peer < p - 1`.
    pub fn into_shared_secret(
        self,
        group: &DhGroup,
        peer_public: &BigUint,
    ) -> Result<SharedSecret, KeyExchangeError> {
        let one = BigUint::one();
        let upper = group.modulus() - &one;

        if peer_public <= &one || peer_public >= &upper {
            return Err(KeyExchangeError::InvalidPeerKey);
        }

        Ok(SharedSecret(peer_public.modpow(&self.private_exponent, group.modulus())))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_exponent", &"<redacted>")
            .field("public_value", &self.public_value)
            .finish()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        // Best-effort clear: the stored value is overwritten with zero on
        // every exit path. num-bigint offers no in-place scrub of freed
        // limbs, so the raw entropy buffer above is the Zeroizing one.
        self.private_exponent.set_zero();
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    /// Small test group: p = 23, g = 5.
    fn tiny_group() -> DhGroup {
        DhGroup::new(BigUint::from(23u32), BigUint::from(5u32))
    }

    fn pair_with_exponent(group: &DhGroup, exponent: u32) -> KeyPair {
        let private_exponent = BigUint::from(exponent);
        let public_value = group.generator().modpow(&private_exponent, group.modulus());
        KeyPair { private_exponent, public_value }
    }

    #[test]
    fn known_exchange_in_tiny_group() {
        let group = tiny_group();

        // a = 6: 5^6 mod 23 = 8; b = 15: 5^15 mod 23 = 19
        let alice = pair_with_exponent(&group, 6);
        let bob = pair_with_exponent(&group, 15);

        assert_eq!(alice.public_value(), &BigUint::from(8u32));
        assert_eq!(bob.public_value(), &BigUint::from(19u32));

        let bob_public = bob.public_value().clone();
        let alice_public = alice.public_value().clone();

        let secret_a = alice.into_shared_secret(&group, &bob_public).unwrap();
        let secret_b = bob.into_shared_secret(&group, &alice_public).unwrap();

        assert_eq!(secret_a, secret_b);
        assert_eq!(secret_a.as_biguint(), &BigUint::from(2u32));
    }

    #[test]
    fn trivial_peer_values_are_rejected() {
        let group = tiny_group();
        let p_minus_1 = group.modulus() - BigUint::one();

        for peer in [BigUint::zero(), BigUint::one(), p_minus_1] {
            let pair = pair_with_exponent(&group, 6);
            let result = pair.into_shared_secret(&group, &peer);
            assert_eq!(result, Err(KeyExchangeError::InvalidPeerKey), "peer {peer} accepted");
        }
    }

    #[test]
    fn modulus_itself_is_rejected() {
        let group = tiny_group();
        let pair = pair_with_exponent(&group, 6);
        let result = pair.into_shared_secret(&group, group.modulus());
        assert_eq!(result, Err(KeyExchangeError::InvalidPeerKey));
    }

    #[test]
    fn generated_exponent_stays_in_range() {
        let group = tiny_group();
        let mut rng = ChaCha20Rng::seed_from_u64(7);

        for _ in 0..200 {
            let pair = KeyPair::generate_with_rng(&group, 64, &mut rng);
            let two = BigUint::from(2u32);
            let upper = group.modulus() - two.clone();
            assert!(pair.private_exponent >= two);
            assert!(pair.private_exponent <= upper);
        }
    }

    #[test]
    fn generated_public_matches_exponent() {
        let group = tiny_group();
        let mut rng = ChaCha20Rng::seed_from_u64(11);

        let pair = KeyPair::generate_with_rng(&group, 64, &mut rng);
        let expected = group.generator().modpow(&pair.private_exponent, group.modulus());
        assert_eq!(pair.public_value(), &expected);
    }

    #[test]
    fn symmetry_in_production_group() {
        let group = DhGroup::rfc3526_group14();
        let mut rng = ChaCha20Rng::seed_from_u64(42);

        // 256-bit exponents keep the test fast; the modulus is still the
        // full 2048-bit prime.
        let alice = KeyPair::generate_with_rng(&group, 256, &mut rng);
        let bob = KeyPair::generate_with_rng(&group, 256, &mut rng);

        let bob_public = bob.public_value().clone();
        let alice_public = alice.public_value().clone();

        let secret_a = alice.into_shared_secret(&group, &bob_public).unwrap();
        let secret_b = bob.into_shared_secret(&group, &alice_public).unwrap();

        assert_eq!(secret_a, secret_b, "both ends must derive the same secret");
    }

    #[test]
    fn group14_parses_to_2048_bits() {
        let group = DhGroup::rfc3526_group14();
        assert_eq!(group.modulus().bits(), 2048);
        assert_eq!(group.generator(), &BigUint::from(2u32));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let group = tiny_group();
        let pair = pair_with_exponent(&group, 6);

        let rendered = format!("{pair:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains('6'), "private exponent leaked: {rendered}");

        let secret = pair.into_shared_secret(&group, &BigUint::from(19u32)).unwrap();
        assert_eq!(format!("{secret:?}"), "SharedSecret(<redacted>)");
    }
}
