//! Sealink Key Exchange Primitives
//!
//! Diffie-Hellman building blocks for establishing a per-chat shared secret
//! over an untrusted relay. Pure integer arithmetic with no I/O; callers may
//! provide their own RNG for deterministic testing.
//!
//! # Protocol
//!
//! Both parties agree on a fixed group `(p, g)` out of band. Each party draws
//! an ephemeral secret exponent and publishes `g^a mod p` through the relay.
//! The shared secret is derived from the peer's published value:
//!
//! ```text
//! Fixed Group (p, g)
//!        │
//!        ▼
//! KeyPair::generate → (a, g^a mod p)
//!        │
//!        ▼
//! Relay exchange of public values (base64 of big-endian bytes)
//!        │
//!        ▼
//! KeyPair::into_shared_secret → (g^b)^a mod p == (g^a)^b mod p
//! ```
//!
//! The relay only ever sees the public values. The secret exponent lives in
//! memory for the lifetime of one handshake and is cleared on drop.
//!
//! # Security
//!
//! - Exponents are drawn from OS entropy; an unavailable entropy source is a
//!   hard error ([`KeyExchangeError::InsufficientEntropy`]), never a silent
//!   fallback to a weak source.
//! - Peer values `0`, `1` and `p-1` are rejected
//!   ([`KeyExchangeError::InvalidPeerKey`]) since they collapse the secret
//!   into a trivial subgroup.
//! - The group is a system parameter (the default is the RFC 3526 2048-bit
//!   MODP group), not negotiated per handshake.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod dh;

pub use codec::{CodecError, decode_biguint, encode_biguint};
pub use dh::{DhGroup, KeyExchangeError, KeyPair, SharedSecret};
