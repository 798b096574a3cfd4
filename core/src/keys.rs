// Copyright (c) 2022-2023 The MobileCoin Foundation

//! P-256 key agreement and signing
//!
//! A fresh [AssociationKeypair] is generated per connection attempt,
//! its public key is embedded in the association URI and the private key
//! signs the ephemeral ECDH key sent in `HELLO_REQ`.

use p256::{
    ecdh::EphemeralSecret,
    ecdsa::{
        signature::{Signer, Verifier},
        Signature, SigningKey, VerifyingKey,
    },
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey,
};
use rand_core::CryptoRngCore;

use mwa_proto::{handshake::HelloReq, PUBLIC_KEY_LEN, SIGNATURE_LEN};

use crate::{cipher::SharedSecret, Error};

/// Association (ECDSA) keypair, never persisted or reused
pub struct AssociationKeypair {
    signing: SigningKey,
}

impl AssociationKeypair {
    /// Generate a new association keypair
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        Self {
            signing: SigningKey::random(rng),
        }
    }

    /// Fetch the uncompressed SEC1 encoded public key
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        encode_point(&PublicKey::from(self.signing.verifying_key()))
    }

    /// Sign a message, returning a raw `r || s` signature
    pub fn sign(&self, msg: &[u8]) -> [u8; SIGNATURE_LEN] {
        let s: Signature = self.signing.sign(msg);

        let mut b = [0u8; SIGNATURE_LEN];
        b.copy_from_slice(&s.to_bytes());
        b
    }

    /// Build a signed `HELLO_REQ` for the provided ephemeral public key
    pub fn hello(&self, ephemeral_public: &[u8; PUBLIC_KEY_LEN]) -> HelloReq {
        HelloReq {
            public_key: *ephemeral_public,
            signature: self.sign(ephemeral_public),
        }
    }
}

impl core::fmt::Debug for AssociationKeypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AssociationKeypair({:02x?})", &self.public_key()[..8])
    }
}

/// Ephemeral ECDH keypair used for a single handshake
pub struct EphemeralKeypair {
    secret: EphemeralSecret,
    public: [u8; PUBLIC_KEY_LEN],
}

impl EphemeralKeypair {
    /// Generate a new ephemeral keypair
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        let secret = EphemeralSecret::random(rng);
        let public = encode_point(&secret.public_key());
        Self { secret, public }
    }

    /// Fetch the uncompressed SEC1 encoded public key
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public
    }

    /// Complete key agreement with the peer's ephemeral key, deriving the
    /// session key salted with the association public key
    pub fn agree(
        &self,
        peer_public: &[u8],
        association_public: &[u8; PUBLIC_KEY_LEN],
    ) -> Result<SharedSecret, Error> {
        let peer = PublicKey::from_sec1_bytes(peer_public).map_err(|_| Error::InvalidKey)?;
        let shared = self.secret.diffie_hellman(&peer);

        SharedSecret::derive(shared.raw_secret_bytes().as_slice(), association_public)
    }
}

impl core::fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "EphemeralKeypair({:02x?})", &self.public[..8])
    }
}

/// Verify a `HELLO_REQ` against the association public key (wallet side)
pub fn verify_hello(association_public: &[u8], hello: &HelloReq) -> Result<(), Error> {
    let key = VerifyingKey::from_sec1_bytes(association_public).map_err(|_| Error::InvalidKey)?;
    let sig = Signature::from_slice(&hello.signature).map_err(|_| Error::InvalidSignature)?;

    key.verify(&hello.public_key, &sig)
        .map_err(|_| Error::InvalidSignature)
}

fn encode_point(p: &PublicKey) -> [u8; PUBLIC_KEY_LEN] {
    let e = p.to_encoded_point(false);

    let mut b = [0u8; PUBLIC_KEY_LEN];
    b.copy_from_slice(e.as_bytes());
    b
}
