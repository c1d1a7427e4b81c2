// Copyright (c) Contributors to the contract-executor project.
// SPDX-License-Identifier: Apache-2.0

//! Keys used to sign and verify gossiped opinions (spec §3 "Opinions" /
//! §6 "Opinion wire format"). Mirrors the narrow-alias style of the
//! teacher's `consensus-config::crypto`: callers only ever see
//! `ExecutorKeyPair`/`ExecutorVerifyingKey`, never the underlying
//! `ed25519_dalek` types directly.

use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signature as DalekSignature, Signer, Verifier};
use executor_types::{ExecutorKey, Signature};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed executor public key")]
    InvalidPublicKey,
    #[error("malformed signature")]
    InvalidSignature,
    #[error("malformed private key")]
    InvalidPrivateKey,
    #[error("signature verification failed")]
    VerificationFailed,
}

/// An executor's signing identity for this contract.
pub struct ExecutorKeyPair(Keypair);

impl ExecutorKeyPair {
    pub fn generate() -> Self {
        let mut csprng = rand_core::OsRng;
        Self(Keypair::generate(&mut csprng))
    }

    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public = PublicKey::from(&secret);
        Ok(Self(Keypair { secret, public }))
    }

    pub fn public_key(&self) -> ExecutorKey {
        ExecutorKey(self.0.public.to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message).to_bytes())
    }
}

/// Verify `signature` over `message` under the claimed `public_key`.
pub fn verify(public_key: ExecutorKey, message: &[u8], signature: Signature) -> Result<(), CryptoError> {
    let pk = PublicKey::from_bytes(public_key.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)?;
    let sig = DalekSignature::from_bytes(signature.as_ref()).map_err(|_| CryptoError::InvalidSignature)?;
    pk.verify(message, &sig).map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let keys = ExecutorKeyPair::generate();
        let msg = b"batch opinion bytes";
        let sig = keys.sign(msg);
        verify(keys.public_key(), msg, sig).expect("signature should verify");
    }

    #[test]
    fn tampered_message_fails_verification() {
        let keys = ExecutorKeyPair::generate();
        let sig = keys.sign(b"original");
        assert!(verify(keys.public_key(), b"tampered", sig).is_err());
    }
}
