//! Crypto runtime precondition check.
//!
//! Run once before any subsystem starts: generates an ephemeral ed25519
//! keypair, signs a SHA-256 digest and verifies it. If the provider is
//! broken (missing algorithm, restricted policy, bad RNG) this fails fast so
//! startup can abort into a graceful shutdown instead of limping along with
//! unusable signing.

use ed25519_dalek::{Signer, SigningKey, Verifier};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::AppError;

const SELF_TEST_MESSAGE: &[u8] = b"statnode crypto self-test";

/// Verify that signing and hashing work in this process.
pub fn check_crypto_setup() -> Result<(), AppError> {
    let signing_key = SigningKey::generate(&mut OsRng);
    let digest = Sha256::digest(SELF_TEST_MESSAGE);

    let signature = signing_key
        .try_sign(&digest)
        .map_err(|e| AppError::Crypto(format!("ed25519 signing unavailable: {e}")))?;

    signing_key
        .verifying_key()
        .verify(&digest, &signature)
        .map_err(|e| AppError::Crypto(format!("ed25519 verification failed: {e}")))?;

    debug!(
        fingerprint = %hex::encode(&Sha256::digest(signing_key.verifying_key().as_bytes())[..4]),
        "crypto self-test passed"
    );
    Ok(())
}
