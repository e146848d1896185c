//! Signed call envelopes: how a caller proves who they are to the token.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{account::Address, contract::Call};

const DOMAIN: &[u8] = b"altarian-call";

/// Random tag drawn when a state file is created. Envelopes are signed for
/// exactly one deployment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(#[serde(with = "hex_id")] [u8; 32]);

impl DeploymentId {
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::fmt::Debug for DeploymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeploymentId({self})")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallEnvelope {
    pub deployment: DeploymentId,
    pub caller: Address,
    pub nonce: u64,
    pub call: Call,
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("caller {0} is not a valid ed25519 key")]
    MalformedKey(Address),
    #[error("malformed signature from {0}")]
    MalformedSignature(Address),
    #[error("invalid signature from {0}")]
    InvalidSignature(Address),
}

impl CallEnvelope {
    /// Signs `call` as the holder of `sk`, for the token behind `deployment`.
    pub fn seal(sk: &SigningKey, deployment: DeploymentId, nonce: u64, call: Call) -> Self {
        let caller = Address::from_verifying_key(&sk.verifying_key());
        let digest = signing_digest(&deployment, &caller, nonce, &call);
        let signature = sk.sign(&digest);
        Self {
            deployment,
            caller,
            nonce,
            call,
            signature: signature.to_bytes().to_vec(),
        }
    }

    /// [`CallEnvelope::seal`] with a random nonce, so that repeating the same
    /// call yields a distinct envelope.
    pub fn seal_random(sk: &SigningKey, deployment: DeploymentId, call: Call) -> Self {
        Self::seal(sk, deployment, OsRng.next_u64(), call)
    }

    /// What the caller signed. Also the replay key: a store never applies the
    /// same digest twice.
    pub fn digest(&self) -> [u8; 32] {
        signing_digest(&self.deployment, &self.caller, self.nonce, &self.call)
    }

    /// Verifies the signature and hands out the authenticated caller.
    pub fn open(self) -> Result<(Address, Call), EnvelopeError> {
        let key = VerifyingKey::from_bytes(self.caller.as_bytes())
            .map_err(|_| EnvelopeError::MalformedKey(self.caller))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| EnvelopeError::MalformedSignature(self.caller))?;
        key.verify_strict(&self.digest(), &signature)
            .map_err(|_| EnvelopeError::InvalidSignature(self.caller))?;
        Ok((self.caller, self.call))
    }
}

fn signing_digest(deployment: &DeploymentId, caller: &Address, nonce: u64, call: &Call) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    hasher.update(deployment.as_bytes());
    hasher.update(caller.as_bytes());
    hasher.update(nonce.to_le_bytes());
    hasher.update(call.commitment());
    hasher.finalize().into()
}

mod hex_id {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&encoded, &mut bytes).map_err(D::Error::custom)?;
        Ok(bytes)
    }
}

mod serde_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERE: DeploymentId = DeploymentId::from_bytes([5; 32]);

    fn keypair() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    fn confirm(id: u64) -> Call {
        Call::ConfirmTransaction { id }
    }

    #[test]
    fn sealed_envelope_opens_to_signer() {
        let sk = keypair();
        let envelope = CallEnvelope::seal(&sk, HERE, 7, confirm(3));
        let (caller, call) = envelope.open().unwrap();
        assert_eq!(caller, Address::from_verifying_key(&sk.verifying_key()));
        assert_eq!(call, confirm(3));
    }

    #[test]
    fn tampered_call_is_rejected() {
        let sk = keypair();
        let mut envelope = CallEnvelope::seal(&sk, HERE, 7, confirm(3));
        envelope.call = confirm(4);
        let caller = envelope.caller;
        assert_eq!(
            envelope.open().unwrap_err(),
            EnvelopeError::InvalidSignature(caller)
        );
    }

    #[test]
    fn foreign_caller_is_rejected() {
        let mut envelope = CallEnvelope::seal(&keypair(), HERE, 7, confirm(3));
        let other = Address::from_verifying_key(&keypair().verifying_key());
        envelope.caller = other;
        assert_eq!(
            envelope.open().unwrap_err(),
            EnvelopeError::InvalidSignature(other)
        );
    }

    #[test]
    fn truncated_signature_is_malformed() {
        let mut envelope = CallEnvelope::seal(&keypair(), HERE, 7, confirm(3));
        envelope.signature.truncate(10);
        let caller = envelope.caller;
        assert_eq!(
            envelope.open().unwrap_err(),
            EnvelopeError::MalformedSignature(caller)
        );
    }

    #[test]
    fn nonce_changes_digest() {
        let sk = keypair();
        let a = CallEnvelope::seal(&sk, HERE, 1, confirm(3));
        let b = CallEnvelope::seal(&sk, HERE, 2, confirm(3));
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn envelope_is_bound_to_its_deployment() {
        let sk = keypair();
        let elsewhere = DeploymentId::from_bytes([6; 32]);
        let here = CallEnvelope::seal(&sk, HERE, 1, confirm(3));
        let there = CallEnvelope::seal(&sk, elsewhere, 1, confirm(3));
        assert_ne!(here.digest(), there.digest());

        let mut moved = here;
        moved.deployment = elsewhere;
        let caller = moved.caller;
        assert_eq!(
            moved.open().unwrap_err(),
            EnvelopeError::InvalidSignature(caller)
        );
    }

    #[test]
    fn envelope_survives_json() {
        let envelope = CallEnvelope::seal(
            &keypair(),
            HERE,
            9,
            Call::Transfer {
                to: Address::from_bytes([4; 32]),
                amount: u128::MAX,
            },
        );
        let json = serde_json::to_string(&envelope).unwrap();
        let back: CallEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
        back.open().unwrap();
    }
}
