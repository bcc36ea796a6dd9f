// Path: crates/vaa/src/vaa.rs
//! Encode, decode, digest and verify VAAs.

use aegis_types::error::VaaError;
use aegis_types::{Address, ChainId, GuardianAddress, GuardianSet, MessagePublication};
use byteorder::{BigEndian, ReadBytesExt};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::io::{Cursor, Read};

/// The only wire version this implementation emits or accepts.
pub const VERSION: u8 = 1;

/// Bytes in one recoverable secp256k1 signature (`r || s || v`).
pub const SIGNATURE_LEN: usize = 65;

/// Returns the number of signatures needed for quorum on a set of `n`
/// guardians: more than two thirds.
pub fn calculate_quorum(n: usize) -> usize {
    n * 2 / 3 + 1
}

/// The 20-byte guardian address for a secp256k1 verifying key: the low 20
/// bytes of the keccak256 of the uncompressed point, tag byte excluded.
pub fn guardian_address_of(key: &VerifyingKey) -> GuardianAddress {
    let point = key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..]);
    GuardianAddress(addr)
}

/// One guardian's signature over a VAA signing digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Position of the signer in the guardian set named by the header.
    pub index: u8,
    /// The 65-byte recoverable signature.
    #[serde(with = "serde_sig_bytes")]
    pub signature: [u8; SIGNATURE_LEN],
}

mod serde_sig_bytes {
    use super::SIGNATURE_LEN;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8; SIGNATURE_LEN], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; SIGNATURE_LEN], D::Error> {
        let raw = hex::decode(String::deserialize(d)?).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 65 bytes"))
    }
}

/// A Verifiable Action Approval: the multi-signed attestation the guardian
/// network emits once a supermajority observed the same message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaa {
    pub version: u8,
    pub guardian_set_index: u32,
    /// Strictly increasing by guardian index.
    pub signatures: Vec<Signature>,
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: ChainId,
    pub emitter_address: Address,
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,
}

impl Vaa {
    /// Builds the unsigned VAA for a watcher message under the given set.
    pub fn from_publication(msg: &MessagePublication, guardian_set_index: u32) -> Vaa {
        Vaa {
            version: VERSION,
            guardian_set_index,
            signatures: Vec::new(),
            timestamp: msg.timestamp,
            nonce: msg.nonce,
            emitter_chain: msg.emitter_chain,
            emitter_address: msg.emitter_address,
            sequence: msg.sequence,
            consistency_level: msg.consistency_level,
            payload: msg.payload.clone(),
        }
    }

    /// The canonical body serialization: every field from `timestamp` onward.
    pub fn body_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(51 + self.payload.len());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.extend_from_slice(&u16::from(self.emitter_chain).to_be_bytes());
        buf.extend_from_slice(self.emitter_address.as_bytes());
        buf.extend_from_slice(&self.sequence.to_be_bytes());
        buf.push(self.consistency_level);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// The value each guardian signs: `keccak256(keccak256(body))`.
    pub fn signing_digest(&self) -> [u8; 32] {
        let once = Keccak256::digest(self.body_bytes());
        Keccak256::digest(once).into()
    }

    /// Lowercase hex of the signing digest; the processor's state-map key.
    pub fn hex_digest(&self) -> String {
        hex::encode(self.signing_digest())
    }

    /// The per-emitter identifier, `chain/emitter_hex/sequence`.
    pub fn message_id(&self) -> String {
        format!(
            "{}/{}/{}",
            u16::from(self.emitter_chain),
            self.emitter_address,
            self.sequence
        )
    }

    /// Serializes header, signatures and body in wire order.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(6 + self.signatures.len() * 66 + 51 + self.payload.len());
        buf.push(self.version);
        buf.extend_from_slice(&self.guardian_set_index.to_be_bytes());
        buf.push(self.signatures.len() as u8);
        for sig in &self.signatures {
            buf.push(sig.index);
            buf.extend_from_slice(&sig.signature);
        }
        buf.extend_from_slice(&self.body_bytes());
        buf
    }

    /// Parses a VAA from wire bytes.
    ///
    /// Structural checks happen here (version, signature ordering); set
    /// membership and quorum are `verify`'s job, since they need a guardian
    /// set.
    pub fn decode(data: &[u8]) -> Result<Vaa, VaaError> {
        let mut reader = Cursor::new(data);

        let version = reader
            .read_u8()
            .map_err(|_| VaaError::Malformed("missing version".into()))?;
        if version != VERSION {
            return Err(VaaError::UnknownVersion(version));
        }

        let guardian_set_index = reader
            .read_u32::<BigEndian>()
            .map_err(|_| VaaError::Malformed("missing guardian set index".into()))?;

        let num_signatures = reader
            .read_u8()
            .map_err(|_| VaaError::Malformed("missing signature count".into()))?;

        let mut signatures = Vec::with_capacity(num_signatures as usize);
        let mut last_index: i32 = -1;
        for _ in 0..num_signatures {
            let index = reader
                .read_u8()
                .map_err(|_| VaaError::Malformed("missing signature index".into()))?;
            if i32::from(index) <= last_index {
                return Err(VaaError::DuplicateOrUnsortedSignatures);
            }
            last_index = i32::from(index);

            let mut signature = [0u8; SIGNATURE_LEN];
            reader
                .read_exact(&mut signature)
                .map_err(|_| VaaError::Malformed("truncated signature".into()))?;
            signatures.push(Signature { index, signature });
        }

        let timestamp = reader
            .read_u32::<BigEndian>()
            .map_err(|_| VaaError::Malformed("missing timestamp".into()))?;
        let nonce = reader
            .read_u32::<BigEndian>()
            .map_err(|_| VaaError::Malformed("missing nonce".into()))?;
        let emitter_chain = reader
            .read_u16::<BigEndian>()
            .map_err(|_| VaaError::Malformed("missing emitter chain".into()))?;

        let mut emitter = [0u8; 32];
        reader
            .read_exact(&mut emitter)
            .map_err(|_| VaaError::Malformed("truncated emitter address".into()))?;

        let sequence = reader
            .read_u64::<BigEndian>()
            .map_err(|_| VaaError::Malformed("missing sequence".into()))?;
        let consistency_level = reader
            .read_u8()
            .map_err(|_| VaaError::Malformed("missing consistency level".into()))?;

        let mut payload = Vec::new();
        reader
            .read_to_end(&mut payload)
            .map_err(|_| VaaError::Malformed("truncated payload".into()))?;

        Ok(Vaa {
            version,
            guardian_set_index,
            signatures,
            timestamp,
            nonce,
            emitter_chain: ChainId(emitter_chain),
            emitter_address: Address(emitter),
            sequence,
            consistency_level,
            payload,
        })
    }

    /// Checks this VAA against a guardian set: non-empty, strictly ordered
    /// signatures, all indices in range, quorum met, and every signature
    /// recovering to the address at its index.
    pub fn verify(&self, set: &GuardianSet) -> Result<(), VaaError> {
        if self.signatures.is_empty() {
            return Err(VaaError::InsufficientSignatures {
                have: 0,
                need: calculate_quorum(set.len()),
            });
        }

        let mut last_index: i32 = -1;
        for sig in &self.signatures {
            if i32::from(sig.index) <= last_index {
                return Err(VaaError::DuplicateOrUnsortedSignatures);
            }
            last_index = i32::from(sig.index);
            if usize::from(sig.index) >= set.len() {
                return Err(VaaError::IndexOutOfRange(sig.index));
            }
        }

        let need = calculate_quorum(set.len());
        if self.signatures.len() < need {
            return Err(VaaError::InsufficientSignatures {
                have: self.signatures.len(),
                need,
            });
        }

        let digest = self.signing_digest();
        for sig in &self.signatures {
            let recovered = recover_signer(&digest, &sig.signature)?;
            let expected = set
                .addresses
                .get(usize::from(sig.index))
                .ok_or(VaaError::IndexOutOfRange(sig.index))?;
            if &recovered != expected {
                return Err(VaaError::InvalidSignature(format!(
                    "signature {} recovers to {}, expected {}",
                    sig.index, recovered, expected
                )));
            }
        }

        Ok(())
    }

    /// Signs the digest with `key` and inserts the signature at its sorted
    /// position. Replaces an existing signature under the same index.
    pub fn add_signature(&mut self, key: &SigningKey, index: u8) -> Result<(), VaaError> {
        let signature = sign_digest(key, &self.signing_digest())?;
        self.signatures.retain(|s| s.index != index);
        self.signatures.push(Signature { index, signature });
        self.signatures.sort_by_key(|s| s.index);
        Ok(())
    }
}

/// Produces a 65-byte recoverable signature over a 32-byte digest.
pub fn sign_digest(key: &SigningKey, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN], VaaError> {
    let (sig, recid) = key
        .sign_prehash_recoverable(digest)
        .map_err(|e| VaaError::InvalidSignature(e.to_string()))?;
    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = recid.to_byte();
    Ok(out)
}

/// Recovers the guardian address that produced `signature` over `digest`.
pub fn recover_signer(
    digest: &[u8; 32],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<GuardianAddress, VaaError> {
    let sig = EcdsaSignature::from_slice(&signature[..64])
        .map_err(|e| VaaError::InvalidSignature(e.to_string()))?;
    let recid = RecoveryId::from_byte(signature[64])
        .ok_or_else(|| VaaError::InvalidSignature("invalid recovery id".into()))?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recid)
        .map_err(|e| VaaError::InvalidSignature(e.to_string()))?;
    Ok(guardian_address_of(&key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vaa() -> Vaa {
        Vaa {
            version: VERSION,
            guardian_set_index: 9,
            signatures: vec![],
            timestamp: 2837,
            nonce: 5,
            emitter_chain: ChainId::ETHEREUM,
            emitter_address: Address::from_bytes(&{
                let mut a = [0u8; 32];
                a[..5].copy_from_slice(&[0, 1, 2, 3, 4]);
                a
            })
            .unwrap(),
            sequence: 10,
            consistency_level: 2,
            payload: b"abcd".to_vec(),
        }
    }

    fn keyed_set(n: usize) -> (Vec<SigningKey>, GuardianSet) {
        let keys: Vec<SigningKey> = (0..n)
            .map(|i| {
                let mut seed = [0u8; 32];
                seed[31] = i as u8 + 1;
                SigningKey::from_slice(&seed).unwrap()
            })
            .collect();
        let addrs = keys
            .iter()
            .map(|k| guardian_address_of(k.verifying_key()))
            .collect();
        (keys, GuardianSet::new(0, addrs))
    }

    #[test]
    fn test_quorum_table() {
        assert_eq!(calculate_quorum(1), 1);
        assert_eq!(calculate_quorum(2), 2);
        assert_eq!(calculate_quorum(3), 3);
        assert_eq!(calculate_quorum(4), 3);
        assert_eq!(calculate_quorum(19), 13);
        for n in 1..=255usize {
            assert_eq!(calculate_quorum(n), n * 2 / 3 + 1);
        }
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let (keys, _) = keyed_set(3);
        let mut vaa = sample_vaa();
        for (i, key) in keys.iter().enumerate() {
            vaa.add_signature(key, i as u8).unwrap();
        }
        let bytes = vaa.encode();
        let decoded = Vaa::decode(&bytes).unwrap();
        assert_eq!(decoded, vaa);
        assert_eq!(decoded.encode(), bytes);
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut bytes = sample_vaa().encode();
        bytes[0] = 8;
        assert_eq!(Vaa::decode(&bytes), Err(VaaError::UnknownVersion(8)));
    }

    #[test]
    fn test_decode_rejects_unsorted_signatures() {
        let (keys, _) = keyed_set(2);
        let mut vaa = sample_vaa();
        vaa.add_signature(&keys[0], 1).unwrap();
        vaa.add_signature(&keys[1], 1).unwrap(); // replaces, still one sig
        assert_eq!(vaa.signatures.len(), 1);

        // Force a duplicate index pair on the wire.
        vaa.signatures = vec![
            Signature {
                index: 1,
                signature: vaa.signatures[0].signature,
            },
            Signature {
                index: 1,
                signature: vaa.signatures[0].signature,
            },
        ];
        let bytes = vaa.encode();
        assert_eq!(
            Vaa::decode(&bytes),
            Err(VaaError::DuplicateOrUnsortedSignatures)
        );
    }

    #[test]
    fn test_digest_ignores_signatures() {
        let (keys, _) = keyed_set(2);
        let mut vaa = sample_vaa();
        let before = vaa.signing_digest();
        vaa.add_signature(&keys[0], 0).unwrap();
        vaa.guardian_set_index = 77; // header field, not part of the body
        assert_eq!(vaa.signing_digest(), before);

        let mut other = sample_vaa();
        other.nonce += 1;
        assert_ne!(other.signing_digest(), before);
    }

    #[test]
    fn test_verify_quorum_and_recovery() {
        let (keys, set) = keyed_set(3);
        let mut vaa = sample_vaa();

        vaa.add_signature(&keys[0], 0).unwrap();
        assert!(matches!(
            vaa.verify(&set),
            Err(VaaError::InsufficientSignatures { have: 1, need: 3 })
        ));

        vaa.add_signature(&keys[1], 1).unwrap();
        vaa.add_signature(&keys[2], 2).unwrap();
        vaa.verify(&set).unwrap();
    }

    #[test]
    fn test_verify_rejects_wrong_signer() {
        let (keys, set) = keyed_set(3);
        let mut vaa = sample_vaa();
        // keys[1] signs but claims index 0.
        vaa.add_signature(&keys[1], 0).unwrap();
        vaa.add_signature(&keys[1], 1).unwrap();
        vaa.add_signature(&keys[2], 2).unwrap();
        assert!(matches!(
            vaa.verify(&set),
            Err(VaaError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_verify_rejects_out_of_range_index() {
        let (keys, set) = keyed_set(3);
        let mut vaa = sample_vaa();
        vaa.add_signature(&keys[0], 0).unwrap();
        vaa.add_signature(&keys[1], 1).unwrap();
        vaa.add_signature(&keys[2], 7).unwrap();
        assert_eq!(vaa.verify(&set), Err(VaaError::IndexOutOfRange(7)));
    }

    #[test]
    fn test_message_id() {
        assert_eq!(
            sample_vaa().message_id(),
            format!("2/{}/10", sample_vaa().emitter_address)
        );
    }

    #[test]
    fn test_known_vector_round_trip() {
        // A VAA captured from an existing deployment (version byte rewritten
        // to 1; the upstream vector predates the version check).
        let raw = hex::decode(concat!(
            "010000000901007bfa71192f886ab6819fa4862e34b4d178962958d9b2e3d943",
            "7338c9e5fde1443b809d2886eaa69e0f0158ea517675d96243c9209c3fe1d94d",
            "5b19866654c6980000000b150000000500020001020304000000000000000000",
            "00000000000000000000000000000000000000000000000000000a0261626364"
        ))
        .unwrap();
        let vaa = Vaa::decode(&raw).unwrap();
        assert_eq!(vaa.guardian_set_index, 9);
        assert_eq!(vaa.timestamp, 2837);
        assert_eq!(vaa.nonce, 5);
        assert_eq!(vaa.emitter_chain, ChainId::ETHEREUM);
        assert_eq!(vaa.sequence, 10);
        assert_eq!(vaa.consistency_level, 2);
        assert_eq!(vaa.payload, b"abcd");
        assert_eq!(vaa.encode(), raw);
    }
}
