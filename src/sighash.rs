//! Signature hash computation and signature checking
//!
//! The digest that signature-checking opcodes verify against commits to the
//! enclosing transaction, the signed subscript, and the sighash mode byte
//! carried at the end of each endorsement. Two algorithms exist: the legacy
//! digest used by base and P2SH scripts, and the BIP143 digest used by
//! version 0 witness programs, which additionally commits to the spent
//! output value.
//!
//! Reference: Bitcoin Core `script/interpreter.cpp` (SignatureHash) and
//! BIP143

use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1};
use sha2::{Digest, Sha256};

use crate::constants::forks;
use crate::operation::Script;
use crate::serialization::encode_varint;
use crate::types::{ByteString, Hash, ScriptVersion, Transaction};

/// Sign all outputs (default mode)
pub const SIGHASH_ALL: u8 = 0x01;
/// Sign no outputs
pub const SIGHASH_NONE: u8 = 0x02;
/// Sign only the output paired with the signed input
pub const SIGHASH_SINGLE: u8 = 0x03;
/// Commit to this input only, letting others be added
pub const SIGHASH_ANYONE_CAN_PAY: u8 = 0x80;

/// Output selection mode extracted from the low bits of the sighash byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SighashBase {
    All,
    None,
    Single,
}

/// Decoded sighash mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SighashType {
    pub base: SighashBase,
    pub anyone_can_pay: bool,
}

impl SighashType {
    /// Decode a sighash byte
    ///
    /// Legacy consensus accepts every byte value: undefined low bits fall
    /// back to signing all outputs.
    pub fn from_byte(byte: u8) -> Self {
        let base = match byte & 0x1f {
            SIGHASH_NONE => SighashBase::None,
            SIGHASH_SINGLE => SighashBase::Single,
            _ => SighashBase::All,
        };
        SighashType {
            base,
            anyone_can_pay: (byte & SIGHASH_ANYONE_CAN_PAY) != 0,
        }
    }
}

fn double_sha256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// Legacy signature hash
///
/// Historical quirk: SIGHASH_SINGLE with an input index beyond the last
/// output hashes nothing and yields the constant "one" digest, which is
/// famously signable by anyone. Consensus depends on reproducing it.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    subscript: &Script,
    sighash_byte: u8,
) -> Hash {
    let sighash_type = SighashType::from_byte(sighash_byte);

    if sighash_type.base == SighashBase::Single && input_index >= tx.outputs.len() {
        let mut one = [0u8; 32];
        one[0] = 0x01;
        return one;
    }

    let subscript_bytes = subscript.to_bytes();
    let mut preimage = ByteString::new();

    preimage.extend_from_slice(&tx.version.to_le_bytes());

    if sighash_type.anyone_can_pay {
        let input = &tx.inputs[input_index];
        preimage.extend_from_slice(&encode_varint(1));
        preimage.extend_from_slice(&input.prevout.hash);
        preimage.extend_from_slice(&input.prevout.index.to_le_bytes());
        preimage.extend_from_slice(&encode_varint(subscript_bytes.len() as u64));
        preimage.extend_from_slice(&subscript_bytes);
        preimage.extend_from_slice(&input.sequence.to_le_bytes());
    } else {
        preimage.extend_from_slice(&encode_varint(tx.inputs.len() as u64));
        for (index, input) in tx.inputs.iter().enumerate() {
            preimage.extend_from_slice(&input.prevout.hash);
            preimage.extend_from_slice(&input.prevout.index.to_le_bytes());
            if index == input_index {
                preimage.extend_from_slice(&encode_varint(subscript_bytes.len() as u64));
                preimage.extend_from_slice(&subscript_bytes);
            } else {
                preimage.extend_from_slice(&encode_varint(0));
            }
            let sequence = if index != input_index && sighash_type.base != SighashBase::All {
                0
            } else {
                input.sequence
            };
            preimage.extend_from_slice(&sequence.to_le_bytes());
        }
    }

    match sighash_type.base {
        SighashBase::All => {
            preimage.extend_from_slice(&encode_varint(tx.outputs.len() as u64));
            for output in &tx.outputs {
                preimage.extend_from_slice(&output.value.to_le_bytes());
                preimage.extend_from_slice(&encode_varint(output.script_pubkey.len() as u64));
                preimage.extend_from_slice(&output.script_pubkey);
            }
        }
        SighashBase::None => {
            preimage.extend_from_slice(&encode_varint(0));
        }
        SighashBase::Single => {
            preimage.extend_from_slice(&encode_varint(input_index as u64 + 1));
            for _ in 0..input_index {
                // Null output: maximum value, empty script.
                preimage.extend_from_slice(&(-1i64).to_le_bytes());
                preimage.extend_from_slice(&encode_varint(0));
            }
            let output = &tx.outputs[input_index];
            preimage.extend_from_slice(&output.value.to_le_bytes());
            preimage.extend_from_slice(&encode_varint(output.script_pubkey.len() as u64));
            preimage.extend_from_slice(&output.script_pubkey);
        }
    }

    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&(sighash_byte as u32).to_le_bytes());

    double_sha256(&preimage)
}

/// BIP143 signature hash for version 0 witness programs
///
/// Commits to the spent output value, and replaces the per-mode input
/// mutation of the legacy algorithm with three precomputable digests.
pub fn signature_hash_v0(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    value: i64,
    sighash_byte: u8,
) -> Hash {
    let sighash_type = SighashType::from_byte(sighash_byte);
    let zero = [0u8; 32];

    let hash_prevouts = if sighash_type.anyone_can_pay {
        zero
    } else {
        let mut data = ByteString::new();
        for input in &tx.inputs {
            data.extend_from_slice(&input.prevout.hash);
            data.extend_from_slice(&input.prevout.index.to_le_bytes());
        }
        double_sha256(&data)
    };

    let hash_sequence = if !sighash_type.anyone_can_pay && sighash_type.base == SighashBase::All {
        let mut data = ByteString::new();
        for input in &tx.inputs {
            data.extend_from_slice(&input.sequence.to_le_bytes());
        }
        double_sha256(&data)
    } else {
        zero
    };

    let hash_outputs = match sighash_type.base {
        SighashBase::All => {
            let mut data = ByteString::new();
            for output in &tx.outputs {
                data.extend_from_slice(&output.value.to_le_bytes());
                data.extend_from_slice(&encode_varint(output.script_pubkey.len() as u64));
                data.extend_from_slice(&output.script_pubkey);
            }
            double_sha256(&data)
        }
        SighashBase::Single if input_index < tx.outputs.len() => {
            let output = &tx.outputs[input_index];
            let mut data = ByteString::new();
            data.extend_from_slice(&output.value.to_le_bytes());
            data.extend_from_slice(&encode_varint(output.script_pubkey.len() as u64));
            data.extend_from_slice(&output.script_pubkey);
            double_sha256(&data)
        }
        _ => zero,
    };

    let input = &tx.inputs[input_index];
    let script_code_bytes = script_code.to_bytes();
    let mut preimage = ByteString::new();
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&hash_prevouts);
    preimage.extend_from_slice(&hash_sequence);
    preimage.extend_from_slice(&input.prevout.hash);
    preimage.extend_from_slice(&input.prevout.index.to_le_bytes());
    preimage.extend_from_slice(&encode_varint(script_code_bytes.len() as u64));
    preimage.extend_from_slice(&script_code_bytes);
    preimage.extend_from_slice(&value.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash_outputs);
    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&(sighash_byte as u32).to_le_bytes());

    double_sha256(&preimage)
}

/// Verify one endorsement against one public key
///
/// An endorsement is a DER signature with the sighash byte appended. Parse
/// failures of either the signature or the public key are verification
/// failures, not evaluation errors; the opcode pushes false. Under BIP66
/// the DER parse is strict, otherwise lax historical encodings are
/// accepted.
#[allow(clippy::too_many_arguments)]
pub fn check_signature(
    endorsement: &[u8],
    public_key: &[u8],
    tx: &Transaction,
    input_index: usize,
    subscript: &Script,
    version: ScriptVersion,
    value: i64,
    active_forks: u32,
) -> bool {
    let Some((&sighash_byte, der)) = endorsement.split_last() else {
        return false;
    };

    let Ok(public_key) = PublicKey::from_slice(public_key) else {
        return false;
    };

    let parsed = if active_forks & forks::BIP66 != 0 {
        Signature::from_der(der)
    } else {
        Signature::from_der_lax(der)
    };
    let Ok(mut signature) = parsed else {
        return false;
    };
    // Historical transactions carry high-S signatures, which the verifier
    // rejects unless normalized first.
    signature.normalize_s();

    let digest = match version {
        ScriptVersion::Base => signature_hash(tx, input_index, subscript, sighash_byte),
        ScriptVersion::WitnessV0 => {
            signature_hash_v0(tx, input_index, subscript, value, sighash_byte)
        }
    };

    let message = Message::from_digest(digest);
    Secp256k1::verification_only()
        .verify_ecdsa(&message, &signature, &public_key)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::Opcode;
    use crate::operation::Operation;
    use crate::types::{OutPoint, TransactionInput, TransactionOutput};

    fn test_transaction() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                prevout: OutPoint {
                    hash: [0x11; 32],
                    index: 0,
                },
                script_sig: vec![],
                sequence: 0xffff_ffff,
            }],
            outputs: vec![TransactionOutput {
                value: 50_000,
                script_pubkey: vec![0x51],
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn sighash_byte_decoding_is_total() {
        for byte in 0u8..=255 {
            let decoded = SighashType::from_byte(byte);
            match byte & 0x1f {
                SIGHASH_NONE => assert_eq!(decoded.base, SighashBase::None),
                SIGHASH_SINGLE => assert_eq!(decoded.base, SighashBase::Single),
                _ => assert_eq!(decoded.base, SighashBase::All),
            }
            assert_eq!(decoded.anyone_can_pay, byte & 0x80 != 0);
        }
    }

    #[test]
    fn single_mode_beyond_outputs_yields_one_digest() {
        let mut tx = test_transaction();
        tx.inputs.push(tx.inputs[0].clone());
        tx.inputs[1].prevout.index = 1;

        let subscript = Script::new(vec![Operation::op(Opcode::Dup)]);
        let digest = signature_hash(&tx, 1, &subscript, SIGHASH_SINGLE);

        let mut one = [0u8; 32];
        one[0] = 0x01;
        assert_eq!(digest, one);
    }

    #[test]
    fn digest_commits_to_the_subscript() {
        let tx = test_transaction();
        let a = signature_hash(
            &tx,
            0,
            &Script::new(vec![Operation::op(Opcode::Dup)]),
            SIGHASH_ALL,
        );
        let b = signature_hash(
            &tx,
            0,
            &Script::new(vec![Operation::op(Opcode::Drop)]),
            SIGHASH_ALL,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn digest_commits_to_the_sighash_byte() {
        let tx = test_transaction();
        let subscript = Script::new(vec![Operation::op(Opcode::Dup)]);
        assert_ne!(
            signature_hash(&tx, 0, &subscript, SIGHASH_ALL),
            signature_hash(&tx, 0, &subscript, SIGHASH_NONE)
        );
    }

    #[test]
    fn v0_digest_commits_to_the_spent_value() {
        let tx = test_transaction();
        let script_code = Script::new(vec![Operation::op(Opcode::Dup)]);
        assert_ne!(
            signature_hash_v0(&tx, 0, &script_code, 50_000, SIGHASH_ALL),
            signature_hash_v0(&tx, 0, &script_code, 50_001, SIGHASH_ALL)
        );
    }

    #[test]
    fn empty_endorsement_fails_verification() {
        let tx = test_transaction();
        let subscript = Script::new(vec![]);
        assert!(!check_signature(
            &[],
            &[0x02; 33],
            &tx,
            0,
            &subscript,
            ScriptVersion::Base,
            0,
            forks::ALL,
        ));
    }
}
