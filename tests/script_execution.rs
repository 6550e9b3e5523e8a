//! End-to-end script evaluation scenarios
//!
//! Each test drives whole scripts through the interpreter the way
//! transaction validation does: input script first, then the prevout
//! script over the threaded stack. Signature scenarios use real secp256k1
//! keys so the checksig family is exercised against genuine digests.

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::Digest;

use blvm_script::constants::{forks, SEQUENCE_FINAL, SEQUENCE_LOCKTIME_DISABLE_FLAG};
use blvm_script::interpreter::{connect, evaluate};
use blvm_script::number::Number;
use blvm_script::opcodes::Opcode;
use blvm_script::operation::{Operation, Script};
use blvm_script::program::Program;
use blvm_script::sighash::{signature_hash, signature_hash_v0, SIGHASH_ALL};
use blvm_script::types::{
    OutPoint, ScriptVersion, Transaction, TransactionInput, TransactionOutput,
};
use blvm_script::ScriptError;

fn spending_transaction(sequence: u32, lock_time: u32, version: u32) -> Transaction {
    Transaction {
        version,
        inputs: vec![TransactionInput {
            prevout: OutPoint {
                hash: [0x42; 32],
                index: 0,
            },
            script_sig: vec![],
            sequence,
        }],
        outputs: vec![TransactionOutput {
            value: 40_000,
            script_pubkey: vec![0x51],
        }],
        lock_time,
    }
}

fn keypair(seed: u8) -> (SecretKey, Vec<u8>) {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[seed; 32]).expect("valid secret");
    let public = PublicKey::from_secret_key(&secp, &secret);
    (secret, public.serialize().to_vec())
}

/// DER signature over the legacy digest, sighash byte appended
fn endorse(secret: &SecretKey, tx: &Transaction, input_index: usize, subscript: &Script) -> Vec<u8> {
    let digest = signature_hash(tx, input_index, subscript, SIGHASH_ALL);
    let secp = Secp256k1::new();
    let signature = secp.sign_ecdsa(&Message::from_digest(digest), secret);
    let mut endorsement = signature.serialize_der().to_vec();
    endorsement.push(SIGHASH_ALL);
    endorsement
}

fn endorse_v0(
    secret: &SecretKey,
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    value: i64,
) -> Vec<u8> {
    let digest = signature_hash_v0(tx, input_index, script_code, value, SIGHASH_ALL);
    let secp = Secp256k1::new();
    let signature = secp.sign_ecdsa(&Message::from_digest(digest), secret);
    let mut endorsement = signature.serialize_der().to_vec();
    endorsement.push(SIGHASH_ALL);
    endorsement
}

#[test]
fn arithmetic_script_connects() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let input_script = Script::new(vec![Operation::op(Opcode::PushPositive1)]);
    let prevout_script = Script::new(vec![
        Operation::op(Opcode::PushPositive2),
        Operation::op(Opcode::Add),
        Operation::op(Opcode::PushPositive3),
        Operation::op(Opcode::Equal),
    ]);
    assert!(connect(&tx, 0, &input_script, &prevout_script, forks::ALL).is_ok());
}

#[test]
fn false_final_stack_is_eval_false() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let input_script = Script::new(vec![Operation::op(Opcode::PushPositive1)]);
    let prevout_script = Script::new(vec![
        Operation::op(Opcode::PushPositive2),
        Operation::op(Opcode::NumEqual),
    ]);
    assert_eq!(
        connect(&tx, 0, &input_script, &prevout_script, forks::ALL),
        Err(ScriptError::EvalFalse)
    );
}

#[test]
fn empty_scripts_are_eval_false() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let empty = Script::default();
    assert_eq!(
        connect(&tx, 0, &empty, &empty, forks::ALL),
        Err(ScriptError::EvalFalse)
    );
}

#[test]
fn p2pkh_spend_verifies() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let (secret, public_key) = keypair(0x11);
    let key_hash =
        ripemd::Ripemd160::digest(sha2::Sha256::digest(&public_key)).to_vec();

    let prevout_script = Script::new(vec![
        Operation::op(Opcode::Dup),
        Operation::op(Opcode::Hash160),
        Operation::push_data(key_hash),
        Operation::op(Opcode::EqualVerify),
        Operation::op(Opcode::CheckSig),
    ]);
    let endorsement = endorse(&secret, &tx, 0, &prevout_script);
    let input_script = Script::new(vec![
        Operation::push_data(endorsement),
        Operation::push_data(public_key),
    ]);

    assert!(connect(&tx, 0, &input_script, &prevout_script, forks::ALL).is_ok());
}

#[test]
fn p2pkh_spend_with_wrong_key_fails() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let (secret, public_key) = keypair(0x11);
    let (_, wrong_public_key) = keypair(0x22);
    let key_hash =
        ripemd::Ripemd160::digest(sha2::Sha256::digest(&wrong_public_key)).to_vec();

    let prevout_script = Script::new(vec![
        Operation::op(Opcode::Dup),
        Operation::op(Opcode::Hash160),
        Operation::push_data(key_hash),
        Operation::op(Opcode::EqualVerify),
        Operation::op(Opcode::CheckSig),
    ]);
    let endorsement = endorse(&secret, &tx, 0, &prevout_script);
    let input_script = Script::new(vec![
        Operation::push_data(endorsement),
        Operation::push_data(public_key),
    ]);

    assert_eq!(
        connect(&tx, 0, &input_script, &prevout_script, forks::ALL),
        Err(ScriptError::EqualVerify)
    );
}

#[test]
fn checksig_with_wrong_signature_pushes_false() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let (_, public_key) = keypair(0x11);
    let (other_secret, _) = keypair(0x22);

    let prevout_script = Script::new(vec![
        Operation::push_data(public_key),
        Operation::op(Opcode::CheckSig),
    ]);
    let endorsement = endorse(&other_secret, &tx, 0, &prevout_script);
    let input_script = Script::new(vec![Operation::push_data(endorsement)]);

    assert_eq!(
        connect(&tx, 0, &input_script, &prevout_script, forks::ALL),
        Err(ScriptError::EvalFalse)
    );
}

#[test]
fn checksigverify_reports_its_own_code() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let (_, public_key) = keypair(0x11);

    let prevout_script = Script::new(vec![
        Operation::push_data(public_key),
        Operation::op(Opcode::CheckSigVerify),
        Operation::op(Opcode::PushPositive1),
    ]);
    // Garbage endorsement: parses as neither DER form.
    let input_script = Script::new(vec![Operation::push_data(vec![0xde, 0xad, 0x01])]);

    assert_eq!(
        connect(&tx, 0, &input_script, &prevout_script, forks::ALL),
        Err(ScriptError::CheckSigVerify)
    );
}

#[test]
fn multisig_two_of_three_verifies() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let (secret1, key1) = keypair(0x11);
    let (_, key2) = keypair(0x22);
    let (secret3, key3) = keypair(0x33);

    let prevout_script = Script::new(vec![
        Operation::op(Opcode::PushPositive2),
        Operation::push_data(key1),
        Operation::push_data(key2),
        Operation::push_data(key3),
        Operation::op(Opcode::PushPositive3),
        Operation::op(Opcode::CheckMultisig),
    ]);

    let endorsement1 = endorse(&secret1, &tx, 0, &prevout_script);
    let endorsement3 = endorse(&secret3, &tx, 0, &prevout_script);

    // Signatures in key order, below them the consumed extra element.
    let input_script = Script::new(vec![
        Operation::op(Opcode::PushSize0),
        Operation::push_data(endorsement1),
        Operation::push_data(endorsement3),
    ]);

    assert!(connect(&tx, 0, &input_script, &prevout_script, forks::ALL).is_ok());
}

#[test]
fn multisig_out_of_order_signatures_fail() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let (secret1, key1) = keypair(0x11);
    let (_, key2) = keypair(0x22);
    let (secret3, key3) = keypair(0x33);

    let prevout_script = Script::new(vec![
        Operation::op(Opcode::PushPositive2),
        Operation::push_data(key1),
        Operation::push_data(key2),
        Operation::push_data(key3),
        Operation::op(Opcode::PushPositive3),
        Operation::op(Opcode::CheckMultisig),
    ]);

    let endorsement1 = endorse(&secret1, &tx, 0, &prevout_script);
    let endorsement3 = endorse(&secret3, &tx, 0, &prevout_script);

    let input_script = Script::new(vec![
        Operation::op(Opcode::PushSize0),
        Operation::push_data(endorsement3),
        Operation::push_data(endorsement1),
    ]);

    assert_eq!(
        connect(&tx, 0, &input_script, &prevout_script, forks::ALL),
        Err(ScriptError::EvalFalse)
    );
}

#[test]
fn multisig_rejects_more_than_twenty_keys() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let mut ops = vec![
        Operation::op(Opcode::PushSize0),
        Operation::op(Opcode::PushSize0),
    ];
    ops.extend((0..21).map(|_| Operation::op(Opcode::PushSize0)));
    ops.push(Operation::push_data(Number::new(21).data()));
    ops.push(Operation::op(Opcode::CheckMultisig));
    let script = Script::new(ops);

    let mut program = Program::new(&script, &tx, 0, forks::ALL);
    assert_eq!(evaluate(&mut program), Err(ScriptError::PubkeyCount));
}

#[test]
fn multisig_key_counting_breaches_operation_ceiling() {
    // Ten trivially-true 0-of-20 multisigs count 20 keys each plus their
    // own operation and a DROP, crossing 201 on the tenth.
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let mut ops = Vec::new();
    for _ in 0..10 {
        ops.push(Operation::op(Opcode::PushSize0));
        ops.push(Operation::op(Opcode::PushSize0));
        ops.extend((0..20).map(|_| Operation::op(Opcode::PushSize0)));
        ops.push(Operation::push_data(Number::new(20).data()));
        ops.push(Operation::op(Opcode::CheckMultisig));
        ops.push(Operation::op(Opcode::Drop));
    }
    let script = Script::new(ops);

    let mut program = Program::new(&script, &tx, 0, forks::ALL);
    assert_eq!(evaluate(&mut program), Err(ScriptError::OpCount));
}

#[test]
fn locktime_verify_accepts_and_rejects() {
    let prevout = |lock: i64| {
        Script::new(vec![
            Operation::push_data(Number::new(lock).data()),
            Operation::op(Opcode::CheckLocktimeVerify),
        ])
    };
    let input_script = Script::new(vec![Operation::op(Opcode::PushPositive1)]);

    // Height 100 satisfies a script requiring height 100 or less.
    let tx = spending_transaction(0, 100, 1);
    assert!(connect(&tx, 0, &input_script, &prevout(100), forks::ALL).is_ok());
    assert!(connect(&tx, 0, &input_script, &prevout(99), forks::ALL).is_ok());
    assert_eq!(
        connect(&tx, 0, &input_script, &prevout(101), forks::ALL),
        Err(ScriptError::UnsatisfiedLocktime)
    );

    // Heights and timestamps are incomparable.
    assert_eq!(
        connect(&tx, 0, &input_script, &prevout(500_000_001), forks::ALL),
        Err(ScriptError::UnsatisfiedLocktime)
    );

    // A final input sequence opts out of lock time entirely.
    let final_tx = spending_transaction(SEQUENCE_FINAL, 100, 1);
    assert_eq!(
        connect(&final_tx, 0, &input_script, &prevout(100), forks::ALL),
        Err(ScriptError::UnsatisfiedLocktime)
    );

    // Negative operands have their own code.
    let negative = Script::new(vec![
        Operation::push_data(vec![0x81]),
        Operation::op(Opcode::CheckLocktimeVerify),
    ]);
    assert_eq!(
        connect(&tx, 0, &input_script, &negative, forks::ALL),
        Err(ScriptError::NegativeLocktime)
    );

    // Without BIP65 the opcode is a NOP and the stack value survives.
    assert!(connect(&tx, 0, &input_script, &prevout(101), forks::NONE).is_ok());
}

#[test]
fn locktime_verify_does_not_consume_the_operand() {
    let tx = spending_transaction(0, 100, 1);
    let script = Script::new(vec![
        Operation::push_data(Number::new(100).data()),
        Operation::op(Opcode::CheckLocktimeVerify),
    ]);
    let mut program = Program::new(&script, &tx, 0, forks::ALL);
    evaluate(&mut program).unwrap();
    assert_eq!(program.depth(), 1);
    assert!(program.is_true(true));
}

#[test]
fn sequence_verify_accepts_and_rejects() {
    let prevout = |sequence: i64| {
        Script::new(vec![
            Operation::push_data(Number::new(sequence).data()),
            Operation::op(Opcode::CheckSequenceVerify),
        ])
    };
    let input_script = Script::new(vec![Operation::op(Opcode::PushPositive1)]);

    // Input aged 10 blocks satisfies a 5 block requirement.
    let tx = spending_transaction(10, 0, 2);
    assert!(connect(&tx, 0, &input_script, &prevout(5), forks::ALL).is_ok());
    assert!(connect(&tx, 0, &input_script, &prevout(10), forks::ALL).is_ok());
    assert_eq!(
        connect(&tx, 0, &input_script, &prevout(11), forks::ALL),
        Err(ScriptError::UnsatisfiedLocktime)
    );

    // The disable bit in the operand turns the check off.
    let disabled = SEQUENCE_LOCKTIME_DISABLE_FLAG as i64 | 1000;
    assert!(connect(&tx, 0, &input_script, &prevout(disabled), forks::ALL).is_ok());

    // Relative locks need transaction version 2.
    let v1_tx = spending_transaction(10, 0, 1);
    assert_eq!(
        connect(&v1_tx, 0, &input_script, &prevout(5), forks::ALL),
        Err(ScriptError::UnsatisfiedLocktime)
    );

    // The disable bit on the input sequence also fails the check.
    let disabled_input = spending_transaction(SEQUENCE_LOCKTIME_DISABLE_FLAG | 10, 0, 2);
    assert_eq!(
        connect(&disabled_input, 0, &input_script, &prevout(5), forks::ALL),
        Err(ScriptError::UnsatisfiedLocktime)
    );

    // Without BIP112 the opcode is a NOP.
    assert!(connect(&v1_tx, 0, &input_script, &prevout(11), forks::NONE).is_ok());
}

#[test]
fn redeem_phase_threads_the_stack() {
    // The P2SH pattern: the input phase leaves arguments on the stack and
    // the redeem script consumes them in a chained program.
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let input_script = Script::new(vec![
        Operation::op(Opcode::PushPositive2),
        Operation::op(Opcode::PushPositive3),
    ]);
    let redeem_script = Script::new(vec![
        Operation::op(Opcode::Add),
        Operation::op(Opcode::PushPositive5),
        Operation::op(Opcode::Equal),
    ]);

    let mut input_program = Program::new(&input_script, &tx, 0, forks::ALL);
    evaluate(&mut input_program).unwrap();
    assert_eq!(input_program.depth(), 2);

    let mut redeem_program = Program::chained(&redeem_script, input_program);
    evaluate(&mut redeem_program).unwrap();
    assert!(redeem_program.is_true(true));
}

#[test]
fn witness_program_uses_the_v0_digest() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let (secret, public_key) = keypair(0x44);
    let value = 75_000;

    let witness_script = Script::new(vec![
        Operation::push_data(public_key),
        Operation::op(Opcode::CheckSig),
    ]);
    let endorsement = endorse_v0(&secret, &tx, 0, &witness_script, value);

    let mut program = Program::witness(
        &witness_script,
        &tx,
        0,
        forks::ALL,
        ScriptVersion::WitnessV0,
        value,
        vec![endorsement.clone()],
    );
    evaluate(&mut program).unwrap();
    assert!(program.is_true(true));

    // The same endorsement over a different spent value must not verify.
    let mut wrong_value = Program::witness(
        &witness_script,
        &tx,
        0,
        forks::ALL,
        ScriptVersion::WitnessV0,
        value + 1,
        vec![endorsement],
    );
    evaluate(&mut wrong_value).unwrap();
    assert!(!wrong_value.is_true(true));
}

#[test]
fn codeseparator_limits_the_signed_subscript() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let (secret, public_key) = keypair(0x55);

    let prevout_script = Script::new(vec![
        Operation::op(Opcode::PushPositive1),
        Operation::op(Opcode::Drop),
        Operation::op(Opcode::CodeSeparator),
        Operation::push_data(public_key),
        Operation::op(Opcode::CheckSig),
    ]);
    // Only the operations after the separator are signed.
    let signed_subscript = Script::new(
        prevout_script.ops()[3..].to_vec(),
    );
    let endorsement = endorse(&secret, &tx, 0, &signed_subscript);
    let input_script = Script::new(vec![Operation::push_data(endorsement)]);

    assert!(connect(&tx, 0, &input_script, &prevout_script, forks::ALL).is_ok());
}

#[test]
fn sha256_known_vector() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let digest = hex::decode("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        .unwrap();
    let input_script = Script::new(vec![Operation::push_data(b"abc".to_vec())]);
    let prevout_script = Script::new(vec![
        Operation::op(Opcode::Sha256),
        Operation::push_data(digest),
        Operation::op(Opcode::Equal),
    ]);
    assert!(connect(&tx, 0, &input_script, &prevout_script, forks::ALL).is_ok());
}

#[test]
fn deep_branch_nesting_resolves() {
    let tx = spending_transaction(SEQUENCE_FINAL, 0, 1);
    let input_script = Script::new(vec![Operation::op(Opcode::PushPositive1)]);

    let mut ops = Vec::new();
    for _ in 0..50 {
        ops.push(Operation::op(Opcode::PushPositive1));
        ops.push(Operation::op(Opcode::If));
    }
    ops.push(Operation::op(Opcode::PushPositive1));
    for _ in 0..50 {
        ops.push(Operation::op(Opcode::EndIf));
    }
    let prevout_script = Script::new(ops);

    assert!(connect(&tx, 0, &input_script, &prevout_script, forks::ALL).is_ok());
}
