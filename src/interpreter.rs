//! Opcode interpreter
//!
//! Pure dispatch from (operation, program state) to a result code, plus the
//! run loop that drives a whole script. The interpreter holds no state of
//! its own: every effect lands in the `Program`, and every failure is a
//! returned `ScriptError` that terminates the evaluation.
//!
//! The run loop implements the dead-branch model: when an enclosing
//! conditional is false, only the conditional opcodes themselves are
//! evaluated and everything else is skipped with zero side effect. Two
//! checks ignore branch liveness entirely, because consensus does: a
//! disabled opcode fails the script wherever it appears, and counted
//! operations accumulate toward the 201 ceiling even when skipped.

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::constants::{
    forks, LOCKTIME_THRESHOLD, MAX_EXTENDED_NUMBER_SIZE, MAX_NUMBER_SIZE, MAX_SCRIPT_PUBLIC_KEYS,
    MAX_SCRIPT_SIZE, SEQUENCE_FINAL, SEQUENCE_LOCKTIME_DISABLE_FLAG, SEQUENCE_LOCKTIME_MASK,
    SEQUENCE_LOCKTIME_TYPE_FLAG,
};
use crate::error::{Result, ScriptError};
use crate::number::Number;
use crate::opcodes::Opcode;
use crate::operation::{Operation, Script};
use crate::program::Program;
use crate::sighash;
use crate::types::{ByteString, Transaction};

/// Run a program to completion
///
/// Returns success only if every operation executed cleanly and the
/// conditional stack is closed at exhaustion. Final-stack truthiness is the
/// caller's policy; see [`Program::is_true`].
pub fn evaluate(program: &mut Program<'_>) -> Result<()> {
    let script = program.script();

    if script.serialized_size() > MAX_SCRIPT_SIZE {
        return Err(ScriptError::ScriptSize);
    }

    for (position, op) in script.ops().iter().enumerate() {
        if op.is_oversized() {
            return Err(ScriptError::PushSize);
        }
        if op.opcode().is_disabled() {
            return Err(ScriptError::DisabledOpcode);
        }
        if !program.increment_operation_count(op) {
            return Err(ScriptError::OpCount);
        }
        if program.succeeded() || op.opcode().is_conditional() {
            execute(op, program, position)?;
            if program.is_stack_overflow() {
                return Err(ScriptError::StackSize);
            }
        }
    }

    if program.closed() {
        Ok(())
    } else {
        Err(ScriptError::UnbalancedConditional)
    }
}

/// Connect a transaction input's unlocking script to the locking script of
/// the output it spends
///
/// Runs the input script, threads the resulting stack into the prevout
/// script phase, and requires a true final stack. P2SH redeem and witness
/// phases need the external byte parser and are orchestrated by the caller
/// through [`Program::chained`] and [`Program::witness`].
pub fn connect(
    transaction: &Transaction,
    input_index: usize,
    input_script: &Script,
    prevout_script: &Script,
    active_forks: u32,
) -> Result<()> {
    let mut input_program = Program::new(input_script, transaction, input_index, active_forks);
    evaluate(&mut input_program)?;

    let mut prevout_program = Program::chained(prevout_script, input_program);
    evaluate(&mut prevout_program)?;

    if prevout_program.is_true(false) {
        Ok(())
    } else {
        Err(ScriptError::EvalFalse)
    }
}

/// Apply one operation to the program
///
/// `position` is the operation's index in the script, used to mark the
/// subscript boundary for OP_CODESEPARATOR.
fn execute(op: &Operation, program: &mut Program<'_>, position: usize) -> Result<()> {
    use Opcode::*;

    let opcode = op.opcode();
    match opcode {
        PushSize0 => {
            program.push_data(ByteString::new());
            Ok(())
        }
        PushNegative1 => {
            program.push_number(Number::new(-1));
            Ok(())
        }
        PushPositive1 | PushPositive2 | PushPositive3 | PushPositive4 | PushPositive5
        | PushPositive6 | PushPositive7 | PushPositive8 | PushPositive9 | PushPositive10
        | PushPositive11 | PushPositive12 | PushPositive13 | PushPositive14 | PushPositive15
        | PushPositive16 => {
            // The value is carried in the opcode itself, offset from 0x50.
            let value = (opcode.to_u8() - Reserved80.to_u8()) as i64;
            program.push_number(Number::new(value));
            Ok(())
        }

        Nop | Nop1 | Nop4 | Nop5 | Nop6 | Nop7 | Nop8 | Nop9 | Nop10 => Ok(()),

        Ver | Reserved80 | Reserved137 | Reserved138 => Err(ScriptError::ReservedOpcode),

        If => op_if(program),
        NotIf => op_notif(program),
        Else => program.negate(),
        EndIf => program.close(),
        Verify => op_verify(program),
        Return => Err(ScriptError::OpReturn),

        ToAltStack => {
            let data = program.pop().ok_or(ScriptError::InvalidStackOperation)?;
            program.push_alternate(data);
            Ok(())
        }
        FromAltStack => {
            let data = program
                .pop_alternate()
                .ok_or(ScriptError::InvalidAltStackOperation)?;
            program.push_data(data);
            Ok(())
        }
        Drop2 => {
            program.erase(0)?;
            program.erase(0)?;
            Ok(())
        }
        Dup2 => {
            program.duplicate(1)?;
            program.duplicate(1)
        }
        Dup3 => {
            program.duplicate(2)?;
            program.duplicate(2)?;
            program.duplicate(2)
        }
        Over2 => {
            program.duplicate(3)?;
            program.duplicate(3)
        }
        Rot2 => op_rot2(program),
        Swap2 => {
            program.swap(3, 1)?;
            program.swap(2, 0)
        }
        IfDup => {
            let truthy = program.peek_bool().ok_or(ScriptError::InvalidStackOperation)?;
            if truthy {
                program.duplicate(0)?;
            }
            Ok(())
        }
        Depth => {
            program.push_length(program.depth());
            Ok(())
        }
        Drop => {
            program.pop().ok_or(ScriptError::InvalidStackOperation)?;
            Ok(())
        }
        Dup => program.duplicate(0),
        Nip => program.erase(1).map(|_| ()),
        Over => program.duplicate(1),
        Pick => {
            let index = program.pop_index()?;
            program.duplicate(index)
        }
        Roll => {
            let index = program.pop_index()?;
            let item = program.erase(index)?;
            program.push_data(item);
            Ok(())
        }
        Rot => {
            program.swap(2, 1)?;
            program.swap(1, 0)
        }
        Swap => program.swap(1, 0),
        Tuck => {
            program.duplicate(0)?;
            program.swap(2, 1)
        }

        Size => {
            let length = program
                .peek(0)
                .map(|data| data.len())
                .ok_or(ScriptError::InvalidStackOperation)?;
            program.push_length(length);
            Ok(())
        }

        Equal => {
            let (left, right) = pop_pair(program)?;
            program.push_bool(left == right);
            Ok(())
        }
        EqualVerify => {
            let (left, right) = pop_pair(program)?;
            if left == right {
                Ok(())
            } else {
                Err(ScriptError::EqualVerify)
            }
        }

        Add1 => op_unary_number(program, |value| value + 1),
        Sub1 => op_unary_number(program, |value| value - 1),
        Negate => op_unary_number(program, |value| -value),
        Abs => op_unary_number(program, i64::abs),
        Not => {
            let number = program.pop_number(MAX_NUMBER_SIZE)?;
            program.push_bool(number.is_zero());
            Ok(())
        }
        NonZero => {
            let number = program.pop_number(MAX_NUMBER_SIZE)?;
            program.push_bool(!number.is_zero());
            Ok(())
        }

        // Operands are bounded to the 4-byte domain, so i64 arithmetic
        // cannot overflow. The result is re-encoded as-is: it may exceed
        // the operand domain and is still a valid push.
        Add => op_binary_number(program, |left, right| left + right),
        Sub => op_binary_number(program, |left, right| left - right),
        Min => op_binary_number(program, i64::min),
        Max => op_binary_number(program, i64::max),
        BoolAnd => op_binary_predicate(program, |left, right| left != 0 && right != 0),
        BoolOr => op_binary_predicate(program, |left, right| left != 0 || right != 0),
        NumEqual => op_binary_predicate(program, |left, right| left == right),
        NumEqualVerify => {
            let (left, right) = program.pop_binary(MAX_NUMBER_SIZE)?;
            if left.value() == right.value() {
                Ok(())
            } else {
                Err(ScriptError::NumEqualVerify)
            }
        }
        NumNotEqual => op_binary_predicate(program, |left, right| left != right),
        LessThan => op_binary_predicate(program, |left, right| left < right),
        GreaterThan => op_binary_predicate(program, |left, right| left > right),
        LessThanOrEqual => op_binary_predicate(program, |left, right| left <= right),
        GreaterThanOrEqual => op_binary_predicate(program, |left, right| left >= right),
        Within => {
            let (value, lower, upper) = program.pop_ternary(MAX_NUMBER_SIZE)?;
            program.push_bool(lower.value() <= value.value() && value.value() < upper.value());
            Ok(())
        }

        Ripemd160 => op_hash(program, |data| ripemd::Ripemd160::digest(data).to_vec()),
        Sha1 => op_hash(program, |data| sha1::Sha1::digest(data).to_vec()),
        Sha256 => op_hash(program, |data| sha2::Sha256::digest(data).to_vec()),
        Hash160 => op_hash(program, |data| {
            ripemd::Ripemd160::digest(sha2::Sha256::digest(data)).to_vec()
        }),
        Hash256 => op_hash(program, |data| {
            sha2::Sha256::digest(sha2::Sha256::digest(data)).to_vec()
        }),

        CodeSeparator => {
            program.set_jump(position + 1);
            Ok(())
        }
        CheckSig => {
            let verified = op_check_sig(program)?;
            program.push_bool(verified);
            Ok(())
        }
        CheckSigVerify => {
            if op_check_sig(program)? {
                Ok(())
            } else {
                Err(ScriptError::CheckSigVerify)
            }
        }
        CheckMultisig => {
            let verified = op_check_multisig(program)?;
            program.push_bool(verified);
            Ok(())
        }
        CheckMultisigVerify => {
            if op_check_multisig(program)? {
                Ok(())
            } else {
                Err(ScriptError::CheckMultisigVerify)
            }
        }

        CheckLocktimeVerify => op_check_locktime_verify(program),
        CheckSequenceVerify => op_check_sequence_verify(program),

        // Unreachable through `evaluate`, which rejects these first; kept
        // so direct dispatch stays correct.
        VerIf | VerNotIf | Cat | Substr | Left | Right | Invert | And | Or | Xor | Mul2 | Div2
        | Mul | Div | Mod | LShift | RShift => Err(ScriptError::DisabledOpcode),

        // Every remaining opcode is a sized push; the payload was attached
        // by the parser.
        _ => {
            program.push_data(op.data().to_vec());
            Ok(())
        }
    }
}

fn op_if(program: &mut Program<'_>) -> Result<()> {
    if program.succeeded() {
        let value = program.pop_bool().ok_or(ScriptError::InvalidStackOperation)?;
        program.open(value);
    } else {
        // Inside a dead branch the condition is not consumed; the nested
        // branch is recorded dead so its ENDIF balances.
        program.open(false);
    }
    Ok(())
}

fn op_notif(program: &mut Program<'_>) -> Result<()> {
    if program.succeeded() {
        let value = program.pop_bool().ok_or(ScriptError::InvalidStackOperation)?;
        program.open(!value);
    } else {
        program.open(false);
    }
    Ok(())
}

fn op_verify(program: &mut Program<'_>) -> Result<()> {
    match program.pop_bool() {
        Some(true) => Ok(()),
        Some(false) => Err(ScriptError::Verify),
        None => Err(ScriptError::InvalidStackOperation),
    }
}

fn op_rot2(program: &mut Program<'_>) -> Result<()> {
    let first = program.erase(5)?;
    let second = program.erase(4)?;
    program.push_data(first);
    program.push_data(second);
    Ok(())
}

fn pop_pair(program: &mut Program<'_>) -> Result<(ByteString, ByteString)> {
    let right = program.pop().ok_or(ScriptError::InvalidStackOperation)?;
    let left = program.pop().ok_or(ScriptError::InvalidStackOperation)?;
    Ok((left, right))
}

fn op_unary_number(program: &mut Program<'_>, f: impl FnOnce(i64) -> i64) -> Result<()> {
    let number = program.pop_number(MAX_NUMBER_SIZE)?;
    program.push_number(Number::new(f(number.value())));
    Ok(())
}

fn op_binary_number(program: &mut Program<'_>, f: impl FnOnce(i64, i64) -> i64) -> Result<()> {
    let (left, right) = program.pop_binary(MAX_NUMBER_SIZE)?;
    program.push_number(Number::new(f(left.value(), right.value())));
    Ok(())
}

fn op_binary_predicate(program: &mut Program<'_>, f: impl FnOnce(i64, i64) -> bool) -> Result<()> {
    let (left, right) = program.pop_binary(MAX_NUMBER_SIZE)?;
    program.push_bool(f(left.value(), right.value()));
    Ok(())
}

fn op_hash(program: &mut Program<'_>, digest: impl FnOnce(&[u8]) -> Vec<u8>) -> Result<()> {
    let data = program.pop().ok_or(ScriptError::InvalidStackOperation)?;
    program.push_data(digest(&data));
    Ok(())
}

/// Argument marshalling for CHECKSIG; digest computation and verification
/// are delegated to the sighash collaborator
fn op_check_sig(program: &mut Program<'_>) -> Result<bool> {
    let public_key = program.pop().ok_or(ScriptError::InvalidStackOperation)?;
    let endorsement = program.pop().ok_or(ScriptError::InvalidStackOperation)?;

    let subscript = program.subscript(std::slice::from_ref(&endorsement));
    Ok(sighash::check_signature(
        &endorsement,
        &public_key,
        program.transaction(),
        program.input_index(),
        &subscript,
        program.version(),
        program.input_value(),
        program.active_forks(),
    ))
}

/// CHECKMULTISIG marshalling: pop and validate both counts, then iterate
/// signatures against public keys in stack order with early exit
fn op_check_multisig(program: &mut Program<'_>) -> Result<bool> {
    let key_count = program.pop_number(MAX_NUMBER_SIZE)?.value();
    if key_count < 0 || key_count > MAX_SCRIPT_PUBLIC_KEYS as i64 {
        return Err(ScriptError::PubkeyCount);
    }
    let key_count = key_count as usize;
    if !program.increment_multisig_count(key_count) {
        return Err(ScriptError::OpCount);
    }

    let mut public_keys = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        public_keys.push(program.pop().ok_or(ScriptError::InvalidStackOperation)?);
    }
    public_keys.reverse();

    let signature_count = program.pop_number(MAX_NUMBER_SIZE)?.value();
    if signature_count < 0 || signature_count > key_count as i64 {
        return Err(ScriptError::SigCount);
    }
    let signature_count = signature_count as usize;

    let mut endorsements = Vec::with_capacity(signature_count);
    for _ in 0..signature_count {
        endorsements.push(program.pop().ok_or(ScriptError::InvalidStackOperation)?);
    }
    endorsements.reverse();

    // Protocol quirk: one extra element is consumed and its contents
    // ignored.
    program.pop().ok_or(ScriptError::InvalidStackOperation)?;

    let subscript = program.subscript(&endorsements);

    let mut key_index = 0;
    for (signature_index, endorsement) in endorsements.iter().enumerate() {
        loop {
            // Signatures must verify in key order, so once fewer keys
            // remain than signatures the result is settled.
            if public_keys.len() - key_index < endorsements.len() - signature_index {
                return Ok(false);
            }
            let public_key = &public_keys[key_index];
            key_index += 1;
            if sighash::check_signature(
                endorsement,
                public_key,
                program.transaction(),
                program.input_index(),
                &subscript,
                program.version(),
                program.input_value(),
                program.active_forks(),
            ) {
                break;
            }
        }
    }

    Ok(true)
}

/// Verify-only comparison against the transaction lock time; no stack
/// mutation on success, no pop on failure
fn op_check_locktime_verify(program: &mut Program<'_>) -> Result<()> {
    if !program.is_enabled(forks::BIP65) {
        // NOP2 semantics before activation.
        return Ok(());
    }

    let number = program.peek_number(MAX_EXTENDED_NUMBER_SIZE)?;
    if number.value() < 0 {
        return Err(ScriptError::NegativeLocktime);
    }

    let stack_lock_time = number.value() as u64;
    let tx_lock_time = program.transaction().lock_time as u64;
    let threshold = LOCKTIME_THRESHOLD as u64;

    // Heights and timestamps are incomparable.
    if (stack_lock_time < threshold) != (tx_lock_time < threshold) {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    if stack_lock_time > tx_lock_time {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    // A final sequence disables lock time for the input, which would let
    // the transaction bypass the check.
    if program.input().sequence == SEQUENCE_FINAL {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    Ok(())
}

/// Verify-only comparison against the input's relative lock time
fn op_check_sequence_verify(program: &mut Program<'_>) -> Result<()> {
    if !program.is_enabled(forks::BIP112) {
        // NOP3 semantics before activation.
        return Ok(());
    }

    let number = program.peek_number(MAX_EXTENDED_NUMBER_SIZE)?;
    if number.value() < 0 {
        return Err(ScriptError::NegativeLocktime);
    }

    let stack_sequence = number.value() as u64;
    if stack_sequence & (SEQUENCE_LOCKTIME_DISABLE_FLAG as u64) != 0 {
        return Ok(());
    }

    if program.transaction().version < 2 {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    let input_sequence = program.input().sequence;
    if input_sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
        return Err(ScriptError::UnsatisfiedLocktime);
    }

    let mask = (SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK) as u64;
    let masked_stack = stack_sequence & mask;
    let masked_input = (input_sequence as u64) & mask;
    let type_flag = SEQUENCE_LOCKTIME_TYPE_FLAG as u64;

    if (masked_stack < type_flag) != (masked_input < type_flag) {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    if masked_stack > masked_input {
        return Err(ScriptError::UnsatisfiedLocktime);
    }
    Ok(())
}
