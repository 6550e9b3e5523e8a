//! Script execution state
//!
//! A `Program` owns every piece of mutable state for one script evaluation:
//! the primary and alternate stacks, the conditional (branch) stack, the
//! operation accumulator, and the subscript jump position. Opcode handlers
//! never touch raw containers; every stack access goes through the
//! bounds-checked methods here, and every method that can fail returns a
//! value instead of panicking on validation-relevant conditions.

use smallvec::SmallVec;

use crate::constants::{MAX_SCRIPT_OPS, MAX_STACK_SIZE};
use crate::error::{Result, ScriptError};
use crate::number::{stack_to_bool, Number};
use crate::operation::{Operation, Script};
use crate::types::{ByteString, ScriptVersion, Transaction, TransactionInput};

/// Mutable state for one script evaluation
///
/// Constructed fresh per input, or threaded forward across chained phases
/// of the same input's validation with the stacks moved, never copied.
/// Script and Transaction data is borrowed for the evaluation's lifetime.
pub struct Program<'a> {
    script: &'a Script,
    transaction: &'a Transaction,
    input_index: usize,
    active_forks: u32,
    value: i64,
    version: ScriptVersion,

    primary: Vec<ByteString>,
    alternate: Vec<ByteString>,
    condition: SmallVec<[bool; 8]>,

    // Count of dead entries in `condition`, so `succeeded` is O(1).
    negative_condition_count: usize,
    operation_count: usize,
    jump: usize,
}

impl<'a> Program<'a> {
    /// Input script run: empty stacks
    ///
    /// `input_index` must reference an input of `transaction`.
    pub fn new(
        script: &'a Script,
        transaction: &'a Transaction,
        input_index: usize,
        active_forks: u32,
    ) -> Self {
        debug_assert!(input_index < transaction.inputs.len());
        Program {
            script,
            transaction,
            input_index,
            active_forks,
            value: 0,
            version: ScriptVersion::Base,
            primary: Vec::new(),
            alternate: Vec::new(),
            condition: SmallVec::new(),
            negative_condition_count: 0,
            operation_count: 0,
            jump: 0,
        }
    }

    /// Successor phase of the same input's validation (prevout script or
    /// P2SH redeem script), taking over the predecessor's primary stack
    ///
    /// The conditional stack, accumulator, and jump position reset; the
    /// transaction context carries through.
    pub fn chained(script: &'a Script, predecessor: Program<'a>) -> Self {
        Program {
            script,
            transaction: predecessor.transaction,
            input_index: predecessor.input_index,
            active_forks: predecessor.active_forks,
            value: predecessor.value,
            version: predecessor.version,
            primary: predecessor.primary,
            alternate: Vec::new(),
            condition: SmallVec::new(),
            negative_condition_count: 0,
            operation_count: 0,
            jump: 0,
        }
    }

    /// Witness program run: stack initialized from the witness, digest
    /// version and spent value supplied by the caller
    #[allow(clippy::too_many_arguments)]
    pub fn witness(
        script: &'a Script,
        transaction: &'a Transaction,
        input_index: usize,
        active_forks: u32,
        version: ScriptVersion,
        value: i64,
        stack: Vec<ByteString>,
    ) -> Self {
        debug_assert!(input_index < transaction.inputs.len());
        Program {
            script,
            transaction,
            input_index,
            active_forks,
            value,
            version,
            primary: stack,
            alternate: Vec::new(),
            condition: SmallVec::new(),
            negative_condition_count: 0,
            operation_count: 0,
            jump: 0,
        }
    }

    // Context
    // ------------------------------------------------------------------

    /// The script under evaluation, with the evaluation's full lifetime
    pub fn script(&self) -> &'a Script {
        self.script
    }

    pub fn transaction(&self) -> &'a Transaction {
        self.transaction
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    /// The input being validated
    pub fn input(&self) -> &'a TransactionInput {
        &self.transaction.inputs[self.input_index]
    }

    /// Previous output value spent by this input (meaningful for witness
    /// digests)
    pub fn input_value(&self) -> i64 {
        self.value
    }

    pub fn version(&self) -> ScriptVersion {
        self.version
    }

    pub fn active_forks(&self) -> u32 {
        self.active_forks
    }

    /// Whether a soft-fork rule bit is active for this evaluation
    pub fn is_enabled(&self, fork: u32) -> bool {
        (self.active_forks & fork) != 0
    }

    // Primary stack
    // ------------------------------------------------------------------

    /// Pushes never fail; the run loop checks `is_stack_overflow` after
    /// each operation so the hot path stays branch-free.
    pub fn push_data(&mut self, data: ByteString) {
        self.primary.push(data);
    }

    pub fn push_bool(&mut self, value: bool) {
        self.primary.push(if value { vec![1] } else { vec![] });
    }

    pub fn push_number(&mut self, number: Number) {
        self.primary.push(number.data());
    }

    /// Push a stack depth or element length as a number
    pub fn push_length(&mut self, length: usize) {
        self.push_number(Number::new(length as i64));
    }

    pub fn pop(&mut self) -> Option<ByteString> {
        self.primary.pop()
    }

    pub fn pop_bool(&mut self) -> Option<bool> {
        self.pop().map(|data| stack_to_bool(&data))
    }

    /// Pop and decode one numeric operand
    pub fn pop_number(&mut self, max_size: usize) -> Result<Number> {
        let data = self.pop().ok_or(ScriptError::InvalidStackOperation)?;
        Number::from_data(&data, max_size).ok_or(ScriptError::NumberOverflow)
    }

    /// Pop two 4-byte operands, returned in stack order (left below right)
    pub fn pop_binary(&mut self, max_size: usize) -> Result<(Number, Number)> {
        let right = self.pop_number(max_size)?;
        let left = self.pop_number(max_size)?;
        Ok((left, right))
    }

    /// Pop three 4-byte operands for WITHIN: value below lower below upper
    pub fn pop_ternary(&mut self, max_size: usize) -> Result<(Number, Number, Number)> {
        let upper = self.pop_number(max_size)?;
        let lower = self.pop_number(max_size)?;
        let value = self.pop_number(max_size)?;
        Ok((value, lower, upper))
    }

    /// Pop a stack index for PICK/ROLL, validated against the remaining
    /// depth
    pub fn pop_index(&mut self) -> Result<usize> {
        let number = self.pop_number(crate::constants::MAX_NUMBER_SIZE)?;
        if number.value() < 0 {
            return Err(ScriptError::InvalidStackOperation);
        }
        let index = number.value() as usize;
        if index >= self.primary.len() {
            return Err(ScriptError::InvalidStackOperation);
        }
        Ok(index)
    }

    /// Element `index` positions down from the top (0 is the top)
    pub fn peek(&self, index: usize) -> Option<&ByteString> {
        self.primary
            .len()
            .checked_sub(index + 1)
            .map(|position| &self.primary[position])
    }

    pub fn peek_bool(&self) -> Option<bool> {
        self.peek(0).map(|data| stack_to_bool(data))
    }

    /// Decode the top element without popping (CHECKLOCKTIMEVERIFY and
    /// CHECKSEQUENCEVERIFY are verify-only and must not mutate the stack)
    pub fn peek_number(&self, max_size: usize) -> Result<Number> {
        let data = self.peek(0).ok_or(ScriptError::InvalidStackOperation)?;
        Number::from_data(data, max_size).ok_or(ScriptError::NumberOverflow)
    }

    /// Copy the element `index` positions down to the top
    pub fn duplicate(&mut self, index: usize) -> Result<()> {
        let item = self
            .peek(index)
            .cloned()
            .ok_or(ScriptError::InvalidStackOperation)?;
        self.primary.push(item);
        Ok(())
    }

    /// Swap the elements `left` and `right` positions down from the top
    pub fn swap(&mut self, left: usize, right: usize) -> Result<()> {
        let depth = self.primary.len();
        let left_position = depth
            .checked_sub(left + 1)
            .ok_or(ScriptError::InvalidStackOperation)?;
        let right_position = depth
            .checked_sub(right + 1)
            .ok_or(ScriptError::InvalidStackOperation)?;
        self.primary.swap(left_position, right_position);
        Ok(())
    }

    /// Remove and return the element `index` positions down from the top
    pub fn erase(&mut self, index: usize) -> Result<ByteString> {
        let position = self
            .primary
            .len()
            .checked_sub(index + 1)
            .ok_or(ScriptError::InvalidStackOperation)?;
        Ok(self.primary.remove(position))
    }

    pub fn depth(&self) -> usize {
        self.primary.len()
    }

    pub fn is_stack_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Combined primary and alternate depth exceeds the 1000 element
    /// ceiling
    pub fn is_stack_overflow(&self) -> bool {
        self.primary.len() + self.alternate.len() > MAX_STACK_SIZE
    }

    /// Final result of an evaluation phase
    ///
    /// With `clean` set, exactly one element must remain and be true;
    /// otherwise any true top element passes. An empty stack is false
    /// either way. Policy over which to apply belongs to the caller, not
    /// the interpreter.
    pub fn is_true(&self, clean: bool) -> bool {
        if clean && self.primary.len() != 1 {
            return false;
        }
        match self.primary.last() {
            Some(top) => stack_to_bool(top),
            None => false,
        }
    }

    // Alternate stack
    // ------------------------------------------------------------------

    pub fn push_alternate(&mut self, data: ByteString) {
        self.alternate.push(data);
    }

    pub fn pop_alternate(&mut self) -> Option<ByteString> {
        self.alternate.pop()
    }

    // Conditional stack
    // ------------------------------------------------------------------

    /// Enter a branch (IF/NOTIF), recording its liveness
    pub fn open(&mut self, live: bool) {
        self.condition.push(live);
        if !live {
            self.negative_condition_count += 1;
        }
    }

    /// Flip the innermost branch (ELSE)
    pub fn negate(&mut self) -> Result<()> {
        let top = self
            .condition
            .last_mut()
            .ok_or(ScriptError::UnbalancedConditional)?;
        *top = !*top;
        if *top {
            self.negative_condition_count -= 1;
        } else {
            self.negative_condition_count += 1;
        }
        Ok(())
    }

    /// Close the innermost branch (ENDIF)
    pub fn close(&mut self) -> Result<()> {
        let live = self
            .condition
            .pop()
            .ok_or(ScriptError::UnbalancedConditional)?;
        if !live {
            self.negative_condition_count -= 1;
        }
        Ok(())
    }

    /// No branch left open; required at the end of a well-formed
    /// evaluation
    pub fn closed(&self) -> bool {
        self.condition.is_empty()
    }

    /// No enclosing branch is currently dead
    pub fn succeeded(&self) -> bool {
        self.negative_condition_count == 0
    }

    // Accumulator
    // ------------------------------------------------------------------

    /// Count one operation toward the ceiling; push opcodes and small
    /// literal pushes are excluded from the counted set
    pub fn increment_operation_count(&mut self, op: &Operation) -> bool {
        if !op.opcode().is_counted() {
            return true;
        }
        self.operation_count += 1;
        self.operation_count <= MAX_SCRIPT_OPS
    }

    /// Count one operation per public key evaluated by CHECKMULTISIG
    pub fn increment_multisig_count(&mut self, public_keys: usize) -> bool {
        self.operation_count += public_keys;
        self.operation_count <= MAX_SCRIPT_OPS
    }

    // Subscript
    // ------------------------------------------------------------------

    /// Start the signed subscript at `position` (the operation after the
    /// most recent OP_CODESEPARATOR)
    pub fn set_jump(&mut self, position: usize) {
        self.jump = position;
    }

    /// The subscript committed to by signature hashes
    ///
    /// Operations before the jump position and OP_CODESEPARATOR itself are
    /// never signed. Base scripts additionally strip any push whose payload
    /// equals one of the endorsements being checked (legacy
    /// find-and-delete); witness scripts do not.
    pub fn subscript(&self, endorsements: &[ByteString]) -> Script {
        let strip_endorsements = self.version == ScriptVersion::Base;
        self.script
            .ops()
            .iter()
            .skip(self.jump)
            .filter(|op| {
                if op.opcode() == crate::opcodes::Opcode::CodeSeparator {
                    return false;
                }
                if strip_endorsements
                    && op.opcode().is_push()
                    && endorsements.iter().any(|e| e.as_slice() == op.data())
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }
}
