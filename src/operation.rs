//! Script operations
//!
//! An operation is an opcode plus, for push opcodes, its literal payload.
//! Operations are produced by the script parser and are immutable once
//! built; the execution machinery references them without taking ownership.

use crate::constants::MAX_SCRIPT_ELEMENT_SIZE;
use crate::opcodes::Opcode;
use crate::types::ByteString;

/// One parsed Script instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    opcode: Opcode,
    data: ByteString,
}

impl Operation {
    /// Operation with no payload
    pub fn op(opcode: Opcode) -> Self {
        debug_assert!(!opcode.carries_data());
        Operation {
            opcode,
            data: ByteString::new(),
        }
    }

    /// Push operation with its literal payload
    ///
    /// Direct push opcodes must carry exactly as many bytes as the opcode
    /// value names; the parser guarantees this for parsed scripts.
    pub fn push(opcode: Opcode, data: ByteString) -> Self {
        debug_assert!(opcode.carries_data() || data.is_empty());
        debug_assert!(!opcode.is_push_size() || data.len() == opcode.to_u8() as usize);
        Operation { opcode, data }
    }

    /// Minimal push of arbitrary data, selecting the smallest push opcode
    pub fn push_data(data: ByteString) -> Self {
        let opcode = match data.len() {
            0 => Opcode::PushSize0,
            len if len <= 75 => Opcode::from_u8(len as u8).expect("direct push size"),
            len if len <= u8::MAX as usize => Opcode::PushOneSize,
            len if len <= u16::MAX as usize => Opcode::PushTwoSize,
            _ => Opcode::PushFourSize,
        };
        Operation { opcode, data }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload exceeds the 520 byte element ceiling
    pub fn is_oversized(&self) -> bool {
        self.data.len() > MAX_SCRIPT_ELEMENT_SIZE
    }

    /// Serialized length in bytes (opcode, length prefix, payload)
    pub fn serialized_size(&self) -> usize {
        let prefix = match self.opcode {
            Opcode::PushOneSize => 1,
            Opcode::PushTwoSize => 2,
            Opcode::PushFourSize => 4,
            _ => 0,
        };
        1 + prefix + self.data.len()
    }

    /// Append the wire encoding to `buffer`
    ///
    /// This is the encoding committed to by signature hashes, so it must be
    /// byte-exact: the opcode, its length prefix where one exists, then the
    /// payload.
    pub fn to_bytes(&self, buffer: &mut ByteString) {
        buffer.push(self.opcode.to_u8());
        match self.opcode {
            Opcode::PushOneSize => buffer.push(self.data.len() as u8),
            Opcode::PushTwoSize => buffer.extend_from_slice(&(self.data.len() as u16).to_le_bytes()),
            Opcode::PushFourSize => {
                buffer.extend_from_slice(&(self.data.len() as u32).to_le_bytes())
            }
            _ => {}
        }
        buffer.extend_from_slice(&self.data);
    }
}

/// An ordered sequence of operations attached to a transaction input or
/// output
///
/// Built by the external parser (or directly, in tests and builders); the
/// execution machinery only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    ops: Vec<Operation>,
}

impl Script {
    pub fn new(ops: Vec<Operation>) -> Self {
        Script { ops }
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Serialized length in bytes
    pub fn serialized_size(&self) -> usize {
        self.ops.iter().map(Operation::serialized_size).sum()
    }

    /// Wire encoding of the whole script
    pub fn to_bytes(&self) -> ByteString {
        let mut buffer = ByteString::with_capacity(self.serialized_size());
        for op in &self.ops {
            op.to_bytes(&mut buffer);
        }
        buffer
    }
}

impl From<Vec<Operation>> for Script {
    fn from(ops: Vec<Operation>) -> Self {
        Script::new(ops)
    }
}

impl FromIterator<Operation> for Script {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Script::new(iter.into_iter().collect())
    }
}
