//! # blvm-script
//!
//! Bitcoin Script virtual machine: the number codec, the per-evaluation
//! execution state, and the opcode interpreter.
//!
//! Script validity is a consensus rule. Every validating node must produce
//! bit-identical accept/reject results for identical input, so this crate
//! reproduces the historical semantics exactly, quirks included: overflow
//! judged on encoded byte length rather than numeric range, negative zero
//! as a falsy stack value, disabled opcodes rejected even inside dead
//! branches, and the extra element consumed by CHECKMULTISIG.
//!
//! ## Architecture
//!
//! - [`number`]: minimal-encoding signed integer codec and stack
//!   truthiness
//! - [`program`]: the mutable evaluation state (primary, alternate, and
//!   conditional stacks, operation accumulator, subscript jump)
//! - [`interpreter`]: stateless opcode dispatch and the run loop
//! - [`sighash`]: the signature hash collaborator for the checksig family
//!
//! Evaluation is synchronous and allocation-bounded: the resource ceilings
//! in [`constants`] make every script terminate deterministically, so no
//! timeout or cancellation machinery exists here. Scripts arrive already
//! parsed; callers that validate raw transactions bring their own parser.
//!
//! ## Usage
//!
//! ```rust
//! use blvm_script::constants::forks;
//! use blvm_script::interpreter;
//! use blvm_script::opcodes::Opcode;
//! use blvm_script::operation::{Operation, Script};
//! use blvm_script::types::{OutPoint, Transaction, TransactionInput, TransactionOutput};
//!
//! let transaction = Transaction {
//!     version: 1,
//!     inputs: vec![TransactionInput {
//!         prevout: OutPoint { hash: [0; 32], index: 0 },
//!         script_sig: vec![],
//!         sequence: 0xffff_ffff,
//!     }],
//!     outputs: vec![TransactionOutput { value: 50_000, script_pubkey: vec![] }],
//!     lock_time: 0,
//! };
//!
//! let input_script = Script::new(vec![Operation::op(Opcode::PushPositive1)]);
//! let prevout_script = Script::new(vec![
//!     Operation::op(Opcode::PushPositive2),
//!     Operation::op(Opcode::Add),
//!     Operation::op(Opcode::PushPositive3),
//!     Operation::op(Opcode::Equal),
//! ]);
//!
//! interpreter::connect(&transaction, 0, &input_script, &prevout_script, forks::ALL)
//!     .expect("script connects");
//! ```

pub mod constants;
pub mod error;
pub mod interpreter;
pub mod number;
pub mod opcodes;
pub mod operation;
pub mod program;
pub mod serialization;
pub mod sighash;
pub mod types;

pub use error::{Result, ScriptError};
pub use interpreter::{connect, evaluate};
pub use number::{stack_to_bool, Number};
pub use opcodes::Opcode;
pub use operation::{Operation, Script};
pub use program::Program;
pub use types::{
    ByteString, Hash, OutPoint, ScriptVersion, Transaction, TransactionInput, TransactionOutput,
};
