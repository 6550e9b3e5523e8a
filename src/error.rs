//! Script evaluation error taxonomy
//!
//! Every failure mode is a value in one closed enum. A failure at any single
//! operation terminates that script evaluation with its code; the calling
//! validator treats any non-success code as "script invalid". Nothing at
//! this layer panics or produces user-facing text beyond the code itself.

use thiserror::Error;

/// Result codes for script evaluation failures
///
/// Evaluation is deterministic, so retrying cannot change the outcome and
/// there is no partial success.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    /// Serialized script exceeds the 10,000 byte ceiling
    #[error("script size limit exceeded")]
    ScriptSize,

    /// A push payload exceeds the 520 byte element ceiling
    #[error("push size limit exceeded")]
    PushSize,

    /// More than 201 counted operations in one evaluation
    #[error("operation count limit exceeded")]
    OpCount,

    /// Combined primary and alternate stack depth exceeds 1000
    #[error("stack size limit exceeded")]
    StackSize,

    /// Signature count outside `0..=key_count` in CHECKMULTISIG
    #[error("invalid signature count")]
    SigCount,

    /// Public key count outside `0..=20` in CHECKMULTISIG
    #[error("invalid public key count")]
    PubkeyCount,

    /// A disabled opcode appeared anywhere in the script
    ///
    /// Fatal regardless of branch liveness: dead code is still rejected.
    #[error("disabled opcode")]
    DisabledOpcode,

    /// A reserved opcode was executed in a live branch
    #[error("reserved opcode")]
    ReservedOpcode,

    /// ELSE or ENDIF without a matching IF, or an IF left open at the end
    #[error("unbalanced conditional")]
    UnbalancedConditional,

    /// Stack underflow or wrong shape for the executed opcode
    #[error("invalid stack operation")]
    InvalidStackOperation,

    /// Alternate stack underflow
    #[error("invalid alternate stack operation")]
    InvalidAltStackOperation,

    /// A number operand exceeded its maximum encoded length
    #[error("script number overflow")]
    NumberOverflow,

    /// OP_VERIFY popped a false value
    #[error("verify failed")]
    Verify,

    /// OP_EQUALVERIFY operands were not equal
    #[error("equal verify failed")]
    EqualVerify,

    /// OP_NUMEQUALVERIFY operands were not numerically equal
    #[error("numeric equal verify failed")]
    NumEqualVerify,

    /// OP_CHECKSIGVERIFY signature did not verify
    #[error("signature check verify failed")]
    CheckSigVerify,

    /// OP_CHECKMULTISIGVERIFY signatures did not verify
    #[error("multisignature check verify failed")]
    CheckMultisigVerify,

    /// CHECKLOCKTIMEVERIFY or CHECKSEQUENCEVERIFY operand was negative
    #[error("negative lock time")]
    NegativeLocktime,

    /// Lock time or sequence constraint not met by the transaction
    #[error("unsatisfied lock time")]
    UnsatisfiedLocktime,

    /// OP_RETURN executed in a live branch
    #[error("op_return")]
    OpReturn,

    /// Final stack was false after both script phases
    #[error("script evaluated to false")]
    EvalFalse,

    /// Final stack held more than the single true element required
    #[error("stack not clean at end of evaluation")]
    CleanStack,
}

pub type Result<T> = std::result::Result<T, ScriptError>;
