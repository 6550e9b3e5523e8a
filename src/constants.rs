//! Script engine consensus constants
//!
//! Every limit here is a consensus rule: two nodes disagreeing on any of
//! these values will disagree on script validity and fork.
//!
//! Reference: Bitcoin Core `script/script.h`

/// Maximum combined depth of the primary and alternate stacks
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum size of a single stack element in bytes
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum number of counted (non-push) operations per script evaluation
///
/// Push opcodes and small literal pushes are excluded from the counted set.
/// CHECKMULTISIG additionally counts one operation per evaluated public key.
pub const MAX_SCRIPT_OPS: usize = 201;

/// Maximum number of public keys in a single CHECKMULTISIG
pub const MAX_SCRIPT_PUBLIC_KEYS: usize = 20;

/// Maximum serialized script length in bytes
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum encoded byte length of a script number operand for arithmetic
pub const MAX_NUMBER_SIZE: usize = 4;

/// Widened operand length for CHECKLOCKTIMEVERIFY and CHECKSEQUENCEVERIFY
///
/// Lock times and sequence numbers are full 32-bit unsigned values, which do
/// not fit the 4-byte signed operand domain, so these two opcodes decode a
/// 5-byte number instead.
pub const MAX_EXTENDED_NUMBER_SIZE: usize = 5;

/// Lock time boundary between block heights and Unix timestamps
///
/// Lock times below this value are block heights; at or above it they are
/// Unix timestamps. CHECKLOCKTIMEVERIFY requires the operand and the
/// transaction lock time to be on the same side of this boundary.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Sequence value that opts an input out of lock time enforcement
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// BIP68: sequence bit that disables relative lock time for an input
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;

/// BIP68: sequence bit selecting time-based (vs height-based) relative locks
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;

/// BIP68: mask extracting the relative lock time value from a sequence
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;

/// Active soft-fork rule bits for one script evaluation
///
/// Historical validation replays blocks under the rule set that was active
/// at their height, so the caller selects the forks per evaluation.
pub mod forks {
    /// BIP16: pay-to-script-hash evaluation
    pub const BIP16: u32 = 1 << 0;

    /// BIP65: CHECKLOCKTIMEVERIFY (absolute lock time)
    pub const BIP65: u32 = 1 << 1;

    /// BIP66: strict DER signature encoding
    pub const BIP66: u32 = 1 << 2;

    /// BIP112: CHECKSEQUENCEVERIFY (relative lock time)
    pub const BIP112: u32 = 1 << 3;

    /// BIP141: segregated witness program evaluation
    pub const BIP141: u32 = 1 << 4;

    /// BIP143: version 0 witness signature hash algorithm
    pub const BIP143: u32 = 1 << 5;

    /// All soft-fork rules active (tip validation)
    pub const ALL: u32 = BIP16 | BIP65 | BIP66 | BIP112 | BIP141 | BIP143;

    /// No soft-fork rules active (genesis rule set)
    pub const NONE: u32 = 0;
}
