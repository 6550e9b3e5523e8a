//! Bitcoin Script opcode catalogue
//!
//! The complete set of defined opcodes (0x00 through 0xb9) as a closed enum,
//! with the classification predicates the interpreter dispatches on. Raw
//! bytes above 0xb9 name no operation and are rejected by the parser, so
//! they have no representation here.
//!
//! Reference: Bitcoin Core `script/script.h` and BIP specifications

macro_rules! opcodes {
    ($($(#[$meta:meta])* $name:ident = $value:literal,)*) => {
        /// A single Script instruction code
        ///
        /// Discriminants are the wire byte values. Push opcodes (0x00-0x60
        /// excluding the reserved 0x50) place data on the stack; everything
        /// above 0x60 is a counted operation.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Opcode {
            $($(#[$meta])* $name = $value,)*
        }

        impl Opcode {
            /// Map a raw byte to its opcode, if one is defined
            pub const fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Opcode::$name),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    // ========================================================================
    // Push opcodes (0x00 - 0x60): direct pushes carry 0-75 literal bytes in
    // the opcode itself; the three push-data variants carry a length prefix.
    // ========================================================================

    /// Push an empty byte string (OP_0 / OP_FALSE)
    PushSize0 = 0x00,
    PushSize1 = 0x01,
    PushSize2 = 0x02,
    PushSize3 = 0x03,
    PushSize4 = 0x04,
    PushSize5 = 0x05,
    PushSize6 = 0x06,
    PushSize7 = 0x07,
    PushSize8 = 0x08,
    PushSize9 = 0x09,
    PushSize10 = 0x0a,
    PushSize11 = 0x0b,
    PushSize12 = 0x0c,
    PushSize13 = 0x0d,
    PushSize14 = 0x0e,
    PushSize15 = 0x0f,
    PushSize16 = 0x10,
    PushSize17 = 0x11,
    PushSize18 = 0x12,
    PushSize19 = 0x13,
    PushSize20 = 0x14,
    PushSize21 = 0x15,
    PushSize22 = 0x16,
    PushSize23 = 0x17,
    PushSize24 = 0x18,
    PushSize25 = 0x19,
    PushSize26 = 0x1a,
    PushSize27 = 0x1b,
    PushSize28 = 0x1c,
    PushSize29 = 0x1d,
    PushSize30 = 0x1e,
    PushSize31 = 0x1f,
    PushSize32 = 0x20,
    PushSize33 = 0x21,
    PushSize34 = 0x22,
    PushSize35 = 0x23,
    PushSize36 = 0x24,
    PushSize37 = 0x25,
    PushSize38 = 0x26,
    PushSize39 = 0x27,
    PushSize40 = 0x28,
    PushSize41 = 0x29,
    PushSize42 = 0x2a,
    PushSize43 = 0x2b,
    PushSize44 = 0x2c,
    PushSize45 = 0x2d,
    PushSize46 = 0x2e,
    PushSize47 = 0x2f,
    PushSize48 = 0x30,
    PushSize49 = 0x31,
    PushSize50 = 0x32,
    PushSize51 = 0x33,
    PushSize52 = 0x34,
    PushSize53 = 0x35,
    PushSize54 = 0x36,
    PushSize55 = 0x37,
    PushSize56 = 0x38,
    PushSize57 = 0x39,
    PushSize58 = 0x3a,
    PushSize59 = 0x3b,
    PushSize60 = 0x3c,
    PushSize61 = 0x3d,
    PushSize62 = 0x3e,
    PushSize63 = 0x3f,
    PushSize64 = 0x40,
    PushSize65 = 0x41,
    PushSize66 = 0x42,
    PushSize67 = 0x43,
    PushSize68 = 0x44,
    PushSize69 = 0x45,
    PushSize70 = 0x46,
    PushSize71 = 0x47,
    PushSize72 = 0x48,
    PushSize73 = 0x49,
    PushSize74 = 0x4a,
    PushSize75 = 0x4b,

    /// OP_PUSHDATA1: next byte is the payload length
    PushOneSize = 0x4c,
    /// OP_PUSHDATA2: next two bytes (little-endian) are the payload length
    PushTwoSize = 0x4d,
    /// OP_PUSHDATA4: next four bytes (little-endian) are the payload length
    PushFourSize = 0x4e,

    /// OP_1NEGATE: push the number -1
    PushNegative1 = 0x4f,

    /// OP_RESERVED: fails the script if executed
    Reserved80 = 0x50,

    /// OP_1 / OP_TRUE: push the number 1
    PushPositive1 = 0x51,
    /// OP_2
    PushPositive2 = 0x52,
    /// OP_3
    PushPositive3 = 0x53,
    /// OP_4
    PushPositive4 = 0x54,
    /// OP_5
    PushPositive5 = 0x55,
    /// OP_6
    PushPositive6 = 0x56,
    /// OP_7
    PushPositive7 = 0x57,
    /// OP_8
    PushPositive8 = 0x58,
    /// OP_9
    PushPositive9 = 0x59,
    /// OP_10
    PushPositive10 = 0x5a,
    /// OP_11
    PushPositive11 = 0x5b,
    /// OP_12
    PushPositive12 = 0x5c,
    /// OP_13
    PushPositive13 = 0x5d,
    /// OP_14
    PushPositive14 = 0x5e,
    /// OP_15
    PushPositive15 = 0x5f,
    /// OP_16
    PushPositive16 = 0x60,

    // ========================================================================
    // Control flow (0x61 - 0x6a)
    // ========================================================================

    /// OP_NOP: no operation
    Nop = 0x61,
    /// OP_VER: fails the script if executed
    Ver = 0x62,
    /// OP_IF: execute the branch if the popped value is true
    If = 0x63,
    /// OP_NOTIF: execute the branch if the popped value is false
    NotIf = 0x64,
    /// OP_VERIF: disabled, fails the script even in a dead branch
    VerIf = 0x65,
    /// OP_VERNOTIF: disabled, fails the script even in a dead branch
    VerNotIf = 0x66,
    /// OP_ELSE: flip the innermost branch
    Else = 0x67,
    /// OP_ENDIF: close the innermost branch
    EndIf = 0x68,
    /// OP_VERIFY: fail unless the popped value is true
    Verify = 0x69,
    /// OP_RETURN: fail the script unconditionally
    Return = 0x6a,

    // ========================================================================
    // Stack operations (0x6b - 0x7d)
    // ========================================================================

    /// OP_TOALTSTACK: move the top element to the alternate stack
    ToAltStack = 0x6b,
    /// OP_FROMALTSTACK: move the alternate stack top back
    FromAltStack = 0x6c,
    /// OP_2DROP: remove the top two elements
    Drop2 = 0x6d,
    /// OP_2DUP: duplicate the top two elements
    Dup2 = 0x6e,
    /// OP_3DUP: duplicate the top three elements
    Dup3 = 0x6f,
    /// OP_2OVER: copy the pair two places back to the top
    Over2 = 0x70,
    /// OP_2ROT: move the fifth and sixth elements to the top
    Rot2 = 0x71,
    /// OP_2SWAP: swap the top two pairs
    Swap2 = 0x72,
    /// OP_IFDUP: duplicate the top element if it is true
    IfDup = 0x73,
    /// OP_DEPTH: push the primary stack depth
    Depth = 0x74,
    /// OP_DROP: remove the top element
    Drop = 0x75,
    /// OP_DUP: duplicate the top element
    Dup = 0x76,
    /// OP_NIP: remove the second element
    Nip = 0x77,
    /// OP_OVER: copy the second element to the top
    Over = 0x78,
    /// OP_PICK: copy the nth element to the top
    Pick = 0x79,
    /// OP_ROLL: move the nth element to the top
    Roll = 0x7a,
    /// OP_ROT: rotate the top three elements left
    Rot = 0x7b,
    /// OP_SWAP: swap the top two elements
    Swap = 0x7c,
    /// OP_TUCK: copy the top element below the second
    Tuck = 0x7d,

    // ========================================================================
    // Splice (0x7e - 0x82): all disabled except OP_SIZE
    // ========================================================================

    /// OP_CAT: disabled
    Cat = 0x7e,
    /// OP_SUBSTR: disabled
    Substr = 0x7f,
    /// OP_LEFT: disabled
    Left = 0x80,
    /// OP_RIGHT: disabled
    Right = 0x81,
    /// OP_SIZE: push the byte length of the top element without popping it
    Size = 0x82,

    // ========================================================================
    // Bitwise logic (0x83 - 0x8a): all disabled except equality
    // ========================================================================

    /// OP_INVERT: disabled
    Invert = 0x83,
    /// OP_AND: disabled
    And = 0x84,
    /// OP_OR: disabled
    Or = 0x85,
    /// OP_XOR: disabled
    Xor = 0x86,
    /// OP_EQUAL: push whether the top two elements are byte-equal
    Equal = 0x87,
    /// OP_EQUALVERIFY: fail unless the top two elements are byte-equal
    EqualVerify = 0x88,
    /// OP_RESERVED1: fails the script if executed
    Reserved137 = 0x89,
    /// OP_RESERVED2: fails the script if executed
    Reserved138 = 0x8a,

    // ========================================================================
    // Arithmetic (0x8b - 0xa5): 4-byte operand domain
    // ========================================================================

    /// OP_1ADD: add one
    Add1 = 0x8b,
    /// OP_1SUB: subtract one
    Sub1 = 0x8c,
    /// OP_2MUL: disabled
    Mul2 = 0x8d,
    /// OP_2DIV: disabled
    Div2 = 0x8e,
    /// OP_NEGATE: negate
    Negate = 0x8f,
    /// OP_ABS: absolute value
    Abs = 0x90,
    /// OP_NOT: 1 if zero, else 0
    Not = 0x91,
    /// OP_0NOTEQUAL: 0 if zero, else 1
    NonZero = 0x92,
    /// OP_ADD
    Add = 0x93,
    /// OP_SUB
    Sub = 0x94,
    /// OP_MUL: disabled
    Mul = 0x95,
    /// OP_DIV: disabled
    Div = 0x96,
    /// OP_MOD: disabled
    Mod = 0x97,
    /// OP_LSHIFT: disabled
    LShift = 0x98,
    /// OP_RSHIFT: disabled
    RShift = 0x99,
    /// OP_BOOLAND
    BoolAnd = 0x9a,
    /// OP_BOOLOR
    BoolOr = 0x9b,
    /// OP_NUMEQUAL
    NumEqual = 0x9c,
    /// OP_NUMEQUALVERIFY
    NumEqualVerify = 0x9d,
    /// OP_NUMNOTEQUAL
    NumNotEqual = 0x9e,
    /// OP_LESSTHAN
    LessThan = 0x9f,
    /// OP_GREATERTHAN
    GreaterThan = 0xa0,
    /// OP_LESSTHANOREQUAL
    LessThanOrEqual = 0xa1,
    /// OP_GREATERTHANOREQUAL
    GreaterThanOrEqual = 0xa2,
    /// OP_MIN
    Min = 0xa3,
    /// OP_MAX
    Max = 0xa4,
    /// OP_WITHIN: 1 if lower <= value < upper
    Within = 0xa5,

    // ========================================================================
    // Crypto (0xa6 - 0xaf)
    // ========================================================================

    /// OP_RIPEMD160
    Ripemd160 = 0xa6,
    /// OP_SHA1
    Sha1 = 0xa7,
    /// OP_SHA256
    Sha256 = 0xa8,
    /// OP_HASH160: RIPEMD160(SHA256(x))
    Hash160 = 0xa9,
    /// OP_HASH256: SHA256(SHA256(x))
    Hash256 = 0xaa,
    /// OP_CODESEPARATOR: start the signed subscript after this position
    CodeSeparator = 0xab,
    /// OP_CHECKSIG
    CheckSig = 0xac,
    /// OP_CHECKSIGVERIFY
    CheckSigVerify = 0xad,
    /// OP_CHECKMULTISIG
    CheckMultisig = 0xae,
    /// OP_CHECKMULTISIGVERIFY
    CheckMultisigVerify = 0xaf,

    // ========================================================================
    // Expansion (0xb0 - 0xb9): upgradeable no-ops
    // ========================================================================

    /// OP_NOP1
    Nop1 = 0xb0,
    /// OP_CHECKLOCKTIMEVERIFY (OP_NOP2 before BIP65)
    CheckLocktimeVerify = 0xb1,
    /// OP_CHECKSEQUENCEVERIFY (OP_NOP3 before BIP112)
    CheckSequenceVerify = 0xb2,
    /// OP_NOP4
    Nop4 = 0xb3,
    /// OP_NOP5
    Nop5 = 0xb4,
    /// OP_NOP6
    Nop6 = 0xb5,
    /// OP_NOP7
    Nop7 = 0xb6,
    /// OP_NOP8
    Nop8 = 0xb7,
    /// OP_NOP9
    Nop9 = 0xb8,
    /// OP_NOP10
    Nop10 = 0xb9,
}

impl Opcode {
    /// Wire byte value
    #[inline]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Opcode places data on the stack (excludes the reserved 0x50 slot)
    #[inline]
    pub fn is_push(self) -> bool {
        self.to_u8() <= Opcode::PushPositive16.to_u8() && self != Opcode::Reserved80
    }

    /// Opcode counts toward the 201 operation ceiling
    #[inline]
    pub fn is_counted(self) -> bool {
        self.to_u8() > Opcode::PushPositive16.to_u8()
    }

    /// Direct push whose payload length is the opcode value (1-75 bytes)
    #[inline]
    pub fn is_push_size(self) -> bool {
        (Opcode::PushSize1.to_u8()..=Opcode::PushSize75.to_u8()).contains(&self.to_u8())
    }

    /// Push with an explicit length prefix (OP_PUSHDATA1/2/4)
    #[inline]
    pub fn is_push_data(self) -> bool {
        matches!(
            self,
            Opcode::PushOneSize | Opcode::PushTwoSize | Opcode::PushFourSize
        )
    }

    /// Opcode carries a literal payload attached by the parser
    #[inline]
    pub fn carries_data(self) -> bool {
        self.is_push_size() || self.is_push_data()
    }

    /// Conditional opcodes are evaluated even inside a dead branch
    #[inline]
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Opcode::If | Opcode::NotIf | Opcode::Else | Opcode::EndIf
        )
    }

    /// Disabled opcodes fail the script wherever they appear
    #[inline]
    pub fn is_disabled(self) -> bool {
        matches!(
            self,
            Opcode::VerIf
                | Opcode::VerNotIf
                | Opcode::Cat
                | Opcode::Substr
                | Opcode::Left
                | Opcode::Right
                | Opcode::Invert
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
                | Opcode::Mul2
                | Opcode::Div2
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::LShift
                | Opcode::RShift
        )
    }

    /// Reserved opcodes fail only when executed in a live branch
    #[inline]
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            Opcode::Reserved80 | Opcode::Ver | Opcode::Reserved137 | Opcode::Reserved138
        )
    }
}
