//! CIL opcode byte constants (ECMA-335) for the instructions the assembler emits.
//!
//! Single-byte opcodes are named after their mnemonic (e.g. [`CALL`] = `0x28`).
//! Two-byte opcodes that use the `0xFE` prefix have their second byte stored with
//! an `FE_` prefix (e.g. [`FE_CEQ`] = `0x01` for `ceq`, encoded `0xFE 0x01`).
#![allow(missing_docs)]

// Misc
pub const NOP: u8 = 0x00;
pub const BREAK: u8 = 0x01;

// Argument / local shorthand
pub const LDARG_0: u8 = 0x02;
pub const LDLOC_0: u8 = 0x06;
pub const STLOC_0: u8 = 0x0A;
pub const LDARG_S: u8 = 0x0E;
pub const STARG_S: u8 = 0x10;
pub const LDLOC_S: u8 = 0x11;
pub const STLOC_S: u8 = 0x13;

// Constants
pub const LDNULL: u8 = 0x14;
pub const LDC_I4_M1: u8 = 0x15;
pub const LDC_I4_0: u8 = 0x16;
pub const LDC_I4_S: u8 = 0x1F;
pub const LDC_I4: u8 = 0x20;
pub const LDC_I8: u8 = 0x21;
pub const LDC_R8: u8 = 0x23;

// Stack manipulation
pub const DUP: u8 = 0x25;
pub const POP: u8 = 0x26;

// Calls and returns
pub const CALL: u8 = 0x28;
pub const RET: u8 = 0x2A;

// Branches (long form)
pub const BR: u8 = 0x38;
pub const BRFALSE: u8 = 0x39;
pub const BRTRUE: u8 = 0x3A;
pub const BEQ: u8 = 0x3B;
pub const BLT: u8 = 0x3F;
pub const SWITCH: u8 = 0x45;

// Arithmetic
pub const ADD: u8 = 0x58;
pub const SUB: u8 = 0x59;
pub const MUL: u8 = 0x5A;

// Conversions
pub const CONV_I4: u8 = 0x69;
pub const CONV_I8: u8 = 0x6A;
pub const CONV_R8: u8 = 0x6C;

// Object model
pub const CALLVIRT: u8 = 0x6F;
pub const NEWOBJ: u8 = 0x73;
pub const THROW: u8 = 0x7A;
pub const LDFLD: u8 = 0x7B;
pub const NEWARR: u8 = 0x8D;

// Two-byte opcodes (0xFE prefix)
pub const FE_PREFIX: u8 = 0xFE;
pub const FE_CEQ: u8 = 0x01;
pub const FE_CLT: u8 = 0x04;
pub const FE_LDARG: u8 = 0x09;
pub const FE_STARG: u8 = 0x0B;
pub const FE_LDLOC: u8 = 0x0C;
pub const FE_STLOC: u8 = 0x0E;
pub const FE_TAIL: u8 = 0x14;
