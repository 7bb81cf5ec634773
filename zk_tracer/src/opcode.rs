//! Static description of every EVM instruction as seen by the hub: the
//! instruction family deciding which section it produces, and the stack
//! pattern deciding which stack operations it performs.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoStaticStr};

/// A decoded EVM instruction. Bytes without an assigned instruction decode to
/// [`OpCode::Invalid`], together with the designated `INVALID` (`0xfe`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCode {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    Smod,
    Addmod,
    Mulmod,
    Exp,
    Signextend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    Iszero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Sha3,
    Address,
    Balance,
    Origin,
    Caller,
    Callvalue,
    Calldataload,
    Calldatasize,
    Calldatacopy,
    Codesize,
    Codecopy,
    Gasprice,
    Extcodesize,
    Extcodecopy,
    Returndatasize,
    Returndatacopy,
    Extcodehash,
    Blockhash,
    Coinbase,
    Timestamp,
    Number,
    Prevrandao,
    Gaslimit,
    Chainid,
    Selfbalance,
    Basefee,
    Pop,
    Mload,
    Mstore,
    Mstore8,
    Sload,
    Sstore,
    Jump,
    Jumpi,
    Pc,
    Msize,
    Gas,
    Jumpdest,
    /// `PUSH0` to `PUSH32`.
    Push(u8),
    /// `DUP1` to `DUP16`.
    Dup(u8),
    /// `SWAP1` to `SWAP16`.
    Swap(u8),
    /// `LOG0` to `LOG4`.
    Log(u8),
    Create,
    Call,
    Callcode,
    Return,
    Delegatecall,
    Create2,
    Staticcall,
    Revert,
    Invalid(u8),
    Selfdestruct,
}

impl From<u8> for OpCode {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => OpCode::Stop,
            0x01 => OpCode::Add,
            0x02 => OpCode::Mul,
            0x03 => OpCode::Sub,
            0x04 => OpCode::Div,
            0x05 => OpCode::Sdiv,
            0x06 => OpCode::Mod,
            0x07 => OpCode::Smod,
            0x08 => OpCode::Addmod,
            0x09 => OpCode::Mulmod,
            0x0a => OpCode::Exp,
            0x0b => OpCode::Signextend,
            0x10 => OpCode::Lt,
            0x11 => OpCode::Gt,
            0x12 => OpCode::Slt,
            0x13 => OpCode::Sgt,
            0x14 => OpCode::Eq,
            0x15 => OpCode::Iszero,
            0x16 => OpCode::And,
            0x17 => OpCode::Or,
            0x18 => OpCode::Xor,
            0x19 => OpCode::Not,
            0x1a => OpCode::Byte,
            0x1b => OpCode::Shl,
            0x1c => OpCode::Shr,
            0x1d => OpCode::Sar,
            0x20 => OpCode::Sha3,
            0x30 => OpCode::Address,
            0x31 => OpCode::Balance,
            0x32 => OpCode::Origin,
            0x33 => OpCode::Caller,
            0x34 => OpCode::Callvalue,
            0x35 => OpCode::Calldataload,
            0x36 => OpCode::Calldatasize,
            0x37 => OpCode::Calldatacopy,
            0x38 => OpCode::Codesize,
            0x39 => OpCode::Codecopy,
            0x3a => OpCode::Gasprice,
            0x3b => OpCode::Extcodesize,
            0x3c => OpCode::Extcodecopy,
            0x3d => OpCode::Returndatasize,
            0x3e => OpCode::Returndatacopy,
            0x3f => OpCode::Extcodehash,
            0x40 => OpCode::Blockhash,
            0x41 => OpCode::Coinbase,
            0x42 => OpCode::Timestamp,
            0x43 => OpCode::Number,
            0x44 => OpCode::Prevrandao,
            0x45 => OpCode::Gaslimit,
            0x46 => OpCode::Chainid,
            0x47 => OpCode::Selfbalance,
            0x48 => OpCode::Basefee,
            0x50 => OpCode::Pop,
            0x51 => OpCode::Mload,
            0x52 => OpCode::Mstore,
            0x53 => OpCode::Mstore8,
            0x54 => OpCode::Sload,
            0x55 => OpCode::Sstore,
            0x56 => OpCode::Jump,
            0x57 => OpCode::Jumpi,
            0x58 => OpCode::Pc,
            0x59 => OpCode::Msize,
            0x5a => OpCode::Gas,
            0x5b => OpCode::Jumpdest,
            0x5f..=0x7f => OpCode::Push(byte - 0x5f),
            0x80..=0x8f => OpCode::Dup(byte - 0x7f),
            0x90..=0x9f => OpCode::Swap(byte - 0x8f),
            0xa0..=0xa4 => OpCode::Log(byte - 0xa0),
            0xf0 => OpCode::Create,
            0xf1 => OpCode::Call,
            0xf2 => OpCode::Callcode,
            0xf3 => OpCode::Return,
            0xf4 => OpCode::Delegatecall,
            0xf5 => OpCode::Create2,
            0xfa => OpCode::Staticcall,
            0xfd => OpCode::Revert,
            0xff => OpCode::Selfdestruct,
            _ => OpCode::Invalid(byte),
        }
    }
}

impl OpCode {
    /// The byte this instruction is encoded with.
    pub const fn byte(self) -> u8 {
        match self {
            OpCode::Stop => 0x00,
            OpCode::Add => 0x01,
            OpCode::Mul => 0x02,
            OpCode::Sub => 0x03,
            OpCode::Div => 0x04,
            OpCode::Sdiv => 0x05,
            OpCode::Mod => 0x06,
            OpCode::Smod => 0x07,
            OpCode::Addmod => 0x08,
            OpCode::Mulmod => 0x09,
            OpCode::Exp => 0x0a,
            OpCode::Signextend => 0x0b,
            OpCode::Lt => 0x10,
            OpCode::Gt => 0x11,
            OpCode::Slt => 0x12,
            OpCode::Sgt => 0x13,
            OpCode::Eq => 0x14,
            OpCode::Iszero => 0x15,
            OpCode::And => 0x16,
            OpCode::Or => 0x17,
            OpCode::Xor => 0x18,
            OpCode::Not => 0x19,
            OpCode::Byte => 0x1a,
            OpCode::Shl => 0x1b,
            OpCode::Shr => 0x1c,
            OpCode::Sar => 0x1d,
            OpCode::Sha3 => 0x20,
            OpCode::Address => 0x30,
            OpCode::Balance => 0x31,
            OpCode::Origin => 0x32,
            OpCode::Caller => 0x33,
            OpCode::Callvalue => 0x34,
            OpCode::Calldataload => 0x35,
            OpCode::Calldatasize => 0x36,
            OpCode::Calldatacopy => 0x37,
            OpCode::Codesize => 0x38,
            OpCode::Codecopy => 0x39,
            OpCode::Gasprice => 0x3a,
            OpCode::Extcodesize => 0x3b,
            OpCode::Extcodecopy => 0x3c,
            OpCode::Returndatasize => 0x3d,
            OpCode::Returndatacopy => 0x3e,
            OpCode::Extcodehash => 0x3f,
            OpCode::Blockhash => 0x40,
            OpCode::Coinbase => 0x41,
            OpCode::Timestamp => 0x42,
            OpCode::Number => 0x43,
            OpCode::Prevrandao => 0x44,
            OpCode::Gaslimit => 0x45,
            OpCode::Chainid => 0x46,
            OpCode::Selfbalance => 0x47,
            OpCode::Basefee => 0x48,
            OpCode::Pop => 0x50,
            OpCode::Mload => 0x51,
            OpCode::Mstore => 0x52,
            OpCode::Mstore8 => 0x53,
            OpCode::Sload => 0x54,
            OpCode::Sstore => 0x55,
            OpCode::Jump => 0x56,
            OpCode::Jumpi => 0x57,
            OpCode::Pc => 0x58,
            OpCode::Msize => 0x59,
            OpCode::Gas => 0x5a,
            OpCode::Jumpdest => 0x5b,
            OpCode::Push(n) => 0x5f + n,
            OpCode::Dup(n) => 0x7f + n,
            OpCode::Swap(n) => 0x8f + n,
            OpCode::Log(n) => 0xa0 + n,
            OpCode::Create => 0xf0,
            OpCode::Call => 0xf1,
            OpCode::Callcode => 0xf2,
            OpCode::Return => 0xf3,
            OpCode::Delegatecall => 0xf4,
            OpCode::Create2 => 0xf5,
            OpCode::Staticcall => 0xfa,
            OpCode::Revert => 0xfd,
            OpCode::Invalid(byte) => byte,
            OpCode::Selfdestruct => 0xff,
        }
    }

    pub const fn family(self) -> InstructionFamily {
        use InstructionFamily as F;

        match self {
            OpCode::Add | OpCode::Sub => F::Add,
            OpCode::Mul | OpCode::Exp => F::Mul,
            OpCode::Div | OpCode::Sdiv | OpCode::Mod | OpCode::Smod => F::Mod,
            OpCode::Addmod | OpCode::Mulmod => F::Ext,
            OpCode::Lt | OpCode::Gt | OpCode::Slt | OpCode::Sgt | OpCode::Eq | OpCode::Iszero => {
                F::Wcp
            }
            OpCode::And
            | OpCode::Or
            | OpCode::Xor
            | OpCode::Not
            | OpCode::Byte
            | OpCode::Signextend => F::Bin,
            OpCode::Shl | OpCode::Shr | OpCode::Sar => F::Shf,
            OpCode::Sha3 => F::Kec,
            OpCode::Address
            | OpCode::Caller
            | OpCode::Callvalue
            | OpCode::Calldatasize
            | OpCode::Codesize
            | OpCode::Returndatasize => F::Context,
            OpCode::Balance | OpCode::Extcodesize | OpCode::Extcodehash | OpCode::Selfbalance => {
                F::Account
            }
            OpCode::Calldatacopy
            | OpCode::Codecopy
            | OpCode::Extcodecopy
            | OpCode::Returndatacopy => F::Copy,
            OpCode::Origin | OpCode::Gasprice => F::Transaction,
            OpCode::Blockhash
            | OpCode::Coinbase
            | OpCode::Timestamp
            | OpCode::Number
            | OpCode::Prevrandao
            | OpCode::Gaslimit
            | OpCode::Chainid
            | OpCode::Basefee => F::Batch,
            OpCode::Calldataload | OpCode::Mload | OpCode::Mstore | OpCode::Mstore8 => F::StackRam,
            OpCode::Sload | OpCode::Sstore => F::Storage,
            OpCode::Jump | OpCode::Jumpi => F::Jump,
            OpCode::Pc | OpCode::Msize | OpCode::Gas | OpCode::Jumpdest => F::MachineState,
            OpCode::Push(_) | OpCode::Pop => F::PushPop,
            OpCode::Dup(_) => F::Dup,
            OpCode::Swap(_) => F::Swap,
            OpCode::Log(_) => F::Log,
            OpCode::Create | OpCode::Create2 => F::Create,
            OpCode::Call | OpCode::Callcode | OpCode::Delegatecall | OpCode::Staticcall => F::Call,
            OpCode::Stop | OpCode::Return | OpCode::Revert | OpCode::Selfdestruct => F::Halt,
            OpCode::Invalid(_) => F::Invalid,
        }
    }

    pub fn stack_settings(self) -> StackSettings {
        use StackPattern as P;

        let s = StackSettings::new;
        match self {
            OpCode::Stop => s(P::ZeroZero, 0, 0).flag(3),
            OpCode::Add
            | OpCode::Mul
            | OpCode::Sub
            | OpCode::Div
            | OpCode::Sdiv
            | OpCode::Mod
            | OpCode::Smod
            | OpCode::Exp
            | OpCode::Signextend
            | OpCode::Lt
            | OpCode::Gt
            | OpCode::Slt
            | OpCode::Sgt
            | OpCode::Eq
            | OpCode::And
            | OpCode::Or
            | OpCode::Xor
            | OpCode::Byte
            | OpCode::Shl
            | OpCode::Shr
            | OpCode::Sar
            | OpCode::Sha3 => s(P::TwoOne, 2, 1),
            OpCode::Addmod | OpCode::Mulmod => s(P::ThreeOne, 3, 1),
            OpCode::Iszero | OpCode::Not | OpCode::Blockhash => s(P::OneOne, 1, 1),
            OpCode::Balance | OpCode::Extcodesize | OpCode::Extcodehash => {
                s(P::OneOne, 1, 1).trimming()
            }
            OpCode::Address
            | OpCode::Origin
            | OpCode::Caller
            | OpCode::Callvalue
            | OpCode::Calldatasize
            | OpCode::Codesize
            | OpCode::Gasprice
            | OpCode::Returndatasize
            | OpCode::Coinbase
            | OpCode::Timestamp
            | OpCode::Number
            | OpCode::Prevrandao
            | OpCode::Gaslimit
            | OpCode::Chainid
            | OpCode::Basefee
            | OpCode::Pc
            | OpCode::Msize
            | OpCode::Gas
            | OpCode::Push(_) => s(P::ZeroOne, 0, 1),
            OpCode::Selfbalance => s(P::ZeroOne, 0, 1).flag(1),
            OpCode::Calldataload => s(P::LoadStore, 1, 1).flag(2),
            OpCode::Mload | OpCode::Sload => s(P::LoadStore, 1, 1),
            OpCode::Mstore | OpCode::Mstore8 => s(P::LoadStore, 2, 0).flag(1),
            OpCode::Sstore => s(P::LoadStore, 2, 0).flag(1).forbidden_in_static(),
            OpCode::Calldatacopy | OpCode::Codecopy | OpCode::Returndatacopy => s(P::Copy, 3, 0),
            OpCode::Extcodecopy => s(P::Copy, 4, 0).flag(1).trimming(),
            OpCode::Pop | OpCode::Jump => s(P::OneZero, 1, 0),
            OpCode::Jumpi => s(P::TwoZero, 2, 0).flag(1),
            OpCode::Jumpdest => s(P::ZeroZero, 0, 0),
            OpCode::Dup(n) => s(P::Dup, n, n + 1),
            OpCode::Swap(n) => s(P::Swap, n + 1, n + 1),
            OpCode::Log(n) => s(P::Log, n + 2, 0).two_lines().forbidden_in_static(),
            OpCode::Create => s(P::Create, 3, 1).two_lines().forbidden_in_static(),
            OpCode::Create2 => s(P::Create, 4, 1)
                .two_lines()
                .flag(1)
                .forbidden_in_static(),
            OpCode::Call => s(P::Call, 7, 1).two_lines().flag(1).trimming(),
            OpCode::Callcode => s(P::Call, 7, 1).two_lines().flag(2).trimming(),
            OpCode::Delegatecall => s(P::Call, 6, 1).two_lines().flag(3).trimming(),
            OpCode::Staticcall => s(P::Call, 6, 1).two_lines().flag(4).trimming(),
            OpCode::Return => s(P::TwoZero, 2, 0).flag(1),
            OpCode::Revert => s(P::TwoZero, 2, 0).flag(2),
            OpCode::Selfdestruct => s(P::OneZero, 1, 0)
                .flag(4)
                .trimming()
                .forbidden_in_static(),
            OpCode::Invalid(_) => s(P::ZeroZero, 0, 0),
        }
    }

    pub const fn is_halt(self) -> bool {
        matches!(self.family(), InstructionFamily::Halt)
    }

    pub const fn is_invalid(self) -> bool {
        matches!(self, OpCode::Invalid(_))
    }

    pub const fn is_create(self) -> bool {
        matches!(self, OpCode::Create | OpCode::Create2)
    }

    pub const fn is_call(self) -> bool {
        matches!(
            self,
            OpCode::Call | OpCode::Callcode | OpCode::Delegatecall | OpCode::Staticcall
        )
    }

    /// Number of immediate bytes following the instruction in the bytecode.
    pub const fn immediate_size(self) -> usize {
        match self {
            OpCode::Push(n) => n as usize,
            _ => 0,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpCode::Push(n) => write!(f, "PUSH{n}"),
            OpCode::Dup(n) => write!(f, "DUP{n}"),
            OpCode::Swap(n) => write!(f, "SWAP{n}"),
            OpCode::Log(n) => write!(f, "LOG{n}"),
            OpCode::Invalid(byte) => write!(f, "INVALID({byte:#04x})"),
            other => write!(f, "{}", format!("{other:?}").to_uppercase()),
        }
    }
}

/// Groups of instructions sharing the same section layout.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumCount, EnumIter, IntoStaticStr, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InstructionFamily {
    Add,
    Mod,
    Mul,
    Ext,
    Wcp,
    Bin,
    Shf,
    Kec,
    Context,
    Account,
    Copy,
    Transaction,
    Batch,
    StackRam,
    Storage,
    Jump,
    MachineState,
    PushPop,
    Dup,
    Swap,
    Log,
    Create,
    Call,
    Halt,
    Invalid,
}

/// Shapes of the stack lines an instruction produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StackPattern {
    ZeroZero,
    OneZero,
    TwoZero,
    ZeroOne,
    OneOne,
    TwoOne,
    ThreeOne,
    LoadStore,
    Dup,
    Swap,
    Log,
    Copy,
    Call,
    Create,
}

/// How an instruction consumes and produces stack items.
///
/// The meaning of the four flags depends on the family:
/// - `Account`: flag 1 when the target is the executing account.
/// - `Copy`: flag 1 when copying the code of a foreign account.
/// - `StackRam`, `Storage`: flag 1 for stores, flag 2 when call data is read.
/// - `Jump`: flag 1 for `JUMPI`.
/// - `Create`: flag 1 for `CREATE2`.
/// - `Call`: one flag per `CALL`, `CALLCODE`, `DELEGATECALL`, `STATICCALL`.
/// - `Halt`: one flag per `RETURN`, `REVERT`, `STOP`, `SELFDESTRUCT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackSettings {
    pub pattern: StackPattern,
    /// Number of items read from the stack.
    pub delta: u8,
    /// Number of items written to the stack.
    pub alpha: u8,
    pub two_lines: bool,
    pub flags: [bool; 4],
    /// Whether the first stack item is an address to be trimmed to 20 bytes.
    pub address_trimming: bool,
    /// Whether the instruction modifies state, and thus cannot run in a
    /// static context.
    pub forbidden_in_static: bool,
}

impl StackSettings {
    const fn new(pattern: StackPattern, delta: u8, alpha: u8) -> Self {
        Self {
            pattern,
            delta,
            alpha,
            two_lines: false,
            flags: [false; 4],
            address_trimming: false,
            forbidden_in_static: false,
        }
    }

    fn flag(mut self, n: usize) -> Self {
        self.flags[n - 1] = true;
        self
    }

    fn two_lines(mut self) -> Self {
        self.two_lines = true;
        self
    }

    fn trimming(mut self) -> Self {
        self.address_trimming = true;
        self
    }

    fn forbidden_in_static(mut self) -> Self {
        self.forbidden_in_static = true;
        self
    }

    pub const fn flag1(&self) -> bool {
        self.flags[0]
    }

    pub const fn flag2(&self) -> bool {
        self.flags[1]
    }

    pub const fn flag3(&self) -> bool {
        self.flags[2]
    }

    pub const fn flag4(&self) -> bool {
        self.flags[3]
    }

    /// Number of stack lines the instruction occupies.
    pub const fn line_count(&self) -> usize {
        if self.two_lines {
            2
        } else {
            1
        }
    }
}
