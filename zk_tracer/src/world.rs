//! The interface the hub expects from the EVM interpreter driving it.
//!
//! The interpreter exposes its world state through [`WorldView`] at
//! transaction boundaries, and its currently executing frame through
//! [`MessageFrame`] at every instruction and context boundary.

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hashbrown::HashMap;
use keccak_hash::keccak;
use serde::{Deserialize, Serialize};
use zk_tracer_common::EMPTY_CODE_HASH;

use crate::util::hex_bytes;

/// An account as stored in the state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    #[serde(with = "hex_bytes", default)]
    pub code: Bytes,
}

impl AccountState {
    pub fn code_hash(&self) -> H256 {
        if self.code.is_empty() {
            EMPTY_CODE_HASH
        } else {
            keccak(&self.code)
        }
    }

    pub fn code_size(&self) -> usize {
        self.code.len()
    }

    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }
}

/// Read-only access to the world state.
pub trait WorldView {
    /// Returns the account at `address`, or `None` if it does not exist.
    fn account(&self, address: Address) -> Option<AccountState>;

    /// Returns the value stored at `key` for `address`, zero if unset.
    fn storage(&self, address: Address, key: U256) -> U256;
}

/// Whether a frame runs existing code or initialization code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageFrameType {
    #[default]
    MessageCall,
    ContractCreation,
}

/// Reasons for which the interpreter aborted an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    OutOfGas,
    InvalidOperation,
    StackUnderflow,
    StackOverflow,
    InvalidJumpDestination,
    IllegalStateChange,
    InvalidReturnDataBufferAccess,
    CodeSizeTooLarge,
    InvalidCode,
    PrecompileError,
}

/// Outcome of an instruction, reported after its side effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub gas_cost: u64,
    #[serde(default)]
    pub halt_reason: Option<HaltReason>,
}

impl OperationResult {
    pub const fn success(gas_cost: u64) -> Self {
        Self {
            gas_cost,
            halt_reason: None,
        }
    }

    pub const fn halted(gas_cost: u64, reason: HaltReason) -> Self {
        Self {
            gas_cost,
            halt_reason: Some(reason),
        }
    }
}

/// The interpreter's view of the currently executing frame.
///
/// Stack items are indexed from the top: `stack_item(0)` is the top of the
/// stack. Items past the bottom of the stack read as zero.
pub trait MessageFrame {
    fn frame_type(&self) -> MessageFrameType;

    /// Call depth, zero for the root frame of a transaction.
    fn depth(&self) -> usize;

    /// The instruction about to execute, or that just executed.
    fn opcode(&self) -> u8;

    fn pc(&self) -> usize;

    fn stack_size(&self) -> usize;

    fn stack_item(&self, offset: usize) -> U256;

    /// The account whose storage and balance this frame acts upon.
    fn recipient_address(&self) -> Address;

    /// The account whose code this frame executes.
    fn contract_address(&self) -> Address;

    fn sender_address(&self) -> Address;

    fn code(&self) -> Bytes;

    fn value(&self) -> U256;

    fn remaining_gas(&self) -> u64;

    fn input_data(&self) -> Bytes;

    /// Data returned by the last child of this frame.
    fn return_data(&self) -> Bytes;

    /// Data this frame returns to its caller.
    fn output_data(&self) -> Bytes;

    fn is_static(&self) -> bool;

    /// The current state of an account, as modified by execution so far.
    fn account(&self, address: Address) -> Option<AccountState>;

    fn storage_value(&self, address: Address, key: U256) -> U256;

    fn is_address_warm(&self, address: Address) -> bool;

    fn is_storage_warm(&self, address: Address, key: U256) -> bool;

    /// Gas charged for the current instruction before it executes.
    fn upfront_gas_cost(&self) -> u64;

    fn is_valid_jump_destination(&self, destination: U256) -> bool;

    /// `size` bytes of memory from `offset`, zero-padded past its end.
    fn memory_slice(&self, offset: usize, size: usize) -> Bytes;
}

/// A log emitted by a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<H256>,
    #[serde(with = "hex_bytes", default)]
    pub data: Bytes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListEntry {
    pub address: Address,
    #[serde(default)]
    pub storage_keys: Vec<U256>,
}

/// A transaction as submitted to the interpreter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    /// `None` for contract creations.
    #[serde(default)]
    pub to: Option<Address>,
    pub nonce: u64,
    #[serde(default)]
    pub value: U256,
    pub gas_limit: u64,
    #[serde(default)]
    pub gas_price: U256,
    /// Call data, or initialization code for contract creations.
    #[serde(with = "hex_bytes", default)]
    pub payload: Bytes,
    #[serde(default)]
    pub access_list: Vec<AccessListEntry>,
}

impl Transaction {
    pub fn is_deployment(&self) -> bool {
        self.to.is_none()
    }

    /// The explicit recipient, or the address of the created contract.
    pub fn effective_to(&self) -> Address {
        self.to
            .unwrap_or_else(|| zk_tracer_common::contract_address(self.sender, self.nonce))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub coinbase: Address,
    #[serde(default)]
    pub base_fee: U256,
}

/// An in-memory world state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryWorld {
    #[serde(default)]
    pub accounts: HashMap<Address, AccountState>,
    #[serde(default)]
    pub storage: HashMap<Address, HashMap<U256, U256>>,
}

impl MemoryWorld {
    pub fn with_account(mut self, address: Address, account: AccountState) -> Self {
        self.accounts.insert(address, account);
        self
    }

    pub fn with_storage(mut self, address: Address, key: U256, value: U256) -> Self {
        self.storage.entry(address).or_default().insert(key, value);
        self
    }
}

impl WorldView for MemoryWorld {
    fn account(&self, address: Address) -> Option<AccountState> {
        self.accounts.get(&address).cloned()
    }

    fn storage(&self, address: Address, key: U256) -> U256 {
        self.storage
            .get(&address)
            .and_then(|slots| slots.get(&key))
            .copied()
            .unwrap_or_default()
    }
}
