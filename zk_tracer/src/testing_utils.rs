//! A set of utility functions and constants to be used by `zk_tracer` unit
//! and integration tests.

use bytes::Bytes;
use env_logger::{try_init_from_env, Env, DEFAULT_FILTER_ENV};
use ethereum_types::{Address, H160, U256};

use crate::error::HubError;
use crate::hub::Hub;
use crate::opcode::OpCode;
use crate::replay::SnapshotFrame;
use crate::world::{
    AccountState, BlockHeader, MemoryWorld, MessageFrameType, OperationResult, Transaction,
};

/// Gas available to frames built by [`FrameBuilder`] unless told otherwise.
pub const DEFAULT_FRAME_GAS: u64 = 1_000_000;

pub const SENDER: Address = H160([0x5e; 20]);
pub const COINBASE: Address = H160([0xc0; 20]);

pub fn init_logger() {
    let _ = try_init_from_env(Env::default().filter_or(DEFAULT_FILTER_ENV, "info"));
}

/// Shorthand for the address `0x00..00{n}`.
pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

/// An externally owned account holding `balance` wei.
pub fn eoa(balance: u64) -> AccountState {
    AccountState {
        nonce: 0,
        balance: U256::from(balance),
        code: Bytes::new(),
    }
}

/// A contract account running `code`.
pub fn contract(code: &[u8]) -> AccountState {
    AccountState {
        nonce: 1,
        balance: U256::zero(),
        code: Bytes::copy_from_slice(code),
    }
}

/// An address as pushed on the stack.
pub fn word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

/// First block of a conflation, mined by [`COINBASE`].
pub fn block() -> BlockHeader {
    BlockHeader {
        number: 1,
        coinbase: COINBASE,
        base_fee: U256::from(7),
    }
}

/// Runs one successful instruction, `pre` being the frame about to execute
/// it and `post` the frame once it has.
pub fn step(hub: &mut Hub, pre: &SnapshotFrame, post: &SnapshotFrame) -> Result<(), HubError> {
    hub.trace(pre)?;
    hub.trace_post_execution(post, OperationResult::success(3))
}

/// A message call from [`SENDER`] to `to`.
pub fn call_tx(to: Address, nonce: u64) -> Transaction {
    Transaction {
        sender: SENDER,
        to: Some(to),
        nonce,
        gas_limit: 100_000,
        gas_price: U256::one(),
        ..Default::default()
    }
}

/// A contract creation from [`SENDER`] running `init_code`.
pub fn deployment_tx(init_code: &[u8], nonce: u64) -> Transaction {
    Transaction {
        sender: SENDER,
        to: None,
        nonce,
        gas_limit: 100_000,
        gas_price: U256::one(),
        payload: Bytes::copy_from_slice(init_code),
        ..Default::default()
    }
}

/// Builds [`SnapshotFrame`]s for tests.
#[derive(Clone, Debug)]
pub struct FrameBuilder {
    frame: SnapshotFrame,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            frame: SnapshotFrame {
                remaining_gas: DEFAULT_FRAME_GAS,
                ..Default::default()
            },
        }
    }

    pub fn opcode(mut self, opcode: OpCode) -> Self {
        self.frame.opcode = opcode.byte();
        self
    }

    pub fn pc(mut self, pc: usize) -> Self {
        self.frame.pc = pc;
        self
    }

    /// Sets the stack, top first.
    pub fn stack(mut self, items: &[u64]) -> Self {
        self.frame.stack = items.iter().copied().map(U256::from).collect();
        self
    }

    /// Sets the stack, top first.
    pub fn stack_words(mut self, items: &[U256]) -> Self {
        self.frame.stack = items.to_vec();
        self
    }

    /// A stack of `height` zeros.
    pub fn stack_height(mut self, height: usize) -> Self {
        self.frame.stack = vec![U256::zero(); height];
        self
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.frame.remaining_gas = gas;
        self
    }

    pub fn upfront(mut self, cost: u64) -> Self {
        self.frame.upfront_gas_cost = cost;
        self
    }

    pub fn is_static(mut self, is_static: bool) -> Self {
        self.frame.is_static = is_static;
        self
    }

    pub fn output(mut self, output: Vec<u8>) -> Self {
        self.frame.output_data = output.into();
        self
    }

    pub fn return_data(mut self, data: Vec<u8>) -> Self {
        self.frame.return_data = data.into();
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.frame.depth = depth;
        self
    }

    pub fn frame_type(mut self, frame_type: MessageFrameType) -> Self {
        self.frame.frame_type = frame_type;
        self
    }

    /// Makes the frame run the code of `address` on its own account.
    pub fn running(mut self, address: Address) -> Self {
        self.frame.recipient = address;
        self.frame.contract = address;
        self
    }

    pub fn sender(mut self, sender: Address) -> Self {
        self.frame.sender = sender;
        self
    }

    pub fn code(mut self, code: &[u8]) -> Self {
        self.frame.code = Bytes::copy_from_slice(code);
        self
    }

    pub fn value(mut self, value: u64) -> Self {
        self.frame.value = U256::from(value);
        self
    }

    pub fn memory(mut self, memory: &[u8]) -> Self {
        self.frame.memory = Bytes::copy_from_slice(memory);
        self
    }

    pub fn world(mut self, world: MemoryWorld) -> Self {
        self.frame.world = world;
        self
    }

    pub fn account(mut self, address: Address, account: AccountState) -> Self {
        self.frame.world.accounts.insert(address, account);
        self
    }

    pub fn warm(mut self, address: Address) -> Self {
        self.frame.warm_addresses.insert(address);
        self
    }

    pub fn warm_slot(mut self, address: Address, key: u64) -> Self {
        self.frame.warm_slots.insert((address, U256::from(key)));
        self
    }

    pub fn jump_destination(mut self, destination: u64) -> Self {
        self.frame.jump_destinations.insert(U256::from(destination));
        self
    }

    pub fn build(self) -> SnapshotFrame {
        self.frame
    }
}
