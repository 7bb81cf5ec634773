//! Recorded callback streams.
//!
//! A [`ReplayEvent`] sequence is what an interpreter would feed the hub while
//! executing a conflation, with every frame captured as a [`SnapshotFrame`].
//! Streams serialize to JSON and can be replayed against a fresh hub with
//! [`run`].

use bytes::Bytes;
use ethereum_types::{Address, U256};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::HubError;
use crate::hub::Hub;
use crate::util::hex_bytes;
use crate::world::{
    AccountState, BlockHeader, LogEntry, MemoryWorld, MessageFrame, MessageFrameType,
    OperationResult, Transaction, WorldView,
};

/// A frame captured at one point of its execution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotFrame {
    pub frame_type: MessageFrameType,
    pub depth: usize,
    pub opcode: u8,
    pub pc: usize,
    /// Operand stack, top first.
    pub stack: Vec<U256>,
    pub recipient: Address,
    pub contract: Address,
    pub sender: Address,
    #[serde(with = "hex_bytes")]
    pub code: Bytes,
    pub value: U256,
    pub remaining_gas: u64,
    #[serde(with = "hex_bytes")]
    pub input_data: Bytes,
    #[serde(with = "hex_bytes")]
    pub return_data: Bytes,
    #[serde(with = "hex_bytes")]
    pub output_data: Bytes,
    #[serde(with = "hex_bytes")]
    pub memory: Bytes,
    pub is_static: bool,
    /// State of the world as seen by the frame.
    pub world: MemoryWorld,
    pub warm_addresses: HashSet<Address>,
    pub warm_slots: HashSet<(Address, U256)>,
    pub upfront_gas_cost: u64,
    pub jump_destinations: HashSet<U256>,
}

impl MessageFrame for SnapshotFrame {
    fn frame_type(&self) -> MessageFrameType {
        self.frame_type
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn opcode(&self) -> u8 {
        self.opcode
    }

    fn pc(&self) -> usize {
        self.pc
    }

    fn stack_size(&self) -> usize {
        self.stack.len()
    }

    fn stack_item(&self, offset: usize) -> U256 {
        self.stack.get(offset).copied().unwrap_or_default()
    }

    fn recipient_address(&self) -> Address {
        self.recipient
    }

    fn contract_address(&self) -> Address {
        self.contract
    }

    fn sender_address(&self) -> Address {
        self.sender
    }

    fn code(&self) -> Bytes {
        self.code.clone()
    }

    fn value(&self) -> U256 {
        self.value
    }

    fn remaining_gas(&self) -> u64 {
        self.remaining_gas
    }

    fn input_data(&self) -> Bytes {
        self.input_data.clone()
    }

    fn return_data(&self) -> Bytes {
        self.return_data.clone()
    }

    fn output_data(&self) -> Bytes {
        self.output_data.clone()
    }

    fn is_static(&self) -> bool {
        self.is_static
    }

    fn account(&self, address: Address) -> Option<AccountState> {
        self.world.account(address)
    }

    fn storage_value(&self, address: Address, key: U256) -> U256 {
        self.world.storage(address, key)
    }

    fn is_address_warm(&self, address: Address) -> bool {
        self.warm_addresses.contains(&address)
    }

    fn is_storage_warm(&self, address: Address, key: U256) -> bool {
        self.warm_slots.contains(&(address, key))
    }

    fn upfront_gas_cost(&self) -> u64 {
        self.upfront_gas_cost
    }

    fn is_valid_jump_destination(&self, destination: U256) -> bool {
        self.jump_destinations.contains(&destination)
    }

    fn memory_slice(&self, offset: usize, size: usize) -> Bytes {
        let mut slice = vec![0u8; size];
        if offset < self.memory.len() {
            let end = self.memory.len().min(offset.saturating_add(size));
            slice[..end - offset].copy_from_slice(&self.memory[offset..end]);
        }
        Bytes::from(slice)
    }
}

/// One callback of the interpreter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    StartConflation,
    StartBlock {
        block: BlockHeader,
    },
    StartTransaction {
        world: MemoryWorld,
        tx: Transaction,
    },
    ContextEnter {
        frame: SnapshotFrame,
    },
    /// An instruction about to execute.
    Instruction {
        frame: SnapshotFrame,
    },
    PostExecution {
        frame: SnapshotFrame,
        result: OperationResult,
    },
    ContextExit {
        frame: SnapshotFrame,
    },
    EndTransaction {
        world: MemoryWorld,
        tx: Transaction,
        success: bool,
        #[serde(with = "hex_bytes", default)]
        output: Bytes,
        #[serde(default)]
        logs: Vec<LogEntry>,
        gas_used: u64,
    },
    EndConflation,
}

/// Feeds `events` to `hub`, stopping at the first fatal error.
pub fn run<'a>(
    hub: &mut Hub,
    events: impl IntoIterator<Item = &'a ReplayEvent>,
) -> Result<(), HubError> {
    for event in events {
        match event {
            ReplayEvent::StartConflation => hub.trace_start_conflation(),
            ReplayEvent::StartBlock { block } => hub.trace_start_block(block),
            ReplayEvent::StartTransaction { world, tx } => hub.trace_start_tx(world, tx)?,
            ReplayEvent::ContextEnter { frame } => hub.trace_context_enter(frame)?,
            ReplayEvent::Instruction { frame } => hub.trace(frame)?,
            ReplayEvent::PostExecution { frame, result } => {
                hub.trace_post_execution(frame, *result)?
            }
            ReplayEvent::ContextExit { frame } => hub.trace_context_exit(frame)?,
            ReplayEvent::EndTransaction {
                world,
                tx,
                success,
                output,
                logs,
                gas_used,
            } => hub.trace_end_tx(world, tx, *success, output, logs, *gas_used)?,
            ReplayEvent::EndConflation => hub.trace_end_conflation()?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reads_are_zero_padded() {
        let frame = SnapshotFrame {
            memory: Bytes::from_static(&[1, 2, 3]),
            ..Default::default()
        };
        assert_eq!(frame.memory_slice(1, 4), Bytes::from_static(&[2, 3, 0, 0]));
        assert_eq!(frame.memory_slice(8, 2), Bytes::from_static(&[0, 0]));
        assert_eq!(frame.stack_item(3), U256::zero());
    }

    #[test]
    fn events_read_from_json() {
        let json = r#"[
            { "event": "start_conflation" },
            { "event": "start_block", "block": { "number": 7, "coinbase": "0x00000000000000000000000000000000000000c0" } },
            { "event": "instruction", "frame": { "opcode": 1, "stack": ["0x2", "0x3"] } },
            { "event": "end_conflation" }
        ]"#;
        let events: Vec<ReplayEvent> = serde_json::from_str(json).unwrap();
        assert_eq!(events.len(), 4);
        let ReplayEvent::Instruction { frame } = &events[2] else {
            panic!("expected an instruction");
        };
        assert_eq!(frame.stack_item(1), U256::from(3));
        assert_eq!(frame.frame_type, MessageFrameType::MessageCall);
    }
}
