use bytes::Bytes;
use ethereum_types::{Address, U256};

use super::stack::Stack;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallFrameType {
    /// Root frame of a message-call transaction.
    Root,
    Standard,
    Static,
    /// Frame running initialization code, including the root frame of a
    /// contract-creation transaction.
    InitCode,
}

/// One call or create activation.
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Position of the frame in its [`super::CallStack`].
    pub id: usize,
    pub context_number: usize,
    pub parent_id: Option<usize>,
    pub children: Vec<usize>,
    pub last_called_child: Option<usize>,
    pub depth: usize,
    pub frame_type: CallFrameType,

    /// The account whose storage and balance the frame acts upon.
    pub address: Address,
    pub address_deployment_number: usize,
    /// The account whose code the frame executes.
    pub code_address: Address,
    pub code_deployment_number: usize,
    pub code_deployment_status: bool,
    pub parent_address: Address,
    pub code: Bytes,
    pub value: U256,
    pub gas_endowment: u64,
    pub call_data: Bytes,
    /// Data returned to this frame by its last child.
    pub return_data: Bytes,
    /// Data this frame hands back to its parent.
    pub output_data: Bytes,

    /// Hub stamp at which the frame was entered.
    pub start_stamp: usize,
    /// Last line of the transaction trace written before the frame was
    /// closed.
    pub end_line: Option<usize>,
    /// Hub stamp at which the frame reverted, either on its own or because
    /// an ancestor did.
    pub revert_stamp: Option<usize>,
    /// Whether the revert originated in this frame.
    pub self_reverts: bool,

    pub stack: Stack,
}

impl CallFrame {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_deployment(&self) -> bool {
        self.frame_type == CallFrameType::InitCode
    }

    pub fn is_static(&self) -> bool {
        self.frame_type == CallFrameType::Static
    }

    pub fn will_revert(&self) -> bool {
        self.revert_stamp.is_some()
    }

    /// Whether the frame reverted because one of its ancestors did.
    pub fn gets_reverted(&self) -> bool {
        self.will_revert() && !self.self_reverts
    }

    pub fn is_closed(&self) -> bool {
        self.end_line.is_some()
    }
}

/// What [`super::CallStack::enter`] needs to open a frame.
#[derive(Clone, Debug, Default)]
pub struct FrameSpec {
    pub address: Address,
    pub address_deployment_number: usize,
    pub code_address: Address,
    pub code_deployment_number: usize,
    pub code_deployment_status: bool,
    pub code: Bytes,
    pub value: U256,
    pub gas: u64,
    pub call_data: Bytes,
    pub is_static: bool,
    pub is_deployment: bool,
    pub context_number: usize,
    pub stamp: usize,
}
