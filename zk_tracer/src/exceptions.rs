use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::callstack::StackStatus;
use crate::config::HubConfig;
use crate::opcode::OpCode;
use crate::util::u256_to_usize_saturating;
use crate::world::{HaltReason, MessageFrame};

bitflags! {
    /// EVM exceptions raised by an instruction, or by the way a frame exits.
    ///
    /// These are regular execution outcomes: they drive revert marking and
    /// section selection, and never abort tracing.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Exceptions: u16 {
        const INVALID_OPCODE = 1 << 0;
        const STACK_UNDERFLOW = 1 << 1;
        const STACK_OVERFLOW = 1 << 2;
        const OUT_OF_GAS = 1 << 3;
        const RETURN_DATA_OVERFLOW = 1 << 4;
        const JUMP_FAULT = 1 << 5;
        const STATIC_FAULT = 1 << 6;
        const INVALID_CODE_PREFIX = 1 << 7;
        const CODE_SIZE_OVERFLOW = 1 << 8;
        const PRECOMPILE_FAILURE = 1 << 9;

        const STACK_EXCEPTIONS = Self::STACK_UNDERFLOW.bits() | Self::STACK_OVERFLOW.bits();
    }
}

/// First byte forbidden at the start of deployed code (EIP-3541).
const EOF_PREFIX: u8 = 0xef;

impl Exceptions {
    /// Exceptions detectable before the instruction executes.
    pub fn from_frame(
        frame: &dyn MessageFrame,
        opcode: OpCode,
        stack_status: StackStatus,
    ) -> Self {
        let mut exceptions = match stack_status {
            StackStatus::Normal => Exceptions::empty(),
            StackStatus::Underflow => Exceptions::STACK_UNDERFLOW,
            StackStatus::Overflow => Exceptions::STACK_OVERFLOW,
        };

        if opcode.is_invalid() {
            exceptions |= Exceptions::INVALID_OPCODE;
        }

        // Operands cannot be inspected on a broken stack.
        if !exceptions.is_empty() {
            return exceptions;
        }

        if frame.is_static() && Self::modifies_state(frame, opcode) {
            exceptions |= Exceptions::STATIC_FAULT;
        }

        if frame.upfront_gas_cost() > frame.remaining_gas() {
            exceptions |= Exceptions::OUT_OF_GAS;
        }

        match opcode {
            OpCode::Jump => {
                if !frame.is_valid_jump_destination(frame.stack_item(0)) {
                    exceptions |= Exceptions::JUMP_FAULT;
                }
            }
            OpCode::Jumpi => {
                if !frame.stack_item(1).is_zero()
                    && !frame.is_valid_jump_destination(frame.stack_item(0))
                {
                    exceptions |= Exceptions::JUMP_FAULT;
                }
            }
            OpCode::Returndatacopy => {
                let offset = u256_to_usize_saturating(frame.stack_item(1));
                let size = u256_to_usize_saturating(frame.stack_item(2));
                if offset.saturating_add(size) > frame.return_data().len() {
                    exceptions |= Exceptions::RETURN_DATA_OVERFLOW;
                }
            }
            _ => {}
        }

        exceptions
    }

    /// Exceptions raised by how a frame exits, independently of its last
    /// instruction: the code returned by initialization code must be
    /// deployable.
    pub fn from_exit(frame: &dyn MessageFrame, config: &HubConfig) -> Self {
        let mut exceptions = Exceptions::empty();
        let output = frame.output_data();

        if output.first() == Some(&EOF_PREFIX) {
            exceptions |= Exceptions::INVALID_CODE_PREFIX;
        }
        if output.len() > config.max_code_size {
            exceptions |= Exceptions::CODE_SIZE_OVERFLOW;
        }

        exceptions
    }

    pub fn from_halt_reason(reason: HaltReason) -> Self {
        match reason {
            HaltReason::OutOfGas => Exceptions::OUT_OF_GAS,
            HaltReason::InvalidOperation => Exceptions::INVALID_OPCODE,
            HaltReason::StackUnderflow => Exceptions::STACK_UNDERFLOW,
            HaltReason::StackOverflow => Exceptions::STACK_OVERFLOW,
            HaltReason::InvalidJumpDestination => Exceptions::JUMP_FAULT,
            HaltReason::IllegalStateChange => Exceptions::STATIC_FAULT,
            HaltReason::InvalidReturnDataBufferAccess => Exceptions::RETURN_DATA_OVERFLOW,
            HaltReason::CodeSizeTooLarge => Exceptions::CODE_SIZE_OVERFLOW,
            HaltReason::InvalidCode => Exceptions::INVALID_CODE_PREFIX,
            HaltReason::PrecompileError => Exceptions::PRECOMPILE_FAILURE,
        }
    }

    pub fn any(&self) -> bool {
        !self.is_empty()
    }

    pub fn no_stack_exception(&self) -> bool {
        !self.intersects(Exceptions::STACK_EXCEPTIONS)
    }

    fn modifies_state(frame: &dyn MessageFrame, opcode: OpCode) -> bool {
        match opcode {
            // Value-bearing calls are the only calls a static frame cannot
            // perform.
            OpCode::Call => !frame.stack_item(2).is_zero(),
            _ => opcode.stack_settings().forbidden_in_static,
        }
    }
}
