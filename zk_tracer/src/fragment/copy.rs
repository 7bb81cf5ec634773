use ethereum_types::{Address, U256};

use crate::error::HubError;
use crate::opcode::OpCode;
use crate::trace::{Column, Trace};

/// Instruction handed over to the memory-copy engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyFragment {
    pub instruction: OpCode,
    /// Context whose call data or return data is read, zero when copying
    /// code.
    pub source_context: usize,
    /// Account whose code is read, zero when copying context data.
    pub source_address: Address,
    pub target_context: usize,
    pub source_offset: U256,
    pub target_offset: U256,
    pub size: U256,
}

impl CopyFragment {
    pub(crate) fn trace(&self, trace: &mut Trace) -> Result<(), HubError> {
        trace.set(Column::CopyInstruction, self.instruction.byte())?;
        trace.set(Column::CopySourceContext, self.source_context)?;
        trace.set(Column::CopySourceAddress, self.source_address)?;
        trace.set(Column::CopyTargetContext, self.target_context)?;
        trace.set(Column::CopySourceOffset, self.source_offset)?;
        trace.set(Column::CopyTargetOffset, self.target_offset)?;
        trace.set(Column::CopySize, self.size)?;

        Ok(())
    }
}
