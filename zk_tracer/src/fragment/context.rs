use ethereum_types::{Address, U256};

use crate::callstack::{CallFrame, CallStack};
use crate::error::HubError;
use crate::trace::{Column, Trace};

/// A view of an execution context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextFragment {
    pub context_number: usize,
    pub depth: usize,
    pub is_root: bool,
    pub is_static: bool,
    pub account_address: Address,
    pub account_deployment_number: usize,
    pub byte_code_address: Address,
    pub byte_code_deployment_number: usize,
    pub byte_code_deployment_status: bool,
    pub caller_address: Address,
    pub caller_context_number: usize,
    pub call_value: U256,
    pub call_data_size: usize,
    pub return_data_size: usize,
    /// Whether the instruction updates the context's return data.
    pub update: bool,
    pub returner_context_number: usize,
}

impl ContextFragment {
    pub fn from_frame(frame: &CallFrame, call_stack: &CallStack, update: bool) -> Self {
        let caller_context_number = call_stack
            .parent(frame)
            .map(|parent| parent.context_number)
            .unwrap_or_default();
        let returner_context_number = frame
            .last_called_child
            .and_then(|id| call_stack.by_id(id).ok())
            .map(|child| child.context_number)
            .unwrap_or_default();

        Self {
            context_number: frame.context_number,
            depth: frame.depth,
            is_root: frame.is_root(),
            is_static: frame.is_static(),
            account_address: frame.address,
            account_deployment_number: frame.address_deployment_number,
            byte_code_address: frame.code_address,
            byte_code_deployment_number: frame.code_deployment_number,
            byte_code_deployment_status: frame.code_deployment_status,
            caller_address: frame.parent_address,
            caller_context_number,
            call_value: frame.value,
            call_data_size: frame.call_data.len(),
            return_data_size: frame.return_data.len(),
            update,
            returner_context_number,
        }
    }

    pub(crate) fn trace(&self, trace: &mut Trace) -> Result<(), HubError> {
        trace.set(Column::CtxContextNumber, self.context_number)?;
        trace.set(Column::CtxCallStackDepth, self.depth)?;
        trace.set(Column::CtxIsRoot, self.is_root)?;
        trace.set(Column::CtxIsStatic, self.is_static)?;
        trace.set(Column::CtxAccountAddress, self.account_address)?;
        trace.set(
            Column::CtxAccountDeploymentNumber,
            self.account_deployment_number,
        )?;
        trace.set(Column::CtxByteCodeAddress, self.byte_code_address)?;
        trace.set(
            Column::CtxByteCodeDeploymentNumber,
            self.byte_code_deployment_number,
        )?;
        trace.set(
            Column::CtxByteCodeDeploymentStatus,
            self.byte_code_deployment_status,
        )?;
        trace.set(Column::CtxCallerAddress, self.caller_address)?;
        trace.set(Column::CtxCallerContextNumber, self.caller_context_number)?;
        trace.set(Column::CtxCallValue, self.call_value)?;
        trace.set(Column::CtxCallDataSize, self.call_data_size)?;
        trace.set(Column::CtxReturnDataSize, self.return_data_size)?;
        trace.set(Column::CtxUpdate, self.update)?;
        trace.set(
            Column::CtxReturnerContextNumber,
            self.returner_context_number,
        )?;

        Ok(())
    }
}
