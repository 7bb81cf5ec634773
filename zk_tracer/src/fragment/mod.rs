//! Fragments are typed partial rows. Each row of the hub trace is made of the
//! common columns, shared by every row of a section, and of exactly one
//! fragment filling the columns of its perspective.

mod account;
mod context;
mod copy;
mod stack;
mod storage;
mod transaction;

pub use account::{AccountFragment, AccountSnapshot};
pub use context::ContextFragment;
pub use copy::CopyFragment;
use enum_as_inner::EnumAsInner;
use ethereum_types::Address;
pub use stack::StackFragment;
pub use storage::StorageFragment;
pub use transaction::TransactionFragment;

use crate::error::HubError;
use crate::exceptions::Exceptions;
use crate::trace::{Column, Perspective, Trace};
use crate::transaction::{TxEndMetadata, TxState};

/// Data only known once the transaction is over, provided when rows are
/// emitted.
#[derive(Clone, Copy, Debug)]
pub struct RetconView<'a> {
    pub tx: &'a TxEndMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq, EnumAsInner)]
pub enum TraceFragment {
    Stack(StackFragment),
    Account(AccountFragment),
    Context(ContextFragment),
    Storage(StorageFragment),
    Transaction(TransactionFragment),
    Copy(CopyFragment),
}

impl TraceFragment {
    pub fn perspective(&self) -> Perspective {
        match self {
            TraceFragment::Stack(_) => Perspective::Stack,
            TraceFragment::Account(_) => Perspective::Account,
            TraceFragment::Context(_) => Perspective::Context,
            TraceFragment::Storage(_) => Perspective::Storage,
            TraceFragment::Transaction(_) => Perspective::Transaction,
            TraceFragment::Copy(_) => Perspective::Copy,
        }
    }

    pub(crate) fn trace(&self, trace: &mut Trace, view: &RetconView) -> Result<(), HubError> {
        let perspective = self.perspective();
        trace.set(Column::PeekAtStack, perspective == Perspective::Stack)?;
        trace.set(Column::PeekAtAccount, perspective == Perspective::Account)?;
        trace.set(Column::PeekAtContext, perspective == Perspective::Context)?;
        trace.set(Column::PeekAtStorage, perspective == Perspective::Storage)?;
        trace.set(
            Column::PeekAtTransaction,
            perspective == Perspective::Transaction,
        )?;
        trace.set(Column::PeekAtCopy, perspective == Perspective::Copy)?;

        match self {
            TraceFragment::Stack(f) => f.trace(trace),
            TraceFragment::Account(f) => f.trace(trace),
            TraceFragment::Context(f) => f.trace(trace),
            TraceFragment::Storage(f) => f.trace(trace),
            TraceFragment::Transaction(f) => f.trace(trace, view),
            TraceFragment::Copy(f) => f.trace(trace),
        }
    }
}

/// Columns shared by every row of a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommonFragment {
    pub tx_number: usize,
    pub batch_number: usize,
    pub tx_state: TxState,
    pub stamp: usize,
    pub exceptions: Exceptions,
    pub context_number: usize,
    pub caller_context_number: usize,
    pub pc: usize,
    pub code_address: Address,
    pub code_deployment_number: usize,
    pub code_deployment_status: bool,
    pub two_line_instruction: bool,
}

/// Fields of a section fixed by the post-transaction pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectionRetcon {
    pub context_number_new: usize,
    pub pc_new: usize,
    pub will_revert: bool,
    pub gets_reverted: bool,
    pub self_reverts: bool,
    pub revert_stamp: usize,
}

/// Position of a row within its section.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct LineCounters {
    pub counter_tli: usize,
    pub non_stack_rows: usize,
    pub counter_nsr: usize,
}

impl CommonFragment {
    pub(crate) fn trace(
        &self,
        trace: &mut Trace,
        retcon: &SectionRetcon,
        counters: LineCounters,
        view: &RetconView,
    ) -> Result<(), HubError> {
        trace.set(Column::AbsoluteTransactionNumber, self.tx_number)?;
        trace.set(Column::BatchNumber, self.batch_number)?;
        trace.set(Column::TxSkip, self.tx_state == TxState::Skip)?;
        trace.set(Column::TxWarm, self.tx_state == TxState::Warm)?;
        trace.set(Column::TxInit, self.tx_state == TxState::Init)?;
        trace.set(Column::TxExec, self.tx_state == TxState::Exec)?;
        trace.set(Column::TxFinl, self.tx_state == TxState::Final)?;
        trace.set(Column::HubStamp, self.stamp)?;
        trace.set(Column::HubStampTransactionEnd, view.tx.hub_stamp_end)?;
        trace.set(Column::TransactionReverts, !view.tx.success)?;
        trace.set(Column::ExceptionAhoy, self.exceptions.any())?;
        trace.set(Column::ContextNumber, self.context_number)?;
        trace.set(Column::ContextNumberNew, retcon.context_number_new)?;
        trace.set(Column::CallerContextNumber, self.caller_context_number)?;
        trace.set(Column::ContextWillRevert, retcon.will_revert)?;
        trace.set(Column::ContextGetsReverted, retcon.gets_reverted)?;
        trace.set(Column::ContextSelfReverts, retcon.self_reverts)?;
        trace.set(Column::ContextRevertStamp, retcon.revert_stamp)?;
        trace.set(Column::ProgramCounter, self.pc)?;
        trace.set(Column::ProgramCounterNew, retcon.pc_new)?;
        trace.set(Column::CodeAddress, self.code_address)?;
        trace.set(Column::CodeDeploymentNumber, self.code_deployment_number)?;
        trace.set(Column::CodeDeploymentStatus, self.code_deployment_status)?;
        trace.set(Column::TwoLineInstruction, self.two_line_instruction)?;
        trace.set(Column::CounterTli, counters.counter_tli)?;
        trace.set(Column::NumberOfNonStackRows, counters.non_stack_rows)?;
        trace.set(Column::CounterNsr, counters.counter_nsr)?;

        Ok(())
    }
}
