//! Accumulation of sections per transaction and of transactions per
//! conflation, each closed by a single retroactive correction pass.

use itertools::Itertools;

use crate::callstack::CallStack;
use crate::deployment::DeploymentInfo;
use crate::error::HubError;
use crate::fragment::{RetconView, TraceFragment};
use crate::section::TraceSection;
use crate::trace::Trace;
use crate::transaction::{TxEndMetadata, TxState};

/// Sections of the transaction being traced.
#[derive(Debug, Default)]
pub struct TxTrace {
    sections: Vec<TraceSection>,
    lines: usize,
    sealed: bool,
}

impl TxTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a section, returning its index.
    pub fn add(&mut self, section: TraceSection) -> Result<usize, HubError> {
        if self.sealed {
            return Err(HubError::TransactionAlreadySealed);
        }
        self.lines += section.line_count();
        self.sections.push(section);
        Ok(self.sections.len() - 1)
    }

    pub fn section_mut(&mut self, index: usize) -> Option<&mut TraceSection> {
        self.sections.get_mut(index)
    }

    pub fn sections(&self) -> &[TraceSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// Runs the post-transaction correction and closes the trace.
    ///
    /// Each section learns the context number and program counter of the
    /// section that follows it, and instruction sections learn whether their
    /// frame reverted. The correction can only run once.
    pub fn seal(
        &mut self,
        meta: TxEndMetadata,
        call_stack: &CallStack,
    ) -> Result<SealedTxTrace, HubError> {
        if self.sealed {
            return Err(HubError::TransactionAlreadySealed);
        }
        self.sealed = true;

        let mut sections = std::mem::take(&mut self.sections);

        let successors: Vec<_> = sections
            .iter()
            .tuple_windows()
            .map(|(_, next)| (next.common.context_number, next.common.pc))
            .chain(std::iter::once((0, 0)))
            .collect();

        for (section, (context_number_new, pc_new)) in sections.iter_mut().zip(successors) {
            section.retcon.context_number_new = context_number_new;
            section.retcon.pc_new = pc_new;

            if section.common.tx_state != TxState::Exec {
                continue;
            }
            let frame = call_stack.by_context_number(section.common.context_number)?;
            section.retcon.will_revert = frame.will_revert();
            section.retcon.gets_reverted = frame.gets_reverted();
            section.retcon.self_reverts = frame.self_reverts;
            section.retcon.revert_stamp = frame.revert_stamp.unwrap_or_default();
        }

        Ok(SealedTxTrace {
            sections,
            lines: self.lines,
            meta,
        })
    }
}

/// A transaction trace after its post-transaction correction.
#[derive(Clone, Debug)]
pub struct SealedTxTrace {
    sections: Vec<TraceSection>,
    lines: usize,
    meta: TxEndMetadata,
}

impl SealedTxTrace {
    pub fn sections(&self) -> &[TraceSection] {
        &self.sections
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn meta(&self) -> &TxEndMetadata {
        &self.meta
    }

    /// Records the deployment epochs of the end of the conflation on every
    /// account row.
    pub(crate) fn set_final_deployments(&mut self, deployments: &DeploymentInfo) {
        for section in &mut self.sections {
            for fragment in section.fragments_mut() {
                if let TraceFragment::Account(account) = fragment {
                    account.set_final_deployment(deployments);
                }
            }
        }
    }

    fn trace(&self, trace: &mut Trace) -> Result<(), HubError> {
        let view = RetconView { tx: &self.meta };
        for section in &self.sections {
            section.trace(trace, &view)?;
        }
        Ok(())
    }
}

/// Transactions of the conflation being traced.
#[derive(Debug, Default)]
pub struct ConflationTrace {
    transactions: Vec<SealedTxTrace>,
    sealed: bool,
}

impl ConflationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transaction, returning its index within the conflation.
    pub fn push(&mut self, tx: SealedTxTrace) -> Result<usize, HubError> {
        if self.sealed {
            return Err(HubError::ConflationAlreadySealed);
        }
        self.transactions.push(tx);
        Ok(self.transactions.len() - 1)
    }

    pub(crate) fn transaction_mut(&mut self, index: usize) -> Option<&mut SealedTxTrace> {
        self.transactions.get_mut(index)
    }

    pub fn transactions(&self) -> &[SealedTxTrace] {
        &self.transactions
    }

    pub fn line_count(&self) -> usize {
        self.transactions.iter().map(SealedTxTrace::line_count).sum()
    }

    /// Closes the conflation. Can only happen once.
    pub fn seal(&mut self, deployments: &DeploymentInfo) -> Result<SealedConflation, HubError> {
        if self.sealed {
            return Err(HubError::ConflationAlreadySealed);
        }
        self.sealed = true;

        Ok(SealedConflation {
            transactions: std::mem::take(&mut self.transactions),
            deployments: deployments.clone(),
        })
    }
}

/// A conflation whose rows can be emitted.
#[derive(Clone, Debug)]
pub struct SealedConflation {
    transactions: Vec<SealedTxTrace>,
    deployments: DeploymentInfo,
}

impl SealedConflation {
    pub fn transactions(&self) -> &[SealedTxTrace] {
        &self.transactions
    }

    /// Deployment epochs at the end of the conflation.
    pub fn deployments(&self) -> &DeploymentInfo {
        &self.deployments
    }

    pub fn line_count(&self) -> usize {
        self.transactions.iter().map(SealedTxTrace::line_count).sum()
    }

    /// Emits every line of every transaction into `trace`.
    pub fn trace(&self, trace: &mut Trace) -> Result<(), HubError> {
        let expected = trace.line_count() + self.line_count();
        for tx in &self.transactions {
            tx.trace(trace)?;
        }

        let emitted = trace.line_count();
        if emitted != expected {
            return Err(HubError::LineCountMismatch { expected, emitted });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::Address;

    use super::*;
    use crate::callstack::FrameSpec;
    use crate::exceptions::Exceptions;
    use crate::fragment::CommonFragment;
    use crate::section::SectionKind;

    fn common(tx_state: TxState, context_number: usize, pc: usize) -> CommonFragment {
        CommonFragment {
            tx_number: 1,
            batch_number: 1,
            tx_state,
            stamp: 1,
            exceptions: Exceptions::empty(),
            context_number,
            caller_context_number: 0,
            pc,
            code_address: Address::zero(),
            code_deployment_number: 0,
            code_deployment_status: false,
            two_line_instruction: false,
        }
    }

    fn call_stack() -> CallStack {
        let mut call_stack = CallStack::bedrock(FrameSpec {
            context_number: 2,
            ..Default::default()
        });
        call_stack
            .enter(FrameSpec {
                context_number: 4,
                ..Default::default()
            })
            .unwrap();
        call_stack.revert(7).unwrap();
        call_stack
    }

    #[test]
    fn retcon_links_sections_and_reverts() {
        let mut tx = TxTrace::new();
        tx.add(TraceSection::new(SectionKind::Initialization, common(TxState::Init, 0, 0)))
            .unwrap();
        tx.add(TraceSection::new(SectionKind::Call, common(TxState::Exec, 2, 5)))
            .unwrap();
        tx.add(TraceSection::new(SectionKind::StackOnly, common(TxState::Exec, 4, 0)))
            .unwrap();

        let sealed = tx.seal(TxEndMetadata::default(), &call_stack()).unwrap();
        let retcons: Vec<_> = sealed.sections().iter().map(|s| *s.retcon()).collect();

        assert_eq!((retcons[0].context_number_new, retcons[0].pc_new), (2, 5));
        assert_eq!((retcons[1].context_number_new, retcons[1].pc_new), (4, 0));
        assert_eq!((retcons[2].context_number_new, retcons[2].pc_new), (0, 0));
        assert!(!retcons[1].will_revert);
        assert!(retcons[2].will_revert && retcons[2].self_reverts);
        assert_eq!(retcons[2].revert_stamp, 7);
    }

    #[test]
    fn retcon_runs_once() {
        let mut tx = TxTrace::new();
        tx.seal(TxEndMetadata::default(), &call_stack()).unwrap();
        assert_eq!(
            tx.seal(TxEndMetadata::default(), &call_stack()).unwrap_err(),
            HubError::TransactionAlreadySealed
        );
        assert_eq!(
            tx.add(TraceSection::new(SectionKind::Skip, common(TxState::Skip, 0, 0)))
                .unwrap_err(),
            HubError::TransactionAlreadySealed
        );

        let mut conflation = ConflationTrace::new();
        conflation.seal(&DeploymentInfo::default()).unwrap();
        assert!(matches!(
            conflation.seal(&DeploymentInfo::default()),
            Err(HubError::ConflationAlreadySealed)
        ));
    }

    #[test]
    fn unknown_frames_abort_the_retcon() {
        let mut tx = TxTrace::new();
        tx.add(TraceSection::new(SectionKind::StackOnly, common(TxState::Exec, 9, 0)))
            .unwrap();
        assert_eq!(
            tx.seal(TxEndMetadata::default(), &call_stack()).unwrap_err(),
            HubError::UnknownContextNumber(9)
        );
    }
}
