use strum::IntoStaticStr;

use crate::error::HubError;
use crate::fragment::{
    AccountFragment, CommonFragment, ContextFragment, CopyFragment, LineCounters, RetconView,
    SectionRetcon, StackFragment, StorageFragment, TraceFragment, TransactionFragment,
};
use crate::opcode::InstructionFamily;
use crate::trace::Trace;

/// Shapes of sections, one per instruction family plus the transaction
/// boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum SectionKind {
    Skip,
    Warmup,
    Initialization,
    StackOnly,
    ContextLog,
    Account,
    Copy,
    Transaction,
    StackRam,
    Storage,
    Create,
    Call,
    Jump,
    EndTransaction,
}

impl SectionKind {
    pub const fn for_family(family: InstructionFamily) -> Self {
        use InstructionFamily as F;

        match family {
            F::Add
            | F::Mod
            | F::Mul
            | F::Ext
            | F::Wcp
            | F::Bin
            | F::Shf
            | F::Kec
            | F::Batch
            | F::MachineState
            | F::PushPop
            | F::Dup
            | F::Swap
            | F::Halt
            | F::Invalid => SectionKind::StackOnly,
            F::Context | F::Log => SectionKind::ContextLog,
            F::Account => SectionKind::Account,
            F::Copy => SectionKind::Copy,
            F::Transaction => SectionKind::Transaction,
            F::StackRam => SectionKind::StackRam,
            F::Storage => SectionKind::Storage,
            F::Create => SectionKind::Create,
            F::Call => SectionKind::Call,
            F::Jump => SectionKind::Jump,
        }
    }
}

macro_rules! impl_into_fragment {
    ($($variant:ident => $fragment:ty),* $(,)?) => {
        $(
            impl From<$fragment> for TraceFragment {
                fn from(fragment: $fragment) -> Self {
                    TraceFragment::$variant(fragment)
                }
            }
        )*
    };
}

impl_into_fragment! {
    Stack => StackFragment,
    Account => AccountFragment,
    Context => ContextFragment,
    Storage => StorageFragment,
    Transaction => TransactionFragment,
    Copy => CopyFragment,
}

/// The rows produced by one instruction or one transaction boundary.
///
/// Instruction sections start with their stack lines, which is what allows
/// the stack latch to back-fill results into them once the instruction has
/// executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceSection {
    pub kind: SectionKind,
    pub common: CommonFragment,
    fragments: Vec<TraceFragment>,
    pub(crate) retcon: SectionRetcon,
}

impl TraceSection {
    pub fn new(kind: SectionKind, common: CommonFragment) -> Self {
        Self {
            kind,
            common,
            fragments: Vec::with_capacity(4),
            retcon: SectionRetcon::default(),
        }
    }

    pub fn with_stack(
        kind: SectionKind,
        common: CommonFragment,
        stack: impl IntoIterator<Item = StackFragment>,
    ) -> Self {
        let mut section = Self::new(kind, common);
        section
            .fragments
            .extend(stack.into_iter().map(TraceFragment::Stack));
        section
    }

    pub fn push(&mut self, fragment: impl Into<TraceFragment>) -> &mut Self {
        self.fragments.push(fragment.into());
        self
    }

    pub fn fragments(&self) -> &[TraceFragment] {
        &self.fragments
    }

    pub(crate) fn fragments_mut(&mut self) -> impl Iterator<Item = &mut TraceFragment> {
        self.fragments.iter_mut()
    }

    pub fn line_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn retcon(&self) -> &SectionRetcon {
        &self.retcon
    }

    pub(crate) fn stack_line_mut(&mut self, line: usize) -> Option<&mut StackFragment> {
        self.fragments
            .get_mut(line)
            .and_then(TraceFragment::as_stack_mut)
    }

    pub(crate) fn trace(&self, trace: &mut Trace, view: &RetconView) -> Result<(), HubError> {
        let non_stack_rows = self
            .fragments
            .iter()
            .filter(|f| !f.is_stack())
            .count();

        let mut stack_rows = 0;
        let mut other_rows = 0;
        for fragment in &self.fragments {
            let counters = if fragment.is_stack() {
                stack_rows += 1;
                LineCounters {
                    counter_tli: stack_rows - 1,
                    non_stack_rows,
                    counter_nsr: 0,
                }
            } else {
                other_rows += 1;
                LineCounters {
                    counter_tli: 0,
                    non_stack_rows,
                    counter_nsr: other_rows,
                }
            };

            self.common.trace(trace, &self.retcon, counters, view)?;
            fragment.trace(trace, view)?;
            trace.fill_and_validate_row()?;
        }

        Ok(())
    }
}
