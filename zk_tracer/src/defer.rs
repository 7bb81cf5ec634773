//! Work that cannot be completed when it is scheduled.
//!
//! Sections of `CALL` and `CREATE` instructions depend on whether a child
//! context is actually entered, skipped transactions on the world state after
//! settlement, and account rows on the deployment epochs at the end of the
//! conflation. Such work is captured as plain data and queued against the
//! point in the callback stream where it can be completed.

use std::collections::VecDeque;

use strum::{EnumCount, IntoStaticStr};

use crate::fragment::{AccountSnapshot, CommonFragment, ContextFragment, StackFragment};
use crate::section::SectionKind;

/// Points of the callback stream at which deferred work runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumCount, IntoStaticStr)]
pub enum Trigger {
    /// Once the interpreter reports the outcome of the current instruction.
    PostExec,
    /// When a child context is entered, before its first instruction.
    NextContext,
    /// After the settlement of the current transaction.
    PostTx,
    /// Once the conflation is over.
    PostConflation,
}

/// Handle of a proto-section held by a [`DeferRegistry`].
pub type ProtoId = usize;

/// The part of a `CALL` or `CREATE` section known when the instruction is
/// processed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtoSection {
    pub kind: SectionKind,
    /// Frame executing the instruction.
    pub frame_id: usize,
    pub common: CommonFragment,
    pub stack: Vec<StackFragment>,
    pub context: ContextFragment,
    pub caller: AccountSnapshot,
    /// The called account, or the account being created.
    pub callee: AccountSnapshot,
}

/// Account rows of a transaction requiring no execution, waiting for the
/// post-transaction state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedTransaction {
    pub common: CommonFragment,
    pub is_deployment: bool,
    pub sender: AccountSnapshot,
    pub recipient: AccountSnapshot,
    pub miner: AccountSnapshot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Deferred {
    /// Completes the section of a `CALL` or `CREATE` instruction.
    Proto(ProtoId),
    SkippedTransaction(Box<SkippedTransaction>),
    /// Stamps the final deployment epochs onto the account rows of the n-th
    /// transaction of the conflation.
    FinalDeployments { tx_index: usize },
}

/// FIFO queues of deferred work, one per [`Trigger`].
///
/// A proto-section may be queued on several triggers: the first one to fire
/// takes it, and later firings of the same handle find nothing and are
/// ignored.
#[derive(Debug, Default)]
pub struct DeferRegistry {
    queues: [VecDeque<Deferred>; Trigger::COUNT],
    protos: Vec<Option<ProtoSection>>,
}

impl DeferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, trigger: Trigger, item: Deferred) {
        log::debug!(
            "deferring {} until {}",
            item.name(),
            <&'static str>::from(trigger)
        );
        self.queues[trigger as usize].push_back(item);
    }

    /// Stores `proto` and queues it on every trigger of `triggers`.
    pub fn schedule_proto(&mut self, proto: ProtoSection, triggers: &[Trigger]) -> ProtoId {
        let id = self.protos.len();
        self.protos.push(Some(proto));
        for trigger in triggers {
            self.schedule(*trigger, Deferred::Proto(id));
        }
        id
    }

    pub fn pop(&mut self, trigger: Trigger) -> Option<Deferred> {
        self.queues[trigger as usize].pop_front()
    }

    /// Takes the proto-section out of the registry, if no other trigger did
    /// so first.
    pub fn take_proto(&mut self, id: ProtoId) -> Option<ProtoSection> {
        self.protos.get_mut(id).and_then(Option::take)
    }

    /// Drops whatever is still queued on `trigger`, returning how many items
    /// were dropped.
    pub fn discard(&mut self, trigger: Trigger) -> usize {
        let queue = &mut self.queues[trigger as usize];
        let dropped = queue.len();
        if dropped > 0 {
            log::debug!(
                "dropping {dropped} item(s) deferred until {}",
                <&'static str>::from(trigger)
            );
        }
        queue.clear();
        dropped
    }

    pub fn pending(&self, trigger: Trigger) -> usize {
        self.queues[trigger as usize].len()
    }

    /// Forgets the transaction-scoped work once a transaction is over.
    pub fn end_transaction(&mut self) {
        self.discard(Trigger::PostExec);
        self.discard(Trigger::NextContext);
        self.discard(Trigger::PostTx);

        let unresolved = self.protos.iter().filter(|p| p.is_some()).count();
        if unresolved > 0 {
            log::warn!("{unresolved} proto-section(s) were never resolved");
        }
        self.protos.clear();
    }
}

impl Deferred {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Deferred::Proto(_) => "proto-section",
            Deferred::SkippedTransaction(_) => "skipped transaction",
            Deferred::FinalDeployments { .. } => "final deployment epochs",
        }
    }
}
