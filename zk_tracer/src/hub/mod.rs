//! The hub: the entry point of the tracer.
//!
//! The interpreter drives the hub through callbacks, called synchronously at
//! fixed points of its execution. Per instruction, the hub receives
//! [`Hub::trace`] before the instruction executes, then the context
//! enter/exit callbacks of any child context it opens, then
//! [`Hub::trace_post_execution`] with the instruction's result on the stack.
//!
//! The root context of a transaction is opened by the hub itself when the
//! transaction starts; context callbacks at depth zero only update the
//! deployment status of the recipient and close the root frame.

mod dispatch;

use bytes::Bytes;
use ethereum_types::{Address, U256};
use hashbrown::{HashMap, HashSet};
use zk_tracer_common::is_precompile;

use crate::callstack::{CallFrame, CallStack, FrameSpec};
use crate::config::HubConfig;
use crate::defer::{DeferRegistry, Deferred, ProtoSection, SkippedTransaction, Trigger};
use crate::deployment::DeploymentInfo;
use crate::error::HubError;
use crate::exceptions::Exceptions;
use crate::fragment::{
    AccountFragment, AccountSnapshot, CommonFragment, ContextFragment, StackFragment,
    StorageFragment, TransactionFragment,
};
use crate::module::{Module, OperationCounter};
use crate::opcode::OpCode;
use crate::section::{SectionKind, TraceSection};
use crate::state::{ConflationTrace, SealedConflation, SealedTxTrace, TxTrace};
use crate::trace::{Trace, TraceColumns};
use crate::transaction::{TxEndMetadata, TxState};
use crate::util::u256_to_address;
use crate::world::{
    BlockHeader, LogEntry, MessageFrame, MessageFrameType, OperationResult, Transaction,
    WorldView,
};

/// State of the transaction being traced.
#[derive(Debug)]
struct TxContext {
    tx: Transaction,
    state: TxState,
    call_stack: CallStack,
    trace: TxTrace,
    /// Value of each storage slot when the transaction first touched it.
    val_origs: HashMap<(Address, U256), U256>,
    /// Exceptions raised by the instruction being executed.
    exceptions: Exceptions,
}

impl TxContext {
    fn new(tx: Transaction, state: TxState) -> Self {
        Self {
            tx,
            state,
            call_stack: CallStack::default(),
            trace: TxTrace::new(),
            val_origs: HashMap::new(),
            exceptions: Exceptions::empty(),
        }
    }
}

#[derive(Debug)]
pub struct Hub {
    config: HubConfig,
    /// Hub stamp, bumped by every section. Conflation-scoped.
    stamp: usize,
    /// Number of the current transaction within the conflation, from 1.
    tx_number: usize,
    /// Number of the current block within the conflation, from 1.
    batch_number: usize,
    block: BlockHeader,
    deployments: DeploymentInfo,
    defers: DeferRegistry,
    modules: Vec<OperationCounter>,
    tx: Option<TxContext>,
    conflation: ConflationTrace,
    sealed: Option<SealedConflation>,
}

impl Default for Hub {
    fn default() -> Self {
        Self {
            config: HubConfig::default(),
            stamp: 0,
            tx_number: 0,
            batch_number: 0,
            block: BlockHeader::default(),
            deployments: DeploymentInfo::default(),
            defers: DeferRegistry::new(),
            modules: OperationCounter::arithmetic(),
            tx: None,
            conflation: ConflationTrace::new(),
            sealed: None,
        }
    }
}

impl Hub {
    pub fn new(config: HubConfig) -> Result<Self, HubError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn stamp(&self) -> usize {
        self.stamp
    }

    pub fn deployments(&self) -> &DeploymentInfo {
        &self.deployments
    }

    pub fn modules(&self) -> &[OperationCounter] {
        &self.modules
    }

    /// Call tree of the transaction being traced.
    pub fn call_stack(&self) -> Option<&CallStack> {
        self.tx.as_ref().map(|ctx| &ctx.call_stack)
    }

    /// Transactions traced so far in the conflation.
    pub fn transactions(&self) -> &[SealedTxTrace] {
        match &self.sealed {
            Some(sealed) => sealed.transactions(),
            None => self.conflation.transactions(),
        }
    }

    pub fn sealed_conflation(&self) -> Option<&SealedConflation> {
        self.sealed.as_ref()
    }

    /// Number of lines traced so far.
    pub fn line_count(&self) -> usize {
        let current = self
            .tx
            .as_ref()
            .map(|ctx| ctx.trace.line_count())
            .unwrap_or_default();
        match &self.sealed {
            Some(sealed) => sealed.line_count(),
            None => self.conflation.line_count() + current,
        }
    }

    pub fn trace_start_conflation(&mut self) {
        log::info!("starting conflation");
        self.stamp = 0;
        self.tx_number = 0;
        self.batch_number = 0;
        self.deployments = DeploymentInfo::default();
        self.defers = DeferRegistry::new();
        self.modules.iter_mut().for_each(OperationCounter::clear);
        self.tx = None;
        self.conflation = ConflationTrace::new();
        self.sealed = None;
    }

    pub fn trace_start_block(&mut self, block: &BlockHeader) {
        self.batch_number += 1;
        self.block = *block;
        log::debug!("starting block {} ({} in conflation)", block.number, self.batch_number);
    }

    pub fn trace_start_tx(&mut self, world: &dyn WorldView, tx: &Transaction) -> Result<(), HubError> {
        if self.sealed.is_some() {
            return Err(HubError::ConflationAlreadySealed);
        }
        if self.tx.is_some() {
            return Err(HubError::TransactionInProgress);
        }
        if let Some(to) = tx.to.filter(|to| is_precompile(*to)) {
            return Err(HubError::TransactionToPrecompile(to));
        }

        self.tx_number += 1;
        let requires_evm_execution = match tx.to {
            Some(to) => world.account(to).is_some_and(|account| account.has_code()),
            None => !tx.payload.is_empty(),
        };
        log::info!(
            "starting transaction {} from {:?} (evm execution: {requires_evm_execution})",
            self.tx_number,
            tx.sender
        );

        if !requires_evm_execution {
            self.tx = Some(TxContext::new(tx.clone(), TxState::Skip));
            return self.process_skip(world, tx);
        }

        self.tx = Some(TxContext::new(tx.clone(), TxState::Warm));
        if !tx.access_list.is_empty() {
            self.process_warm(world, tx)?;
        }
        self.process_init(world, tx)
    }

    fn boundary_common(&self, tx_state: TxState) -> CommonFragment {
        CommonFragment {
            tx_number: self.tx_number,
            batch_number: self.batch_number,
            tx_state,
            stamp: self.stamp,
            exceptions: Exceptions::empty(),
            context_number: 0,
            caller_context_number: 0,
            pc: 0,
            code_address: Address::zero(),
            code_deployment_number: 0,
            code_deployment_status: false,
            two_line_instruction: false,
        }
    }

    fn instruction_common(
        &self,
        frame: &dyn MessageFrame,
        opcode: OpCode,
        exceptions: Exceptions,
        top: &CallFrame,
        call_stack: &CallStack,
    ) -> CommonFragment {
        CommonFragment {
            tx_number: self.tx_number,
            batch_number: self.batch_number,
            tx_state: TxState::Exec,
            stamp: self.stamp,
            exceptions,
            context_number: top.context_number,
            caller_context_number: call_stack
                .parent(top)
                .map(|parent| parent.context_number)
                .unwrap_or_default(),
            pc: frame.pc(),
            code_address: top.code_address,
            code_deployment_number: top.code_deployment_number,
            code_deployment_status: top.code_deployment_status,
            two_line_instruction: opcode.stack_settings().two_lines,
        }
    }

    /// Transactions without EVM execution get their account rows once the
    /// post-transaction state is known.
    fn process_skip(&mut self, world: &dyn WorldView, tx: &Transaction) -> Result<(), HubError> {
        self.stamp += 1;

        let deployments = &self.deployments;
        let snapshot =
            |address| AccountSnapshot::new(address, world.account(address).as_ref(), true, deployments);
        let skipped = SkippedTransaction {
            common: self.boundary_common(TxState::Skip),
            is_deployment: tx.is_deployment(),
            sender: snapshot(tx.sender),
            recipient: snapshot(tx.effective_to()),
            miner: snapshot(self.block.coinbase),
        };

        self.defers
            .schedule(Trigger::PostTx, Deferred::SkippedTransaction(Box::new(skipped)));
        Ok(())
    }

    fn process_warm(&mut self, world: &dyn WorldView, tx: &Transaction) -> Result<(), HubError> {
        self.stamp += 1;
        let mut section =
            TraceSection::new(SectionKind::Warmup, self.boundary_common(TxState::Warm));

        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        let mut seen_addresses = HashSet::new();
        let mut seen_keys = HashSet::new();

        for entry in &tx.access_list {
            let address = entry.address;
            let warm = !seen_addresses.insert(address);
            let before = AccountSnapshot::new(
                address,
                world.account(address).as_ref(),
                warm,
                &self.deployments,
            );
            section.push(AccountFragment::new(before, before.warm()));

            for key in &entry.storage_keys {
                let warm = !seen_keys.insert((address, *key));
                let value = world.storage(address, *key);
                let value_orig = *ctx.val_origs.entry((address, *key)).or_insert(value);
                section.push(StorageFragment {
                    address,
                    deployment_number: self.deployments.number(address),
                    key: *key,
                    value_orig,
                    value_curr: value,
                    value_next: value,
                    warm,
                    warm_new: true,
                });
            }
        }

        ctx.trace.add(section)?;
        Ok(())
    }

    fn process_init(&mut self, world: &dyn WorldView, tx: &Transaction) -> Result<(), HubError> {
        self.stamp += 1;
        let common = self.boundary_common(TxState::Init);
        let to = tx.effective_to();
        let is_deployment = tx.is_deployment();

        let sender_before = AccountSnapshot::new(
            tx.sender,
            world.account(tx.sender).as_ref(),
            true,
            &self.deployments,
        );
        let upfront_cost = U256::from(tx.gas_limit).saturating_mul(tx.gas_price);
        let sender_after = AccountSnapshot {
            nonce: sender_before.nonce + 1,
            balance: sender_before
                .balance
                .saturating_sub(tx.value)
                .saturating_sub(upfront_cost),
            ..sender_before
        };

        let recipient = world.account(to);
        let recipient_before =
            AccountSnapshot::new(to, recipient.as_ref(), true, &self.deployments);
        if is_deployment {
            self.deployments.mark_deploying(to);
        }
        let recipient_after = AccountSnapshot {
            nonce: if is_deployment { 1 } else { recipient_before.nonce },
            balance: recipient_before.balance.saturating_add(tx.value),
            exists: true,
            ..recipient_before
        }
        .with_deployment(&self.deployments);

        let code = match (is_deployment, recipient) {
            (true, _) => tx.payload.clone(),
            (false, Some(account)) => account.code,
            (false, None) => Bytes::new(),
        };
        let root = FrameSpec {
            address: to,
            address_deployment_number: self.deployments.number(to),
            code_address: to,
            code_deployment_number: self.deployments.number(to),
            code_deployment_status: self.deployments.is_deploying(to),
            code,
            value: tx.value,
            gas: tx.gas_limit,
            call_data: if is_deployment {
                Bytes::new()
            } else {
                tx.payload.clone()
            },
            is_static: false,
            is_deployment,
            context_number: self.stamp + 1,
            stamp: self.stamp,
        };

        let mut section = TraceSection::new(SectionKind::Initialization, common);
        section
            .push(TransactionFragment::new(tx, &self.block, true))
            .push(AccountFragment::new(sender_before, sender_after))
            .push(AccountFragment::new(recipient_before, recipient_after));

        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        ctx.call_stack = CallStack::bedrock(root);
        let root = ctx.call_stack.top_mut()?;
        root.parent_address = tx.sender;
        let root = ctx.call_stack.top()?;
        section.push(ContextFragment::from_frame(root, &ctx.call_stack, false));

        ctx.trace.add(section)?;
        ctx.state = TxState::Exec;
        Ok(())
    }

    pub fn trace_context_enter(&mut self, frame: &dyn MessageFrame) -> Result<(), HubError> {
        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        if ctx.state == TxState::Skip {
            return Ok(());
        }

        let is_deployment = frame.frame_type() == MessageFrameType::ContractCreation;
        if is_deployment {
            self.deployments.mark_deploying(frame.recipient_address());
        }
        if frame.depth() == 0 {
            return Ok(());
        }

        let (address, code_address) = (frame.recipient_address(), frame.contract_address());
        let context_number = self.stamp + 1;
        ctx.call_stack.enter(FrameSpec {
            address,
            address_deployment_number: self.deployments.number(address),
            code_address,
            code_deployment_number: self.deployments.number(code_address),
            code_deployment_status: self.deployments.is_deploying(code_address),
            code: frame.code(),
            value: frame.value(),
            gas: frame.remaining_gas(),
            call_data: frame.input_data(),
            is_static: frame.is_static(),
            is_deployment,
            context_number,
            stamp: self.stamp,
        })?;
        log::debug!("entered context {context_number} at depth {}", frame.depth());

        self.fire_frame_deferrals(Trigger::NextContext, frame)
    }

    /// Processes the instruction `frame` is about to execute.
    pub fn trace(&mut self, frame: &dyn MessageFrame) -> Result<(), HubError> {
        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        if ctx.state == TxState::Skip {
            return Ok(());
        }

        self.stamp += 1;
        let stamp = self.stamp;
        let opcode = OpCode::from(frame.opcode());

        let top = ctx.call_stack.top_mut()?;
        top.stack.process_instruction(
            frame,
            self.config.max_stack_height,
            self.config.stack_stamp_spacing * stamp,
        );
        let stack_ok = top.stack.is_ok();
        let exceptions = Exceptions::from_frame(frame, opcode, top.stack.status());
        ctx.exceptions = exceptions;

        if exceptions.no_stack_exception() {
            for module in &mut self.modules {
                module.trace(frame);
            }
        }

        if exceptions.any() || opcode == OpCode::Revert {
            ctx.call_stack.revert(stamp)?;
        }

        if stack_ok {
            self.dispatch(frame, opcode)
        } else {
            log::debug!("stack exception on {opcode} at stamp {stamp}");
            let (common, stack) = self.instruction_parts(frame, opcode)?;
            self.add_instruction_section(TraceSection::with_stack(
                SectionKind::StackOnly,
                common,
                stack,
            ))
        }
    }

    /// Common fragment and stack lines of the instruction being executed.
    fn instruction_parts(
        &self,
        frame: &dyn MessageFrame,
        opcode: OpCode,
    ) -> Result<(CommonFragment, Vec<StackFragment>), HubError> {
        let ctx = self.tx.as_ref().ok_or(HubError::NoOpenTransaction)?;
        let top = ctx.call_stack.top()?;
        let common = self.instruction_common(frame, opcode, ctx.exceptions, top, &ctx.call_stack);
        let stack = top
            .stack
            .current()
            .lines
            .iter()
            .map(|line| StackFragment::new(opcode, &top.stack, line.clone()))
            .collect();
        Ok((common, stack))
    }

    /// Appends the section of the current instruction and points the stack
    /// latch of the current frame at it.
    fn add_instruction_section(&mut self, section: TraceSection) -> Result<(), HubError> {
        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        let index = ctx.trace.add(section)?;
        ctx.call_stack.top_mut()?.stack.current.section = Some(index);
        Ok(())
    }

    pub fn trace_post_execution(
        &mut self,
        frame: &dyn MessageFrame,
        result: OperationResult,
    ) -> Result<(), HubError> {
        let ctx = self.tx.as_ref().ok_or(HubError::NoOpenTransaction)?;
        if ctx.state == TxState::Skip {
            return Ok(());
        }

        let opcode = OpCode::from(frame.opcode());
        if opcode.is_create() {
            if result.halt_reason.is_none() && !frame.stack_item(0).is_zero() {
                self.deployments.deploy(u256_to_address(frame.stack_item(0)));
            } else {
                self.deployments.abandon_finished();
            }
        }

        self.fire_frame_deferrals(Trigger::PostExec, frame)?;
        self.defers.discard(Trigger::NextContext);

        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        let halted = result
            .halt_reason
            .map(Exceptions::from_halt_reason)
            .unwrap_or_default();

        // Child contexts have run since the instruction was processed, so its
        // exceptions are read back from its own section.
        let top = ctx.call_stack.top()?;
        let pending = top.stack.current();
        let index = pending
            .section
            .ok_or(HubError::MissingInstructionSection(top.context_number))?;
        let section = ctx
            .trace
            .section_mut(index)
            .ok_or(HubError::MissingInstructionSection(top.context_number))?;
        let newly_exceptional = !section.common.exceptions.any() && halted.any();
        let exceptions = section.common.exceptions | halted;
        section.common.exceptions = exceptions;

        let result_value = if exceptions.any() {
            U256::zero()
        } else {
            frame.stack_item(0)
        };
        for line in &pending.lines {
            let Some(column) = line.result_column else {
                continue;
            };
            let fragment = section
                .stack_line_mut(line.ct)
                .ok_or(HubError::NotAStackLine {
                    section: index,
                    line: line.ct,
                })?;
            fragment.line.items[column - 1].value = result_value;
        }

        if newly_exceptional {
            let stamp = section.common.stamp;
            log::debug!("{opcode} halted with {halted:?}");
            ctx.call_stack.revert(stamp)?;
        }
        Ok(())
    }

    pub fn trace_context_exit(&mut self, frame: &dyn MessageFrame) -> Result<(), HubError> {
        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        if ctx.state == TxState::Skip {
            return Ok(());
        }

        if frame.frame_type() == MessageFrameType::ContractCreation {
            self.deployments.unmark_deploying(frame.recipient_address());

            let exceptions = Exceptions::from_exit(frame, &self.config);
            if exceptions.any() && !ctx.call_stack.top()?.will_revert() {
                log::warn!(
                    "deployment at {:?} fails on exit: {exceptions:?}",
                    frame.recipient_address()
                );
                ctx.call_stack.revert(self.stamp)?;
            }
        }

        // INIT has written lines before any frame can exit.
        let last_line = ctx.trace.line_count().saturating_sub(1);
        ctx.call_stack.exit(
            last_line,
            frame.output_data(),
            frame.return_data(),
        )
    }

    pub fn trace_end_tx(
        &mut self,
        world: &dyn WorldView,
        tx: &Transaction,
        success: bool,
        output: &[u8],
        logs: &[LogEntry],
        gas_used: u64,
    ) -> Result<(), HubError> {
        let ctx = self.tx.as_ref().ok_or(HubError::NoOpenTransaction)?;
        let skipped = ctx.state == TxState::Skip;

        if !skipped {
            self.process_final(world, tx, success)?;
            match (tx.is_deployment(), success) {
                (true, true) => self.deployments.deploy(tx.effective_to()),
                (true, false) => self.deployments.abandon(tx.effective_to()),
                (false, _) => {}
            }
        }

        while let Some(item) = self.defers.pop(Trigger::PostTx) {
            match item {
                Deferred::SkippedTransaction(skipped) => self.resolve_skipped(*skipped, world)?,
                other => return Err(unexpected(&other, Trigger::PostTx)),
            }
        }

        let leftover_gas = tx.gas_limit.saturating_sub(gas_used);
        let meta = TxEndMetadata {
            success,
            hub_stamp_end: self.stamp,
            leftover_gas,
            refund_amount: U256::from(leftover_gas).saturating_mul(tx.gas_price),
        };

        let mut ctx = self.tx.take().ok_or(HubError::NoOpenTransaction)?;
        let sealed = ctx.trace.seal(meta, &ctx.call_stack)?;
        let lines = sealed.line_count();
        let tx_index = self.conflation.push(sealed)?;

        self.defers.end_transaction();
        self.defers
            .schedule(Trigger::PostConflation, Deferred::FinalDeployments { tx_index });

        log::info!(
            "transaction {} traced: {lines} line(s), success: {success}, {} log(s), {} byte(s) of output",
            self.tx_number,
            logs.len(),
            output.len()
        );
        Ok(())
    }

    fn process_final(
        &mut self,
        world: &dyn WorldView,
        tx: &Transaction,
        success: bool,
    ) -> Result<(), HubError> {
        self.stamp += 1;
        let mut section =
            TraceSection::new(SectionKind::EndTransaction, self.boundary_common(TxState::Final));

        let deployments = &self.deployments;
        let settled = |address| {
            AccountFragment::unchanged(AccountSnapshot::new(
                address,
                world.account(address).as_ref(),
                true,
                deployments,
            ))
        };
        section
            .push(settled(tx.sender))
            .push(settled(self.block.coinbase));
        if !success {
            section.push(settled(tx.effective_to()));
        }
        section.push(TransactionFragment::new(tx, &self.block, true));

        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        ctx.state = TxState::Final;
        ctx.trace.add(section)?;
        Ok(())
    }

    fn resolve_skipped(
        &mut self,
        skipped: SkippedTransaction,
        world: &dyn WorldView,
    ) -> Result<(), HubError> {
        if skipped.is_deployment {
            self.deployments.deploy(skipped.recipient.address);
        }

        let mut section = TraceSection::new(SectionKind::Skip, skipped.common);
        for before in [skipped.sender, skipped.recipient, skipped.miner] {
            let after = AccountSnapshot::new(
                before.address,
                world.account(before.address).as_ref(),
                true,
                &self.deployments,
            );
            section.push(AccountFragment::new(before, after));
        }

        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        ctx.trace.add(section)?;
        Ok(())
    }

    /// Runs the work deferred until `trigger`, `frame` being the frame
    /// current when it fires.
    fn fire_frame_deferrals(
        &mut self,
        trigger: Trigger,
        frame: &dyn MessageFrame,
    ) -> Result<(), HubError> {
        while let Some(item) = self.defers.pop(trigger) {
            let Deferred::Proto(id) = item else {
                return Err(unexpected(&item, trigger));
            };
            let Some(proto) = self.defers.take_proto(id) else {
                log::debug!("proto-section {id} already resolved");
                continue;
            };
            self.resolve_proto(proto, frame, trigger == Trigger::NextContext)?;
        }
        Ok(())
    }

    /// Completes the section of a `CALL` or `CREATE`, either with the child
    /// context it opened or, when no context was entered, once the
    /// instruction has executed.
    fn resolve_proto(
        &mut self,
        proto: ProtoSection,
        frame: &dyn MessageFrame,
        entered: bool,
    ) -> Result<(), HubError> {
        let after = |snapshot: &AccountSnapshot| {
            AccountSnapshot::new(
                snapshot.address,
                frame.account(snapshot.address).as_ref(),
                true,
                &self.deployments,
            )
        };
        let (caller_after, callee_after) = (after(&proto.caller), after(&proto.callee));

        let mut section = TraceSection::with_stack(proto.kind, proto.common, proto.stack);
        section
            .push(proto.context)
            .push(AccountFragment::new(proto.caller, caller_after))
            .push(AccountFragment::new(proto.callee, callee_after));

        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        if entered {
            let child = ctx.call_stack.top()?;
            section.push(ContextFragment::from_frame(child, &ctx.call_stack, false));
        }

        let index = ctx.trace.add(section)?;
        ctx.call_stack.by_id_mut(proto.frame_id)?.stack.current.section = Some(index);
        Ok(())
    }

    pub fn trace_end_conflation(&mut self) -> Result<(), HubError> {
        if self.tx.is_some() {
            return Err(HubError::TransactionInProgress);
        }

        while let Some(item) = self.defers.pop(Trigger::PostConflation) {
            let Deferred::FinalDeployments { tx_index } = item else {
                return Err(unexpected(&item, Trigger::PostConflation));
            };
            self.conflation
                .transaction_mut(tx_index)
                .ok_or(HubError::UnknownTransaction(tx_index))?
                .set_final_deployments(&self.deployments);
        }

        let sealed = self.conflation.seal(&self.deployments)?;
        log::info!(
            "conflation sealed: {} transaction(s), {} line(s)",
            sealed.transactions().len(),
            sealed.line_count()
        );
        for module in &self.modules {
            log::debug!("{} module: {} line(s)", module.module_key(), module.line_count());
        }
        self.sealed = Some(sealed);
        Ok(())
    }

    /// Emits the rows of the sealed conflation.
    pub fn commit(&self) -> Result<TraceColumns, HubError> {
        let sealed = self.sealed.as_ref().ok_or(HubError::ConflationNotSealed)?;
        let mut trace = Trace::new();
        sealed.trace(&mut trace)?;
        trace.build()
    }
}

fn unexpected(item: &Deferred, trigger: Trigger) -> HubError {
    HubError::UnexpectedDeferral {
        item: item.name(),
        trigger: trigger.into(),
    }
}
