use ethereum_types::Address;
use zk_tracer_common::{contract_address, create2_address};

use super::Hub;
use crate::callstack::{CallFrame, CallStack};
use crate::defer::{ProtoSection, Trigger};
use crate::deployment::DeploymentInfo;
use crate::error::HubError;
use crate::fragment::{
    AccountFragment, AccountSnapshot, ContextFragment, CopyFragment, StorageFragment,
    TraceFragment, TransactionFragment,
};
use crate::opcode::{InstructionFamily, OpCode};
use crate::section::{SectionKind, TraceSection};
use crate::util::{u256_to_address, u256_to_h256, u256_to_usize_saturating};
use crate::world::MessageFrame;

/// The account at `address` read, and warmed, by an instruction.
fn touched_account(
    frame: &dyn MessageFrame,
    address: Address,
    deployments: &DeploymentInfo,
) -> AccountFragment {
    let before = AccountSnapshot::new(
        address,
        frame.account(address).as_ref(),
        frame.is_address_warm(address),
        deployments,
    );
    AccountFragment::new(before, before.warm())
}

fn copy_fragment(
    frame: &dyn MessageFrame,
    opcode: OpCode,
    top: &CallFrame,
    call_stack: &CallStack,
) -> Result<CopyFragment, HubError> {
    let item = |depth| frame.stack_item(depth);

    // (source context, source account, depth of the first offset)
    let (source_context, source_address, first) = match opcode {
        OpCode::Calldatacopy => (top.context_number, Address::zero(), 0),
        OpCode::Codecopy => (0, top.code_address, 0),
        OpCode::Returndatacopy => {
            let returner = match top.last_called_child {
                Some(child) => call_stack.by_id(child)?.context_number,
                None => 0,
            };
            (returner, Address::zero(), 0)
        }
        OpCode::Extcodecopy => (0, u256_to_address(item(0)), 1),
        _ => {
            return Err(HubError::UnexpectedOpcode {
                opcode: opcode.byte(),
                family: InstructionFamily::Copy.into(),
            })
        }
    };

    Ok(CopyFragment {
        instruction: opcode,
        source_context,
        source_address,
        target_context: top.context_number,
        target_offset: item(first),
        source_offset: item(first + 1),
        size: item(first + 2),
    })
}

/// Address of the account a `CREATE` or `CREATE2` deploys to.
fn created_address(frame: &dyn MessageFrame, opcode: OpCode) -> Address {
    let creator = frame.recipient_address();
    match opcode {
        OpCode::Create2 => {
            let offset = u256_to_usize_saturating(frame.stack_item(1));
            let size = u256_to_usize_saturating(frame.stack_item(2));
            let init_code = frame.memory_slice(offset, size);
            create2_address(creator, u256_to_h256(frame.stack_item(3)), &init_code)
        }
        _ => {
            let nonce = frame
                .account(creator)
                .map(|account| account.nonce)
                .unwrap_or_default();
            contract_address(creator, nonce)
        }
    }
}

impl Hub {
    /// Builds the section of an instruction whose stack requirements are
    /// met, according to its family.
    pub(super) fn dispatch(&mut self, frame: &dyn MessageFrame, opcode: OpCode) -> Result<(), HubError> {
        use InstructionFamily as F;

        let family = opcode.family();
        let kind = SectionKind::for_family(family);
        let settings = opcode.stack_settings();
        let (common, stack) = self.instruction_parts(frame, opcode)?;
        let exceptional = common.exceptions.any();
        let update_return_data = opcode.is_halt() || opcode.is_invalid() || exceptional;

        let ctx = self.tx.as_mut().ok_or(HubError::NoOpenTransaction)?;
        let top = ctx.call_stack.top()?;
        let context = ContextFragment::from_frame(top, &ctx.call_stack, update_return_data);
        let trimmed_target = || u256_to_address(frame.stack_item(0));

        let mut lines: Vec<TraceFragment> = Vec::with_capacity(3);
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
            | F::Invalid => {}
            F::Context | F::Log => lines.push(context.into()),
            F::Account => {
                if settings.flag1() {
                    lines.push(context.into());
                }
                let target = if settings.address_trimming {
                    trimmed_target()
                } else {
                    frame.recipient_address()
                };
                lines.push(touched_account(frame, target, &self.deployments).into());
            }
            F::Copy => {
                if settings.flag1() {
                    lines.push(touched_account(frame, trimmed_target(), &self.deployments).into());
                } else {
                    lines.push(context.into());
                }
                if !exceptional {
                    lines.push(copy_fragment(frame, opcode, top, &ctx.call_stack)?.into());
                }
            }
            F::Transaction => {
                lines.push(TransactionFragment::new(&ctx.tx, &self.block, true).into());
            }
            F::StackRam => {
                if settings.flag2() {
                    lines.push(context.into());
                }
            }
            F::Storage => {
                let address = frame.recipient_address();
                let key = frame.stack_item(0);
                let value_curr = frame.storage_value(address, key);
                let value_orig = *ctx.val_origs.entry((address, key)).or_insert(value_curr);
                let warm = frame.is_storage_warm(address, key);
                let (value_next, warm_new) = match (settings.flag1(), exceptional) {
                    (_, true) => (value_curr, warm),
                    (true, false) => (frame.stack_item(1), true),
                    (false, false) => (value_curr, true),
                };
                lines.push(context.into());
                lines.push(
                    StorageFragment {
                        address,
                        deployment_number: self.deployments.number(address),
                        key,
                        value_orig,
                        value_curr,
                        value_next,
                        warm,
                        warm_new,
                    }
                    .into(),
                );
            }
            F::Jump => {
                let code = AccountSnapshot::new(
                    top.code_address,
                    frame.account(top.code_address).as_ref(),
                    true,
                    &self.deployments,
                );
                lines.push(context.into());
                lines.push(AccountFragment::unchanged(code).into());
            }
            F::Create | F::Call => {
                // Operands of a failing instruction need not describe a
                // reachable account.
                let callee = match (opcode.is_create(), exceptional) {
                    (_, true) => Address::zero(),
                    (true, false) => created_address(frame, opcode),
                    (false, false) => u256_to_address(frame.stack_item(1)),
                };
                let caller = frame.recipient_address();
                let proto = ProtoSection {
                    kind,
                    frame_id: top.id,
                    common,
                    stack,
                    context,
                    caller: AccountSnapshot::new(
                        caller,
                        frame.account(caller).as_ref(),
                        true,
                        &self.deployments,
                    ),
                    callee: AccountSnapshot::new(
                        callee,
                        frame.account(callee).as_ref(),
                        frame.is_address_warm(callee),
                        &self.deployments,
                    ),
                };
                self.defers
                    .schedule_proto(proto, &[Trigger::PostExec, Trigger::NextContext]);
                return Ok(());
            }
        }

        let mut section = TraceSection::with_stack(kind, common, stack);
        for line in lines {
            section.push(line);
        }
        self.add_instruction_section(section)
    }
}
