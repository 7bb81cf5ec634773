//! Sub-modules the hub hands instructions over to.

use ethereum_types::U256;

use crate::opcode::{InstructionFamily, OpCode};
use crate::world::MessageFrame;

/// A trace fed by the hub with the instructions it is responsible for.
pub trait Module {
    /// Name of the module's trace.
    fn module_key(&self) -> &'static str;

    /// Records the instruction about to be executed by `frame`.
    fn trace(&mut self, frame: &dyn MessageFrame);

    fn line_count(&self) -> usize;
}

/// An arithmetic operation together with its operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operation {
    pub opcode: OpCode,
    pub operands: [U256; 3],
}

impl Operation {
    /// Rows the operation spans in its module.
    fn lines(&self) -> usize {
        match self.opcode {
            OpCode::Div
            | OpCode::Sdiv
            | OpCode::Mod
            | OpCode::Smod
            | OpCode::Addmod
            | OpCode::Mulmod
            | OpCode::Exp
            | OpCode::Shr
            | OpCode::Sar => 2,
            _ => 1,
        }
    }
}

/// Collects the operations of one arithmetic family.
#[derive(Clone, Debug)]
pub struct OperationCounter {
    family: InstructionFamily,
    operations: Vec<Operation>,
}

impl OperationCounter {
    pub fn new(family: InstructionFamily) -> Self {
        Self {
            family,
            operations: vec![],
        }
    }

    /// One counter per arithmetic family.
    pub fn arithmetic() -> Vec<Self> {
        [
            InstructionFamily::Add,
            InstructionFamily::Mod,
            InstructionFamily::Mul,
            InstructionFamily::Ext,
            InstructionFamily::Wcp,
            InstructionFamily::Shf,
        ]
        .into_iter()
        .map(Self::new)
        .collect()
    }

    pub fn family(&self) -> InstructionFamily {
        self.family
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }
}

impl Module for OperationCounter {
    fn module_key(&self) -> &'static str {
        self.family.into()
    }

    fn trace(&mut self, frame: &dyn MessageFrame) {
        let opcode = OpCode::from(frame.opcode());
        if opcode.family() != self.family {
            return;
        }
        let arity = opcode.stack_settings().delta as usize;
        let mut operands = [U256::zero(); 3];
        for (depth, operand) in operands.iter_mut().enumerate().take(arity) {
            *operand = frame.stack_item(depth);
        }
        self.operations.push(Operation { opcode, operands });
    }

    fn line_count(&self) -> usize {
        self.operations.iter().map(Operation::lines).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::FrameBuilder;

    #[test]
    fn counts_only_its_family() {
        let mut modules = OperationCounter::arithmetic();
        for (opcode, stack) in [
            (OpCode::Add, &[1u64, 2][..]),
            (OpCode::Div, &[8, 2][..]),
            (OpCode::Addmod, &[1, 2, 5][..]),
            (OpCode::Lt, &[1, 2][..]),
        ] {
            let frame = FrameBuilder::new().opcode(opcode).stack(stack).build();
            for module in &mut modules {
                module.trace(&frame);
            }
        }

        let lines: Vec<_> = modules
            .iter()
            .map(|m| (m.module_key(), m.line_count()))
            .collect();
        assert_eq!(
            lines,
            vec![("ADD", 1), ("MOD", 2), ("MUL", 0), ("EXT", 2), ("WCP", 1), ("SHF", 0)]
        );
        assert_eq!(
            modules[3].operations()[0].operands,
            [U256::from(1), U256::from(2), U256::from(5)]
        );
    }
}
