use crate::callstack::{Stack, StackLine, StackStatus};
use crate::error::HubError;
use crate::opcode::{OpCode, StackSettings};
use crate::trace::{Column, Trace};

const ITEM_COLUMNS: [[Column; 4]; 4] = [
    [
        Column::StackItemHeight1,
        Column::StackItemHeight2,
        Column::StackItemHeight3,
        Column::StackItemHeight4,
    ],
    [
        Column::StackItemValue1,
        Column::StackItemValue2,
        Column::StackItemValue3,
        Column::StackItemValue4,
    ],
    [
        Column::StackItemPop1,
        Column::StackItemPop2,
        Column::StackItemPop3,
        Column::StackItemPop4,
    ],
    [
        Column::StackItemStamp1,
        Column::StackItemStamp2,
        Column::StackItemStamp3,
        Column::StackItemStamp4,
    ],
];

/// One stack line of an instruction, along with the stack heights around it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackFragment {
    pub opcode: OpCode,
    pub settings: StackSettings,
    pub height: usize,
    pub height_new: usize,
    pub status: StackStatus,
    pub line: StackLine,
}

impl StackFragment {
    pub fn new(opcode: OpCode, stack: &Stack, line: StackLine) -> Self {
        Self {
            opcode,
            settings: stack.settings().unwrap_or_else(|| opcode.stack_settings()),
            height: stack.height(),
            height_new: stack.height_new(),
            status: stack.status(),
            line,
        }
    }

    pub(crate) fn trace(&self, trace: &mut Trace) -> Result<(), HubError> {
        let settings = &self.settings;

        trace.set(Column::StackInstruction, self.opcode.byte())?;
        trace.set(Column::StackFamily, self.opcode.family() as u8)?;
        trace.set(Column::StackHeight, self.height)?;
        trace.set(Column::StackHeightNew, self.height_new)?;
        trace.set(
            Column::StackUnderflow,
            self.status == StackStatus::Underflow,
        )?;
        trace.set(Column::StackOverflow, self.status == StackStatus::Overflow)?;
        trace.set(Column::StackDelta, settings.delta)?;
        trace.set(Column::StackAlpha, settings.alpha)?;
        trace.set(Column::StackFlag1, settings.flag1())?;
        trace.set(Column::StackFlag2, settings.flag2())?;
        trace.set(Column::StackFlag3, settings.flag3())?;
        trace.set(Column::StackFlag4, settings.flag4())?;

        for (i, item) in self.line.items.iter().enumerate() {
            trace.set(ITEM_COLUMNS[0][i], item.height)?;
            trace.set(ITEM_COLUMNS[1][i], item.value)?;
            trace.set(ITEM_COLUMNS[2][i], item.active && item.pop)?;
            trace.set(ITEM_COLUMNS[3][i], item.stamp)?;
        }

        Ok(())
    }
}
