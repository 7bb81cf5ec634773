//! The hub's view of a frame's operand stack.
//!
//! Before an instruction executes, [`Stack::process_instruction`] checks its
//! stack requirements and records the stack operations it performs as a
//! [`StackContext`]. Values pushed by the instruction are unknown at that
//! point; the lines carrying them are armed and get back-filled once the
//! interpreter reports the outcome.

use ethereum_types::U256;

use crate::opcode::{OpCode, StackPattern, StackSettings};
use crate::world::MessageFrame;

/// Number of stack operations held by a single stack line.
pub const STACK_LINE_WIDTH: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StackStatus {
    #[default]
    Normal,
    Underflow,
    Overflow,
}

impl StackStatus {
    pub const fn is_ok(self) -> bool {
        matches!(self, StackStatus::Normal)
    }
}

/// A single read or write of a stack slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StackOperation {
    pub height: usize,
    pub value: U256,
    /// `true` for reads, `false` for writes.
    pub pop: bool,
    pub stamp: usize,
    /// Whether the slot holds an actual operation rather than padding.
    pub active: bool,
}

impl StackOperation {
    const fn pop(height: usize, value: U256, stamp: usize) -> Self {
        Self {
            height,
            value,
            pop: true,
            stamp,
            active: true,
        }
    }

    const fn push(height: usize, value: U256, stamp: usize) -> Self {
        Self {
            height,
            value,
            pop: false,
            stamp,
            active: true,
        }
    }
}

/// Up to four stack operations, each in a fixed column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackLine {
    /// Position of the line among the instruction's stack lines.
    pub ct: usize,
    pub items: [StackOperation; STACK_LINE_WIDTH],
    /// Column (1-based) of the push whose value is only known after
    /// execution.
    pub result_column: Option<usize>,
}

impl StackLine {
    fn empty(ct: usize) -> Self {
        Self {
            ct,
            ..Default::default()
        }
    }

    pub fn needs_result(&self) -> bool {
        self.result_column.is_some()
    }
}

/// The stack lines of the instruction currently being executed by a frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackContext {
    pub opcode: Option<OpCode>,
    pub lines: Vec<StackLine>,
    /// Index, in the transaction trace, of the section holding these lines.
    pub section: Option<usize>,
}

impl StackContext {
    fn new(opcode: OpCode) -> Self {
        Self {
            opcode: Some(opcode),
            lines: Vec::with_capacity(2),
            section: None,
        }
    }
}

/// Operand stack bookkeeping for one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack {
    height: usize,
    height_new: usize,
    status: StackStatus,
    settings: Option<StackSettings>,
    pub(crate) current: StackContext,
}

/// Stamped operation builder for the instruction being processed.
struct Ops<'a> {
    frame: &'a dyn MessageFrame,
    height: usize,
    stamp: usize,
    next: usize,
}

impl Ops<'_> {
    fn next_stamp(&mut self) -> usize {
        let stamp = self.stamp + self.next;
        self.next += 1;
        stamp
    }

    /// Reads the item `depth` slots below the top.
    fn pop(&mut self, depth: usize) -> StackOperation {
        let value = self.frame.stack_item(depth);
        let stamp = self.next_stamp();
        StackOperation::pop(self.height - depth, value, stamp)
    }

    /// Writes a known value at `height`.
    fn push_immediate(&mut self, height: usize, value: U256) -> StackOperation {
        let stamp = self.next_stamp();
        StackOperation::push(height, value, stamp)
    }

    /// Writes a value at `height` that is only known after execution.
    fn push_result(&mut self, height: usize) -> StackOperation {
        self.push_immediate(height, U256::zero())
    }
}

impl Stack {
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn height_new(&self) -> usize {
        self.height_new
    }

    pub fn status(&self) -> StackStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    pub fn settings(&self) -> Option<StackSettings> {
        self.settings
    }

    pub fn current(&self) -> &StackContext {
        &self.current
    }

    /// Checks the stack requirements of the frame's current instruction and
    /// records its stack lines, stamped from `stamp` onwards.
    pub fn process_instruction(
        &mut self,
        frame: &dyn MessageFrame,
        max_height: usize,
        stamp: usize,
    ) {
        let opcode = OpCode::from(frame.opcode());
        let settings = opcode.stack_settings();
        let (delta, alpha) = (settings.delta as usize, settings.alpha as usize);

        self.settings = Some(settings);
        self.current = StackContext::new(opcode);
        self.height = frame.stack_size();

        self.status = if self.height < delta {
            StackStatus::Underflow
        } else if self.height - delta + alpha > max_height {
            StackStatus::Overflow
        } else {
            StackStatus::Normal
        };

        if !self.status.is_ok() {
            self.height_new = 0;
            for ct in 0..settings.line_count() {
                self.current.lines.push(StackLine::empty(ct));
            }
            return;
        }

        self.height_new = self.height - delta + alpha;

        let mut ops = Ops {
            frame,
            height: self.height,
            stamp,
            next: 0,
        };
        let h = self.height;

        match settings.pattern {
            StackPattern::ZeroZero => self.add_line([]),
            StackPattern::OneZero => {
                let a = ops.pop(0);
                self.add_line([(1, a)]);
            }
            StackPattern::TwoZero => {
                let (a, b) = (ops.pop(0), ops.pop(1));
                self.add_line([(1, a), (2, b)]);
            }
            StackPattern::ZeroOne => {
                let r = ops.push_result(h + 1);
                self.add_arming_line([(4, r)], 4);
            }
            StackPattern::OneOne => {
                let a = ops.pop(0);
                let r = ops.push_result(h);
                self.add_arming_line([(1, a), (4, r)], 4);
            }
            StackPattern::TwoOne => {
                let (a, b) = (ops.pop(0), ops.pop(1));
                let r = ops.push_result(h - 1);
                self.add_arming_line([(1, a), (2, b), (4, r)], 4);
            }
            StackPattern::ThreeOne => {
                let (a, b, c) = (ops.pop(0), ops.pop(1), ops.pop(2));
                let r = ops.push_result(h - 2);
                self.add_arming_line([(1, a), (2, b), (3, c), (4, r)], 4);
            }
            StackPattern::LoadStore => {
                if settings.flag1() {
                    let (a, b) = (ops.pop(0), ops.pop(1));
                    self.add_line([(1, a), (2, b)]);
                } else {
                    let a = ops.pop(0);
                    let r = ops.push_result(h);
                    self.add_arming_line([(1, a), (4, r)], 4);
                }
            }
            StackPattern::Dup => {
                let depth = delta - 1;
                let value = frame.stack_item(depth);
                let a = ops.pop(depth);
                let b = ops.push_immediate(h - depth, value);
                let c = ops.push_immediate(h + 1, value);
                self.add_line([(1, a), (2, b), (4, c)]);
            }
            StackPattern::Swap => {
                let depth = delta - 1;
                let (top, bottom) = (frame.stack_item(0), frame.stack_item(depth));
                let a = ops.pop(depth);
                let b = ops.pop(0);
                let c = ops.push_immediate(h - depth, top);
                let d = ops.push_immediate(h, bottom);
                self.add_line([(1, a), (2, b), (3, c), (4, d)]);
            }
            StackPattern::Log => {
                let (offset, size) = (ops.pop(0), ops.pop(1));
                self.add_line([(1, offset), (2, size)]);
                let topics: Vec<_> = (2..delta)
                    .map(|depth| ops.pop(depth))
                    .enumerate()
                    .map(|(i, op)| (i + 1, op))
                    .collect();
                self.add_line(topics);
            }
            StackPattern::Copy => {
                let items: Vec<_> = (0..delta).map(|depth| (depth + 1, ops.pop(depth))).collect();
                self.add_line(items);
            }
            StackPattern::Call => {
                // gas, address, [value,] args offset, args size, return
                // offset, return size
                let memory_start = delta - 4;
                let memory: Vec<_> = (memory_start..delta)
                    .enumerate()
                    .map(|(i, depth)| (i + 1, ops.pop(depth)))
                    .collect();
                self.add_line(memory);

                let mut head: Vec<_> = (0..memory_start)
                    .map(|depth| (depth + 1, ops.pop(depth)))
                    .collect();
                head.push((4, ops.push_result(h - delta + 1)));
                self.add_arming_line(head, 4);
            }
            StackPattern::Create => {
                // value, offset, size[, salt]
                let (offset, size) = (ops.pop(1), ops.pop(2));
                self.add_line([(1, offset), (2, size)]);

                let mut head = vec![(1, ops.pop(0))];
                if settings.flag1() {
                    head.push((2, ops.pop(3)));
                }
                head.push((4, ops.push_result(h - delta + 1)));
                self.add_arming_line(head, 4);
            }
        }
    }

    fn add_line(&mut self, items: impl IntoIterator<Item = (usize, StackOperation)>) {
        let mut line = StackLine::empty(self.current.lines.len());
        for (column, op) in items {
            line.items[column - 1] = op;
        }
        self.current.lines.push(line);
    }

    fn add_arming_line(
        &mut self,
        items: impl IntoIterator<Item = (usize, StackOperation)>,
        result_column: usize,
    ) {
        self.add_line(items);
        if let Some(line) = self.current.lines.last_mut() {
            line.result_column = Some(result_column);
        }
    }
}
