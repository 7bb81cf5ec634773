//! The call tree of the transaction being traced.
//!
//! Frames live in an arena and refer to one another through their position
//! in it, so a frame id stays valid for the whole transaction, long after the
//! frame has exited. Context numbers are handed out by the hub and identify a
//! frame uniquely across the conflation.

mod frame;
mod stack;

use std::collections::VecDeque;

use bytes::Bytes;
pub use frame::{CallFrame, CallFrameType, FrameSpec};
use hashbrown::HashMap;
pub use stack::{
    Stack, StackContext, StackLine, StackOperation, StackStatus, STACK_LINE_WIDTH,
};

use crate::error::HubError;

#[derive(Clone, Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    current: Option<usize>,
    by_context_number: HashMap<usize, usize>,
    last_context_number: Option<usize>,
}

impl CallStack {
    /// Creates a call stack holding the root frame of a transaction.
    pub fn bedrock(spec: FrameSpec) -> Self {
        let mut call_stack = Self::default();
        let frame_type = if spec.is_deployment {
            CallFrameType::InitCode
        } else {
            CallFrameType::Root
        };
        call_stack.push(spec, frame_type, None);
        call_stack
    }

    /// Opens a child of the current frame and makes it current.
    pub fn enter(&mut self, spec: FrameSpec) -> Result<usize, HubError> {
        let parent = self.current.ok_or(HubError::NoCurrentFrame)?;
        if let Some(last) = self.last_context_number {
            if spec.context_number <= last {
                return Err(HubError::NonMonotonicContextNumber {
                    last,
                    new: spec.context_number,
                });
            }
        }

        let frame_type = if spec.is_deployment {
            CallFrameType::InitCode
        } else if spec.is_static || self.frames[parent].is_static() {
            CallFrameType::Static
        } else {
            CallFrameType::Standard
        };
        let id = self.push(spec, frame_type, Some(parent));

        let parent = &mut self.frames[parent];
        parent.children.push(id);
        parent.last_called_child = Some(id);

        Ok(id)
    }

    fn push(&mut self, spec: FrameSpec, frame_type: CallFrameType, parent_id: Option<usize>) -> usize {
        let id = self.frames.len();
        let (depth, parent_address) = match parent_id {
            Some(parent) => (self.frames[parent].depth + 1, self.frames[parent].address),
            None => (0, Default::default()),
        };

        self.frames.push(CallFrame {
            id,
            context_number: spec.context_number,
            parent_id,
            children: vec![],
            last_called_child: None,
            depth,
            frame_type,
            address: spec.address,
            address_deployment_number: spec.address_deployment_number,
            code_address: spec.code_address,
            code_deployment_number: spec.code_deployment_number,
            code_deployment_status: spec.code_deployment_status,
            parent_address,
            code: spec.code,
            value: spec.value,
            gas_endowment: spec.gas,
            call_data: spec.call_data,
            return_data: Bytes::new(),
            output_data: Bytes::new(),
            start_stamp: spec.stamp,
            end_line: None,
            revert_stamp: None,
            self_reverts: false,
            stack: Stack::default(),
        });
        self.by_context_number.insert(spec.context_number, id);
        self.last_context_number = Some(spec.context_number);
        self.current = Some(id);

        id
    }

    /// Closes the current frame and makes its parent current.
    ///
    /// The parent's return data becomes the frame's output data, empty when
    /// the frame halts without output. The frame's `return_data`, left over
    /// from its own last child, is never handed up, and reporting it along
    /// with output data means the interpreter's report cannot be trusted.
    pub fn exit(
        &mut self,
        end_line: usize,
        output_data: Bytes,
        return_data: Bytes,
    ) -> Result<(), HubError> {
        let id = self.current.ok_or(HubError::NoCurrentFrame)?;
        let frame = &mut self.frames[id];

        if !output_data.is_empty() && !return_data.is_empty() {
            return Err(HubError::AmbiguousFrameOutput {
                context_number: frame.context_number,
            });
        }

        frame.end_line = Some(end_line);
        frame.output_data = output_data.clone();
        self.current = frame.parent_id;

        if let Some(parent) = self.current {
            self.frames[parent].return_data = output_data;
        }

        Ok(())
    }

    /// Marks the current frame as reverted at `stamp`, along with every frame
    /// of its subtree that has not already reverted.
    pub fn revert(&mut self, stamp: usize) -> Result<(), HubError> {
        let id = self.current.ok_or(HubError::NoCurrentFrame)?;
        let frame = &mut self.frames[id];
        if frame.revert_stamp.is_some() {
            return Ok(());
        }
        frame.revert_stamp = Some(stamp);
        frame.self_reverts = true;

        let mut pending: VecDeque<usize> = frame.children.iter().copied().collect();
        while let Some(child) = pending.pop_front() {
            let child = &mut self.frames[child];
            if child.revert_stamp.is_none() {
                child.revert_stamp = Some(stamp);
            }
            pending.extend(child.children.iter().copied());
        }

        Ok(())
    }

    pub fn top(&self) -> Result<&CallFrame, HubError> {
        self.current
            .map(|id| &self.frames[id])
            .ok_or(HubError::NoCurrentFrame)
    }

    pub fn top_mut(&mut self) -> Result<&mut CallFrame, HubError> {
        match self.current {
            Some(id) => Ok(&mut self.frames[id]),
            None => Err(HubError::NoCurrentFrame),
        }
    }

    pub fn by_id(&self, id: usize) -> Result<&CallFrame, HubError> {
        self.frames.get(id).ok_or(HubError::UnknownFrameId(id))
    }

    pub fn by_id_mut(&mut self, id: usize) -> Result<&mut CallFrame, HubError> {
        self.frames.get_mut(id).ok_or(HubError::UnknownFrameId(id))
    }

    pub fn by_context_number(&self, context_number: usize) -> Result<&CallFrame, HubError> {
        self.by_context_number
            .get(&context_number)
            .map(|id| &self.frames[*id])
            .ok_or(HubError::UnknownContextNumber(context_number))
    }

    pub fn parent(&self, frame: &CallFrame) -> Option<&CallFrame> {
        frame.parent_id.map(|id| &self.frames[id])
    }

    /// Depth of the current frame, `None` once the root has exited.
    pub fn depth(&self) -> Option<usize> {
        self.current.map(|id| self.frames[id].depth)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> impl Iterator<Item = &CallFrame> {
        self.frames.iter()
    }
}
