//! Witness generation for the hub of a zk-EVM arithmetization.
//!
//! An EVM interpreter executing a conflation (a batch of blocks proved
//! together) drives a [`Hub`] through a fixed set of callbacks: conflation,
//! block and transaction boundaries, context entry and exit, and two calls
//! per instruction, one before it executes and one once its outcome is
//! known. From this stream the hub builds the rows of its trace, a table
//! whose every row carries one *perspective* (stack, context, account,
//! storage, transaction or copy) and whose rows are grouped into sections.
//!
//! # Sections
//!
//! Every transaction phase and every instruction produces one section. A
//! section starts with the stack lines of its instruction, if any, followed
//! by the fragments describing the state it touches. Some of these cannot be
//! built when the instruction is processed:
//!
//! - the result of an instruction is only on the stack after it executes;
//! - `CALL` and `CREATE` sections depend on whether a child context is
//!   entered;
//! - whether a context reverts is only known once its subtree has run;
//! - deployment epochs of touched accounts are only final at the end of the
//!   conflation.
//!
//! The first two are resolved through the [`defer`] registry, the last two
//! by retroactive passes run when a transaction, respectively the
//! conflation, is sealed.
//!
//! # Driving the hub
//!
//! ```ignore
//! let mut hub = Hub::new(HubConfig::default())?;
//! hub.trace_start_conflation();
//! hub.trace_start_block(&block);
//! hub.trace_start_tx(&world, &tx)?;
//! // For each instruction of each frame:
//! hub.trace(&frame)?;
//! hub.trace_post_execution(&frame, result)?;
//! // ...
//! hub.trace_end_tx(&world, &tx, success, &output, &logs, gas_used)?;
//! hub.trace_end_conflation()?;
//!
//! let columns = hub.commit()?;
//! ```
//!
//! Interpreters living in another process can record their callbacks as a
//! stream of [`replay::ReplayEvent`]s instead, replayed with [`replay::run`]
//! or the `trace_replay` binary.
//!
//! Any [`HubError`] is fatal to the conflation being traced. EVM exceptions
//! are not errors: they are tracked per instruction as [`Exceptions`].

zk_tracer_common::check_chain_features!();

// Execution model
pub mod callstack;
pub mod exceptions;
pub mod opcode;
pub mod transaction;
pub mod world;

// Trace construction
pub mod defer;
pub mod deployment;
pub mod fragment;
pub mod hub;
pub mod module;
pub mod section;
pub mod state;
pub mod trace;

// Utility modules
pub mod config;
pub mod error;
pub mod replay;
pub mod testing_utils;
mod util;

// Public definitions and re-exports
pub use crate::config::HubConfig;
pub use crate::error::HubError;
pub use crate::exceptions::Exceptions;
pub use crate::hub::Hub;
pub use crate::opcode::OpCode;
pub use crate::trace::{Column, TraceColumns};
pub use crate::world::{MessageFrame, OperationResult, Transaction, WorldView};
