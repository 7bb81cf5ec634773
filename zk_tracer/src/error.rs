use ethereum_types::Address;
use thiserror::Error;

use crate::trace::Column;

/// Fatal conditions raised while building a trace.
///
/// EVM exceptions are not part of this type: they are regular outcomes of
/// execution and are tracked through [`crate::exceptions::Exceptions`].
/// Every variant here means the witness can no longer be trusted and the
/// whole conflation must be abandoned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("column {0} has already been set in the current row")]
    ColumnSetTwice(Column),

    #[error("column {0} has not been filled")]
    ColumnUnset(Column),

    #[error("column {0} does not belong to the perspective of the current row")]
    ForeignColumn(Column),

    #[error("cannot build trace with a non-validated row ({0} column(s) set)")]
    PartialRow(usize),

    #[error("exiting frame {context_number} holds both return data and output data")]
    AmbiguousFrameOutput { context_number: usize },

    #[error("no current frame")]
    NoCurrentFrame,

    #[error("unknown frame id {0}")]
    UnknownFrameId(usize),

    #[error("no frame with context number {0}")]
    UnknownContextNumber(usize),

    #[error("context number {new} does not exceed the last issued context number {last}")]
    NonMonotonicContextNumber { last: usize, new: usize },

    #[error("opcode {opcode:#04x} reached the {family} handler")]
    UnexpectedOpcode { opcode: u8, family: &'static str },

    #[error("instruction of context {0} has no recorded section")]
    MissingInstructionSection(usize),

    #[error("line {line} of section {section} is not a stack line")]
    NotAStackLine { section: usize, line: usize },

    #[error("final deployment epoch of {0:?} was never resolved")]
    UnresolvedDeploymentEpoch(Address),

    #[error("{item} cannot run at {trigger}")]
    UnexpectedDeferral {
        item: &'static str,
        trigger: &'static str,
    },

    #[error("no transaction is being traced")]
    NoOpenTransaction,

    #[error("a transaction is still being traced")]
    TransactionInProgress,

    #[error("no transaction {0} in the conflation")]
    UnknownTransaction(usize),

    #[error("post-transaction correction already applied")]
    TransactionAlreadySealed,

    #[error("conflation trace already sealed")]
    ConflationAlreadySealed,

    #[error("conflation trace has not been sealed")]
    ConflationNotSealed,

    #[error("transaction recipient {0:?} is a precompile")]
    TransactionToPrecompile(Address),

    #[error("emitted {emitted} rows but sections account for {expected} lines")]
    LineCountMismatch { expected: usize, emitted: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
