use ethereum_types::U256;
use strum::IntoStaticStr;

/// Phases of the processing of a transaction.
///
/// A transaction either goes `Skip`, when it does not require any EVM
/// execution, or `Warm -> Init -> Exec -> Final`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum TxState {
    Skip,
    Warm,
    Init,
    Exec,
    Final,
}

/// Outcome of a transaction, known once it ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxEndMetadata {
    pub success: bool,
    /// Hub stamp of the last section of the transaction.
    pub hub_stamp_end: usize,
    pub leftover_gas: u64,
    /// Wei returned to the sender for the unused gas.
    pub refund_amount: U256,
}
