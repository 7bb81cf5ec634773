use ethereum_types::{Address, U256};

use super::RetconView;
use crate::error::HubError;
use crate::trace::{Column, Trace};
use crate::world::{BlockHeader, Transaction};

/// The transaction being executed. Its outcome columns are only known once
/// the transaction ends, and are read from the post-transaction metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionFragment {
    pub from: Address,
    pub to: Address,
    pub coinbase: Address,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub base_fee: U256,
    pub is_deployment: bool,
    pub call_data_size: usize,
    pub requires_evm_execution: bool,
}

impl TransactionFragment {
    pub fn new(tx: &Transaction, block: &BlockHeader, requires_evm_execution: bool) -> Self {
        Self {
            from: tx.sender,
            to: tx.effective_to(),
            coinbase: block.coinbase,
            nonce: tx.nonce,
            value: tx.value,
            gas_limit: tx.gas_limit,
            gas_price: tx.gas_price,
            base_fee: block.base_fee,
            is_deployment: tx.is_deployment(),
            call_data_size: tx.payload.len(),
            requires_evm_execution,
        }
    }

    pub(crate) fn trace(&self, trace: &mut Trace, view: &RetconView) -> Result<(), HubError> {
        trace.set(Column::TxnFrom, self.from)?;
        trace.set(Column::TxnTo, self.to)?;
        trace.set(Column::TxnCoinbase, self.coinbase)?;
        trace.set(Column::TxnNonce, self.nonce)?;
        trace.set(Column::TxnValue, self.value)?;
        trace.set(Column::TxnGasLimit, self.gas_limit)?;
        trace.set(Column::TxnGasPrice, self.gas_price)?;
        trace.set(Column::TxnBaseFee, self.base_fee)?;
        trace.set(Column::TxnIsDeployment, self.is_deployment)?;
        trace.set(Column::TxnCallDataSize, self.call_data_size)?;
        trace.set(
            Column::TxnRequiresEvmExecution,
            self.requires_evm_execution,
        )?;
        trace.set(Column::TxnStatusCode, view.tx.success)?;
        trace.set(Column::TxnLeftoverGas, view.tx.leftover_gas)?;
        trace.set(Column::TxnGasRefundAmount, view.tx.refund_amount)?;

        Ok(())
    }
}
