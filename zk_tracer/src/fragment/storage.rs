use ethereum_types::{Address, U256};

use crate::error::HubError;
use crate::trace::{Column, Trace};

/// A storage slot as read or written by an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageFragment {
    pub address: Address,
    pub deployment_number: usize,
    pub key: U256,
    /// Value of the slot at the start of the transaction.
    pub value_orig: U256,
    pub value_curr: U256,
    pub value_next: U256,
    pub warm: bool,
    pub warm_new: bool,
}

impl StorageFragment {
    pub(crate) fn trace(&self, trace: &mut Trace) -> Result<(), HubError> {
        trace.set(Column::StorageAddress, self.address)?;
        trace.set(Column::StorageDeploymentNumber, self.deployment_number)?;
        trace.set(Column::StorageKey, self.key)?;
        trace.set(Column::StorageValueOrig, self.value_orig)?;
        trace.set(Column::StorageValueCurr, self.value_curr)?;
        trace.set(Column::StorageValueNext, self.value_next)?;
        trace.set(Column::StorageWarm, self.warm)?;
        trace.set(Column::StorageWarmNew, self.warm_new)?;
        trace.set(Column::StorageValueOrigIsZero, self.value_orig.is_zero())?;
        trace.set(
            Column::StorageValueCurrIsOrig,
            self.value_curr == self.value_orig,
        )?;
        trace.set(Column::StorageValueCurrIsZero, self.value_curr.is_zero())?;
        trace.set(
            Column::StorageValueNextIsCurr,
            self.value_next == self.value_curr,
        )?;
        trace.set(Column::StorageValueNextIsZero, self.value_next.is_zero())?;
        trace.set(
            Column::StorageValueNextIsOrig,
            self.value_next == self.value_orig,
        )?;

        Ok(())
    }
}
