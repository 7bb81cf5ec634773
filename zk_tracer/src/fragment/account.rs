use ethereum_types::{Address, H256, U256};
use zk_tracer_common::{is_precompile, EMPTY_CODE_HASH};

use crate::deployment::DeploymentInfo;
use crate::error::HubError;
use crate::trace::{Column, Trace};
use crate::world::AccountState;

/// An account as seen at one point of the execution, tagged with its
/// deployment epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub address: Address,
    pub nonce: u64,
    pub balance: U256,
    pub code_size: usize,
    pub code_hash: H256,
    pub exists: bool,
    pub warm: bool,
    pub deployment_number: usize,
    pub deployment_status: bool,
}

impl AccountSnapshot {
    pub fn new(
        address: Address,
        account: Option<&AccountState>,
        warm: bool,
        deployments: &DeploymentInfo,
    ) -> Self {
        let (nonce, balance, code_size, code_hash) = match account {
            Some(account) => (
                account.nonce,
                account.balance,
                account.code_size(),
                account.code_hash(),
            ),
            None => (0, U256::zero(), 0, EMPTY_CODE_HASH),
        };

        Self {
            address,
            nonce,
            balance,
            code_size,
            code_hash,
            exists: account.is_some(),
            warm,
            deployment_number: deployments.number(address),
            deployment_status: deployments.is_deploying(address),
        }
    }

    pub fn warm(self) -> Self {
        Self { warm: true, ..self }
    }

    pub fn with_deployment(self, deployments: &DeploymentInfo) -> Self {
        Self {
            deployment_number: deployments.number(self.address),
            deployment_status: deployments.is_deploying(self.address),
            ..self
        }
    }
}

/// An account before and after an instruction or a transaction boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountFragment {
    pub before: AccountSnapshot,
    pub after: AccountSnapshot,
    /// Deployment number and status of the address at the end of the
    /// conflation, filled in once the conflation is over.
    pub(crate) infty: Option<(usize, bool)>,
}

impl AccountFragment {
    pub fn new(before: AccountSnapshot, after: AccountSnapshot) -> Self {
        Self {
            before,
            after,
            infty: None,
        }
    }

    /// An account read without modification.
    pub fn unchanged(snapshot: AccountSnapshot) -> Self {
        Self::new(snapshot, snapshot)
    }

    pub fn address(&self) -> Address {
        self.before.address
    }

    pub(crate) fn set_final_deployment(&mut self, deployments: &DeploymentInfo) {
        let address = self.address();
        self.infty = Some((deployments.number(address), deployments.is_deploying(address)));
    }

    pub(crate) fn trace(&self, trace: &mut Trace) -> Result<(), HubError> {
        let (before, after) = (&self.before, &self.after);
        let (number_infty, status_infty) = self
            .infty
            .ok_or(HubError::UnresolvedDeploymentEpoch(before.address))?;

        trace.set(Column::AccountAddress, before.address)?;
        trace.set(Column::AccountIsPrecompile, is_precompile(before.address))?;
        trace.set(Column::AccountNonce, before.nonce)?;
        trace.set(Column::AccountNonceNew, after.nonce)?;
        trace.set(Column::AccountBalance, before.balance)?;
        trace.set(Column::AccountBalanceNew, after.balance)?;
        trace.set(Column::AccountCodeSize, before.code_size)?;
        trace.set(Column::AccountCodeSizeNew, after.code_size)?;
        trace.set(Column::AccountCodeHash, before.code_hash)?;
        trace.set(Column::AccountCodeHashNew, after.code_hash)?;
        trace.set(Column::AccountExists, before.exists)?;
        trace.set(Column::AccountExistsNew, after.exists)?;
        trace.set(Column::AccountWarm, before.warm)?;
        trace.set(Column::AccountWarmNew, after.warm)?;
        trace.set(Column::AccountDeploymentNumber, before.deployment_number)?;
        trace.set(Column::AccountDeploymentNumberNew, after.deployment_number)?;
        trace.set(Column::AccountDeploymentStatus, before.deployment_status)?;
        trace.set(Column::AccountDeploymentStatusNew, after.deployment_status)?;
        trace.set(Column::AccountDeploymentNumberInfty, number_infty)?;
        trace.set(Column::AccountDeploymentStatusInfty, status_infty)?;

        Ok(())
    }
}
