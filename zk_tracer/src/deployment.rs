use ethereum_types::Address;
use hashbrown::HashMap;

/// Deployment epochs of the accounts touched by a conflation.
///
/// An address can be deployed, destroyed and deployed again within a single
/// conflation; its deployment number tells those incarnations apart. An
/// incarnation's epoch starts when its initialization code is entered, so
/// constructor rows already carry the new number. The epoch is only kept if
/// the deployment succeeds, failed attempts leave the number unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeploymentInfo {
    numbers: HashMap<Address, usize>,
    deploying: HashMap<Address, bool>,
    /// Epochs of deployments whose outcome is not known yet.
    pending: HashMap<Address, usize>,
}

impl DeploymentInfo {
    pub fn number(&self, address: Address) -> usize {
        self.pending
            .get(&address)
            .or_else(|| self.numbers.get(&address))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_deploying(&self, address: Address) -> bool {
        self.deploying.get(&address).copied().unwrap_or_default()
    }

    /// Records a successful deployment at `address`, keeping the epoch its
    /// initialization code ran under.
    pub fn deploy(&mut self, address: Address) {
        let committed = self.numbers.get(&address).copied().unwrap_or_default();
        let number = self.pending.remove(&address).unwrap_or(committed + 1);
        self.numbers.insert(address, number);
        self.deploying.insert(address, false);
    }

    /// Opens the next epoch of `address` while its initialization code runs.
    pub fn mark_deploying(&mut self, address: Address) {
        if !self.pending.contains_key(&address) {
            let committed = self.numbers.get(&address).copied().unwrap_or_default();
            self.pending.insert(address, committed + 1);
        }
        self.deploying.insert(address, true);
    }

    /// Ends the initialization code of `address`. The epoch it opened stays
    /// pending until the deployment is either kept or abandoned.
    pub fn unmark_deploying(&mut self, address: Address) {
        self.deploying.insert(address, false);
    }

    /// Drops the epoch opened by a failed deployment at `address`.
    pub fn abandon(&mut self, address: Address) {
        if self.pending.remove(&address).is_some() {
            log::debug!("deployment at {address:?} abandoned");
        }
        self.deploying.insert(address, false);
    }

    /// Drops the epochs of every deployment whose initialization code is
    /// over but which was never kept.
    pub fn abandon_finished(&mut self) {
        let deploying = &self.deploying;
        self.pending
            .retain(|address, _| deploying.get(address).copied().unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployments_bump_the_epoch_once_each() {
        let address = Address::from_low_u64_be(0xc0de);
        let mut info = DeploymentInfo::default();
        assert_eq!(info.number(address), 0);

        // The initialization code runs under the new epoch.
        info.mark_deploying(address);
        assert!(info.is_deploying(address));
        assert_eq!(info.number(address), 1);
        info.mark_deploying(address);
        assert_eq!(info.number(address), 1);

        info.unmark_deploying(address);
        assert_eq!(info.number(address), 1);
        info.deploy(address);
        assert!(!info.is_deploying(address));
        assert_eq!(info.number(address), 1);

        // A failed attempt leaves the epoch untouched.
        info.mark_deploying(address);
        assert_eq!(info.number(address), 2);
        info.unmark_deploying(address);
        info.abandon_finished();
        assert_eq!(info.number(address), 1);

        info.mark_deploying(address);
        info.abandon(address);
        assert_eq!(info.number(address), 1);

        info.mark_deploying(address);
        info.deploy(address);
        assert_eq!(info.number(address), 2);
    }

    #[test]
    fn deployments_without_initialization_code_still_count() {
        let address = Address::from_low_u64_be(0xc0de);
        let mut info = DeploymentInfo::default();
        info.deploy(address);
        info.deploy(address);
        assert_eq!(info.number(address), 2);
    }

    #[test]
    fn only_finished_deployments_are_abandoned() {
        let outer = Address::from_low_u64_be(1);
        let inner = Address::from_low_u64_be(2);
        let mut info = DeploymentInfo::default();

        info.mark_deploying(outer);
        info.mark_deploying(inner);
        info.unmark_deploying(inner);
        info.abandon_finished();

        assert_eq!(info.number(outer), 1);
        assert!(info.is_deploying(outer));
        assert_eq!(info.number(inner), 0);
    }
}
