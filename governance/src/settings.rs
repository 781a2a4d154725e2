//! Settings store with a one-way bootstrap mode.
//!
//! While bootstrap mode is open the guardian may write any setting directly.
//! Disabling bootstrap mode is permanent; afterwards only proposal execution
//! may write, and only into governable groups.

use crate::error::GovernanceError;
use crate::params::GOVERNABLE_GROUPS;
use trustdao_store::{SettingKey, SettingValue, SettingsBacking};
use trustdao_types::NodeAddress;

const BOOTSTRAP_GROUP: &str = "dao.bootstrap";
const BOOTSTRAP_DISABLED_PATH: &str = "bootstrap.disabled";

/// Typed settings for one governance domain.
///
/// The protocol-level and trusted-node-level domains are separate instances,
/// each with its own guardian and bootstrap flag.
pub struct SettingsStore<B> {
    backing: B,
    guardian: NodeAddress,
    bootstrap_disabled: bool,
}

impl<B: SettingsBacking> SettingsStore<B> {
    /// Open a store over `backing`, restoring the bootstrap flag if present.
    pub fn open(backing: B, guardian: NodeAddress) -> Result<Self, GovernanceError> {
        let flag = backing.get(&Self::bootstrap_key())?;
        Ok(Self {
            backing,
            guardian,
            bootstrap_disabled: matches!(flag, Some(SettingValue::Bool(true))),
        })
    }

    fn bootstrap_key() -> SettingKey {
        SettingKey::new(BOOTSTRAP_GROUP, BOOTSTRAP_DISABLED_PATH)
    }

    /// Write every default whose key has never been set.
    pub fn seed_defaults(
        &mut self,
        defaults: &[(SettingKey, SettingValue)],
    ) -> Result<(), GovernanceError> {
        for (key, value) in defaults {
            if self.backing.get(key)?.is_none() {
                self.backing.put(key, value.clone())?;
            }
        }
        Ok(())
    }

    pub fn guardian(&self) -> &NodeAddress {
        &self.guardian
    }

    pub fn is_bootstrap_open(&self) -> bool {
        !self.bootstrap_disabled
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    pub fn get(&self, group: &str, path: &str) -> Result<Option<SettingValue>, GovernanceError> {
        Ok(self.backing.get(&SettingKey::new(group, path))?)
    }

    pub fn get_uint(&self, group: &str, path: &str) -> Result<u128, GovernanceError> {
        match self.get(group, path)? {
            Some(SettingValue::Uint(v)) => Ok(v),
            other => Err(Self::mismatch(group, path, "uint", other)),
        }
    }

    pub fn get_bool(&self, group: &str, path: &str) -> Result<bool, GovernanceError> {
        match self.get(group, path)? {
            Some(SettingValue::Bool(v)) => Ok(v),
            other => Err(Self::mismatch(group, path, "bool", other)),
        }
    }

    pub fn get_address(&self, group: &str, path: &str) -> Result<NodeAddress, GovernanceError> {
        match self.get(group, path)? {
            Some(SettingValue::Address(v)) => Ok(v),
            other => Err(Self::mismatch(group, path, "address", other)),
        }
    }

    fn mismatch(
        group: &str,
        path: &str,
        wanted: &str,
        found: Option<SettingValue>,
    ) -> GovernanceError {
        let reason = match found {
            None => "not set".to_string(),
            Some(v) => format!("expected {wanted}, found {}", v.type_name()),
        };
        GovernanceError::InvalidSetting {
            key: SettingKey::new(group, path),
            reason,
        }
    }

    /// Fails unless bootstrap mode is open and `caller` is the guardian.
    pub fn check_bootstrap(&self, caller: &NodeAddress) -> Result<(), GovernanceError> {
        if self.bootstrap_disabled {
            return Err(GovernanceError::BootstrapClosed);
        }
        if caller != &self.guardian {
            return Err(GovernanceError::NotGuardian(caller.to_string()));
        }
        Ok(())
    }

    fn bootstrap_set(
        &mut self,
        caller: &NodeAddress,
        group: &str,
        path: &str,
        value: SettingValue,
    ) -> Result<(), GovernanceError> {
        self.check_bootstrap(caller)?;
        let key = SettingKey::new(group, path);
        // The flag has one writer: disable_bootstrap.
        if group == BOOTSTRAP_GROUP {
            return Err(GovernanceError::InvalidSetting {
                key,
                reason: "bootstrap mode is closed with disable_bootstrap only".into(),
            });
        }
        self.backing.put(&key, value)?;
        tracing::info!(setting = %key, "bootstrap setting written");
        Ok(())
    }

    pub fn bootstrap_set_uint(
        &mut self,
        caller: &NodeAddress,
        group: &str,
        path: &str,
        value: u128,
    ) -> Result<(), GovernanceError> {
        self.bootstrap_set(caller, group, path, SettingValue::Uint(value))
    }

    pub fn bootstrap_set_bool(
        &mut self,
        caller: &NodeAddress,
        group: &str,
        path: &str,
        value: bool,
    ) -> Result<(), GovernanceError> {
        self.bootstrap_set(caller, group, path, SettingValue::Bool(value))
    }

    pub fn bootstrap_set_address(
        &mut self,
        caller: &NodeAddress,
        group: &str,
        path: &str,
        value: NodeAddress,
    ) -> Result<(), GovernanceError> {
        self.bootstrap_set(caller, group, path, SettingValue::Address(value))
    }

    /// Permanently close bootstrap mode.
    pub fn disable_bootstrap(&mut self, caller: &NodeAddress) -> Result<(), GovernanceError> {
        self.check_bootstrap(caller)?;
        self.backing
            .put(&Self::bootstrap_key(), SettingValue::Bool(true))?;
        self.bootstrap_disabled = true;
        tracing::info!(guardian = %caller, "bootstrap mode disabled");
        Ok(())
    }

    /// Fails unless proposals may write into `group`.
    pub fn check_governable(group: &str) -> Result<(), GovernanceError> {
        if GOVERNABLE_GROUPS.contains(&group) {
            Ok(())
        } else {
            Err(GovernanceError::SettingNotGovernable(group.to_string()))
        }
    }

    /// Write performed by an executed settings proposal.
    pub(crate) fn set_by_proposal(
        &mut self,
        key: &SettingKey,
        value: SettingValue,
    ) -> Result<(), GovernanceError> {
        Self::check_governable(&key.group)?;
        self.backing.put(key, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustdao_nullables::NullSettingsBacking;

    fn addr(n: u8) -> NodeAddress {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        NodeAddress::from_bytes(bytes)
    }

    fn store() -> SettingsStore<NullSettingsBacking> {
        SettingsStore::open(NullSettingsBacking::new(), addr(1)).unwrap()
    }

    #[test]
    fn guardian_writes_during_bootstrap() {
        let mut s = store();
        s.bootstrap_set_uint(&addr(1), "members", "members.minimum", 5)
            .unwrap();
        s.bootstrap_set_bool(&addr(1), "members", "members.flag", true)
            .unwrap();
        s.bootstrap_set_address(&addr(1), "network", "oracle", addr(9))
            .unwrap();
        assert_eq!(s.get_uint("members", "members.minimum").unwrap(), 5);
        assert!(s.get_bool("members", "members.flag").unwrap());
        assert_eq!(s.get_address("network", "oracle").unwrap(), addr(9));
    }

    #[test]
    fn non_guardian_rejected() {
        let mut s = store();
        let err = s
            .bootstrap_set_uint(&addr(2), "members", "members.minimum", 5)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotGuardian(_)));
    }

    #[test]
    fn disable_is_one_way() {
        let mut s = store();
        s.disable_bootstrap(&addr(1)).unwrap();
        assert!(!s.is_bootstrap_open());
        assert!(matches!(
            s.bootstrap_set_uint(&addr(1), "members", "members.minimum", 5),
            Err(GovernanceError::BootstrapClosed)
        ));
        assert!(matches!(
            s.disable_bootstrap(&addr(1)),
            Err(GovernanceError::BootstrapClosed)
        ));
    }

    #[test]
    fn bootstrap_flag_is_not_a_writable_setting() {
        let mut s = store();
        assert!(matches!(
            s.bootstrap_set_bool(&addr(1), BOOTSTRAP_GROUP, BOOTSTRAP_DISABLED_PATH, true),
            Err(GovernanceError::InvalidSetting { .. })
        ));
        assert!(matches!(
            s.bootstrap_set_uint(&addr(1), BOOTSTRAP_GROUP, "other", 1),
            Err(GovernanceError::InvalidSetting { .. })
        ));
        assert!(s.is_bootstrap_open());
        assert_eq!(s.get(BOOTSTRAP_GROUP, BOOTSTRAP_DISABLED_PATH).unwrap(), None);

        let SettingsStore { backing, .. } = s;
        let reopened = SettingsStore::open(backing, addr(1)).unwrap();
        assert!(reopened.is_bootstrap_open());
    }

    #[test]
    fn reopening_restores_disabled_flag() {
        let mut s = store();
        s.disable_bootstrap(&addr(1)).unwrap();
        let SettingsStore { backing, .. } = s;
        let reopened = SettingsStore::open(backing, addr(1)).unwrap();
        assert!(!reopened.is_bootstrap_open());
    }

    #[test]
    fn typed_reads_report_mismatch_and_missing() {
        let mut s = store();
        s.bootstrap_set_bool(&addr(1), "members", "x", true).unwrap();
        assert!(matches!(
            s.get_uint("members", "x"),
            Err(GovernanceError::InvalidSetting { .. })
        ));
        assert!(matches!(
            s.get_uint("members", "missing"),
            Err(GovernanceError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn seed_defaults_keeps_existing_values() {
        let mut s = store();
        s.bootstrap_set_uint(&addr(1), "members", "a", 7).unwrap();
        s.seed_defaults(&[
            (SettingKey::new("members", "a"), SettingValue::Uint(1)),
            (SettingKey::new("members", "b"), SettingValue::Uint(2)),
        ])
        .unwrap();
        assert_eq!(s.get_uint("members", "a").unwrap(), 7);
        assert_eq!(s.get_uint("members", "b").unwrap(), 2);
    }

    #[test]
    fn domains_are_independent() {
        let mut protocol = store();
        let trusted = store();
        protocol.disable_bootstrap(&addr(1)).unwrap();
        assert!(!protocol.is_bootstrap_open());
        assert!(trusted.is_bootstrap_open());
    }

    #[test]
    fn only_governable_groups_accept_proposal_writes() {
        let mut s = store();
        s.disable_bootstrap(&addr(1)).unwrap();
        s.set_by_proposal(&SettingKey::new("members", "m"), SettingValue::Uint(1))
            .unwrap();
        assert!(matches!(
            s.set_by_proposal(&SettingKey::new("network", "m"), SettingValue::Uint(1)),
            Err(GovernanceError::SettingNotGovernable(_))
        ));
    }
}
