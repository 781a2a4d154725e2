//! The set of trusted members.

use crate::challenge::ChallengeRecord;
use crate::error::GovernanceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trustdao_store::NodeRegistry;
use trustdao_types::{NodeAddress, RplAmount, Timestamp};

/// A trusted member of the DAO.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub address: NodeAddress,
    /// Short human handle, e.g. an operator name.
    pub id: String,
    pub email: String,
    pub joined_at: Timestamp,
    /// RPL held in custody on behalf of this member.
    pub rpl_bond: RplAmount,
    /// Open liveness challenge, if any.
    pub challenged: Option<ChallengeRecord>,
}

impl Member {
    pub fn new(
        address: NodeAddress,
        id: impl Into<String>,
        email: impl Into<String>,
        joined_at: Timestamp,
        rpl_bond: RplAmount,
    ) -> Self {
        Self {
            address,
            id: id.into(),
            email: email.into(),
            joined_at,
            rpl_bond,
            challenged: None,
        }
    }

    pub fn is_challenged(&self) -> bool {
        self.challenged.is_some()
    }
}

/// Membership table keyed by address.
///
/// Holds no policy of its own beyond membership uniqueness and the
/// minimum-size rule; callers decide *when* an admission or removal may
/// happen.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MembershipRegistry {
    members: BTreeMap<NodeAddress, Member>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, address: &NodeAddress) -> bool {
        self.members.contains_key(address)
    }

    pub fn get(&self, address: &NodeAddress) -> Option<&Member> {
        self.members.get(address)
    }

    pub(crate) fn get_mut(&mut self, address: &NodeAddress) -> Option<&mut Member> {
        self.members.get_mut(address)
    }

    pub fn require(&self, address: &NodeAddress) -> Result<&Member, GovernanceError> {
        self.members
            .get(address)
            .ok_or_else(|| GovernanceError::NotMember(address.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Sum of every member's bond.
    pub fn total_bonded(&self) -> RplAmount {
        self.iter()
            .fold(RplAmount::ZERO, |total, m| total.saturating_add(m.rpl_bond))
    }

    /// A candidate must be a registered node and not yet a member.
    pub fn check_admissible(
        &self,
        address: &NodeAddress,
        registry: &impl NodeRegistry,
    ) -> Result<(), GovernanceError> {
        if !registry.is_registered_node(address) {
            return Err(GovernanceError::NotRegisteredNode(address.to_string()));
        }
        if self.is_member(address) {
            return Err(GovernanceError::AlreadyMember(address.to_string()));
        }
        Ok(())
    }

    /// The emergency join path is only open while below the minimum.
    pub fn check_low_member_mode(&self, minimum: u64) -> Result<(), GovernanceError> {
        if (self.count() as u64) < minimum {
            Ok(())
        } else {
            Err(GovernanceError::LowMemberModeNotEngaged {
                members: self.count(),
                minimum,
            })
        }
    }

    /// A member may leave or be kicked only if the DAO stays at or above `minimum`.
    pub fn check_removable(
        &self,
        address: &NodeAddress,
        minimum: u64,
    ) -> Result<&Member, GovernanceError> {
        let member = self.require(address)?;
        let remaining = self.count() - 1;
        if (remaining as u64) < minimum {
            return Err(GovernanceError::BelowMinimumMembers { remaining, minimum });
        }
        Ok(member)
    }

    pub(crate) fn admit(&mut self, member: Member) -> Result<(), GovernanceError> {
        if self.is_member(&member.address) {
            return Err(GovernanceError::AlreadyMember(member.address.to_string()));
        }
        tracing::info!(
            member = %member.address,
            id = %member.id,
            bond = %member.rpl_bond,
            "member admitted"
        );
        self.members.insert(member.address.clone(), member);
        Ok(())
    }

    pub(crate) fn remove(&mut self, address: &NodeAddress) -> Option<Member> {
        let removed = self.members.remove(address);
        if removed.is_some() {
            tracing::info!(member = %address, remaining = self.count(), "member removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustdao_nullables::NullNodeRegistry;

    fn addr(n: u8) -> NodeAddress {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        NodeAddress::from_bytes(bytes)
    }

    fn member(n: u8) -> Member {
        Member::new(addr(n), format!("m{n}"), "ops@example.org", Timestamp::new(1), RplAmount::ZERO)
    }

    #[test]
    fn admission_requires_registration() {
        let reg = NullNodeRegistry::with_nodes([&addr(1)]);
        let members = MembershipRegistry::new();
        members.check_admissible(&addr(1), &reg).unwrap();
        assert!(matches!(
            members.check_admissible(&addr(2), &reg),
            Err(GovernanceError::NotRegisteredNode(_))
        ));
    }

    #[test]
    fn duplicate_admission_rejected() {
        let reg = NullNodeRegistry::with_nodes([&addr(1)]);
        let mut members = MembershipRegistry::new();
        members.admit(member(1)).unwrap();
        assert!(matches!(
            members.admit(member(1)),
            Err(GovernanceError::AlreadyMember(_))
        ));
        assert!(matches!(
            members.check_admissible(&addr(1), &reg),
            Err(GovernanceError::AlreadyMember(_))
        ));
    }

    #[test]
    fn removal_respects_minimum() {
        let mut members = MembershipRegistry::new();
        for n in 1..=3 {
            members.admit(member(n)).unwrap();
        }
        assert!(matches!(
            members.check_removable(&addr(1), 3),
            Err(GovernanceError::BelowMinimumMembers { remaining: 2, minimum: 3 })
        ));
        members.check_removable(&addr(1), 2).unwrap();
        assert!(matches!(
            members.check_removable(&addr(9), 0),
            Err(GovernanceError::NotMember(_))
        ));
    }

    #[test]
    fn low_member_mode() {
        let mut members = MembershipRegistry::new();
        members.check_low_member_mode(2).unwrap();
        members.admit(member(1)).unwrap();
        members.admit(member(2)).unwrap();
        assert!(matches!(
            members.check_low_member_mode(2),
            Err(GovernanceError::LowMemberModeNotEngaged { .. })
        ));
    }
}
