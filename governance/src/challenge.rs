//! Liveness challenges between members.
//!
//! Any member, or a registered non-member who pays the challenge fee, can
//! challenge a member. The target clears the challenge by responding. Once
//! the window has elapsed anyone else may decide it; a failed challenge
//! removes the target.

use crate::error::GovernanceError;
use crate::member::MembershipRegistry;
use crate::params::MemberSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trustdao_store::NodeRegistry;
use trustdao_types::{EthAmount, NodeAddress, Timestamp};

/// An open challenge against a member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub target: NodeAddress,
    pub challenger: NodeAddress,
    pub raised_at: Timestamp,
    pub window_end: Timestamp,
    /// Fee paid by a non-member challenger; zero for members.
    pub fee: EthAmount,
}

/// How a challenge was resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// The target proved liveness (or was vouched for); membership kept.
    Cleared(ChallengeRecord),
    /// The target failed; the caller must remove them.
    Failed(ChallengeRecord),
}

/// Challenger cooldowns and collected fees.
///
/// The open records themselves live on [`Member::challenged`] so a target can
/// have at most one.
///
/// [`Member::challenged`]: crate::member::Member::challenged
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChallengeManager {
    last_challenge_at: HashMap<NodeAddress, Timestamp>,
    fees_held: EthAmount,
}

impl ChallengeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total fees paid by non-member challengers.
    pub fn fees_held(&self) -> EthAmount {
        self.fees_held
    }

    pub fn last_challenge_at(&self, challenger: &NodeAddress) -> Option<Timestamp> {
        self.last_challenge_at.get(challenger).copied()
    }

    /// Raise a challenge against `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn challenge(
        &mut self,
        members: &mut MembershipRegistry,
        registry: &impl NodeRegistry,
        target: &NodeAddress,
        challenger: &NodeAddress,
        fee: EthAmount,
        settings: &MemberSettings,
        now: Timestamp,
    ) -> Result<ChallengeRecord, GovernanceError> {
        if challenger == target {
            return Err(GovernanceError::SelfChallenge);
        }
        let member = members
            .get(target)
            .ok_or_else(|| GovernanceError::InvalidTarget(target.to_string()))?;
        if member.is_challenged() {
            return Err(GovernanceError::AlreadyChallenged(target.to_string()));
        }
        if let Some(last) = self.last_challenge_at(challenger) {
            if !last.has_expired(settings.challenge_cooldown_secs, now) {
                return Err(GovernanceError::CooldownActive {
                    challenger: challenger.to_string(),
                    remaining_secs: last.plus(settings.challenge_cooldown_secs).as_secs()
                        - now.as_secs(),
                });
            }
        }

        let paid = if members.is_member(challenger) {
            EthAmount::ZERO
        } else {
            if !registry.is_registered_node(challenger) {
                return Err(GovernanceError::NotRegisteredNode(challenger.to_string()));
            }
            if fee != settings.challenge_cost {
                return Err(GovernanceError::PaymentRequired {
                    required: settings.challenge_cost,
                    provided: fee,
                });
            }
            fee
        };
        let fees_held = self
            .fees_held
            .checked_add(paid)
            .ok_or(GovernanceError::FeeOverflow {
                held: self.fees_held,
                fee: paid,
            })?;

        let record = ChallengeRecord {
            target: target.clone(),
            challenger: challenger.clone(),
            raised_at: now,
            window_end: now.plus(settings.challenge_window_secs),
            fee: paid,
        };
        if let Some(member) = members.get_mut(target) {
            member.challenged = Some(record.clone());
        }
        self.last_challenge_at.insert(challenger.clone(), now);
        self.fees_held = fees_held;
        tracing::info!(
            target = %target,
            challenger = %challenger,
            window_end = %record.window_end,
            fee = %paid,
            "challenge raised"
        );
        Ok(record)
    }

    fn open_record(
        members: &MembershipRegistry,
        target: &NodeAddress,
    ) -> Result<ChallengeRecord, GovernanceError> {
        members
            .get(target)
            .and_then(|m| m.challenged.clone())
            .ok_or_else(|| GovernanceError::NoActiveChallenge(target.to_string()))
    }

    /// The target answers its own challenge. Allowed at any time while the
    /// record is open, including after the window has elapsed.
    pub fn respond(
        &self,
        members: &MembershipRegistry,
        target: &NodeAddress,
        caller: &NodeAddress,
        success: bool,
    ) -> Result<ChallengeOutcome, GovernanceError> {
        if caller != target {
            return Err(GovernanceError::NotChallengeTarget(target.to_string()));
        }
        let record = Self::open_record(members, target)?;
        Ok(if success {
            ChallengeOutcome::Cleared(record)
        } else {
            ChallengeOutcome::Failed(record)
        })
    }

    /// Decide a challenge. The target may decide at any time (as a response);
    /// anyone else must wait until the window has elapsed.
    pub fn decide(
        &self,
        members: &MembershipRegistry,
        target: &NodeAddress,
        decider: &NodeAddress,
        success: bool,
        now: Timestamp,
    ) -> Result<ChallengeOutcome, GovernanceError> {
        if decider == target {
            return self.respond(members, target, decider, success);
        }
        let record = Self::open_record(members, target)?;
        if now < record.window_end {
            return Err(GovernanceError::WindowNotElapsed {
                target: target.to_string(),
                remaining_secs: record.window_end.as_secs() - now.as_secs(),
            });
        }
        Ok(if success {
            ChallengeOutcome::Cleared(record)
        } else {
            ChallengeOutcome::Failed(record)
        })
    }

    /// Drop the open record of a cleared challenge.
    pub(crate) fn clear(&self, members: &mut MembershipRegistry, target: &NodeAddress) {
        if let Some(member) = members.get_mut(target) {
            if member.challenged.take().is_some() {
                tracing::info!(target = %target, "challenge cleared");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Member;
    use trustdao_nullables::NullNodeRegistry;
    use trustdao_types::{Fraction, RplAmount};

    const WINDOW: u64 = 3_600;
    const COOLDOWN: u64 = 600;

    fn addr(n: u8) -> NodeAddress {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        NodeAddress::from_bytes(bytes)
    }

    fn settings() -> MemberSettings {
        MemberSettings {
            quorum: Fraction::from_bps(5100).unwrap(),
            rpl_bond: RplAmount::new(100),
            minimum_members: 1,
            challenge_cooldown_secs: COOLDOWN,
            challenge_window_secs: WINDOW,
            challenge_cost: EthAmount::new(10),
            penalty_enabled: false,
            penalty_fine: RplAmount::ZERO,
        }
    }

    fn setup() -> (MembershipRegistry, NullNodeRegistry) {
        let mut members = MembershipRegistry::new();
        for n in 1..=3 {
            members
                .admit(Member::new(addr(n), "m", "e", Timestamp::new(0), RplAmount::ZERO))
                .unwrap();
        }
        let registry = NullNodeRegistry::with_nodes([&addr(1), &addr(2), &addr(3), &addr(9)]);
        (members, registry)
    }

    fn t(s: u64) -> Timestamp {
        Timestamp::new(s)
    }

    #[test]
    fn self_and_non_member_targets_rejected() {
        let (mut members, reg) = setup();
        let mut mgr = ChallengeManager::new();
        assert!(matches!(
            mgr.challenge(&mut members, &reg, &addr(1), &addr(1), EthAmount::ZERO, &settings(), t(0)),
            Err(GovernanceError::SelfChallenge)
        ));
        assert!(matches!(
            mgr.challenge(&mut members, &reg, &addr(8), &addr(1), EthAmount::ZERO, &settings(), t(0)),
            Err(GovernanceError::InvalidTarget(_))
        ));
    }

    #[test]
    fn one_open_challenge_per_target() {
        let (mut members, reg) = setup();
        let mut mgr = ChallengeManager::new();
        mgr.challenge(&mut members, &reg, &addr(1), &addr(2), EthAmount::ZERO, &settings(), t(0))
            .unwrap();
        assert!(matches!(
            mgr.challenge(&mut members, &reg, &addr(1), &addr(3), EthAmount::ZERO, &settings(), t(0)),
            Err(GovernanceError::AlreadyChallenged(_))
        ));
    }

    #[test]
    fn challenger_cooldown() {
        let (mut members, reg) = setup();
        let mut mgr = ChallengeManager::new();
        mgr.challenge(&mut members, &reg, &addr(1), &addr(2), EthAmount::ZERO, &settings(), t(0))
            .unwrap();
        assert!(matches!(
            mgr.challenge(&mut members, &reg, &addr(3), &addr(2), EthAmount::ZERO, &settings(), t(COOLDOWN - 1)),
            Err(GovernanceError::CooldownActive { remaining_secs: 1, .. })
        ));
        mgr.challenge(&mut members, &reg, &addr(3), &addr(2), EthAmount::ZERO, &settings(), t(COOLDOWN))
            .unwrap();
    }

    #[test]
    fn outsiders_pay_the_exact_fee() {
        let (mut members, reg) = setup();
        let mut mgr = ChallengeManager::new();
        assert!(matches!(
            mgr.challenge(&mut members, &reg, &addr(1), &addr(9), EthAmount::new(5), &settings(), t(0)),
            Err(GovernanceError::PaymentRequired { .. })
        ));
        assert!(matches!(
            mgr.challenge(&mut members, &reg, &addr(1), &addr(7), EthAmount::new(10), &settings(), t(0)),
            Err(GovernanceError::NotRegisteredNode(_))
        ));
        let record = mgr
            .challenge(&mut members, &reg, &addr(1), &addr(9), EthAmount::new(10), &settings(), t(0))
            .unwrap();
        assert_eq!(record.fee, EthAmount::new(10));
        assert_eq!(mgr.fees_held(), EthAmount::new(10));
    }

    #[test]
    fn fee_overflow_rejects_before_recording() {
        let (mut members, reg) = setup();
        let mut mgr = ChallengeManager::new();
        let settings = MemberSettings {
            challenge_cost: EthAmount::new(u128::MAX),
            challenge_cooldown_secs: 0,
            ..settings()
        };
        let max = EthAmount::new(u128::MAX);
        mgr.challenge(&mut members, &reg, &addr(1), &addr(9), max, &settings, t(0))
            .unwrap();
        assert!(matches!(
            mgr.challenge(&mut members, &reg, &addr(2), &addr(9), max, &settings, t(1)),
            Err(GovernanceError::FeeOverflow { .. })
        ));
        assert!(!members.get(&addr(2)).unwrap().is_challenged());
        assert_eq!(mgr.fees_held(), max);
        assert_eq!(mgr.last_challenge_at(&addr(9)), Some(t(0)));
    }

    #[test]
    fn decide_waits_for_window() {
        let (mut members, reg) = setup();
        let mut mgr = ChallengeManager::new();
        mgr.challenge(&mut members, &reg, &addr(1), &addr(2), EthAmount::ZERO, &settings(), t(0))
            .unwrap();
        assert!(matches!(
            mgr.decide(&members, &addr(1), &addr(3), false, t(WINDOW - 1)),
            Err(GovernanceError::WindowNotElapsed { remaining_secs: 1, .. })
        ));
        assert!(matches!(
            mgr.decide(&members, &addr(1), &addr(3), false, t(WINDOW + 1)),
            Ok(ChallengeOutcome::Failed(_))
        ));
    }

    #[test]
    fn target_can_respond_late() {
        let (mut members, reg) = setup();
        let mut mgr = ChallengeManager::new();
        mgr.challenge(&mut members, &reg, &addr(1), &addr(2), EthAmount::ZERO, &settings(), t(0))
            .unwrap();
        let outcome = mgr.respond(&members, &addr(1), &addr(1), true).unwrap();
        assert!(matches!(outcome, ChallengeOutcome::Cleared(_)));
        mgr.clear(&mut members, &addr(1));
        assert!(!members.get(&addr(1)).unwrap().is_challenged());
        assert!(matches!(
            mgr.decide(&members, &addr(1), &addr(3), false, t(WINDOW * 2)),
            Err(GovernanceError::NoActiveChallenge(_))
        ));
    }

    #[test]
    fn only_target_responds() {
        let (mut members, reg) = setup();
        let mut mgr = ChallengeManager::new();
        mgr.challenge(&mut members, &reg, &addr(1), &addr(2), EthAmount::ZERO, &settings(), t(0))
            .unwrap();
        assert!(matches!(
            mgr.respond(&members, &addr(1), &addr(2), true),
            Err(GovernanceError::NotChallengeTarget(_))
        ));
        assert!(matches!(
            mgr.respond(&members, &addr(1), &addr(1), false),
            Ok(ChallengeOutcome::Failed(_))
        ));
    }
}
