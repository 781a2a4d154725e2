//! Trusted-node DAO settings.
//!
//! Every setting lives at a `(group, path)` key in the [`SettingsStore`].
//! Settings in the `members` and `proposals` groups can be changed by
//! proposal once bootstrap mode is over; the guardian can set anything while
//! bootstrap mode is open.
//!
//! [`SettingsStore`]: crate::settings::SettingsStore

use crate::error::GovernanceError;
use crate::quorum::QuorumCalculator;
use crate::settings::SettingsStore;
use serde::{Deserialize, Serialize};
use trustdao_store::{SettingKey, SettingValue, SettingsBacking};
use trustdao_types::{EthAmount, Fraction, RplAmount};

pub const MEMBERS_GROUP: &str = "members";
pub const PROPOSALS_GROUP: &str = "proposals";

/// Groups a settings proposal is allowed to write to.
pub const GOVERNABLE_GROUPS: [&str; 2] = [MEMBERS_GROUP, PROPOSALS_GROUP];

const DAY: u128 = 24 * 3600;

/// The settings the trusted-node DAO reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DaoSetting {
    // Membership
    Quorum,
    RplBond,
    MinimumMembers,

    // Challenges
    ChallengeCooldown,
    ChallengeWindow,
    ChallengeCost,
    ChallengePenaltyEnabled,
    ChallengePenaltyFine,

    // Proposals
    ProposalCooldown,
    VoteDelay,
    VoteDuration,
    ExecuteWindow,
}

impl DaoSetting {
    pub const ALL: [DaoSetting; 12] = [
        Self::Quorum,
        Self::RplBond,
        Self::MinimumMembers,
        Self::ChallengeCooldown,
        Self::ChallengeWindow,
        Self::ChallengeCost,
        Self::ChallengePenaltyEnabled,
        Self::ChallengePenaltyFine,
        Self::ProposalCooldown,
        Self::VoteDelay,
        Self::VoteDuration,
        Self::ExecuteWindow,
    ];

    pub fn group(&self) -> &'static str {
        match self {
            Self::ProposalCooldown | Self::VoteDelay | Self::VoteDuration | Self::ExecuteWindow => {
                PROPOSALS_GROUP
            }
            _ => MEMBERS_GROUP,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Quorum => "members.quorum",
            Self::RplBond => "members.rplbond",
            Self::MinimumMembers => "members.minimum",
            Self::ChallengeCooldown => "members.challenge.cooldown",
            Self::ChallengeWindow => "members.challenge.window",
            Self::ChallengeCost => "members.challenge.cost",
            Self::ChallengePenaltyEnabled => "members.challenge.penalty.enabled",
            Self::ChallengePenaltyFine => "members.challenge.penalty.fine",
            Self::ProposalCooldown => "proposals.cooldown.time",
            Self::VoteDelay => "proposals.vote.delay.time",
            Self::VoteDuration => "proposals.vote.time",
            Self::ExecuteWindow => "proposals.execute.time",
        }
    }

    pub fn key(&self) -> SettingKey {
        SettingKey::new(self.group(), self.path())
    }

    pub fn from_key(key: &SettingKey) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.group() == key.group && s.path() == key.path)
    }

    pub fn default_value(&self) -> SettingValue {
        match self {
            Self::Quorum => SettingValue::Uint(Fraction::SCALE / 100 * 51),
            Self::RplBond => SettingValue::Uint(RplAmount::whole(1750).raw()),
            Self::MinimumMembers => SettingValue::Uint(3),
            Self::ChallengeCooldown => SettingValue::Uint(7 * DAY),
            Self::ChallengeWindow => SettingValue::Uint(7 * DAY),
            Self::ChallengeCost => SettingValue::Uint(EthAmount::whole(1).raw()),
            Self::ChallengePenaltyEnabled => SettingValue::Bool(false),
            Self::ChallengePenaltyFine => SettingValue::Uint(0),
            Self::ProposalCooldown => SettingValue::Uint(2 * DAY),
            Self::VoteDelay => SettingValue::Uint(7 * DAY),
            Self::VoteDuration => SettingValue::Uint(14 * DAY),
            Self::ExecuteWindow => SettingValue::Uint(28 * DAY),
        }
    }

    /// Every setting paired with its default value.
    pub fn defaults() -> Vec<(SettingKey, SettingValue)> {
        Self::ALL
            .into_iter()
            .map(|s| (s.key(), s.default_value()))
            .collect()
    }
}

/// Check a value about to be written to `key`.
///
/// Known settings must keep their type; the quorum must stay in range.
/// Unknown paths are accepted as-is.
pub fn validate_setting(key: &SettingKey, value: &SettingValue) -> Result<(), GovernanceError> {
    let Some(setting) = DaoSetting::from_key(key) else {
        return Ok(());
    };
    let expected = setting.default_value();
    if std::mem::discriminant(&expected) != std::mem::discriminant(value) {
        return Err(GovernanceError::InvalidSetting {
            key: key.clone(),
            reason: format!(
                "expected {}, got {}",
                expected.type_name(),
                value.type_name()
            ),
        });
    }
    match (setting, value) {
        (DaoSetting::Quorum, SettingValue::Uint(raw)) => {
            QuorumCalculator::validate_raw(*raw)?;
        }
        (DaoSetting::VoteDuration, SettingValue::Uint(0)) => {
            return Err(GovernanceError::InvalidSetting {
                key: key.clone(),
                reason: "voting period must be non-zero".into(),
            });
        }
        (DaoSetting::ExecuteWindow, SettingValue::Uint(0)) => {
            return Err(GovernanceError::InvalidSetting {
                key: key.clone(),
                reason: "execution window must be non-zero".into(),
            });
        }
        _ => {}
    }
    Ok(())
}

fn saturating_u64(raw: u128) -> u64 {
    u64::try_from(raw).unwrap_or(u64::MAX)
}

const PERIOD_UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

/// Period in its two largest units for log fields, e.g. `14d 3h`.
pub(crate) fn describe_period(secs: u64) -> String {
    let Some(i) = PERIOD_UNITS.iter().position(|(size, _)| secs >= *size) else {
        return "0s".into();
    };
    let (size, unit) = PERIOD_UNITS[i];
    let mut label = format!("{}{unit}", secs / size);
    if let Some((next, next_unit)) = PERIOD_UNITS.get(i + 1) {
        let n = secs % size / next;
        if n > 0 {
            label.push_str(&format!(" {n}{next_unit}"));
        }
    }
    label
}

/// Membership and challenge settings, read fresh for each command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberSettings {
    pub quorum: Fraction,
    pub rpl_bond: RplAmount,
    pub minimum_members: u64,
    pub challenge_cooldown_secs: u64,
    pub challenge_window_secs: u64,
    pub challenge_cost: EthAmount,
    pub penalty_enabled: bool,
    pub penalty_fine: RplAmount,
}

impl MemberSettings {
    pub fn load<B: SettingsBacking>(store: &SettingsStore<B>) -> Result<Self, GovernanceError> {
        let uint = |s: DaoSetting| store.get_uint(s.group(), s.path());
        Ok(Self {
            quorum: QuorumCalculator::validate_raw(uint(DaoSetting::Quorum)?)?,
            rpl_bond: RplAmount::new(uint(DaoSetting::RplBond)?),
            minimum_members: saturating_u64(uint(DaoSetting::MinimumMembers)?),
            challenge_cooldown_secs: saturating_u64(uint(DaoSetting::ChallengeCooldown)?),
            challenge_window_secs: saturating_u64(uint(DaoSetting::ChallengeWindow)?),
            challenge_cost: EthAmount::new(uint(DaoSetting::ChallengeCost)?),
            penalty_enabled: store.get_bool(
                DaoSetting::ChallengePenaltyEnabled.group(),
                DaoSetting::ChallengePenaltyEnabled.path(),
            )?,
            penalty_fine: RplAmount::new(uint(DaoSetting::ChallengePenaltyFine)?),
        })
    }
}

/// Proposal timing settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalSettings {
    pub cooldown_secs: u64,
    pub vote_delay_secs: u64,
    pub vote_duration_secs: u64,
    pub execute_window_secs: u64,
}

impl ProposalSettings {
    pub fn load<B: SettingsBacking>(store: &SettingsStore<B>) -> Result<Self, GovernanceError> {
        let uint = |s: DaoSetting| store.get_uint(s.group(), s.path()).map(saturating_u64);
        Ok(Self {
            cooldown_secs: uint(DaoSetting::ProposalCooldown)?,
            vote_delay_secs: uint(DaoSetting::VoteDelay)?,
            vote_duration_secs: uint(DaoSetting::VoteDuration)?.max(1),
            execute_window_secs: uint(DaoSetting::ExecuteWindow)?.max(1),
        })
    }
}
