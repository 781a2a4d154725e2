use proptest::prelude::*;

use trustdao_governance::{
    DaoSetting, GovernanceError, ProposalPayload, ProposalState, QuorumCalculator, SettingsStore,
    TrustedNodeDao,
};
use trustdao_nullables::{NullBondCustody, NullNodeRegistry, NullSettingsBacking};
use trustdao_store::SettingValue;
use trustdao_types::{Fraction, NodeAddress, Timestamp};

type Dao = TrustedNodeDao<NullSettingsBacking, NullBondCustody, NullNodeRegistry>;

fn addr(n: u8) -> NodeAddress {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    NodeAddress::from_bytes(bytes)
}

fn guardian() -> NodeAddress {
    addr(0xee)
}

/// `members` members admitted at t=0, no vote delay, no proposal cooldown.
fn dao(members: u8, quorum_bps: u32) -> Dao {
    let nodes: Vec<NodeAddress> = (1..=members).map(addr).collect();
    let settings = SettingsStore::open(NullSettingsBacking::new(), guardian()).unwrap();
    let mut dao = TrustedNodeDao::new(
        settings,
        NullBondCustody::new(),
        NullNodeRegistry::with_nodes(&nodes),
    )
    .unwrap();
    let quorum = Fraction::from_bps(quorum_bps).unwrap().raw();
    for (setting, value) in [
        (DaoSetting::Quorum, SettingValue::Uint(quorum)),
        (DaoSetting::VoteDelay, SettingValue::Uint(0)),
        (DaoSetting::ProposalCooldown, SettingValue::Uint(0)),
    ] {
        dao.bootstrap_setting(&guardian(), &setting.key(), value)
            .unwrap();
    }
    for node in &nodes {
        dao.bootstrap_member(&guardian(), "node", "ops@example.org", node, Timestamp::new(0))
            .unwrap();
    }
    dao
}

fn leave() -> ProposalPayload {
    ProposalPayload::Leave { refund: addr(0xaa) }
}

proptest! {
    /// votes_required is the integer ceiling of members * quorum.
    #[test]
    fn quorum_is_ceiling(members in 0usize..2_000, bps in 1u32..=9_000) {
        let quorum = Fraction::from_bps(bps).unwrap();
        let expected = (members as u64 * bps as u64).div_ceil(10_000);
        prop_assert_eq!(QuorumCalculator::votes_required(members, quorum), expected);
    }

    /// A proposal succeeds exactly when yes votes reach the live quorum,
    /// whatever the number of no votes.
    #[test]
    fn succeeds_exactly_at_quorum(
        members in 1u8..12,
        bps in 1u32..=9_000,
        yes in 0u8..12,
        no in 0u8..12,
    ) {
        let mut dao = dao(members, bps);
        let yes = yes.min(members);
        let no = no.min(members - yes);
        let required = dao.quorum_votes_required().unwrap();
        let id = dao.propose(&addr(1), "prop", leave(), Timestamp::new(1)).unwrap();
        let now = Timestamp::new(1);

        let mut voter = 1u8;
        for _ in 0..no {
            dao.vote(id, &addr(voter), false, now).unwrap();
            voter += 1;
        }
        let mut cast = 0u64;
        for _ in 0..yes {
            match dao.vote(id, &addr(voter), true, now) {
                Ok(_) => cast += 1,
                Err(GovernanceError::AlreadyDecided(_)) => break,
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            }
            voter += 1;
        }
        let state = dao.proposal_state(id, now).unwrap();
        if cast >= required {
            prop_assert_eq!(state, ProposalState::Succeeded);
            prop_assert_eq!(cast, required);
        } else {
            prop_assert_eq!(state, ProposalState::Active);
        }
    }

    /// Proposal ids are 1, 2, 3, ... in creation order.
    #[test]
    fn ids_strictly_increase_from_one(proposers in proptest::collection::vec(1u8..=5, 1..30)) {
        let mut dao = dao(5, 5_100);
        let mut now = 1u64;
        for (i, proposer) in proposers.iter().enumerate() {
            let id = dao.propose(&addr(*proposer), "prop", leave(), Timestamp::new(now)).unwrap();
            prop_assert_eq!(id, i as u64 + 1);
            now += 1;
        }
        prop_assert_eq!(dao.proposal_count(), proposers.len() as u64);
    }

    /// A member never gets a second vote on the same proposal.
    #[test]
    fn one_vote_per_member(members in 3u8..10, voter in 1u8..10, first in any::<bool>()) {
        let voter = addr(voter.min(members));
        let mut dao = dao(members, 9_000);
        let id = dao.propose(&addr(1), "prop", leave(), Timestamp::new(1)).unwrap();
        dao.vote(id, &voter, first, Timestamp::new(1)).unwrap();
        let again = dao.vote(id, &voter, !first, Timestamp::new(1));
        prop_assert!(again.is_err());
        prop_assert_eq!(dao.votes_for(id).unwrap() + dao.votes_against(id).unwrap(), 1);
        prop_assert_eq!(dao.receipt(id, &voter).unwrap(), Some(first));
    }
}
