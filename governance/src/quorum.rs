//! Quorum arithmetic.

use crate::error::GovernanceError;
use trustdao_types::Fraction;

/// Pure functions for the "yes" votes a proposal needs.
pub struct QuorumCalculator;

impl QuorumCalculator {
    /// Highest quorum fraction the DAO accepts (0.90), as a raw 18-decimal value.
    pub const MAX_RAW: u128 = Fraction::SCALE / 100 * 90;

    /// `ceil(total_members * quorum)`.
    pub fn votes_required(total_members: usize, quorum: Fraction) -> u64 {
        quorum.ceil_mul(total_members as u64)
    }

    /// Accept a raw quorum value only if `0 < q <= 0.90`.
    pub fn validate_raw(raw: u128) -> Result<Fraction, GovernanceError> {
        if raw == 0 || raw > Self::MAX_RAW {
            let shown = Fraction::from_raw(raw)
                .map(|f| f.to_string())
                .unwrap_or_else(|_| format!("{raw}e-18"));
            return Err(GovernanceError::InvalidQuorum(shown));
        }
        Fraction::from_raw(raw).map_err(|e| GovernanceError::InvalidQuorum(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(bps: u32) -> Fraction {
        Fraction::from_bps(bps).unwrap()
    }

    #[test]
    fn two_members_at_055_need_both() {
        assert_eq!(QuorumCalculator::votes_required(2, q(5500)), 2);
    }

    #[test]
    fn default_quorum_thresholds() {
        assert_eq!(QuorumCalculator::votes_required(3, q(5100)), 2);
        assert_eq!(QuorumCalculator::votes_required(4, q(5100)), 3);
        assert_eq!(QuorumCalculator::votes_required(10, q(5100)), 6);
        assert_eq!(QuorumCalculator::votes_required(0, q(5100)), 0);
    }

    #[test]
    fn validate_bounds() {
        assert!(QuorumCalculator::validate_raw(0).is_err());
        assert!(QuorumCalculator::validate_raw(1).is_ok());
        assert!(QuorumCalculator::validate_raw(QuorumCalculator::MAX_RAW).is_ok());
        assert!(QuorumCalculator::validate_raw(QuorumCalculator::MAX_RAW + 1).is_err());
        assert!(QuorumCalculator::validate_raw(u128::MAX).is_err());
    }
}
