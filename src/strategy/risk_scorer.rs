use super::strategy_constants::*;
use crate::types::ProtocolType;

/// Bounded heuristic risk in [0, 1]. Deterministic and total; a non-finite apy scores the baseline.
pub fn score(protocol: ProtocolType, tvl: u128, apy: f64) -> f64 {
    if !apy.is_finite() {
        return BASELINE_RISK;
    }

    let mut risk = BASELINE_RISK;

    risk += match protocol {
        ProtocolType::Compound | ProtocolType::Aave => LENDING_RISK_DELTA,
        ProtocolType::Curve => STABLE_SWAP_RISK_DELTA,
        ProtocolType::UniswapV3 => CONCENTRATED_LIQUIDITY_RISK_DELTA,
        ProtocolType::Staking | ProtocolType::Other => 0.0,
    };

    if tvl > LARGE_TVL_THRESHOLD {
        risk += LARGE_TVL_RISK_DELTA;
    } else if tvl < SMALL_TVL_THRESHOLD {
        risk += SMALL_TVL_RISK_DELTA;
    }

    if apy > HIGH_APY_THRESHOLD {
        risk += HIGH_APY_RISK_DELTA;
    } else if apy < LOW_APY_THRESHOLD {
        risk += LOW_APY_RISK_DELTA;
    }

    risk.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MID_TVL: u128 = 100_000_000_000_000_000_000_000;

    #[rstest]
    #[case::lending_mid_tvl_mid_apy(ProtocolType::Compound, MID_TVL, 0.08, 0.3)]
    #[case::aave_large_tvl_low_apy(ProtocolType::Aave, LARGE_TVL_THRESHOLD + 1, 0.02, 0.1)]
    #[case::curve_mid(ProtocolType::Curve, MID_TVL, 0.1, 0.4)]
    #[case::uniswap_small_tvl_high_apy(ProtocolType::UniswapV3, 1, 0.5, 0.9)]
    #[case::staking_mid(ProtocolType::Staking, MID_TVL, 0.05, 0.5)]
    #[case::other_small_high(ProtocolType::Other, 0, 0.3, 0.8)]
    fn applies_protocol_tvl_and_apy_deltas(
        #[case] protocol: ProtocolType,
        #[case] tvl: u128,
        #[case] apy: f64,
        #[case] expected: f64,
    ) {
        assert!((score(protocol, tvl, apy) - expected).abs() < 1e-9);
    }

    #[test]
    fn thresholds_are_exclusive() {
        // exactly at the boundaries no tvl or apy delta applies
        let at_large = score(ProtocolType::Staking, LARGE_TVL_THRESHOLD, HIGH_APY_THRESHOLD);
        let at_small = score(ProtocolType::Staking, SMALL_TVL_THRESHOLD, LOW_APY_THRESHOLD);
        assert!((at_large - BASELINE_RISK).abs() < 1e-9);
        assert!((at_small - BASELINE_RISK).abs() < 1e-9);
    }

    #[test]
    fn result_is_always_within_unit_interval() {
        let protocols = [
            ProtocolType::Compound,
            ProtocolType::Aave,
            ProtocolType::Curve,
            ProtocolType::UniswapV3,
            ProtocolType::Staking,
            ProtocolType::Other,
        ];
        for protocol in protocols {
            for tvl in [0, SMALL_TVL_THRESHOLD, MID_TVL, u128::MAX] {
                for apy in [0.0, 0.01, 0.1, 5.0, f64::INFINITY, f64::NAN] {
                    let s = score(protocol, tvl, apy);
                    assert!((0.0..=1.0).contains(&s), "{:?} {} {} -> {}", protocol, tvl, apy, s);
                }
            }
        }
    }

    #[test]
    fn is_deterministic() {
        let a = score(ProtocolType::UniswapV3, MID_TVL, 0.25);
        let b = score(ProtocolType::UniswapV3, MID_TVL, 0.25);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn non_finite_apy_scores_baseline() {
        assert_eq!(score(ProtocolType::Compound, 0, f64::NAN), BASELINE_RISK);
    }
}
