use rust_decimal::Decimal;
use rust_decimal::prelude::*;

use crate::types::Holding;

/// How much yield a holding is credited with when user analytics are rolled up.
///
/// The bundled [`FlatRateAccrual`] is a placeholder proxy, not an accrual model:
/// it ignores holding duration and the strategy's actual apy.
pub trait YieldAccrualPolicy: Send + Sync {
    fn yield_earned(&self, holding: &Holding) -> u128;
}

/// `floor(amount × rate)` for every active holding
#[derive(Debug, Clone, Copy)]
pub struct FlatRateAccrual {
    pub rate: f64,
}

impl FlatRateAccrual {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl Default for FlatRateAccrual {
    fn default() -> Self {
        Self { rate: 0.1 }
    }
}

impl YieldAccrualPolicy for FlatRateAccrual {
    fn yield_earned(&self, holding: &Holding) -> u128 {
        if !holding.is_active || !self.rate.is_finite() || self.rate <= 0.0 {
            return 0;
        }
        match (Decimal::from_u128(holding.amount), Decimal::from_f64(self.rate)) {
            (Some(amount), Some(rate)) => (amount * rate).floor().to_u128().unwrap_or(0),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(amount: u128, is_active: bool) -> Holding {
        Holding {
            user_id: 1,
            strategy_id: 1,
            amount,
            weight: 1.0,
            is_active,
            strategy_apy: 0.05,
        }
    }

    #[test]
    fn flat_rate_floors_the_proxy_yield() {
        let policy = FlatRateAccrual::default();
        assert_eq!(policy.yield_earned(&holding(1_000, true)), 100);
        assert_eq!(policy.yield_earned(&holding(15, true)), 1);
    }

    #[test]
    fn inactive_holdings_earn_nothing() {
        assert_eq!(FlatRateAccrual::default().yield_earned(&holding(1_000, false)), 0);
    }
}
