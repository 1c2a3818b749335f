use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use tracing::debug;

use super::types::{ActionKind, PlannerConfig, RebalanceAction, RebalanceResponse};
use crate::error::{AdvisorError, AdvisorResult};
use crate::strategy::types::StrategyWeight;
use crate::types::Holding;

/// Diff of `current` against `target` over the union of their strategy ids.
///
/// Missing entries count as zero. A difference whose magnitude does not exceed
/// `dust_threshold` yields no action. Actions come out in ascending strategy id.
pub fn calculate_rebalance_actions(
    current: &BTreeMap<i32, u128>,
    target: &BTreeMap<i32, u128>,
    dust_threshold: u128,
) -> Vec<RebalanceAction> {
    let strategy_ids: BTreeSet<i32> = current.keys().chain(target.keys()).copied().collect();

    let mut actions = Vec::new();
    for strategy_id in strategy_ids {
        let current_amount = current.get(&strategy_id).copied().unwrap_or(0);
        let target_amount = target.get(&strategy_id).copied().unwrap_or(0);

        let (kind, amount) = if target_amount >= current_amount {
            (ActionKind::Deposit, target_amount - current_amount)
        } else {
            (ActionKind::Withdraw, current_amount - target_amount)
        };
        if amount <= dust_threshold {
            continue;
        }

        actions.push(RebalanceAction {
            strategy_id,
            kind,
            amount,
            current_amount,
            target_amount,
        });
    }
    actions
}

/// Current amount per strategy from a user's active holdings
pub fn current_amounts(holdings: &[Holding]) -> BTreeMap<i32, u128> {
    let mut amounts = BTreeMap::new();
    for holding in holdings.iter().filter(|h| h.is_active) {
        *amounts.entry(holding.strategy_id).or_insert(0u128) += holding.amount;
    }
    amounts
}

/// `floor(total × weight)` per strategy; a repeated strategy id keeps its first weight
pub fn target_amounts(total: u128, targets: &[StrategyWeight]) -> AdvisorResult<BTreeMap<i32, u128>> {
    let mut weight_sum = 0.0;
    for target in targets {
        if !target.weight.is_finite() || !(0.0..=1.0).contains(&target.weight) {
            return Err(AdvisorError::Validation(format!(
                "target weight {} for strategy {} outside [0, 1]",
                target.weight, target.strategy_id
            )));
        }
        weight_sum += target.weight;
    }
    if weight_sum > 1.0 + 1e-9 {
        return Err(AdvisorError::Validation(format!(
            "target weights sum to {}, more than 1.0",
            weight_sum
        )));
    }

    let total_dec = Decimal::from_u128(total)
        .ok_or_else(|| AdvisorError::Internal(format!("portfolio total {} exceeds decimal range", total)))?;

    let mut amounts = BTreeMap::new();
    for target in targets {
        if amounts.contains_key(&target.strategy_id) {
            continue;
        }
        let weight = Decimal::from_f64(target.weight)
            .ok_or_else(|| AdvisorError::Internal(format!("weight {} not representable", target.weight)))?;
        let amount = (total_dec * weight).floor().to_u128().unwrap_or(0).min(total);
        amounts.insert(target.strategy_id, amount);
    }
    Ok(amounts)
}

/// Plan for moving a user's holdings onto the target weights
pub fn build_rebalance_plan(
    holdings: &[Holding],
    targets: &[StrategyWeight],
    config: &PlannerConfig,
) -> AdvisorResult<RebalanceResponse> {
    let current = current_amounts(holdings);
    let total: u128 = current.values().sum();
    let target = target_amounts(total, targets)?;

    let actions = calculate_rebalance_actions(&current, &target, config.dust_threshold);
    debug!(
        holdings = current.len(),
        targets = target.len(),
        actions = actions.len(),
        total = %total,
        "Rebalance plan built"
    );

    Ok(RebalanceResponse {
        estimated_gas_cost: actions.len() as u64 * config.gas_per_action,
        estimated_slippage: config.estimated_slippage,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashSet;

    fn amounts(pairs: &[(i32, u128)]) -> BTreeMap<i32, u128> {
        pairs.iter().copied().collect()
    }

    fn holding(strategy_id: i32, amount: u128, is_active: bool) -> Holding {
        Holding {
            user_id: 1,
            strategy_id,
            amount,
            weight: 0.0,
            is_active,
            strategy_apy: 0.05,
        }
    }

    #[test]
    fn identical_vectors_need_no_actions() {
        let x = amounts(&[(1, 500), (2, 300)]);
        assert!(calculate_rebalance_actions(&x, &x, 0).is_empty());
    }

    #[test]
    fn empty_current_deposits_the_target() {
        let actions = calculate_rebalance_actions(&BTreeMap::new(), &amounts(&[(7, 100)]), 0);
        assert_eq!(
            actions,
            vec![RebalanceAction {
                strategy_id: 7,
                kind: ActionKind::Deposit,
                amount: 100,
                current_amount: 0,
                target_amount: 100,
            }]
        );
    }

    #[test]
    fn union_of_ids_with_withdraws_and_dust() {
        let current = amounts(&[(1, 1_000), (2, 500), (3, 10)]);
        let target = amounts(&[(1, 400), (3, 12), (4, 900)]);

        let got: HashSet<(i32, ActionKind, u128)> = calculate_rebalance_actions(&current, &target, 5)
            .into_iter()
            .map(|a| (a.strategy_id, a.kind, a.amount))
            .collect();
        let want: HashSet<(i32, ActionKind, u128)> = [
            (1, ActionKind::Withdraw, 600),
            (2, ActionKind::Withdraw, 500),
            (4, ActionKind::Deposit, 900),
        ]
        .into_iter()
        .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn difference_equal_to_dust_is_skipped() {
        let actions = calculate_rebalance_actions(&amounts(&[(1, 100)]), &amounts(&[(1, 105)]), 5);
        assert!(actions.is_empty());
    }

    #[test]
    fn targets_floor_against_current_total() {
        let targets = [
            StrategyWeight { strategy_id: 1, weight: 1.0 / 3.0 },
            StrategyWeight { strategy_id: 2, weight: 2.0 / 3.0 },
        ];
        let got = target_amounts(10, &targets).unwrap();
        assert_eq!(got, amounts(&[(1, 3), (2, 6)]));
    }

    #[test]
    fn overweight_targets_are_rejected() {
        let targets = [
            StrategyWeight { strategy_id: 1, weight: 0.7 },
            StrategyWeight { strategy_id: 2, weight: 0.5 },
        ];
        assert_matches!(target_amounts(100, &targets), Err(AdvisorError::Validation(_)));
    }

    #[test]
    fn plan_ignores_inactive_holdings_and_prices_actions() {
        let holdings = [holding(1, 600, true), holding(2, 400, true), holding(3, 9_999, false)];
        let targets = [StrategyWeight { strategy_id: 2, weight: 1.0 }];
        let config = PlannerConfig {
            dust_threshold: 0,
            gas_per_action: 100_000,
            estimated_slippage: 0.01,
        };

        let plan = build_rebalance_plan(&holdings, &targets, &config).unwrap();
        let got: HashSet<(i32, ActionKind, u128)> =
            plan.actions.iter().map(|a| (a.strategy_id, a.kind, a.amount)).collect();
        assert_eq!(
            got,
            [(1, ActionKind::Withdraw, 600), (2, ActionKind::Deposit, 600)].into_iter().collect()
        );
        assert_eq!(plan.estimated_gas_cost, 200_000);
        assert_eq!(plan.estimated_slippage, 0.01);
    }
}
