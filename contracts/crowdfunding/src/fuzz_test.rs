use proptest::prelude::*;

use crate::invariants::{
    assert_all_project_invariants, assert_closure_monotonic,
    assert_current_amount_matches_contributions,
};
use crate::{CrowdfundingContract as Contract, Error, InMemoryLedger};

#[derive(Clone, Debug)]
enum Op {
    Contribute { contributor: usize, cents: u32 },
    Distribute,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..4, 1u32..50_000).prop_map(|(contributor, cents)| Op::Contribute {
            contributor,
            cents
        }),
        1 => Just(Op::Distribute),
    ]
}

const CONTRIBUTORS: [&str; 4] = ["alice", "bob", "carol", "dave"];

proptest! {
    /// Whatever sequence of contributions and closing attempts runs, the
    /// project invariants hold after every step.
    #[test]
    fn fuzz_project_lifecycle(
        goal_cents in 1u32..200_000,
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let goal = f64::from(goal_cents) / 100.0;
        let mut ledger = InMemoryLedger::new();
        ledger
            .invoke(|ctx| Contract::create_project(ctx, "p", "T", "D", "S", goal))
            .unwrap();

        for op in ops {
            let before = Contract::get_project(&mut ledger, "p").unwrap();
            let result = match op {
                Op::Contribute { contributor, cents } => {
                    let amount = f64::from(cents) / 100.0;
                    ledger.invoke(|ctx| {
                        Contract::contribute(ctx, "p", CONTRIBUTORS[contributor], amount)
                    })
                }
                Op::Distribute => ledger.invoke(|ctx| Contract::distribute_rewards(ctx, "p")),
            };
            let after = Contract::get_project(&mut ledger, "p").unwrap();

            let failed = match &result {
                Ok(()) => false,
                Err(Error::AlreadyClosed) => {
                    prop_assert!(before.is_closed);
                    true
                }
                Err(Error::GoalNotReached) => {
                    prop_assert!(!before.goal_reached());
                    true
                }
                Err(other) => {
                    prop_assert!(false, "unexpected error: {}", other);
                    true
                }
            };
            if failed {
                prop_assert_eq!(&before, &after);
            }

            assert_closure_monotonic(&before, &after);
            assert_all_project_invariants(&after);
            assert_current_amount_matches_contributions(&mut ledger, &after);
        }
    }

    /// Sums of distinct contributors' amounts land on the project unchanged.
    #[test]
    fn fuzz_distinct_contributors_sum(amounts in prop::collection::vec(1u32..1_000_000, 1..20)) {
        let mut ledger = InMemoryLedger::new();
        ledger
            .invoke(|ctx| Contract::create_project(ctx, "p", "T", "D", "S", 1.0))
            .unwrap();

        for (i, cents) in amounts.iter().enumerate() {
            let who = format!("c{i}");
            ledger
                .invoke(|ctx| Contract::contribute(ctx, "p", &who, f64::from(*cents)))
                .unwrap();
        }

        let expected: f64 = amounts.iter().map(|c| f64::from(*c)).sum();
        let project = Contract::get_project(&mut ledger, "p").unwrap();
        prop_assert_eq!(project.current_amount, expected);

        let records = Contract::get_contributions_for_campaign(&mut ledger, "p").unwrap();
        prop_assert_eq!(records.len(), amounts.len());
    }
}
