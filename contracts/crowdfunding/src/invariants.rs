#![allow(dead_code)]

use crate::codec;
use crate::ledger::TransactionContext;
use crate::storage::contribution_partition;
use crate::types::{Contribution, Project};

/// Tolerance for comparing sums of `f64` amounts.
const EPSILON: f64 = 1e-9;

/// INV-1: Project goal must always be positive.
pub fn assert_goal_positive(project: &Project) {
    assert!(
        project.goal_amount > 0.0,
        "INV-1 violated: project {} has non-positive goal ({})",
        project.project_id,
        project.goal_amount
    );
}

/// INV-2: Accumulated amount is never negative.
pub fn assert_current_amount_non_negative(project: &Project) {
    assert!(
        project.current_amount >= 0.0,
        "INV-2 violated: project {} has negative current amount ({})",
        project.project_id,
        project.current_amount
    );
}

/// INV-3: A closed project must have reached its goal.
pub fn assert_closed_only_when_funded(project: &Project) {
    if project.is_closed {
        assert!(
            project.goal_reached(),
            "INV-3 violated: project {} closed at {} below goal {}",
            project.project_id,
            project.current_amount,
            project.goal_amount
        );
    }
}

/// INV-4: After a contribution of `amount`, the
/// project's current amount increases by exactly `amount`.
pub fn assert_contribution_invariant(before: f64, after: f64, amount: f64) {
    assert!(
        (after - (before + amount)).abs() < EPSILON,
        "INV-4 violated: {} + {} != {}",
        before,
        amount,
        after
    );
}

/// INV-5: Closure is one-way between re-creations of the project.
pub fn assert_closure_monotonic(before: &Project, after: &Project) {
    assert!(
        !before.is_closed || after.is_closed,
        "INV-5 violated: project {} reopened",
        before.project_id
    );
}

/// INV-6: Fields fixed at creation never change.
pub fn assert_project_immutable_fields(original: &Project, current: &Project) {
    assert_eq!(
        original.project_id, current.project_id,
        "INV-6 violated: project id changed"
    );
    assert_eq!(
        original.title, current.title,
        "INV-6 violated: project title changed"
    );
    assert_eq!(
        original.goal_amount, current.goal_amount,
        "INV-6 violated: project goal changed"
    );
}

/// INV-7: A project's current amount equals the sum of the contribution
/// records stored under its partition. Holds only for projects that were
/// never re-created.
pub fn assert_current_amount_matches_contributions<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    project: &Project,
) {
    let prefix = contribution_partition(&project.project_id).unwrap();
    let contributions: Vec<Contribution> = ctx
        .get_state_by_prefix(&prefix)
        .unwrap()
        .map(|kv| codec::decode(&kv.unwrap().value).unwrap())
        .collect();
    let total: f64 = contributions.iter().map(|c| c.amount).sum();
    assert!(
        (total - project.current_amount).abs() < EPSILON,
        "INV-7 violated: project {} current amount {} != sum of contributions {}",
        project.project_id,
        project.current_amount,
        total
    );
}

/// Run all stateless project invariants.
pub fn assert_all_project_invariants(project: &Project) {
    assert_goal_positive(project);
    assert_current_amount_non_negative(project);
    assert_closed_only_when_funded(project);
}
