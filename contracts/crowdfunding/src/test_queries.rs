use crate::ledger::TransactionContext;
use crate::storage::composite_key;
use crate::{Contribution, CrowdfundingContract as Contract, ErrorKind, InMemoryLedger};

fn setup() -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new();
    for (project, goal) in [("p1", 100.0), ("p2", 50.0)] {
        ledger
            .invoke(|ctx| Contract::create_project(ctx, project, "T", "D", "S", goal))
            .unwrap();
    }
    ledger
}

fn fund(ledger: &mut InMemoryLedger, contributions: &[(&str, &str, f64)]) {
    for (project, who, amount) in contributions {
        ledger
            .invoke(|ctx| Contract::contribute(ctx, project, who, *amount))
            .unwrap();
    }
}

fn sorted(mut contributions: Vec<Contribution>) -> Vec<(String, String, f64)> {
    contributions.sort_by(|a, b| {
        (&a.project_id, &a.contributor_id).cmp(&(&b.project_id, &b.contributor_id))
    });
    contributions
        .into_iter()
        .map(|c| (c.project_id, c.contributor_id, c.amount))
        .collect()
}

#[test]
fn test_contributions_by_user() {
    let mut ledger = setup();
    fund(
        &mut ledger,
        &[
            ("p2", "alice", 5.0),
            ("p1", "bob", 7.0),
            ("p1", "alice", 3.0),
        ],
    );

    let found = Contract::get_contributions_by_user(&mut ledger, "alice").unwrap();
    assert_eq!(
        sorted(found),
        vec![
            ("p1".to_string(), "alice".to_string(), 3.0),
            ("p2".to_string(), "alice".to_string(), 5.0),
        ]
    );
}

#[test]
fn test_contributions_for_campaign() {
    let mut ledger = setup();
    fund(
        &mut ledger,
        &[
            ("p1", "carol", 1.0),
            ("p2", "alice", 5.0),
            ("p1", "alice", 3.0),
            ("p1", "carol", 2.0),
        ],
    );

    let found = Contract::get_contributions_for_campaign(&mut ledger, "p1").unwrap();
    assert_eq!(
        sorted(found),
        vec![
            ("p1".to_string(), "alice".to_string(), 3.0),
            ("p1".to_string(), "carol".to_string(), 3.0),
        ]
    );
}

/// Project records also carry a `projectId` field; they must never show up
/// as contributions.
#[test]
fn test_campaign_query_excludes_project_record() {
    let mut ledger = setup();
    let found = Contract::get_contributions_for_campaign(&mut ledger, "p1").unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_queries_return_empty_when_nothing_matches() {
    let mut ledger = setup();
    fund(&mut ledger, &[("p1", "alice", 3.0)]);

    assert!(Contract::get_contributions_by_user(&mut ledger, "nobody")
        .unwrap()
        .is_empty());
    assert!(Contract::get_contributions_for_campaign(&mut ledger, "p9")
        .unwrap()
        .is_empty());
}

#[test]
fn test_query_result_is_independent_of_creation_order() {
    let mut forward = setup();
    let mut backward = setup();
    let ops = [("p1", "alice", 1.0), ("p1", "bob", 2.0), ("p2", "bob", 4.0)];
    fund(&mut forward, &ops);
    let reversed: Vec<_> = ops.iter().rev().copied().collect();
    fund(&mut backward, &reversed);

    let a = Contract::get_contributions_by_user(&mut forward, "bob").unwrap();
    let b = Contract::get_contributions_by_user(&mut backward, "bob").unwrap();
    assert_eq!(sorted(a), sorted(b));
}

#[test]
fn test_query_surfaces_corrupt_records() {
    let mut ledger = setup();
    let key = composite_key("Contribution", &["p1", "eve"]).unwrap();
    ledger
        .put_state(&key, br#"{"projectId":"p1","contributorId":"eve","amount":"lots"}"#.to_vec())
        .unwrap();

    let err = Contract::get_contributions_for_campaign(&mut ledger, "p1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
}
