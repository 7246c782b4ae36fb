use crate::codec::decode;
use crate::events::{
    ContributionReceived, ProjectCreated, RewardsDistributed, UserRegistered,
    CONTRIBUTION_RECEIVED, PROJECT_CREATED, REWARDS_DISTRIBUTED, USER_REGISTERED,
};
use crate::{CrowdfundingContract as Contract, InMemoryLedger};

fn setup() -> InMemoryLedger {
    InMemoryLedger::new()
}

#[test]
fn test_project_created_event() {
    let mut ledger = setup();
    ledger
        .invoke(|ctx| Contract::create_project(ctx, "p1", "T", "D", "S", 5000.0))
        .unwrap();

    let last_event = ledger.last_event().expect("No events found");
    assert_eq!(last_event.name, PROJECT_CREATED);

    let event_data: ProjectCreated = decode(&last_event.payload).unwrap();
    assert_eq!(
        event_data,
        ProjectCreated {
            project_id: "p1".into(),
            goal_amount: 5000.0,
        }
    );
}

#[test]
fn test_contribution_received_event() {
    let mut ledger = setup();
    ledger
        .invoke(|ctx| Contract::create_project(ctx, "p1", "T", "D", "S", 5000.0))
        .unwrap();
    ledger
        .invoke(|ctx| Contract::contribute(ctx, "p1", "alice", 700.0))
        .unwrap();
    ledger
        .invoke(|ctx| Contract::contribute(ctx, "p1", "alice", 300.0))
        .unwrap();

    let last_event = ledger.last_event().expect("No events found");
    assert_eq!(last_event.name, CONTRIBUTION_RECEIVED);

    let event_data: ContributionReceived = decode(&last_event.payload).unwrap();
    assert_eq!(
        event_data,
        ContributionReceived {
            project_id: "p1".into(),
            contributor_id: "alice".into(),
            amount: 300.0,
            current_amount: 1000.0,
        }
    );
}

/// The closing scan lists every contributor under the project's partition,
/// in key order.
#[test]
fn test_rewards_distributed_event_lists_contributors() {
    let mut ledger = setup();
    ledger
        .invoke(|ctx| Contract::create_project(ctx, "p1", "T", "D", "S", 100.0))
        .unwrap();
    for (who, amount) in [("carol", 20.0), ("alice", 60.0), ("bob", 30.0)] {
        ledger
            .invoke(|ctx| Contract::contribute(ctx, "p1", who, amount))
            .unwrap();
    }
    ledger
        .invoke(|ctx| Contract::distribute_rewards(ctx, "p1"))
        .unwrap();

    let last_event = ledger.last_event().expect("No events found");
    assert_eq!(last_event.name, REWARDS_DISTRIBUTED);

    let event_data: RewardsDistributed = decode(&last_event.payload).unwrap();
    assert_eq!(
        event_data,
        RewardsDistributed {
            project_id: "p1".into(),
            contributors: vec!["alice".into(), "bob".into(), "carol".into()],
            total_raised: 110.0,
        }
    );
}

#[test]
fn test_user_registered_event() {
    let mut ledger = setup();
    ledger
        .invoke(|ctx| Contract::register_user(ctx, "alice", "backer"))
        .unwrap();

    let last_event = ledger.last_event().expect("No events found");
    assert_eq!(last_event.name, USER_REGISTERED);
    let event_data: UserRegistered = decode(&last_event.payload).unwrap();
    assert_eq!(event_data.user_id, "alice");
    assert_eq!(event_data.role, "backer");
}

#[test]
fn test_failed_invocation_emits_nothing() {
    let mut ledger = setup();
    ledger
        .invoke(|ctx| Contract::create_project(ctx, "p1", "T", "D", "S", 100.0))
        .unwrap();
    let before = ledger.events().len();

    assert!(ledger
        .invoke(|ctx| Contract::distribute_rewards(ctx, "p1"))
        .is_err());
    assert!(ledger
        .invoke(|ctx| Contract::contribute(ctx, "missing", "alice", 1.0))
        .is_err());

    assert_eq!(ledger.events().len(), before);
    assert_eq!(ledger.last_event().unwrap().name, PROJECT_CREATED);
}

#[test]
fn test_each_transaction_gets_its_own_event() {
    let mut ledger = setup();
    ledger
        .invoke(|ctx| Contract::create_project(ctx, "p1", "T", "D", "S", 100.0))
        .unwrap();
    ledger
        .invoke(|ctx| Contract::register_user(ctx, "bob", "backer"))
        .unwrap();

    let names: Vec<&str> = ledger.events().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec![PROJECT_CREATED, USER_REGISTERED]);
    assert_ne!(ledger.events()[0].tx_id, ledger.events()[1].tx_id);
}
