//! Contract events. Each state-changing entry point sets exactly one event
//! per transaction; the payload is the camelCase JSON of the structs below.

use serde::{Deserialize, Serialize};

use crate::codec::encode;
use crate::ledger::TransactionContext;
use crate::Error;

pub const PROJECT_CREATED: &str = "ProjectCreated";
pub const CONTRIBUTION_RECEIVED: &str = "ContributionReceived";
pub const REWARDS_DISTRIBUTED: &str = "RewardsDistributed";
pub const USER_REGISTERED: &str = "UserRegistered";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreated {
    pub project_id: String,
    pub goal_amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionReceived {
    pub project_id: String,
    pub contributor_id: String,
    pub amount: f64,
    pub current_amount: f64,
}

/// Contributors found under the project's partition when it was closed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsDistributed {
    pub project_id: String,
    pub contributors: Vec<String>,
    pub total_raised: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistered {
    pub user_id: String,
    pub role: String,
}

fn emit<C, T>(ctx: &mut C, name: &str, data: &T) -> Result<(), Error>
where
    C: TransactionContext + ?Sized,
    T: Serialize,
{
    ctx.set_event(name, encode(data)?)?;
    Ok(())
}

pub fn emit_project_created<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    project_id: &str,
    goal_amount: f64,
) -> Result<(), Error> {
    let data = ProjectCreated {
        project_id: project_id.to_string(),
        goal_amount,
    };
    emit(ctx, PROJECT_CREATED, &data)
}

pub fn emit_contribution_received<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    project_id: &str,
    contributor_id: &str,
    amount: f64,
    current_amount: f64,
) -> Result<(), Error> {
    let data = ContributionReceived {
        project_id: project_id.to_string(),
        contributor_id: contributor_id.to_string(),
        amount,
        current_amount,
    };
    emit(ctx, CONTRIBUTION_RECEIVED, &data)
}

pub fn emit_rewards_distributed<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    project_id: &str,
    contributors: Vec<String>,
    total_raised: f64,
) -> Result<(), Error> {
    let data = RewardsDistributed {
        project_id: project_id.to_string(),
        contributors,
        total_raised,
    };
    emit(ctx, REWARDS_DISTRIBUTED, &data)
}

pub fn emit_user_registered<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    user_id: &str,
    role: &str,
) -> Result<(), Error> {
    let data = UserRegistered {
        user_id: user_id.to_string(),
        role: role.to_string(),
    };
    emit(ctx, USER_REGISTERED, &data)
}
