//! Maps gateway requests (`fcn` + string `args`) onto contract entry points.

use serde_json::Value;

use crowdfunding::ledger::TransactionContext;
use crowdfunding::CrowdfundingContract;

use crate::errors::{GatewayError, Result};

/// A fully parsed contract call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateProject {
        project_id: String,
        title: String,
        description: String,
        short_description: String,
        goal_amount: f64,
    },
    Contribute {
        project_id: String,
        contributor_id: String,
        amount: f64,
    },
    DistributeRewards {
        project_id: String,
    },
    RegisterUser {
        user_id: String,
        role: String,
    },
    GetContributionsByUser {
        user_id: String,
    },
    GetContributionsForCampaign {
        campaign_id: String,
    },
    GetProject {
        project_id: String,
    },
    GetUser {
        user_id: String,
    },
}

impl Call {
    /// Parse a function name and its string arguments.
    pub fn parse(fcn: &str, args: &[String]) -> Result<Self> {
        let call = match fcn {
            "CreateProject" => {
                let [project_id, title, description, short_description, goal] = take(fcn, args)?;
                Call::CreateProject {
                    project_id,
                    title,
                    description,
                    short_description,
                    goal_amount: parse_amount("goalAmount", &goal)?,
                }
            }
            "Contribute" => {
                let [project_id, contributor_id, amount] = take(fcn, args)?;
                Call::Contribute {
                    project_id,
                    contributor_id,
                    amount: parse_amount("amount", &amount)?,
                }
            }
            "DistributeRewards" => {
                let [project_id] = take(fcn, args)?;
                Call::DistributeRewards { project_id }
            }
            "RegisterUser" => {
                let [user_id, role] = take(fcn, args)?;
                Call::RegisterUser { user_id, role }
            }
            "GetContributionsByUser" => {
                let [user_id] = take(fcn, args)?;
                Call::GetContributionsByUser { user_id }
            }
            "GetContributionsForCampaign" => {
                let [campaign_id] = take(fcn, args)?;
                Call::GetContributionsForCampaign { campaign_id }
            }
            "GetProject" => {
                let [project_id] = take(fcn, args)?;
                Call::GetProject { project_id }
            }
            "GetUser" => {
                let [user_id] = take(fcn, args)?;
                Call::GetUser { user_id }
            }
            _ => return Err(GatewayError::BadRequest(format!("Function {fcn} not found"))),
        };
        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Call::CreateProject { .. } => "CreateProject",
            Call::Contribute { .. } => "Contribute",
            Call::DistributeRewards { .. } => "DistributeRewards",
            Call::RegisterUser { .. } => "RegisterUser",
            Call::GetContributionsByUser { .. } => "GetContributionsByUser",
            Call::GetContributionsForCampaign { .. } => "GetContributionsForCampaign",
            Call::GetProject { .. } => "GetProject",
            Call::GetUser { .. } => "GetUser",
        }
    }

    /// Whether the call changes state and must be submitted for commit.
    pub fn is_submit(&self) -> bool {
        matches!(
            self,
            Call::CreateProject { .. }
                | Call::Contribute { .. }
                | Call::DistributeRewards { .. }
                | Call::RegisterUser { .. }
        )
    }

    /// Run the call against `ctx`. State-changing calls return `Value::Null`.
    pub fn execute<C: TransactionContext + ?Sized>(
        &self,
        ctx: &mut C,
    ) -> std::result::Result<Value, crowdfunding::Error> {
        type Contract = CrowdfundingContract;
        let output = match self {
            Call::CreateProject {
                project_id,
                title,
                description,
                short_description,
                goal_amount,
            } => {
                Contract::create_project(
                    ctx,
                    project_id,
                    title,
                    description,
                    short_description,
                    *goal_amount,
                )?;
                Value::Null
            }
            Call::Contribute {
                project_id,
                contributor_id,
                amount,
            } => {
                Contract::contribute(ctx, project_id, contributor_id, *amount)?;
                Value::Null
            }
            Call::DistributeRewards { project_id } => {
                Contract::distribute_rewards(ctx, project_id)?;
                Value::Null
            }
            Call::RegisterUser { user_id, role } => {
                Contract::register_user(ctx, user_id, role)?;
                Value::Null
            }
            Call::GetContributionsByUser { user_id } => {
                serde_json::to_value(Contract::get_contributions_by_user(ctx, user_id)?)?
            }
            Call::GetContributionsForCampaign { campaign_id } => {
                serde_json::to_value(Contract::get_contributions_for_campaign(ctx, campaign_id)?)?
            }
            Call::GetProject { project_id } => {
                serde_json::to_value(Contract::get_project(ctx, project_id)?)?
            }
            Call::GetUser { user_id } => serde_json::to_value(Contract::get_user(ctx, user_id)?)?,
        };
        Ok(output)
    }
}

/// Take exactly `N` arguments.
fn take<const N: usize>(fcn: &str, args: &[String]) -> Result<[String; N]> {
    <[String; N]>::try_from(args.to_vec()).map_err(|given| {
        GatewayError::BadRequest(format!(
            "{fcn} expects {N} arguments, got {}",
            given.len()
        ))
    })
}

fn parse_amount(name: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| GatewayError::BadRequest(format!("{name} {raw:?} is not a number")))
}
