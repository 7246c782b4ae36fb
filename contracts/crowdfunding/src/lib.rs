//! # Crowdfunding Contract
//!
//! Transaction logic of a crowdfunding ledger contract. Every entry point on
//! [`CrowdfundingContract`] is one deterministic state transition, executed by
//! the host ledger inside a single atomic transaction:
//!
//! | Phase        | Entry Point(s)                                              |
//! |--------------|-------------------------------------------------------------|
//! | Registration | [`CrowdfundingContract::create_project`], [`CrowdfundingContract::register_user`] |
//! | Funding      | [`CrowdfundingContract::contribute`]                        |
//! | Closure      | [`CrowdfundingContract::distribute_rewards`]                |
//! | Queries      | `get_contributions_by_user`, `get_contributions_for_campaign`, `get_project`, `get_user` |
//!
//! ## Architecture
//!
//! Ledger access goes through the [`ledger::TransactionContext`] port, which
//! the host implements. Key layout and typed record access live in
//! [`storage`]; the value format lives in [`codec`]. This file contains only
//! the entry points, their validation, and event emission.
//!
//! Entry points never retry and never commit partially: any error aborts the
//! invocation and the host discards its writes.

pub mod codec;
pub mod events;
pub mod ledger;
pub mod memory;
pub mod storage;
mod types;

#[cfg(test)]
mod fuzz_test;
#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_events;
#[cfg(test)]
mod test_queries;

use tracing::{debug, info, instrument};

use ledger::{LedgerError, TransactionContext};
use storage::{
    contribution_partition, contribution_selector, load_contribution, load_project, load_user,
    save_contribution, save_project, save_user, validate_id,
};
pub use memory::InMemoryLedger;
pub use types::{Contribution, Project, Reward, User};

/// Errors returned by contract entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("project does not exist: {0}")]
    ProjectNotFound(String),

    #[error("user does not exist: {0}")]
    UserNotFound(String),

    #[error("goal amount not reached")]
    GoalNotReached,

    #[error("project is already closed")]
    AlreadyClosed,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Coarse classification of [`Error`], for hosts that map errors to
/// status codes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidArgument,
    Serialization,
    Storage,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ProjectNotFound(_) | Error::UserNotFound(_) => ErrorKind::NotFound,
            Error::GoalNotReached | Error::AlreadyClosed => ErrorKind::InvalidState,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Ledger(_) => ErrorKind::Storage,
        }
    }
}

/// Monetary amounts must be finite and strictly positive.
fn validate_amount(what: &str, amount: f64) -> Result<(), Error> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "{what} must be a positive finite number, got {amount}"
        )));
    }
    Ok(())
}

pub struct CrowdfundingContract;

impl CrowdfundingContract {
    // ─────────────────────────────────────────────────────────
    // State-changing entry points
    // ─────────────────────────────────────────────────────────

    /// Create a project with `currentAmount = 0` and `isClosed = false`.
    ///
    /// An existing project with the same id is replaced without warning, even
    /// a closed one. Re-creation starts a new funding round under the same id:
    /// the project reopens with `currentAmount = 0`, while contribution records
    /// from earlier rounds stay in the partition and keep accumulating.
    #[instrument(skip(ctx, title, description, short_description), fields(tx = ctx.tx_id()))]
    pub fn create_project<C: TransactionContext + ?Sized>(
        ctx: &mut C,
        project_id: &str,
        title: &str,
        description: &str,
        short_description: &str,
        goal_amount: f64,
    ) -> Result<(), Error> {
        validate_id("project id", project_id)?;
        validate_amount("goal amount", goal_amount)?;

        let project = Project {
            project_id: project_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            short_description: short_description.to_string(),
            goal_amount,
            current_amount: 0.0,
            is_closed: false,
        };
        save_project(ctx, &project)?;
        events::emit_project_created(ctx, project_id, goal_amount)?;

        info!("project created");
        Ok(())
    }

    /// Record `amount` from `contributor_id` towards an open project.
    ///
    /// Repeat contributions from the same contributor accumulate into a single
    /// record, so the project's `currentAmount` always equals the sum of its
    /// contribution records.
    #[instrument(skip(ctx), fields(tx = ctx.tx_id()))]
    pub fn contribute<C: TransactionContext + ?Sized>(
        ctx: &mut C,
        project_id: &str,
        contributor_id: &str,
        amount: f64,
    ) -> Result<(), Error> {
        validate_id("project id", project_id)?;
        validate_id("contributor id", contributor_id)?;
        validate_amount("contribution amount", amount)?;

        let mut project = load_project(ctx, project_id)?
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;
        if project.is_closed {
            return Err(Error::AlreadyClosed);
        }

        let mut contribution = load_contribution(ctx, project_id, contributor_id)?
            .unwrap_or_else(|| Contribution {
                project_id: project_id.to_string(),
                contributor_id: contributor_id.to_string(),
                amount: 0.0,
            });
        let new_current = project.current_amount + amount;
        let new_total = contribution.amount + amount;
        // JSON has no encoding for infinity.
        if !new_current.is_finite() || !new_total.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "contribution of {amount} overflows the running total"
            )));
        }
        project.current_amount = new_current;
        contribution.amount = new_total;

        save_contribution(ctx, &contribution)?;
        save_project(ctx, &project)?;
        events::emit_contribution_received(
            ctx,
            project_id,
            contributor_id,
            amount,
            project.current_amount,
        )?;

        info!(
            current_amount = project.current_amount,
            contributor_total = contribution.amount,
            "contribution recorded"
        );
        Ok(())
    }

    /// Close a funded project and enumerate the contributors eligible for
    /// rewards.
    ///
    /// Preconditions are checked in order: the project exists, its goal is
    /// reached, it is not already closed. Reward tiers are not assigned here;
    /// the eligible contributors are published in the `RewardsDistributed`
    /// event.
    #[instrument(skip(ctx), fields(tx = ctx.tx_id()))]
    pub fn distribute_rewards<C: TransactionContext + ?Sized>(
        ctx: &mut C,
        project_id: &str,
    ) -> Result<(), Error> {
        validate_id("project id", project_id)?;

        let mut project = load_project(ctx, project_id)?
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;
        if !project.goal_reached() {
            return Err(Error::GoalNotReached);
        }
        if project.is_closed {
            return Err(Error::AlreadyClosed);
        }

        project.is_closed = true;
        save_project(ctx, &project)?;

        let prefix = contribution_partition(project_id)?;
        let mut contributors = Vec::new();
        for entry in ctx.get_state_by_prefix(&prefix)? {
            let entry = entry?;
            let contribution: Contribution = codec::decode(&entry.value)?;
            debug!(
                contributor = %contribution.contributor_id,
                amount = contribution.amount,
                "eligible for rewards"
            );
            contributors.push(contribution.contributor_id);
        }

        info!(
            contributors = contributors.len(),
            total_raised = project.current_amount,
            "project closed"
        );
        events::emit_rewards_distributed(ctx, project_id, contributors, project.current_amount)?;
        Ok(())
    }

    /// Register a user, replacing any existing user with the same id.
    #[instrument(skip(ctx), fields(tx = ctx.tx_id()))]
    pub fn register_user<C: TransactionContext + ?Sized>(
        ctx: &mut C,
        user_id: &str,
        role: &str,
    ) -> Result<(), Error> {
        validate_id("user id", user_id)?;

        let user = User {
            user_id: user_id.to_string(),
            role: role.to_string(),
        };
        save_user(ctx, &user)?;
        events::emit_user_registered(ctx, user_id, role)?;

        info!("user registered");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    /// Every contribution made by `user_id`, in query-engine order.
    pub fn get_contributions_by_user<C: TransactionContext + ?Sized>(
        ctx: &mut C,
        user_id: &str,
    ) -> Result<Vec<Contribution>, Error> {
        let selector = contribution_selector("contributorId", user_id)?;
        query_contributions(ctx, &selector)
    }

    /// Every contribution made to `campaign_id`, in query-engine order.
    pub fn get_contributions_for_campaign<C: TransactionContext + ?Sized>(
        ctx: &mut C,
        campaign_id: &str,
    ) -> Result<Vec<Contribution>, Error> {
        let selector = contribution_selector("projectId", campaign_id)?;
        query_contributions(ctx, &selector)
    }

    pub fn get_project<C: TransactionContext + ?Sized>(
        ctx: &mut C,
        project_id: &str,
    ) -> Result<Project, Error> {
        validate_id("project id", project_id)?;
        load_project(ctx, project_id)?.ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))
    }

    pub fn get_user<C: TransactionContext + ?Sized>(
        ctx: &mut C,
        user_id: &str,
    ) -> Result<User, Error> {
        validate_id("user id", user_id)?;
        load_user(ctx, user_id)?.ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }
}

fn query_contributions<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    selector: &ledger::Selector,
) -> Result<Vec<Contribution>, Error> {
    debug!(%selector, "running contribution query");
    let mut contributions = Vec::new();
    for entry in ctx.get_query_result(selector)? {
        let entry = entry?;
        contributions.push(codec::decode(&entry.value)?);
    }
    Ok(contributions)
}
