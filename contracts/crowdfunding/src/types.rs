//! # Types
//!
//! Ledger records used by the crowdfunding contract.
//!
//! Every record is stored as an independent ledger entry (see [`crate::storage`]
//! for the key layout) and serialized as a flat JSON object with camelCase
//! field names (see [`crate::codec`]).
//!
//! ## Project lifecycle
//!
//! ```text
//! open (isClosed = false) ──► closed (isClosed = true)
//! ```
//!
//! `currentAmount` only grows while the project is open. The transition to
//! closed happens once, in `distribute_rewards`, and only when
//! `currentAmount >= goalAmount`.

use serde::{Deserialize, Serialize};

/// A crowdfunding campaign.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Caller-chosen unique identifier.
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub short_description: String,
    /// Target funding amount.
    pub goal_amount: f64,
    /// Sum of every contribution received so far.
    pub current_amount: f64,
    /// Set once rewards have been distributed.
    pub is_closed: bool,
}

impl Project {
    /// Whether the accumulated amount has reached the goal.
    pub fn goal_reached(&self) -> bool {
        self.current_amount >= self.goal_amount
    }
}

/// Running total of what one contributor has given to one project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub project_id: String,
    pub contributor_id: String,
    pub amount: f64,
}

/// A reward tier offered by a project.
///
/// No contract operation reads or writes rewards yet; the record shape is kept
/// so that tier assignment can be layered on top of `distribute_rewards`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub project_id: String,
    pub reward_level: String,
    pub reward_description: String,
    /// Smallest contribution that qualifies for this tier.
    pub min_contribution: f64,
}

impl Reward {
    pub fn is_eligible(&self, contribution: &Contribution) -> bool {
        contribution.project_id == self.project_id && contribution.amount >= self.min_contribution
    }
}

/// A registered participant. `role` is free-form and never enforced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub role: String,
}
