//! # Storage
//!
//! Key layout and typed record helpers over a [`TransactionContext`].
//!
//! ## Keys
//!
//! Every record lives under a composite key built from an object type and
//! one or more attributes, each terminated by `U+0000`:
//!
//! | Key                                   | Record         |
//! |---------------------------------------|----------------|
//! | `\0Project\0{projectId}\0`            | `Project`      |
//! | `\0User\0{userId}\0`                  | `User`         |
//! | `\0Contribution\0{projectId}\0{contributorId}\0` | `Contribution` |
//!
//! Because each kind has its own object type, a project and a user may share
//! an identifier without overwriting each other. All contributions to one
//! project share the prefix `\0Contribution\0{projectId}\0`, which is what
//! `distribute_rewards` scans.
//!
//! Attributes must be non-empty and must not contain `U+0000`; otherwise
//! two different attribute lists could produce the same key.

use tracing::debug;

use crate::codec::{decode, encode};
use crate::ledger::{Selector, TransactionContext};
use crate::types::{Contribution, Project, User};
use crate::Error;

/// Separator and terminator used in composite keys.
const KEY_SEPARATOR: char = '\u{0}';

const PROJECT_OBJECT_TYPE: &str = "Project";
const USER_OBJECT_TYPE: &str = "User";
const CONTRIBUTION_OBJECT_TYPE: &str = "Contribution";

// ── Storage Keys ─────────────────────────────────────────────────────

/// Every ledger key written by the contract.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Project(String),
    User(String),
    Contribution {
        project_id: String,
        contributor_id: String,
    },
}

impl DataKey {
    /// The composite ledger key for this record.
    pub fn to_ledger_key(&self) -> Result<String, Error> {
        match self {
            DataKey::Project(id) => composite_key(PROJECT_OBJECT_TYPE, &[id.as_str()]),
            DataKey::User(id) => composite_key(USER_OBJECT_TYPE, &[id.as_str()]),
            DataKey::Contribution {
                project_id,
                contributor_id,
            } => composite_key(
                CONTRIBUTION_OBJECT_TYPE,
                &[project_id.as_str(), contributor_id.as_str()],
            ),
        }
    }
}

/// Build a composite key: `\0{object_type}\0{attr}\0{attr}\0...`.
///
/// With an empty `attributes` slice this yields the prefix shared by every key
/// of `object_type`.
pub fn composite_key(object_type: &str, attributes: &[&str]) -> Result<String, Error> {
    validate_component("object type", object_type)?;
    let mut key = String::with_capacity(
        2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>(),
    );
    key.push(KEY_SEPARATOR);
    key.push_str(object_type);
    key.push(KEY_SEPARATOR);
    for attribute in attributes {
        validate_component("key attribute", attribute)?;
        key.push_str(attribute);
        key.push(KEY_SEPARATOR);
    }
    Ok(key)
}

/// Split a composite key back into its object type and attributes.
pub fn split_composite_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let body = key.strip_prefix(KEY_SEPARATOR)?.strip_suffix(KEY_SEPARATOR)?;
    let mut parts = body.split(KEY_SEPARATOR);
    let object_type = parts.next()?;
    Some((object_type, parts.collect()))
}

fn validate_component(what: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} must not be empty")));
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(Error::InvalidArgument(format!(
            "{what} {value:?} contains a reserved U+0000 character"
        )));
    }
    Ok(())
}

/// Check that a caller-supplied identifier can be used as a key attribute.
pub fn validate_id(what: &str, id: &str) -> Result<(), Error> {
    validate_component(what, id)
}

/// Prefix shared by every contribution to `project_id`.
pub fn contribution_partition(project_id: &str) -> Result<String, Error> {
    composite_key(CONTRIBUTION_OBJECT_TYPE, &[project_id])
}

/// Query selecting contribution records whose `field` equals `value`.
pub fn contribution_selector(field: &str, value: &str) -> Result<Selector, Error> {
    let namespace = composite_key(CONTRIBUTION_OBJECT_TYPE, &[])?;
    Ok(Selector::new().within(namespace).field_eq(field, value))
}

// ── Record Helpers ───────────────────────────────────────────────────

fn load<C, T>(ctx: &mut C, key: &DataKey) -> Result<Option<T>, Error>
where
    C: TransactionContext + ?Sized,
    T: serde::de::DeserializeOwned,
{
    let ledger_key = key.to_ledger_key()?;
    match ctx.get_state(&ledger_key)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn save<C, T>(ctx: &mut C, key: &DataKey, record: &T) -> Result<(), Error>
where
    C: TransactionContext + ?Sized,
    T: serde::Serialize,
{
    let ledger_key = key.to_ledger_key()?;
    let bytes = encode(record)?;
    debug!(key = ?key, bytes = bytes.len(), "writing record");
    ctx.put_state(&ledger_key, bytes)?;
    Ok(())
}

/// Load a project. Returns `Ok(None)` if it does not exist.
pub fn load_project<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    project_id: &str,
) -> Result<Option<Project>, Error> {
    load(ctx, &DataKey::Project(project_id.to_string()))
}

pub fn save_project<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    project: &Project,
) -> Result<(), Error> {
    save(ctx, &DataKey::Project(project.project_id.clone()), project)
}

pub fn load_user<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    user_id: &str,
) -> Result<Option<User>, Error> {
    load(ctx, &DataKey::User(user_id.to_string()))
}

pub fn save_user<C: TransactionContext + ?Sized>(ctx: &mut C, user: &User) -> Result<(), Error> {
    save(ctx, &DataKey::User(user.user_id.clone()), user)
}

/// Load the running contribution of `contributor_id` to `project_id`.
pub fn load_contribution<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    project_id: &str,
    contributor_id: &str,
) -> Result<Option<Contribution>, Error> {
    load(
        ctx,
        &DataKey::Contribution {
            project_id: project_id.to_string(),
            contributor_id: contributor_id.to_string(),
        },
    )
}

pub fn save_contribution<C: TransactionContext + ?Sized>(
    ctx: &mut C,
    contribution: &Contribution,
) -> Result<(), Error> {
    save(
        ctx,
        &DataKey::Contribution {
            project_id: contribution.project_id.clone(),
            contributor_id: contribution.contributor_id.clone(),
        },
        contribution,
    )
}
