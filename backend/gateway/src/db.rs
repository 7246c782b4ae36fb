//! Database layer: migrations, world-state persistence and the transaction log.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crowdfunding::storage::split_composite_key;

use crate::errors::{GatewayError, Result};
use crate::world_state::{ChaincodeEvent, Version, WorldState};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // Every connection to `:memory:` opens its own database.
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// World state
// ─────────────────────────────────────────────────────────

/// Load every committed key into memory.
pub async fn load_world_state(pool: &SqlitePool) -> Result<WorldState> {
    let rows: Vec<(String, Vec<u8>, i64)> =
        sqlx::query_as("SELECT key, value, version FROM world_state")
            .fetch_all(pool)
            .await?;
    let rows = rows
        .into_iter()
        .map(|(key, value, version)| Ok((key, value, to_version(version)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(WorldState::from_rows(rows))
}

/// Highest committed block number, `0` for an empty ledger.
pub async fn latest_block_number(pool: &SqlitePool) -> Result<Version> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(block_number) FROM transactions")
        .fetch_one(pool)
        .await?;
    row.0.map(to_version).transpose().map(|v| v.unwrap_or(0))
}

// ─────────────────────────────────────────────────────────
// Commit
// ─────────────────────────────────────────────────────────

/// A validated transaction about to be written as its own block.
#[derive(Debug)]
pub struct NewTransaction<'a> {
    pub tx_id: &'a str,
    pub block_number: Version,
    pub channel: &'a str,
    pub chaincode: &'a str,
    pub fcn: &'a str,
    pub args: &'a [String],
    pub event: Option<&'a ChaincodeEvent>,
    pub writes: &'a BTreeMap<String, Vec<u8>>,
}

/// Persist the write set and the transaction row atomically.
pub async fn commit_transaction(pool: &SqlitePool, tx: &NewTransaction<'_>) -> Result<()> {
    let block_number = to_column(tx.block_number)?;
    let args = serde_json::to_string(tx.args)?;
    let write_set = serde_json::to_string(&render_write_set(tx.writes))?;

    let mut db_tx = pool.begin().await?;

    for (key, value) in tx.writes {
        sqlx::query(
            r#"
            INSERT INTO world_state (key, value, version)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, version = excluded.version
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(block_number)
        .execute(&mut *db_tx)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO transactions
            (tx_id, block_number, channel, chaincode, fcn, args,
             event_name, event_payload, write_set, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(tx.tx_id)
    .bind(block_number)
    .bind(tx.channel)
    .bind(tx.chaincode)
    .bind(tx.fcn)
    .bind(args)
    .bind(tx.event.map(|e| e.name.as_str()))
    .bind(tx.event.map(|e| String::from_utf8_lossy(&e.payload).into_owned()))
    .bind(write_set)
    .bind(Utc::now().timestamp_millis())
    .execute(&mut *db_tx)
    .await?;

    db_tx.commit().await?;
    Ok(())
}

/// Render ledger keys as `{objectType, attributes, value}` for the log.
fn render_write_set(writes: &BTreeMap<String, Vec<u8>>) -> Vec<Value> {
    writes
        .iter()
        .map(|(key, value)| {
            let value = serde_json::from_slice(value)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(value).into_owned()));
            match split_composite_key(key) {
                Some((object_type, attributes)) => serde_json::json!({
                    "objectType": object_type,
                    "attributes": attributes,
                    "value": value,
                }),
                None => serde_json::json!({ "key": key, "value": value }),
            }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────
// Transaction and block reads
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    tx_id: String,
    block_number: i64,
    channel: String,
    chaincode: String,
    fcn: String,
    args: String,
    event_name: Option<String>,
    event_payload: Option<String>,
    write_set: String,
    created_at: i64,
}

/// A committed transaction as served by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub tx_id: String,
    pub block_number: i64,
    pub channel: String,
    pub chaincode: String,
    pub fcn: String,
    pub args: Vec<String>,
    pub event: Option<EventRecord>,
    pub write_set: Value,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub name: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub number: i64,
    pub channel: String,
    pub transactions: Vec<TransactionRecord>,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = GatewayError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let event = match row.event_name {
            Some(name) => {
                let payload = row.event_payload.unwrap_or_default();
                let payload = serde_json::from_str(&payload).unwrap_or(Value::String(payload));
                Some(EventRecord { name, payload })
            }
            None => None,
        };
        Ok(TransactionRecord {
            tx_id: row.tx_id,
            block_number: row.block_number,
            channel: row.channel,
            chaincode: row.chaincode,
            fcn: row.fcn,
            args: serde_json::from_str(&row.args)?,
            event,
            write_set: serde_json::from_str(&row.write_set)?,
            created_at: DateTime::from_timestamp_millis(row.created_at),
        })
    }
}

const SELECT_TRANSACTION: &str = r#"
    SELECT tx_id, block_number, channel, chaincode, fcn, args,
           event_name, event_payload, write_set, created_at
    FROM   transactions
"#;

/// Look up a committed transaction by id.
pub async fn get_transaction(pool: &SqlitePool, tx_id: &str) -> Result<Option<TransactionRecord>> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!("{SELECT_TRANSACTION} WHERE tx_id = ?1"))
        .bind(tx_id)
        .fetch_optional(pool)
        .await?;
    row.map(TransactionRecord::try_from).transpose()
}

/// Fetch a block with its transactions; `None` past the chain height.
pub async fn get_block(pool: &SqlitePool, number: i64) -> Result<Option<Block>> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "{SELECT_TRANSACTION} WHERE block_number = ?1 ORDER BY tx_id ASC"
    ))
    .bind(number)
    .fetch_all(pool)
    .await?;

    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let channel = first.channel.clone();
    let transactions = rows
        .into_iter()
        .map(TransactionRecord::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(Block {
        number,
        channel,
        transactions,
    }))
}

fn to_version(column: i64) -> Result<Version> {
    Version::try_from(column)
        .map_err(|_| GatewayError::Internal(format!("negative version {column} in database")))
}

fn to_column(version: Version) -> Result<i64> {
    i64::try_from(version)
        .map_err(|_| GatewayError::Internal(format!("block number {version} out of range")))
}
