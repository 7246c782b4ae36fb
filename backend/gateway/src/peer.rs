//! Single-node peer: simulates contract calls, validates them against the
//! committed state and commits each one as its own block.

use std::sync::RwLock;

use serde_json::Value;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::contract::Call;
use crate::db::{self, NewTransaction};
use crate::errors::{GatewayError, Result};
use crate::world_state::{SimulationResults, TxSimulator, Version, WorldState};

pub struct Peer {
    pool: SqlitePool,
    config: Config,
    world: RwLock<WorldState>,
    /// Current chain height; holding the lock serializes commits.
    height: Mutex<Version>,
}

impl Peer {
    /// Load the committed world state and chain height from the database.
    pub async fn open(pool: SqlitePool, config: Config) -> Result<Self> {
        let world = db::load_world_state(&pool).await?;
        let height = db::latest_block_number(&pool).await?;
        if world.is_empty() {
            info!("Starting from an empty ledger");
        } else {
            info!(keys = world.len(), height, "World state loaded");
        }
        Ok(Self {
            pool,
            config,
            world: RwLock::new(world),
            height: Mutex::new(height),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Submit a state-changing call and return its transaction id.
    pub async fn submit(&self, fcn: &str, args: &[String]) -> Result<String> {
        let call = Call::parse(fcn, args)?;
        if !call.is_submit() {
            return Err(GatewayError::BadRequest(format!("Function {fcn} not found")));
        }
        let (_, results) = self.simulate(&call)?;
        self.commit(results, fcn, args).await
    }

    /// Run a read-only call against the committed state.
    pub async fn evaluate(&self, fcn: &str, args: &[String]) -> Result<Value> {
        let call = Call::parse(fcn, args)?;
        if call.is_submit() {
            return Err(GatewayError::BadRequest(format!("Function {fcn} not found")));
        }
        let (output, _) = self.simulate(&call)?;
        Ok(output)
    }

    /// Execute `call` against a snapshot without touching committed state.
    pub(crate) fn simulate(&self, call: &Call) -> Result<(Value, SimulationResults)> {
        let tx_id = Uuid::new_v4().to_string();
        let world = self
            .world
            .read()
            .map_err(|_| GatewayError::Internal("world state lock poisoned".into()))?;
        let mut sim = TxSimulator::new(&world, tx_id);
        let output = call.execute(&mut sim)?;
        let results = sim.into_results();
        debug!(
            tx = %results.tx_id,
            fcn = call.name(),
            reads = results.rwset.reads.len(),
            writes = results.rwset.writes.len(),
            "Simulated"
        );
        Ok((output, results))
    }

    /// Validate and commit simulation results as the next block.
    pub(crate) async fn commit(
        &self,
        results: SimulationResults,
        fcn: &str,
        args: &[String],
    ) -> Result<String> {
        let mut height = self.height.lock().await;

        {
            let world = self
                .world
                .read()
                .map_err(|_| GatewayError::Internal("world state lock poisoned".into()))?;
            if let Err(e) = world.validate(&results.rwset) {
                warn!(tx = %results.tx_id, fcn, "Transaction invalidated: {e}");
                return Err(e);
            }
        }

        let block_number = *height + 1;
        db::commit_transaction(
            &self.pool,
            &NewTransaction {
                tx_id: &results.tx_id,
                block_number,
                channel: &self.config.channel_name,
                chaincode: &self.config.chaincode_name,
                fcn,
                args,
                event: results.event.as_ref(),
                writes: &results.rwset.writes,
            },
        )
        .await?;

        self.world
            .write()
            .map_err(|_| GatewayError::Internal("world state lock poisoned".into()))?
            .apply(&results.rwset.writes, block_number);
        *height = block_number;

        info!(
            tx = %results.tx_id,
            block = block_number,
            fcn,
            event = results.event.as_ref().map(|e| e.name.as_str()),
            "Transaction committed"
        );
        Ok(results.tx_id)
    }
}
