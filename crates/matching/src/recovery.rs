// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Startup replay
//!
//! Recovery proceeds in three phases:
//!
//! 1. Load the latest assigned id to seed the id counter
//! 2. Register the symbol and its order book
//! 3. Replay every stored order through `add_order` with matching
//!    disabled, so orders rest with their persisted executed/leaves state
//!    and no crossings re-execute
//!
//! Replay events are drained and discarded: rebuilding the book must not
//! write back to the store the book is being rebuilt from.

use thiserror::Error;
use tracing::info;

use crate::{
	engine::{EngineError, MatchingEngine},
	handler::InfoMap,
	storage::{OrderStorage, StorageError},
	types::Symbol,
};

/// Error types for recovery operations
#[derive(Debug, Error)]
pub enum RecoveryError {
	#[error("storage error during recovery: {0}")]
	Storage(#[from] StorageError),
	#[error("engine error during recovery: {0}")]
	Engine(#[from] EngineError),
}

/// Outcome of a successful recovery
#[derive(Debug)]
pub struct RecoveryReport {
	/// Highest order id ever assigned; the next order gets `latest + 1`
	pub latest_order_id: u64,
	/// Orders restored into the book
	pub orders_restored: usize,
	/// Info strings keyed by order id, rebuilt from the rows
	pub infos: InfoMap,
}

/// Replay coordinator over an order store
pub struct RecoveryCoordinator<'a> {
	storage: &'a mut dyn OrderStorage,
}

impl<'a> RecoveryCoordinator<'a> {
	pub fn new(storage: &'a mut dyn OrderStorage) -> Self {
		Self { storage }
	}

	/// Rebuild engine state from the store.
	///
	/// The engine must be fresh and have matching disabled; the caller
	/// enables matching once recovery completes.
	pub fn recover(
		&mut self,
		engine: &mut MatchingEngine,
		symbol: Symbol,
	) -> Result<RecoveryReport, RecoveryError> {
		info!("starting recovery for {symbol}");

		let latest_order_id = self.storage.latest_id()?;
		let symbol_id = symbol.id;
		engine.add_symbol(symbol)?;
		engine.add_order_book(symbol_id)?;

		let rows = self.storage.load_orders()?;
		let mut infos = InfoMap::default();
		let mut orders_restored = 0usize;
		for (order, info) in rows {
			let order_id = order.id;
			engine.add_order(order)?;
			infos.insert(order_id, info);
			orders_restored += 1;
		}

		// replay side effects stay out of the store
		let discarded = engine.drain_events();
		info!(
			"recovery complete: latest id {}, {} orders restored, {} replay events discarded",
			latest_order_id,
			orders_restored,
			discarded.len()
		);

		Ok(RecoveryReport {
			latest_order_id,
			orders_restored,
			infos,
		})
	}
}
