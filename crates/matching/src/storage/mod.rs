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

//! Order storage - the durability layer
//!
//! Two logical tables: `orders` holds one row per live order, `latest` is
//! a one-row table with the highest id ever assigned. An order insert
//! commits both the new row and the latest-id bump in one transaction, so
//! the id counter can never run behind the rows it covers.
//!
//! This abstraction allows different backing stores:
//! - SQLite database file (production)
//! - In-memory map (testing)

mod memory;
mod sqlite;

pub use memory::MemoryOrderStorage;
pub use sqlite::SqliteOrderStorage;

use thiserror::Error;

use crate::types::Order;

/// Error types for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("failed to open order store: {0}")]
	Open(String),
	#[error("failed to write order state: {0}")]
	WriteFailed(String),
	#[error("failed to read order state: {0}")]
	ReadFailed(String),
}

/// Persistence contract for order state
///
/// All writes happen inside the request that produced them; `update_orders`
/// commits a whole batch in a single transaction and is used for the
/// per-request executed-order sweep.
pub trait OrderStorage {
	/// Highest order id ever assigned (zero on a fresh store)
	fn latest_id(&mut self) -> Result<u64, StorageError>;

	/// Atomically record a new order and advance the latest id
	fn insert_order(&mut self, order: &Order, info: &str) -> Result<(), StorageError>;

	/// Rewrite the mutable fields of one order's row
	fn update_order(&mut self, order: &Order) -> Result<(), StorageError>;

	/// Rewrite a batch of rows in one transaction
	fn update_orders(&mut self, orders: &[Order]) -> Result<(), StorageError>;

	/// Drop an order's row
	fn delete_order(&mut self, order_id: u64) -> Result<(), StorageError>;

	/// All live rows with their info strings, ordered by id
	fn load_orders(&mut self) -> Result<Vec<(Order, String)>, StorageError>;

	/// Number of live rows
	fn order_count(&mut self) -> Result<usize, StorageError>;
}
