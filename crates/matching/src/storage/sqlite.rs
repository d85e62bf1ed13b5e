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

use std::path::Path;

use bookd_sdk::types::{OrderType, Side, TimeInForce};
use rusqlite::{Connection, params};

use super::{OrderStorage, StorageError};
use crate::types::Order;

const CREATE_TABLE_ORDERS: &str = "CREATE TABLE IF NOT EXISTS orders (
	Id INT PRIMARY KEY NOT NULL,
	SymbolId TINYINT NOT NULL,
	Type TINYINT NOT NULL,
	Side TINYINT NOT NULL,
	Price INT NOT NULL,
	StopPrice INT NOT NULL,
	Quantity INT NOT NULL,
	TimeInForce TINYINT NOT NULL,
	MaxVisibleQuantity INT,
	Slippage INT,
	TrailingDistance INT,
	TrailingStep INT,
	ExecutedQuantity INT NOT NULL,
	LeavesQuantity INT NOT NULL,
	Info CHAR(300) NOT NULL
)";

const CREATE_TABLE_LATEST: &str = "CREATE TABLE IF NOT EXISTS latest (Id INT NOT NULL)";

const SEED_LATEST: &str =
	"INSERT INTO latest (Id) SELECT 0 WHERE NOT EXISTS (SELECT * FROM latest)";

const UPDATE_ORDER: &str = "UPDATE orders SET
	Type=?2, Side=?3, Price=?4, StopPrice=?5, Quantity=?6, TimeInForce=?7,
	MaxVisibleQuantity=?8, Slippage=?9, TrailingDistance=?10, TrailingStep=?11,
	ExecutedQuantity=?12, LeavesQuantity=?13
	WHERE Id=?1";

/// Order storage backed by a local SQLite database file
pub struct SqliteOrderStorage {
	conn: Connection,
}

impl SqliteOrderStorage {
	/// Open (or create) the database file and ensure the schema exists.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
		let conn = Connection::open(path).map_err(|e| StorageError::Open(e.to_string()))?;
		Self::with_connection(conn)
	}

	/// In-memory database, used by tests.
	pub fn open_in_memory() -> Result<Self, StorageError> {
		let conn = Connection::open_in_memory().map_err(|e| StorageError::Open(e.to_string()))?;
		Self::with_connection(conn)
	}

	fn with_connection(conn: Connection) -> Result<Self, StorageError> {
		conn.execute_batch(&format!(
			"{CREATE_TABLE_LATEST}; {SEED_LATEST}; {CREATE_TABLE_ORDERS};"
		))
		.map_err(|e| StorageError::Open(e.to_string()))?;
		Ok(Self { conn })
	}

	fn order_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Order, String)> {
		let type_index: u8 = row.get(2)?;
		let side_index: u8 = row.get(3)?;
		let tif_index: u8 = row.get(7)?;
		let order = Order {
			id: row.get(0)?,
			symbol_id: row.get(1)?,
			order_type: OrderType::from_index(type_index).ok_or(
				rusqlite::Error::IntegralValueOutOfRange(2, type_index as i64),
			)?,
			side: Side::from_index(side_index).ok_or(rusqlite::Error::IntegralValueOutOfRange(
				3,
				side_index as i64,
			))?,
			price: row.get(4)?,
			stop_price: row.get(5)?,
			quantity: row.get(6)?,
			time_in_force: TimeInForce::from_index(tif_index).ok_or(
				rusqlite::Error::IntegralValueOutOfRange(7, tif_index as i64),
			)?,
			max_visible: row.get(8)?,
			slippage: row.get(9)?,
			trailing_distance: row.get::<_, Option<u64>>(10)?.unwrap_or(0),
			trailing_step: row.get::<_, Option<u64>>(11)?.unwrap_or(0),
			executed: row.get(12)?,
			leaves: row.get(13)?,
		};
		let info: String = row.get(14)?;
		Ok((order, info))
	}
}

impl OrderStorage for SqliteOrderStorage {
	fn latest_id(&mut self) -> Result<u64, StorageError> {
		self.conn
			.query_row("SELECT Id FROM latest", [], |row| row.get(0))
			.map_err(|e| StorageError::ReadFailed(e.to_string()))
	}

	fn insert_order(&mut self, order: &Order, info: &str) -> Result<(), StorageError> {
		let tx = self
			.conn
			.transaction()
			.map_err(|e| StorageError::WriteFailed(e.to_string()))?;
		tx.execute("UPDATE latest SET Id=?1", params![order.id])
			.map_err(|e| StorageError::WriteFailed(e.to_string()))?;
		tx.execute(
			"INSERT INTO orders (Id, SymbolId, Type, Side, Price, StopPrice, Quantity,
				TimeInForce, MaxVisibleQuantity, Slippage, TrailingDistance, TrailingStep,
				ExecutedQuantity, LeavesQuantity, Info)
				VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
			params![
				order.id,
				order.symbol_id,
				order.order_type.index(),
				order.side.index(),
				order.price,
				order.stop_price,
				order.quantity,
				order.time_in_force.index(),
				order.max_visible,
				order.slippage,
				order.trailing_distance,
				order.trailing_step,
				order.executed,
				order.leaves,
				info,
			],
		)
		.map_err(|e| StorageError::WriteFailed(e.to_string()))?;
		tx.commit()
			.map_err(|e| StorageError::WriteFailed(e.to_string()))
	}

	fn update_order(&mut self, order: &Order) -> Result<(), StorageError> {
		self.conn
			.execute(
				UPDATE_ORDER,
				params![
					order.id,
					order.order_type.index(),
					order.side.index(),
					order.price,
					order.stop_price,
					order.quantity,
					order.time_in_force.index(),
					order.max_visible,
					order.slippage,
					order.trailing_distance,
					order.trailing_step,
					order.executed,
					order.leaves,
				],
			)
			.map(|_| ())
			.map_err(|e| StorageError::WriteFailed(e.to_string()))
	}

	fn update_orders(&mut self, orders: &[Order]) -> Result<(), StorageError> {
		if orders.is_empty() {
			return Ok(());
		}
		let tx = self
			.conn
			.transaction()
			.map_err(|e| StorageError::WriteFailed(e.to_string()))?;
		for order in orders {
			tx.execute(
				UPDATE_ORDER,
				params![
					order.id,
					order.order_type.index(),
					order.side.index(),
					order.price,
					order.stop_price,
					order.quantity,
					order.time_in_force.index(),
					order.max_visible,
					order.slippage,
					order.trailing_distance,
					order.trailing_step,
					order.executed,
					order.leaves,
				],
			)
			.map_err(|e| StorageError::WriteFailed(e.to_string()))?;
		}
		tx.commit()
			.map_err(|e| StorageError::WriteFailed(e.to_string()))
	}

	fn delete_order(&mut self, order_id: u64) -> Result<(), StorageError> {
		self.conn
			.execute("DELETE FROM orders WHERE Id=?1", params![order_id])
			.map(|_| ())
			.map_err(|e| StorageError::WriteFailed(e.to_string()))
	}

	fn load_orders(&mut self) -> Result<Vec<(Order, String)>, StorageError> {
		let mut stmt = self
			.conn
			.prepare("SELECT * FROM orders ORDER BY Id")
			.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
		let rows = stmt
			.query_map([], Self::order_from_row)
			.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
		rows.collect::<rusqlite::Result<Vec<_>>>()
			.map_err(|e| StorageError::ReadFailed(e.to_string()))
	}

	fn order_count(&mut self) -> Result<usize, StorageError> {
		self.conn
			.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
			.map_err(|e| StorageError::ReadFailed(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn create_test_order(id: u64, executed: u64) -> Order {
		let mut order = Order::limit(id, 1, Side::Buy, 100, 10, TimeInForce::Gtc);
		order.executed = executed;
		order.leaves = order.quantity - executed;
		order
	}

	#[test]
	fn test_fresh_store_latest_is_zero() {
		let mut storage = SqliteOrderStorage::open_in_memory().unwrap();
		assert_eq!(storage.latest_id().unwrap(), 0);
		assert_eq!(storage.order_count().unwrap(), 0);
	}

	#[test]
	fn test_insert_bumps_latest_atomically() {
		let mut storage = SqliteOrderStorage::open_in_memory().unwrap();
		storage
			.insert_order(&create_test_order(7, 0), "txn-7")
			.unwrap();
		assert_eq!(storage.latest_id().unwrap(), 7);

		let rows = storage.load_orders().unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].0.id, 7);
		assert_eq!(rows[0].1, "txn-7");
	}

	#[test]
	fn test_update_rewrites_mutable_fields() {
		let mut storage = SqliteOrderStorage::open_in_memory().unwrap();
		storage
			.insert_order(&create_test_order(1, 0), "a")
			.unwrap();

		let updated = create_test_order(1, 4);
		storage.update_order(&updated).unwrap();

		let rows = storage.load_orders().unwrap();
		assert_eq!(rows[0].0.executed, 4);
		assert_eq!(rows[0].0.leaves, 6);
	}

	#[test]
	fn test_batch_update_commits_all_rows() {
		let mut storage = SqliteOrderStorage::open_in_memory().unwrap();
		storage.insert_order(&create_test_order(1, 0), "a").unwrap();
		storage.insert_order(&create_test_order(2, 0), "b").unwrap();

		let batch = vec![create_test_order(1, 3), create_test_order(2, 5)];
		storage.update_orders(&batch).unwrap();

		let rows = storage.load_orders().unwrap();
		assert_eq!(rows[0].0.executed, 3);
		assert_eq!(rows[1].0.executed, 5);
	}

	#[test]
	fn test_delete_removes_row() {
		let mut storage = SqliteOrderStorage::open_in_memory().unwrap();
		storage.insert_order(&create_test_order(1, 0), "a").unwrap();
		storage.delete_order(1).unwrap();
		assert_eq!(storage.order_count().unwrap(), 0);
		// latest keeps the high-water mark
		assert_eq!(storage.latest_id().unwrap(), 1);
	}

	#[test]
	fn test_optional_fields_round_trip() {
		let mut storage = SqliteOrderStorage::open_in_memory().unwrap();
		let iceberg =
			Order::limit(1, 1, Side::Sell, 100, 50, TimeInForce::Gtc).with_max_visible(10);
		let trailing = Order::trailing_stop(2, 1, Side::Sell, 90, 10, 100, 10);
		let slippage = Order::market_with_slippage(3, 1, Side::Buy, 5, 2);
		storage.insert_order(&iceberg, "i").unwrap();
		storage.insert_order(&trailing, "t").unwrap();
		storage.insert_order(&slippage, "s").unwrap();

		let rows = storage.load_orders().unwrap();
		assert_eq!(rows[0].0.max_visible, Some(10));
		assert_eq!(rows[1].0.trailing_distance, 100);
		assert_eq!(rows[1].0.trailing_step, 10);
		assert_eq!(rows[2].0.slippage, Some(2));
	}
}
