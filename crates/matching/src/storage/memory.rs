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

use std::collections::BTreeMap;

use super::{OrderStorage, StorageError};
use crate::types::Order;

/// In-memory order storage
///
/// Keeps rows in a `BTreeMap` for deterministic iteration. No durability;
/// suitable for tests and for exercising the engine without a database
/// file.
#[derive(Debug, Default)]
pub struct MemoryOrderStorage {
	rows: BTreeMap<u64, (Order, String)>,
	latest: u64,
	/// When set, every write fails; used to exercise persistence-failure
	/// handling in tests.
	pub fail_writes: bool,
}

impl MemoryOrderStorage {
	pub fn new() -> Self {
		Self::default()
	}

	fn check_writable(&self) -> Result<(), StorageError> {
		if self.fail_writes {
			Err(StorageError::WriteFailed("writes disabled".to_string()))
		} else {
			Ok(())
		}
	}
}

impl OrderStorage for MemoryOrderStorage {
	fn latest_id(&mut self) -> Result<u64, StorageError> {
		Ok(self.latest)
	}

	fn insert_order(&mut self, order: &Order, info: &str) -> Result<(), StorageError> {
		self.check_writable()?;
		self.latest = order.id;
		self.rows
			.insert(order.id, (order.clone(), info.to_string()));
		Ok(())
	}

	fn update_order(&mut self, order: &Order) -> Result<(), StorageError> {
		self.check_writable()?;
		if let Some((row, _)) = self.rows.get_mut(&order.id) {
			*row = order.clone();
		}
		Ok(())
	}

	fn update_orders(&mut self, orders: &[Order]) -> Result<(), StorageError> {
		self.check_writable()?;
		for order in orders {
			if let Some((row, _)) = self.rows.get_mut(&order.id) {
				*row = order.clone();
			}
		}
		Ok(())
	}

	fn delete_order(&mut self, order_id: u64) -> Result<(), StorageError> {
		self.check_writable()?;
		self.rows.remove(&order_id);
		Ok(())
	}

	fn load_orders(&mut self) -> Result<Vec<(Order, String)>, StorageError> {
		Ok(self.rows.values().cloned().collect())
	}

	fn order_count(&mut self) -> Result<usize, StorageError> {
		Ok(self.rows.len())
	}
}

#[cfg(test)]
mod tests {
	use bookd_sdk::types::{Side, TimeInForce};

	use super::*;

	#[test]
	fn test_rows_iterate_in_id_order() {
		let mut storage = MemoryOrderStorage::new();
		let second = Order::limit(2, 1, Side::Buy, 100, 10, TimeInForce::Gtc);
		let first = Order::limit(1, 1, Side::Buy, 100, 10, TimeInForce::Gtc);
		storage.insert_order(&second, "b").unwrap();
		storage.insert_order(&first, "a").unwrap();

		let ids: Vec<u64> = storage
			.load_orders()
			.unwrap()
			.iter()
			.map(|(order, _)| order.id)
			.collect();
		assert_eq!(ids, vec![1, 2]);
	}

	#[test]
	fn test_fail_writes_flag() {
		let mut storage = MemoryOrderStorage::new();
		storage.fail_writes = true;
		let order = Order::limit(1, 1, Side::Buy, 100, 10, TimeInForce::Gtc);
		assert!(storage.insert_order(&order, "a").is_err());
		assert_eq!(storage.order_count().unwrap(), 0);
	}
}
