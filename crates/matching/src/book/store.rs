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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::BookGroup;
use crate::types::Order;

/// A resting order plus the book group it rests in
///
/// The group together with the order's resting price is enough to locate
/// the level entry, so deletion and modification are a map lookup plus one
/// ladder operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
	pub order: Order,
	pub group: BookGroup,
}

/// Global keyed lookup from order id to its record
///
/// This is the single authoritative owner of resting order state; levels
/// refer to entries here by id. Removing a record invalidates every level
/// reference to it, which the ladders make explicit by dropping the id from
/// their FIFOs in the same mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderStore {
	records: HashMap<u64, OrderRecord>,
}

impl OrderStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, order_id: u64) -> bool {
		self.records.contains_key(&order_id)
	}

	/// Insert a record; fails when the id is already present.
	pub fn insert(&mut self, record: OrderRecord) -> bool {
		if self.records.contains_key(&record.order.id) {
			return false;
		}
		self.records.insert(record.order.id, record);
		true
	}

	pub fn get(&self, order_id: u64) -> Option<&OrderRecord> {
		self.records.get(&order_id)
	}

	pub fn get_mut(&mut self, order_id: u64) -> Option<&mut OrderRecord> {
		self.records.get_mut(&order_id)
	}

	pub fn remove(&mut self, order_id: u64) -> Option<OrderRecord> {
		self.records.remove(&order_id)
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Ids of all resting orders for one symbol (unordered)
	pub fn ids_for_symbol(&self, symbol_id: u32) -> Vec<u64> {
		self.records
			.values()
			.filter(|record| record.order.symbol_id == symbol_id)
			.map(|record| record.order.id)
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use bookd_sdk::types::{Side, TimeInForce};

	use super::*;

	fn create_test_record(id: u64) -> OrderRecord {
		OrderRecord {
			order: Order::limit(id, 1, Side::Buy, 100, 10, TimeInForce::Gtc),
			group: BookGroup::Bids,
		}
	}

	#[test]
	fn test_insert_and_lookup() {
		let mut store = OrderStore::new();
		assert!(store.insert(create_test_record(1)));
		assert!(store.contains(1));
		assert_eq!(store.get(1).unwrap().order.price, 100);
	}

	#[test]
	fn test_duplicate_insert_fails() {
		let mut store = OrderStore::new();
		assert!(store.insert(create_test_record(1)));
		assert!(!store.insert(create_test_record(1)));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn test_remove_invalidates_lookup() {
		let mut store = OrderStore::new();
		store.insert(create_test_record(1));
		assert!(store.remove(1).is_some());
		assert!(!store.contains(1));
		assert!(store.remove(1).is_none());
	}
}
