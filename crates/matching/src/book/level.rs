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

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

/// Side a price level displays as in book dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelType {
	Bid,
	Ask,
}

impl LevelType {
	pub fn as_str(self) -> &'static str {
		match self {
			LevelType::Bid => "BID",
			LevelType::Ask => "ASK",
		}
	}
}

/// Price level in the order book
///
/// A price level holds the ids of all orders resting at one price, in time
/// priority order (first-in-first-out), together with the aggregate visible
/// and hidden volume at that price. Order records themselves live in the
/// global order store; a level never exists with an empty FIFO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevel {
	level_type: LevelType,
	price: u64,
	/// Order ids at this price in time priority order
	orders: VecDeque<u64>,
	visible: u64,
	hidden: u64,
}

impl PriceLevel {
	fn new(level_type: LevelType, price: u64) -> Self {
		Self {
			level_type,
			price,
			orders: VecDeque::new(),
			visible: 0,
			hidden: 0,
		}
	}

	pub fn level_type(&self) -> LevelType {
		self.level_type
	}

	pub fn price(&self) -> u64 {
		self.price
	}

	pub fn visible(&self) -> u64 {
		self.visible
	}

	pub fn hidden(&self) -> u64 {
		self.hidden
	}

	pub fn total(&self) -> u64 {
		self.visible + self.hidden
	}

	pub fn order_count(&self) -> usize {
		self.orders.len()
	}

	pub fn is_empty(&self) -> bool {
		self.orders.is_empty()
	}

	/// Id of the first order in time priority
	pub fn front(&self) -> Option<u64> {
		self.orders.front().copied()
	}

	/// Order ids in time priority order
	pub fn orders(&self) -> impl Iterator<Item = u64> + '_ {
		self.orders.iter().copied()
	}

	fn push_back(&mut self, order_id: u64, visible: u64, hidden: u64) {
		self.orders.push_back(order_id);
		self.visible += visible;
		self.hidden += hidden;
	}

	fn remove(&mut self, order_id: u64, visible: u64, hidden: u64) -> bool {
		let Some(position) = self.orders.iter().position(|id| *id == order_id) else {
			return false;
		};
		self.orders.remove(position);
		self.visible = self.visible.saturating_sub(visible);
		self.hidden = self.hidden.saturating_sub(hidden);
		true
	}

	fn adjust(&mut self, old_visible: u64, old_hidden: u64, new_visible: u64, new_hidden: u64) {
		self.visible = self.visible.saturating_sub(old_visible) + new_visible;
		self.hidden = self.hidden.saturating_sub(old_hidden) + new_hidden;
	}
}

/// Ordered price-level index for one side of a book group
///
/// Levels are kept in a `BTreeMap` keyed by price; the `descending` flag
/// selects which end is the best (front) level. Bids and sell-side stops
/// take the highest price first, asks and buy-side stops the lowest, so the
/// level closest to crossing or triggering is always the front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ladder {
	levels: BTreeMap<u64, PriceLevel>,
	level_type: LevelType,
	descending: bool,
}

impl Ladder {
	pub fn new(level_type: LevelType, descending: bool) -> Self {
		Self {
			levels: BTreeMap::new(),
			level_type,
			descending,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.levels.is_empty()
	}

	pub fn level_count(&self) -> usize {
		self.levels.len()
	}

	pub fn order_count(&self) -> usize {
		self.levels.values().map(|level| level.order_count()).sum()
	}

	pub fn best(&self) -> Option<&PriceLevel> {
		if self.descending {
			self.levels.last_key_value().map(|(_, level)| level)
		} else {
			self.levels.first_key_value().map(|(_, level)| level)
		}
	}

	pub fn best_price(&self) -> Option<u64> {
		self.best().map(|level| level.price())
	}

	pub fn get(&self, price: u64) -> Option<&PriceLevel> {
		self.levels.get(&price)
	}

	/// Levels in priority order (best first)
	pub fn iter(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
		if self.descending {
			Box::new(self.levels.values().rev())
		} else {
			Box::new(self.levels.values())
		}
	}

	/// Append an order to the level at `price`, creating the level on first
	/// use. Returns true when a new level was created.
	pub fn insert_order(&mut self, price: u64, order_id: u64, visible: u64, hidden: u64) -> bool {
		let created = !self.levels.contains_key(&price);
		self.levels
			.entry(price)
			.or_insert_with(|| PriceLevel::new(self.level_type, price))
			.push_back(order_id, visible, hidden);
		created
	}

	/// Remove an order from the level at `price`. Returns
	/// `(order_found, level_removed)`; an emptied level is destroyed.
	pub fn remove_order(
		&mut self,
		price: u64,
		order_id: u64,
		visible: u64,
		hidden: u64,
	) -> (bool, bool) {
		let Some(level) = self.levels.get_mut(&price) else {
			return (false, false);
		};
		if !level.remove(order_id, visible, hidden) {
			return (false, false);
		}
		if level.is_empty() {
			self.levels.remove(&price);
			(true, true)
		} else {
			(true, false)
		}
	}

	/// Adjust a level's aggregate volume after an in-place order mutation.
	pub fn adjust_order(
		&mut self,
		price: u64,
		old_visible: u64,
		old_hidden: u64,
		new_visible: u64,
		new_hidden: u64,
	) {
		if let Some(level) = self.levels.get_mut(&price) {
			level.adjust(old_visible, old_hidden, new_visible, new_hidden);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_descending_ladder_best_is_highest() {
		let mut ladder = Ladder::new(LevelType::Bid, true);
		ladder.insert_order(100, 1, 10, 0);
		ladder.insert_order(102, 2, 5, 0);
		ladder.insert_order(99, 3, 7, 0);

		assert_eq!(ladder.best_price(), Some(102));
		let prices: Vec<u64> = ladder.iter().map(|level| level.price()).collect();
		assert_eq!(prices, vec![102, 100, 99]);
	}

	#[test]
	fn test_ascending_ladder_best_is_lowest() {
		let mut ladder = Ladder::new(LevelType::Ask, false);
		ladder.insert_order(100, 1, 10, 0);
		ladder.insert_order(102, 2, 5, 0);
		ladder.insert_order(99, 3, 7, 0);

		assert_eq!(ladder.best_price(), Some(99));
		let prices: Vec<u64> = ladder.iter().map(|level| level.price()).collect();
		assert_eq!(prices, vec![99, 100, 102]);
	}

	#[test]
	fn test_level_created_and_removed() {
		let mut ladder = Ladder::new(LevelType::Bid, true);
		assert!(ladder.insert_order(100, 1, 10, 0));
		assert!(!ladder.insert_order(100, 2, 5, 0));
		assert_eq!(ladder.level_count(), 1);
		assert_eq!(ladder.get(100).unwrap().total(), 15);

		assert_eq!(ladder.remove_order(100, 1, 10, 0), (true, false));
		assert_eq!(ladder.remove_order(100, 2, 5, 0), (true, true));
		assert!(ladder.is_empty());
	}

	#[test]
	fn test_remove_missing_order() {
		let mut ladder = Ladder::new(LevelType::Bid, true);
		ladder.insert_order(100, 1, 10, 0);
		assert_eq!(ladder.remove_order(100, 99, 10, 0), (false, false));
		assert_eq!(ladder.remove_order(101, 1, 10, 0), (false, false));
	}

	#[test]
	fn test_fifo_order_within_level() {
		let mut ladder = Ladder::new(LevelType::Ask, false);
		ladder.insert_order(100, 1, 10, 0);
		ladder.insert_order(100, 2, 10, 0);
		ladder.insert_order(100, 3, 10, 0);

		let level = ladder.get(100).unwrap();
		assert_eq!(level.front(), Some(1));
		let ids: Vec<u64> = level.orders().collect();
		assert_eq!(ids, vec![1, 2, 3]);
	}

	#[test]
	fn test_hidden_volume_aggregation() {
		let mut ladder = Ladder::new(LevelType::Ask, false);
		ladder.insert_order(100, 1, 20, 30);
		ladder.insert_order(100, 2, 10, 0);

		let level = ladder.get(100).unwrap();
		assert_eq!(level.visible(), 30);
		assert_eq!(level.hidden(), 30);
		assert_eq!(level.total(), 60);
	}

	#[test]
	fn test_adjust_order_volume() {
		let mut ladder = Ladder::new(LevelType::Ask, false);
		ladder.insert_order(100, 1, 20, 30);
		ladder.adjust_order(100, 20, 30, 20, 10);

		let level = ladder.get(100).unwrap();
		assert_eq!(level.visible(), 20);
		assert_eq!(level.hidden(), 10);
	}
}
