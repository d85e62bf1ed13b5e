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

//! Order book for one symbol
//!
//! The book owns six price-level ladders: the two limit sides plus one
//! stop and one trailing-stop ladder per side. Every ladder keeps its
//! closest-to-action level at the front: bids and sell-side stops order by
//! descending price, asks and buy-side stops by ascending price.
//!
//! The book also tracks the last trade price, which drives stop
//! activation, and one trailing anchor per trailing side, the reference
//! snapshot trailing stops were last repegged against.

mod level;
mod store;

pub use level::{Ladder, LevelType, PriceLevel};
pub use store::{OrderRecord, OrderStore};

use bookd_sdk::types::{OrderType, Side};
use serde::{Deserialize, Serialize};

use crate::types::Order;

/// Book group an order rests in, also the group label in book dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookGroup {
	Bids,
	Asks,
	BuyStop,
	SellStop,
	TrailingBuyStop,
	TrailingSellStop,
}

impl BookGroup {
	/// Dump order: limit sides first, then stops, then trailing stops
	pub const ALL: [BookGroup; 6] = [
		BookGroup::Bids,
		BookGroup::Asks,
		BookGroup::BuyStop,
		BookGroup::SellStop,
		BookGroup::TrailingBuyStop,
		BookGroup::TrailingSellStop,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			BookGroup::Bids => "BIDS",
			BookGroup::Asks => "ASKS",
			BookGroup::BuyStop => "BUY_STOP",
			BookGroup::SellStop => "SELL_STOP",
			BookGroup::TrailingBuyStop => "TRAILING_BUY_STOP",
			BookGroup::TrailingSellStop => "TRAILING_SELL_STOP",
		}
	}

	/// Display side of the group's levels
	pub fn level_type(self) -> LevelType {
		match self {
			BookGroup::Bids | BookGroup::BuyStop | BookGroup::TrailingBuyStop => LevelType::Bid,
			BookGroup::Asks | BookGroup::SellStop | BookGroup::TrailingSellStop => LevelType::Ask,
		}
	}

	/// Price ordering: true when the best level is the highest price
	fn descending(self) -> bool {
		match self {
			BookGroup::Bids | BookGroup::SellStop | BookGroup::TrailingSellStop => true,
			BookGroup::Asks | BookGroup::BuyStop | BookGroup::TrailingBuyStop => false,
		}
	}
}

/// Limit order book with stop and trailing-stop ladders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
	symbol_id: u32,
	bids: Ladder,
	asks: Ladder,
	buy_stop: Ladder,
	sell_stop: Ladder,
	trailing_buy_stop: Ladder,
	trailing_sell_stop: Ladder,
	last_trade_price: Option<u64>,
	/// Reference snapshot trailing buy stops were last repegged against
	pub(crate) trailing_ask_anchor: Option<u64>,
	/// Reference snapshot trailing sell stops were last repegged against
	pub(crate) trailing_bid_anchor: Option<u64>,
}

impl OrderBook {
	pub fn new(symbol_id: u32) -> Self {
		let ladder = |group: BookGroup| Ladder::new(group.level_type(), group.descending());
		Self {
			symbol_id,
			bids: ladder(BookGroup::Bids),
			asks: ladder(BookGroup::Asks),
			buy_stop: ladder(BookGroup::BuyStop),
			sell_stop: ladder(BookGroup::SellStop),
			trailing_buy_stop: ladder(BookGroup::TrailingBuyStop),
			trailing_sell_stop: ladder(BookGroup::TrailingSellStop),
			last_trade_price: None,
			trailing_ask_anchor: None,
			trailing_bid_anchor: None,
		}
	}

	pub fn symbol_id(&self) -> u32 {
		self.symbol_id
	}

	pub fn ladder(&self, group: BookGroup) -> &Ladder {
		match group {
			BookGroup::Bids => &self.bids,
			BookGroup::Asks => &self.asks,
			BookGroup::BuyStop => &self.buy_stop,
			BookGroup::SellStop => &self.sell_stop,
			BookGroup::TrailingBuyStop => &self.trailing_buy_stop,
			BookGroup::TrailingSellStop => &self.trailing_sell_stop,
		}
	}

	pub(crate) fn ladder_mut(&mut self, group: BookGroup) -> &mut Ladder {
		match group {
			BookGroup::Bids => &mut self.bids,
			BookGroup::Asks => &mut self.asks,
			BookGroup::BuyStop => &mut self.buy_stop,
			BookGroup::SellStop => &mut self.sell_stop,
			BookGroup::TrailingBuyStop => &mut self.trailing_buy_stop,
			BookGroup::TrailingSellStop => &mut self.trailing_sell_stop,
		}
	}

	pub fn best_bid(&self) -> Option<u64> {
		self.bids.best_price()
	}

	pub fn best_ask(&self) -> Option<u64> {
		self.asks.best_price()
	}

	pub fn last_trade_price(&self) -> Option<u64> {
		self.last_trade_price
	}

	pub(crate) fn set_last_trade_price(&mut self, price: u64) {
		self.last_trade_price = Some(price);
	}

	/// Total resting orders across all six ladders
	pub fn order_count(&self) -> usize {
		BookGroup::ALL
			.iter()
			.map(|group| self.ladder(*group).order_count())
			.sum()
	}

	/// Book group an order rests in, given its type and side
	pub fn group_for(order: &Order) -> BookGroup {
		match (order.order_type, order.side) {
			(OrderType::Stop | OrderType::StopLimit, Side::Buy) => BookGroup::BuyStop,
			(OrderType::Stop | OrderType::StopLimit, Side::Sell) => BookGroup::SellStop,
			(OrderType::TrailingStop | OrderType::TrailingStopLimit, Side::Buy) => {
				BookGroup::TrailingBuyStop
			}
			(OrderType::TrailingStop | OrderType::TrailingStopLimit, Side::Sell) => {
				BookGroup::TrailingSellStop
			}
			(_, Side::Buy) => BookGroup::Bids,
			(_, Side::Sell) => BookGroup::Asks,
		}
	}

	/// Ladder key an order rests at: stop price for armed stops, limit
	/// price otherwise
	pub fn resting_price(order: &Order) -> u64 {
		if order.is_stop_family() {
			order.stop_price
		} else {
			order.price
		}
	}
}

#[cfg(test)]
mod tests {
	use bookd_sdk::types::TimeInForce;

	use super::*;

	#[test]
	fn test_group_selection() {
		let limit = Order::limit(1, 1, Side::Buy, 100, 10, TimeInForce::Gtc);
		assert_eq!(OrderBook::group_for(&limit), BookGroup::Bids);

		let stop = Order::stop(2, 1, Side::Sell, 95, 10);
		assert_eq!(OrderBook::group_for(&stop), BookGroup::SellStop);

		let trailing = Order::trailing_stop(3, 1, Side::Buy, 105, 10, 5, 1);
		assert_eq!(OrderBook::group_for(&trailing), BookGroup::TrailingBuyStop);
	}

	#[test]
	fn test_resting_price_uses_stop_for_stop_family() {
		let stop_limit = Order::stop_limit(1, 1, Side::Buy, 105, 106, 10);
		assert_eq!(OrderBook::resting_price(&stop_limit), 105);

		let limit = Order::limit(2, 1, Side::Sell, 101, 10, TimeInForce::Gtc);
		assert_eq!(OrderBook::resting_price(&limit), 101);
	}

	#[test]
	fn test_stop_ladders_front_is_closest_to_trigger() {
		let mut book = OrderBook::new(1);
		// Buy stops trigger as the price rises: the lowest stop is closest
		book.ladder_mut(BookGroup::BuyStop).insert_order(105, 1, 10, 0);
		book.ladder_mut(BookGroup::BuyStop).insert_order(103, 2, 10, 0);
		assert_eq!(book.ladder(BookGroup::BuyStop).best_price(), Some(103));

		// Sell stops trigger as the price falls: the highest stop is closest
		book.ladder_mut(BookGroup::SellStop).insert_order(95, 3, 10, 0);
		book.ladder_mut(BookGroup::SellStop).insert_order(97, 4, 10, 0);
		assert_eq!(book.ladder(BookGroup::SellStop).best_price(), Some(97));
	}
}
