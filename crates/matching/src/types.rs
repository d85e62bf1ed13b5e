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

use std::fmt;

use bookd_sdk::types::{OrderType, Side, TimeInForce};
use serde::{Deserialize, Serialize};

/// Traded symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
	pub id: u32,
	pub name: String,
}

impl Symbol {
	pub fn new(id: u32, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
		}
	}
}

impl fmt::Display for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Symbol(id={}, name={})", self.id, self.name)
	}
}

/// Order in the matching engine
///
/// Identity fields (id, symbol, type, side, time-in-force and the optional
/// display/slippage/trailing parameters) never change after construction.
/// Price, stop price and the quantity triple are mutated by matching and by
/// the modify family of operations.
///
/// Quantity invariant: `executed + leaves == quantity` for any order that
/// has not been through `modify`/`mitigate`/`replace` (those explicitly set
/// new totals while preserving the executed history).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	pub id: u64,
	pub symbol_id: u32,
	pub order_type: OrderType,
	pub side: Side,
	/// Limit price; zero for pure market orders
	pub price: u64,
	/// Activation price for the stop family; zero otherwise
	pub stop_price: u64,
	pub quantity: u64,
	pub executed: u64,
	pub leaves: u64,
	pub time_in_force: TimeInForce,
	/// Display cap: `Some(0)` hides the order, `Some(n)` makes it an iceberg
	pub max_visible: Option<u64>,
	/// Maximum price deviation from the entry reference for market orders
	pub slippage: Option<u64>,
	/// Distance kept behind the reference price by trailing stops
	pub trailing_distance: u64,
	/// Minimum favorable reference move before a trailing stop repegs
	pub trailing_step: u64,
}

impl Order {
	fn base(id: u64, symbol_id: u32, order_type: OrderType, side: Side, quantity: u64) -> Self {
		Self {
			id,
			symbol_id,
			order_type,
			side,
			price: 0,
			stop_price: 0,
			quantity,
			executed: 0,
			leaves: quantity,
			time_in_force: TimeInForce::Gtc,
			max_visible: None,
			slippage: None,
			trailing_distance: 0,
			trailing_step: 0,
		}
	}

	/// Market order; the remainder is always cancelled after matching
	pub fn market(id: u64, symbol_id: u32, side: Side, quantity: u64) -> Self {
		let mut order = Self::base(id, symbol_id, OrderType::Market, side, quantity);
		order.time_in_force = TimeInForce::Ioc;
		order
	}

	/// Market order bounded by a maximum slippage from the entry price
	pub fn market_with_slippage(
		id: u64,
		symbol_id: u32,
		side: Side,
		quantity: u64,
		slippage: u64,
	) -> Self {
		let mut order = Self::market(id, symbol_id, side, quantity);
		order.slippage = Some(slippage);
		order
	}

	pub fn limit(
		id: u64,
		symbol_id: u32,
		side: Side,
		price: u64,
		quantity: u64,
		time_in_force: TimeInForce,
	) -> Self {
		let mut order = Self::base(id, symbol_id, OrderType::Limit, side, quantity);
		order.price = price;
		order.time_in_force = time_in_force;
		order
	}

	pub fn stop(id: u64, symbol_id: u32, side: Side, stop_price: u64, quantity: u64) -> Self {
		let mut order = Self::base(id, symbol_id, OrderType::Stop, side, quantity);
		order.stop_price = stop_price;
		order
	}

	pub fn stop_limit(
		id: u64,
		symbol_id: u32,
		side: Side,
		stop_price: u64,
		price: u64,
		quantity: u64,
	) -> Self {
		let mut order = Self::base(id, symbol_id, OrderType::StopLimit, side, quantity);
		order.stop_price = stop_price;
		order.price = price;
		order
	}

	pub fn trailing_stop(
		id: u64,
		symbol_id: u32,
		side: Side,
		stop_price: u64,
		quantity: u64,
		trailing_distance: u64,
		trailing_step: u64,
	) -> Self {
		let mut order = Self::base(id, symbol_id, OrderType::TrailingStop, side, quantity);
		order.stop_price = stop_price;
		order.trailing_distance = trailing_distance;
		order.trailing_step = trailing_step;
		order
	}

	#[allow(clippy::too_many_arguments)]
	pub fn trailing_stop_limit(
		id: u64,
		symbol_id: u32,
		side: Side,
		stop_price: u64,
		price: u64,
		quantity: u64,
		trailing_distance: u64,
		trailing_step: u64,
	) -> Self {
		let mut order = Self::base(id, symbol_id, OrderType::TrailingStopLimit, side, quantity);
		order.stop_price = stop_price;
		order.price = price;
		order.trailing_distance = trailing_distance;
		order.trailing_step = trailing_step;
		order
	}

	/// Cap the displayed quantity (iceberg when positive, hidden when zero)
	pub fn with_max_visible(mut self, max_visible: u64) -> Self {
		self.max_visible = Some(max_visible);
		self
	}

	/// Quantity displayed to the book (zero for hidden orders)
	pub fn visible(&self) -> u64 {
		match self.max_visible {
			Some(cap) => self.leaves.min(cap),
			None => self.leaves,
		}
	}

	/// Quantity held back from display
	pub fn hidden(&self) -> u64 {
		self.leaves - self.visible()
	}

	pub fn is_hidden(&self) -> bool {
		self.max_visible == Some(0)
	}

	pub fn is_iceberg(&self) -> bool {
		matches!(self.max_visible, Some(cap) if cap > 0)
	}

	pub fn is_slippage(&self) -> bool {
		self.slippage.is_some()
	}

	pub fn is_market(&self) -> bool {
		self.order_type == OrderType::Market
	}

	pub fn is_limit(&self) -> bool {
		self.order_type == OrderType::Limit
	}

	pub fn is_trailing_stop(&self) -> bool {
		self.order_type == OrderType::TrailingStop
	}

	pub fn is_trailing_stop_limit(&self) -> bool {
		self.order_type == OrderType::TrailingStopLimit
	}

	/// True for every order that arms in a stop ladder before activation
	pub fn is_stop_family(&self) -> bool {
		matches!(
			self.order_type,
			OrderType::Stop
				| OrderType::StopLimit
				| OrderType::TrailingStop
				| OrderType::TrailingStopLimit
		)
	}
}

impl fmt::Display for Order {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"#{} {} {} {} {}@{}",
			self.id,
			self.time_in_force.as_str(),
			self.side.as_str(),
			self.order_type.as_str(),
			self.leaves,
			self.price,
		)?;
		if self.is_stop_family() {
			write!(f, " stop {}", self.stop_price)?;
		}
		write!(f, " (executed {})", self.executed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_market_orders_are_ioc() {
		let order = Order::market(1, 1, Side::Buy, 10);
		assert_eq!(order.time_in_force, TimeInForce::Ioc);
		assert_eq!(order.leaves, 10);
		assert!(order.is_market());
		assert!(!order.is_stop_family());
	}

	#[test]
	fn test_iceberg_visibility_split() {
		let order = Order::limit(1, 1, Side::Sell, 100, 50, TimeInForce::Gtc).with_max_visible(20);
		assert!(order.is_iceberg());
		assert!(!order.is_hidden());
		assert_eq!(order.visible(), 20);
		assert_eq!(order.hidden(), 30);
	}

	#[test]
	fn test_hidden_order_displays_nothing() {
		let order = Order::limit(1, 1, Side::Sell, 100, 50, TimeInForce::Gtc).with_max_visible(0);
		assert!(order.is_hidden());
		assert_eq!(order.visible(), 0);
		assert_eq!(order.hidden(), 50);
	}

	#[test]
	fn test_visible_shrinks_with_leaves() {
		let mut order =
			Order::limit(1, 1, Side::Sell, 100, 50, TimeInForce::Gtc).with_max_visible(20);
		order.executed = 45;
		order.leaves = 5;
		assert_eq!(order.visible(), 5);
		assert_eq!(order.hidden(), 0);
	}
}
