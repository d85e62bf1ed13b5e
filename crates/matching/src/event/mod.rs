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

//! Market events and the handler contract
//!
//! Every mutation the engine performs is reported as a `MarketEvent`
//! carrying immutable snapshots. The engine never calls listeners while it
//! runs: events are pushed to an `EventBuffer` and drained by the caller
//! after the entry point returns, then mapped onto the `MarketHandler`
//! trait by [`deliver`]. Handlers therefore cannot re-enter the engine.
//!
//! Within one engine entry point the event order is deterministic: it
//! follows the matching loop, and an execution always reports the resting
//! order before the incoming one.

mod buffer;

pub use buffer::EventBuffer;

use serde::{Deserialize, Serialize};

use crate::{
	book::{BookGroup, LevelType},
	types::{Order, Symbol},
};

/// Immutable snapshot of a price level for level events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
	pub symbol_id: u32,
	pub group: BookGroup,
	pub level_type: LevelType,
	pub price: u64,
	pub visible: u64,
	pub hidden: u64,
	pub orders: usize,
}

/// Events produced by the matching engine
///
/// `top_changed` is true iff the best price of the mutated side changed as
/// a result of the mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
	AddSymbol { symbol: Symbol },
	DeleteSymbol { symbol: Symbol },
	AddOrderBook { symbol_id: u32 },
	UpdateOrderBook { symbol_id: u32, top_changed: bool },
	DeleteOrderBook { symbol_id: u32 },
	AddLevel { level: LevelInfo, top_changed: bool },
	UpdateLevel { level: LevelInfo, top_changed: bool },
	DeleteLevel { level: LevelInfo, top_changed: bool },
	AddOrder { order: Order },
	UpdateOrder { order: Order },
	DeleteOrder { order: Order },
	ExecuteOrder { order: Order, price: u64, quantity: u64 },
}

impl MarketEvent {
	/// Order id carried by this event, if any
	pub fn order_id(&self) -> Option<u64> {
		match self {
			MarketEvent::AddOrder { order }
			| MarketEvent::UpdateOrder { order }
			| MarketEvent::DeleteOrder { order }
			| MarketEvent::ExecuteOrder { order, .. } => Some(order.id),
			_ => None,
		}
	}
}

/// Listener for engine mutations
///
/// All methods default to no-ops so handlers implement only what they care
/// about. Handlers must not re-enter the engine; they run strictly after
/// the engine entry point that produced the events has returned.
pub trait MarketHandler {
	fn on_add_symbol(&mut self, _symbol: &Symbol) {}
	fn on_delete_symbol(&mut self, _symbol: &Symbol) {}
	fn on_add_order_book(&mut self, _symbol_id: u32) {}
	fn on_update_order_book(&mut self, _symbol_id: u32, _top_changed: bool) {}
	fn on_delete_order_book(&mut self, _symbol_id: u32) {}
	fn on_add_level(&mut self, _level: &LevelInfo, _top_changed: bool) {}
	fn on_update_level(&mut self, _level: &LevelInfo, _top_changed: bool) {}
	fn on_delete_level(&mut self, _level: &LevelInfo, _top_changed: bool) {}
	fn on_add_order(&mut self, _order: &Order) {}
	fn on_update_order(&mut self, _order: &Order) {}
	fn on_delete_order(&mut self, _order: &Order) {}
	fn on_execute_order(&mut self, _order: &Order, _price: u64, _quantity: u64) {}
}

/// Map drained events onto a handler, preserving order.
pub fn deliver(events: &[MarketEvent], handler: &mut dyn MarketHandler) {
	for event in events {
		match event {
			MarketEvent::AddSymbol { symbol } => handler.on_add_symbol(symbol),
			MarketEvent::DeleteSymbol { symbol } => handler.on_delete_symbol(symbol),
			MarketEvent::AddOrderBook { symbol_id } => handler.on_add_order_book(*symbol_id),
			MarketEvent::UpdateOrderBook {
				symbol_id,
				top_changed,
			} => handler.on_update_order_book(*symbol_id, *top_changed),
			MarketEvent::DeleteOrderBook { symbol_id } => handler.on_delete_order_book(*symbol_id),
			MarketEvent::AddLevel { level, top_changed } => {
				handler.on_add_level(level, *top_changed)
			}
			MarketEvent::UpdateLevel { level, top_changed } => {
				handler.on_update_level(level, *top_changed)
			}
			MarketEvent::DeleteLevel { level, top_changed } => {
				handler.on_delete_level(level, *top_changed)
			}
			MarketEvent::AddOrder { order } => handler.on_add_order(order),
			MarketEvent::UpdateOrder { order } => handler.on_update_order(order),
			MarketEvent::DeleteOrder { order } => handler.on_delete_order(order),
			MarketEvent::ExecuteOrder {
				order,
				price,
				quantity,
			} => handler.on_execute_order(order, *price, *quantity),
		}
	}
}

#[cfg(test)]
mod tests {
	use bookd_sdk::types::{Side, TimeInForce};

	use super::*;

	#[derive(Default)]
	struct CountingHandler {
		adds: usize,
		executions: Vec<(u64, u64, u64)>,
	}

	impl MarketHandler for CountingHandler {
		fn on_add_order(&mut self, _order: &Order) {
			self.adds += 1;
		}

		fn on_execute_order(&mut self, order: &Order, price: u64, quantity: u64) {
			self.executions.push((order.id, price, quantity));
		}
	}

	#[test]
	fn test_deliver_preserves_order() {
		let order = Order::limit(1, 1, Side::Buy, 100, 10, TimeInForce::Gtc);
		let events = vec![
			MarketEvent::AddOrder {
				order: order.clone(),
			},
			MarketEvent::ExecuteOrder {
				order: order.clone(),
				price: 100,
				quantity: 4,
			},
			MarketEvent::ExecuteOrder {
				order,
				price: 100,
				quantity: 6,
			},
		];

		let mut handler = CountingHandler::default();
		deliver(&events, &mut handler);

		assert_eq!(handler.adds, 1);
		assert_eq!(handler.executions, vec![(1, 100, 4), (1, 100, 6)]);
	}
}
