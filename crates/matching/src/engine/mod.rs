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

//! Matching engine
//!
//! The engine owns the symbol and book registries, the global order store
//! and the event ring. All entry points run synchronously on the caller's
//! thread; there is no internal locking and no concurrency. Every mutation
//! is reported through the event ring, which the caller drains after the
//! entry point returns.
//!
//! Matching is gated by a flag: while disabled, orders rest in the book but
//! no crossings execute and no stops activate.

mod matching;
mod stops;

use std::collections::HashMap;

use bookd_sdk::types::{OrderType, TimeInForce};
use thiserror::Error;
use tracing::debug;

use crate::{
	book::{OrderBook, OrderStore},
	event::{EventBuffer, MarketEvent},
	types::{Order, Symbol},
};

/// Error types for engine operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
	#[error("symbol {0} not found")]
	UnknownSymbol(u32),
	#[error("order book {0} not found")]
	UnknownOrderBook(u32),
	#[error("order {0} not found")]
	UnknownOrder(u64),
	#[error("symbol {0} already exists")]
	DuplicateSymbol(u32),
	#[error("order book {0} already exists")]
	DuplicateOrderBook(u32),
	#[error("order {0} already exists")]
	DuplicateOrderId(u64),
	#[error("symbol {0} still has an order book")]
	SymbolInUse(u32),
	#[error("order {0} rejected by time-in-force policy")]
	RejectedByTif(u64),
	#[error("invalid order: {0}")]
	InvalidOrder(&'static str),
}

/// Single-threaded matching engine over one or more order books
#[derive(Debug, Default)]
pub struct MatchingEngine {
	symbols: HashMap<u32, Symbol>,
	books: HashMap<u32, OrderBook>,
	orders: OrderStore,
	events: EventBuffer,
	matching: bool,
}

impl MatchingEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Take all events produced since the last drain, in emission order.
	pub fn drain_events(&mut self) -> Vec<MarketEvent> {
		self.events.drain()
	}

	pub fn is_matching_enabled(&self) -> bool {
		self.matching
	}

	/// Enable matching and cross any resting orders that now overlap.
	pub fn enable_matching(&mut self) {
		self.matching = true;
		let ids: Vec<u32> = self.books.keys().copied().collect();
		for symbol_id in ids {
			self.run_book(symbol_id);
		}
	}

	pub fn disable_matching(&mut self) {
		self.matching = false;
	}

	pub fn symbol(&self, symbol_id: u32) -> Option<&Symbol> {
		self.symbols.get(&symbol_id)
	}

	pub fn order_book(&self, symbol_id: u32) -> Option<&OrderBook> {
		self.books.get(&symbol_id)
	}

	pub fn get_order(&self, order_id: u64) -> Option<&Order> {
		self.orders.get(order_id).map(|record| &record.order)
	}

	/// Global store of resting orders (read-only)
	pub fn orders(&self) -> &OrderStore {
		&self.orders
	}

	pub fn add_symbol(&mut self, symbol: Symbol) -> Result<(), EngineError> {
		if self.symbols.contains_key(&symbol.id) {
			return Err(EngineError::DuplicateSymbol(symbol.id));
		}
		self.events.push(MarketEvent::AddSymbol {
			symbol: symbol.clone(),
		});
		self.symbols.insert(symbol.id, symbol);
		Ok(())
	}

	pub fn delete_symbol(&mut self, symbol_id: u32) -> Result<(), EngineError> {
		if !self.symbols.contains_key(&symbol_id) {
			return Err(EngineError::UnknownSymbol(symbol_id));
		}
		if self.books.contains_key(&symbol_id) {
			return Err(EngineError::SymbolInUse(symbol_id));
		}
		let symbol = self.symbols.remove(&symbol_id).expect("checked above");
		self.events.push(MarketEvent::DeleteSymbol { symbol });
		Ok(())
	}

	pub fn add_order_book(&mut self, symbol_id: u32) -> Result<(), EngineError> {
		if !self.symbols.contains_key(&symbol_id) {
			return Err(EngineError::UnknownSymbol(symbol_id));
		}
		if self.books.contains_key(&symbol_id) {
			return Err(EngineError::DuplicateOrderBook(symbol_id));
		}
		self.books.insert(symbol_id, OrderBook::new(symbol_id));
		self.events.push(MarketEvent::AddOrderBook { symbol_id });
		Ok(())
	}

	/// Delete a book together with every order resting in it.
	pub fn delete_order_book(&mut self, symbol_id: u32) -> Result<(), EngineError> {
		if !self.books.contains_key(&symbol_id) {
			return Err(EngineError::UnknownOrderBook(symbol_id));
		}
		let mut ids = self.orders.ids_for_symbol(symbol_id);
		ids.sort_unstable();
		for order_id in ids {
			if let Some(record) = self.orders.remove(order_id) {
				self.events.push(MarketEvent::DeleteOrder {
					order: record.order,
				});
			}
		}
		self.books.remove(&symbol_id);
		self.events.push(MarketEvent::DeleteOrderBook { symbol_id });
		Ok(())
	}

	/// Add an order and match it against the book.
	///
	/// The order enters the pipeline its type implies: market and limit
	/// orders match immediately, the stop family arms in a stop ladder
	/// unless the last trade price already triggers it.
	pub fn add_order(&mut self, order: Order) -> Result<(), EngineError> {
		Self::validate_order(&order)?;
		if self.orders.contains(order.id) {
			return Err(EngineError::DuplicateOrderId(order.id));
		}
		if !self.symbols.contains_key(&order.symbol_id) {
			return Err(EngineError::UnknownSymbol(order.symbol_id));
		}
		if !self.books.contains_key(&order.symbol_id) {
			return Err(EngineError::UnknownOrderBook(order.symbol_id));
		}

		let symbol_id = order.symbol_id;
		match order.order_type {
			OrderType::Market => self.add_market_order(order),
			OrderType::Limit => self.add_limit_order(order)?,
			_ => self.add_stop_order(order),
		}
		self.run_book(symbol_id);
		Ok(())
	}

	/// Decrement an order's quantity; reaching zero deletes it.
	pub fn reduce_order(&mut self, order_id: u64, quantity: u64) -> Result<(), EngineError> {
		if quantity == 0 {
			return Err(EngineError::InvalidOrder("reduce quantity must be positive"));
		}
		let Some(record) = self.orders.get_mut(order_id) else {
			return Err(EngineError::UnknownOrder(order_id));
		};
		let symbol_id = record.order.symbol_id;
		let group = record.group;
		let price = OrderBook::resting_price(&record.order);
		let old_visible = record.order.visible();
		let old_hidden = record.order.hidden();

		let reduce_by = quantity.min(record.order.leaves);
		record.order.quantity = record.order.quantity.saturating_sub(reduce_by);
		record.order.leaves -= reduce_by;
		let leaves = record.order.leaves;
		let new_visible = record.order.visible();
		let new_hidden = record.order.hidden();
		let order = record.order.clone();

		let book = self
			.books
			.get_mut(&symbol_id)
			.ok_or(EngineError::UnknownOrderBook(symbol_id))?;
		if leaves == 0 {
			self.orders.remove(order_id);
			matching::remove_from_ladder(
				book,
				&mut self.events,
				symbol_id,
				group,
				price,
				order_id,
				old_visible,
				old_hidden,
			);
			self.events.push(MarketEvent::DeleteOrder { order });
		} else {
			matching::adjust_in_ladder(
				book,
				&mut self.events,
				symbol_id,
				group,
				price,
				old_visible,
				old_hidden,
				new_visible,
				new_hidden,
			);
			self.events.push(MarketEvent::UpdateOrder { order });
		}
		self.run_book(symbol_id);
		Ok(())
	}

	/// Re-price and re-size an order; always loses time priority.
	///
	/// Equivalent to delete plus a fresh tail insert preserving the id: the
	/// executed history is kept, quantity and leaves are set to the new
	/// quantity. A zero quantity deletes the order.
	pub fn modify_order(
		&mut self,
		order_id: u64,
		new_price: u64,
		new_quantity: u64,
	) -> Result<(), EngineError> {
		let Some(record) = self.orders.get(order_id) else {
			return Err(EngineError::UnknownOrder(order_id));
		};
		let symbol_id = record.order.symbol_id;
		let book = self
			.books
			.get_mut(&symbol_id)
			.ok_or(EngineError::UnknownOrderBook(symbol_id))?;

		let mut order = matching::remove_resting(book, &mut self.orders, &mut self.events, order_id)
			.expect("record existence checked above");
		if order.is_stop_family() {
			order.stop_price = new_price;
		} else {
			order.price = new_price;
		}
		order.quantity = new_quantity;
		order.leaves = new_quantity;
		self.events.push(MarketEvent::UpdateOrder {
			order: order.clone(),
		});

		if new_quantity == 0 {
			self.events.push(MarketEvent::DeleteOrder { order });
		} else {
			matching::reenter_order(book, &mut self.orders, &mut self.events, self.matching, order);
		}
		self.run_book(symbol_id);
		Ok(())
	}

	/// Like modify, but preserves time priority when the price is unchanged
	/// and the quantity does not grow.
	pub fn mitigate_order(
		&mut self,
		order_id: u64,
		new_price: u64,
		new_quantity: u64,
	) -> Result<(), EngineError> {
		let Some(record) = self.orders.get(order_id) else {
			return Err(EngineError::UnknownOrder(order_id));
		};
		let current_price = OrderBook::resting_price(&record.order);
		if new_price == current_price && new_quantity <= record.order.quantity {
			let delta = record.order.quantity - new_quantity;
			if delta == 0 {
				return Ok(());
			}
			self.reduce_order(order_id, delta)
		} else {
			self.modify_order(order_id, new_price, new_quantity)
		}
	}

	/// Delete an order and enter a fresh one under a new id at the tail of
	/// its new price level.
	pub fn replace_order(
		&mut self,
		order_id: u64,
		new_id: u64,
		new_price: u64,
		new_quantity: u64,
	) -> Result<(), EngineError> {
		if new_id == 0 {
			return Err(EngineError::InvalidOrder("order id must be non-zero"));
		}
		if new_quantity == 0 {
			return Err(EngineError::InvalidOrder("order quantity must be positive"));
		}
		if new_id != order_id && self.orders.contains(new_id) {
			return Err(EngineError::DuplicateOrderId(new_id));
		}
		let Some(record) = self.orders.get(order_id) else {
			return Err(EngineError::UnknownOrder(order_id));
		};
		let symbol_id = record.order.symbol_id;
		let book = self
			.books
			.get_mut(&symbol_id)
			.ok_or(EngineError::UnknownOrderBook(symbol_id))?;

		let old = matching::remove_resting(book, &mut self.orders, &mut self.events, order_id)
			.expect("record existence checked above");
		self.events.push(MarketEvent::DeleteOrder { order: old.clone() });

		let mut order = old;
		order.id = new_id;
		if order.is_stop_family() {
			order.stop_price = new_price;
		} else {
			order.price = new_price;
		}
		order.quantity = new_quantity;
		order.leaves = new_quantity;
		order.executed = 0;
		self.events.push(MarketEvent::AddOrder {
			order: order.clone(),
		});
		matching::reenter_order(book, &mut self.orders, &mut self.events, self.matching, order);
		self.run_book(symbol_id);
		Ok(())
	}

	pub fn delete_order(&mut self, order_id: u64) -> Result<(), EngineError> {
		let Some(record) = self.orders.get(order_id) else {
			return Err(EngineError::UnknownOrder(order_id));
		};
		let symbol_id = record.order.symbol_id;
		let book = self
			.books
			.get_mut(&symbol_id)
			.ok_or(EngineError::UnknownOrderBook(symbol_id))?;
		let order = matching::remove_resting(book, &mut self.orders, &mut self.events, order_id)
			.expect("record existence checked above");
		self.events.push(MarketEvent::DeleteOrder { order });
		self.run_book(symbol_id);
		Ok(())
	}

	fn add_market_order(&mut self, mut order: Order) {
		let book = self
			.books
			.get_mut(&order.symbol_id)
			.expect("book existence checked by add_order");
		self.events.push(MarketEvent::AddOrder {
			order: order.clone(),
		});
		if self.matching {
			matching::match_order(book, &mut self.orders, &mut self.events, &mut order);
		}
		// market orders never rest
		self.events.push(MarketEvent::DeleteOrder { order });
	}

	fn add_limit_order(&mut self, mut order: Order) -> Result<(), EngineError> {
		let book = self
			.books
			.get_mut(&order.symbol_id)
			.expect("book existence checked by add_order");

		// FOK rejects up front, before any event is emitted
		if self.matching
			&& order.time_in_force == TimeInForce::Fok
			&& !matching::can_fill_quantity(
				book,
				&self.orders,
				order.side,
				Some(order.price),
				order.quantity,
			) {
			debug!("order {} rejected: fill-or-kill cannot fill fully", order.id);
			return Err(EngineError::RejectedByTif(order.id));
		}

		self.events.push(MarketEvent::AddOrder {
			order: order.clone(),
		});

		// All-or-none rests untouched until it can fill completely
		let aon_deferred = order.time_in_force == TimeInForce::Aon
			&& !matching::can_fill_quantity(
				book,
				&self.orders,
				order.side,
				Some(order.price),
				order.quantity,
			);
		if self.matching && !aon_deferred {
			matching::match_order(book, &mut self.orders, &mut self.events, &mut order);
		}

		if order.leaves == 0
			|| matches!(
				order.time_in_force,
				TimeInForce::Ioc | TimeInForce::Fok
			) {
			self.events.push(MarketEvent::DeleteOrder { order });
		} else {
			matching::insert_resting(book, &mut self.orders, &mut self.events, order);
		}
		Ok(())
	}

	fn add_stop_order(&mut self, order: Order) {
		let book = self
			.books
			.get_mut(&order.symbol_id)
			.expect("book existence checked by add_order");
		self.events.push(MarketEvent::AddOrder {
			order: order.clone(),
		});
		let triggered = self.matching
			&& stops::is_triggered(book.last_trade_price(), order.side, order.stop_price);
		if triggered {
			stops::activate(book, &mut self.orders, &mut self.events, order);
		} else {
			matching::insert_resting(book, &mut self.orders, &mut self.events, order);
		}
	}

	/// Settle a book after a mutation: repeg trailing stops, cross any
	/// overlapping resting orders, and activate triggered stops until a
	/// fixpoint is reached.
	fn run_book(&mut self, symbol_id: u32) {
		let Some(book) = self.books.get_mut(&symbol_id) else {
			return;
		};
		stops::update_trailing(book, &mut self.orders, &mut self.events);
		if !self.matching {
			return;
		}
		loop {
			matching::cross_resting(book, &mut self.orders, &mut self.events);
			stops::update_trailing(book, &mut self.orders, &mut self.events);
			if !stops::activate_triggered(book, &mut self.orders, &mut self.events) {
				break;
			}
		}
	}

	fn validate_order(order: &Order) -> Result<(), EngineError> {
		if order.id == 0 {
			return Err(EngineError::InvalidOrder("order id must be non-zero"));
		}
		if order.quantity == 0 || order.leaves == 0 {
			return Err(EngineError::InvalidOrder("order quantity must be positive"));
		}
		match order.order_type {
			OrderType::Limit | OrderType::StopLimit | OrderType::TrailingStopLimit
				if order.price == 0 =>
			{
				return Err(EngineError::InvalidOrder("limit price must be positive"));
			}
			_ => {}
		}
		if order.is_stop_family() && order.stop_price == 0 {
			return Err(EngineError::InvalidOrder("stop price must be positive"));
		}
		if (order.is_trailing_stop() || order.is_trailing_stop_limit())
			&& order.trailing_distance == 0
		{
			return Err(EngineError::InvalidOrder(
				"trailing distance must be positive",
			));
		}
		Ok(())
	}
}
