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

//! Daemon-side market handler
//!
//! Applies the events of one request to the durable store, maintains the
//! order-id/info mapping, advances the id counter, and fills in the
//! response the dispatcher sends back. Every event also produces a log
//! line, which is the daemon's activity journal.
//!
//! Persistence failures are logged and never unwind: on the add path the
//! response is suppressed so the client detects the failure by timeout or
//! a follow-up query (the in-memory mutation has already happened).

use std::collections::HashMap;

use tracing::{debug, error, info};

use crate::{
	dispatch::{RequestContext, Response},
	event::{LevelInfo, MarketHandler},
	storage::OrderStorage,
	types::{Order, Symbol},
};

/// Order-id to info-string mapping, alive for the lifetime of each order
///
/// Mutated only while applying `AddOrder` and `DeleteOrder` events, so it
/// stays in lock-step with the store rows.
#[derive(Debug, Clone, Default)]
pub struct InfoMap {
	infos: HashMap<u64, String>,
}

impl InfoMap {
	pub fn insert(&mut self, order_id: u64, info: String) {
		self.infos.insert(order_id, info);
	}

	pub fn remove(&mut self, order_id: u64) -> Option<String> {
		self.infos.remove(&order_id)
	}

	pub fn get(&self, order_id: u64) -> Option<&str> {
		self.infos.get(&order_id).map(String::as_str)
	}

	/// Lowest order id carrying this info string.
	///
	/// Identical infos can exist on several orders; the oldest wins so the
	/// lookup is deterministic.
	pub fn find(&self, info: &str) -> Option<u64> {
		self.infos
			.iter()
			.filter(|(_, value)| value.as_str() == info)
			.map(|(id, _)| *id)
			.min()
	}

	pub fn len(&self) -> usize {
		self.infos.len()
	}

	pub fn is_empty(&self) -> bool {
		self.infos.is_empty()
	}
}

/// Handler wired to the store and the current request context
pub struct DaemonHandler<'a> {
	storage: &'a mut dyn OrderStorage,
	infos: &'a mut InfoMap,
	ctx: &'a mut RequestContext,
	latest_order_id: &'a mut u64,
}

impl<'a> DaemonHandler<'a> {
	pub fn new(
		storage: &'a mut dyn OrderStorage,
		infos: &'a mut InfoMap,
		ctx: &'a mut RequestContext,
		latest_order_id: &'a mut u64,
	) -> Self {
		Self {
			storage,
			infos,
			ctx,
			latest_order_id,
		}
	}
}

impl MarketHandler for DaemonHandler<'_> {
	fn on_add_symbol(&mut self, symbol: &Symbol) {
		info!("add symbol: {symbol}");
	}

	fn on_delete_symbol(&mut self, symbol: &Symbol) {
		info!("delete symbol: {symbol}");
	}

	fn on_add_order_book(&mut self, symbol_id: u32) {
		info!("add order book: {symbol_id}");
	}

	fn on_update_order_book(&mut self, symbol_id: u32, top_changed: bool) {
		debug!(
			"update order book: {symbol_id}{}",
			if top_changed { " - top of the book" } else { "" }
		);
	}

	fn on_delete_order_book(&mut self, symbol_id: u32) {
		info!("delete order book: {symbol_id}");
	}

	fn on_add_level(&mut self, level: &LevelInfo, top_changed: bool) {
		debug!(
			"add level: {} {} @{} ({} visible, {} hidden){}",
			level.group.as_str(),
			level.level_type.as_str(),
			level.price,
			level.visible,
			level.hidden,
			if top_changed { " - top of the book" } else { "" }
		);
	}

	fn on_update_level(&mut self, level: &LevelInfo, top_changed: bool) {
		debug!(
			"update level: {} {} @{} ({} visible, {} hidden){}",
			level.group.as_str(),
			level.level_type.as_str(),
			level.price,
			level.visible,
			level.hidden,
			if top_changed { " - top of the book" } else { "" }
		);
	}

	fn on_delete_level(&mut self, level: &LevelInfo, top_changed: bool) {
		debug!(
			"delete level: {} {} @{}{}",
			level.group.as_str(),
			level.level_type.as_str(),
			level.price,
			if top_changed { " - top of the book" } else { "" }
		);
	}

	fn on_add_order(&mut self, order: &Order) {
		*self.latest_order_id = (*self.latest_order_id).max(order.id);
		info!("add order: {order}");

		if order.id != self.ctx.next_order_id {
			error!(
				"order id {} out of sync with request id {}",
				order.id, self.ctx.next_order_id
			);
			return;
		}

		let order_info = self.ctx.info.clone();
		match self.storage.insert_order(order, &order_info) {
			Ok(()) => {
				self.infos.insert(order.id, order_info);
				self.ctx.response = Response::small(order.id.to_string());
			}
			Err(error) => {
				error!("failed to persist order {}: {error}", order.id);
				self.ctx.suppress_response = true;
			}
		}
	}

	fn on_update_order(&mut self, order: &Order) {
		info!("update order: {order}");
		if let Err(error) = self.storage.update_order(order) {
			error!("failed to update order {}: {error}", order.id);
		}
	}

	fn on_delete_order(&mut self, order: &Order) {
		info!("delete order: {order}");
		if let Err(error) = self.storage.delete_order(order.id) {
			error!("failed to delete order {}: {error}", order.id);
		}
		self.infos.remove(order.id);

		if self.ctx.delete_command {
			self.ctx.response = Response::ok();
		}
	}

	fn on_execute_order(&mut self, order: &Order, price: u64, quantity: u64) {
		info!("execute order: {order} with price {price} and quantity {quantity}");
		self.ctx.record_change(order.id);
	}
}
