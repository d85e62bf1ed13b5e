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

//! Command dispatcher
//!
//! One command in, exactly one response out (or none, when persistence of
//! an add fails and the client is left to detect it by timeout). The
//! dispatcher owns the request context: the pre-allocated order id, the
//! info string, the response under construction and the set of orders
//! touched by executions. After the engine entry point returns, the
//! drained events are applied through the daemon handler and the touched
//! orders are flushed to the store in one batch transaction.

use bookd_sdk::frame::{self, RESPONSE_FRAME_BOOK, RESPONSE_FRAME_ORDER, RESPONSE_FRAME_SMALL};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
	command::{Command, CommandError},
	csv,
	engine::{EngineError, MatchingEngine},
	event,
	handler::{DaemonHandler, InfoMap},
	recovery::{RecoveryCoordinator, RecoveryError},
	storage::OrderStorage,
	types::{Order, Symbol},
};

/// Symbol id the single-symbol daemon trades
pub const DEFAULT_SYMBOL_ID: u32 = 1;

/// Error types for command dispatch
#[derive(Debug, Error)]
pub enum DispatchError {
	#[error(transparent)]
	Command(#[from] CommandError),
	#[error("no order with info {0:?}")]
	UnknownInfo(String),
	#[error(transparent)]
	Engine(#[from] EngineError),
}

/// Response text plus the frame size it travels in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
	pub text: String,
	pub frame_size: usize,
}

impl Response {
	pub fn small(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			frame_size: RESPONSE_FRAME_SMALL,
		}
	}

	pub fn ok() -> Self {
		Self::small("OK")
	}

	pub fn fail() -> Self {
		Self::small("FAIL")
	}

	pub fn order(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			frame_size: RESPONSE_FRAME_ORDER,
		}
	}

	pub fn book(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			frame_size: RESPONSE_FRAME_BOOK,
		}
	}
}

/// Per-request state threaded from the dispatcher into the handler
#[derive(Debug)]
pub struct RequestContext {
	/// Id pre-allocated for an add command (or the replacement id)
	pub next_order_id: u64,
	/// Info string of the order being added
	pub info: String,
	/// True for `delete order <info>`, which answers OK on deletion
	pub delete_command: bool,
	/// Orders touched by executions, in first-touch order
	pub changed: Vec<u64>,
	pub response: Response,
	/// Set when persisting an add fails; the client gets no response
	pub suppress_response: bool,
}

impl RequestContext {
	fn new() -> Self {
		Self {
			next_order_id: 0,
			info: String::new(),
			delete_command: false,
			changed: Vec::new(),
			response: Response::fail(),
			suppress_response: false,
		}
	}

	pub fn record_change(&mut self, order_id: u64) {
		if !self.changed.contains(&order_id) {
			self.changed.push(order_id);
		}
	}
}

/// The daemon: engine, durable store, info map and id counter
pub struct Daemon {
	engine: MatchingEngine,
	storage: Box<dyn OrderStorage>,
	infos: InfoMap,
	latest_order_id: u64,
}

impl Daemon {
	pub fn new(
		engine: MatchingEngine,
		storage: Box<dyn OrderStorage>,
		infos: InfoMap,
		latest_order_id: u64,
	) -> Self {
		Self {
			engine,
			storage,
			infos,
			latest_order_id,
		}
	}

	/// Recover the book from the store and enable matching.
	pub fn bootstrap(
		mut storage: Box<dyn OrderStorage>,
		symbol: Symbol,
	) -> Result<Self, RecoveryError> {
		let mut engine = MatchingEngine::new();
		let report = RecoveryCoordinator::new(storage.as_mut()).recover(&mut engine, symbol)?;
		engine.enable_matching();
		let crossed = engine.drain_events();
		if !crossed.is_empty() {
			warn!(
				"{} events produced while enabling matching after recovery",
				crossed.len()
			);
		}
		Ok(Self::new(
			engine,
			storage,
			report.infos,
			report.latest_order_id,
		))
	}

	pub fn engine(&self) -> &MatchingEngine {
		&self.engine
	}

	pub fn disable_matching(&mut self) {
		self.engine.disable_matching();
	}

	/// Execute one command and build its response.
	///
	/// Returns `None` only when the response is suppressed (failed add
	/// persistence).
	pub fn execute(&mut self, input: &str) -> Option<Response> {
		let mut ctx = RequestContext::new();
		let result = Command::parse(input)
			.map_err(DispatchError::from)
			.and_then(|command| self.dispatch(command, &mut ctx));

		// apply the request's events, even after an error (error paths
		// emit none; this keeps the drain unconditional)
		let events = self.engine.drain_events();
		{
			let mut handler = DaemonHandler::new(
				self.storage.as_mut(),
				&mut self.infos,
				&mut ctx,
				&mut self.latest_order_id,
			);
			event::deliver(&events, &mut handler);
		}

		// end-of-request sweep: one transaction for all executed orders
		// still resting in the book
		let batch: Vec<Order> = ctx
			.changed
			.iter()
			.filter_map(|id| self.engine.get_order(*id).cloned())
			.collect();
		if !batch.is_empty() {
			if let Err(storage_error) = self.storage.update_orders(&batch) {
				error!("failed to flush executed orders: {storage_error}");
			}
		}

		if let Err(dispatch_error) = result {
			warn!("command failed: {dispatch_error} ({input})");
			// failures travel in the frame size the command implies, so
			// clients reading by command type stay in sync
			return Some(Response {
				text: "FAIL".to_string(),
				frame_size: frame::response_frame_size(input),
			});
		}
		if ctx.suppress_response {
			return None;
		}
		Some(ctx.response)
	}

	fn dispatch(
		&mut self,
		command: Command,
		ctx: &mut RequestContext,
	) -> Result<(), DispatchError> {
		match command {
			Command::EnableMatching => {
				self.engine.enable_matching();
				info!("matching enabled");
				ctx.response = Response::ok();
			}
			Command::DisableMatching => {
				self.engine.disable_matching();
				info!("matching disabled");
				ctx.response = Response::ok();
			}
			Command::AddSymbol { id, name } => {
				self.engine.add_symbol(Symbol::new(id, name))?;
				ctx.response = Response::ok();
			}
			Command::DeleteSymbol { id } => {
				self.engine.delete_symbol(id)?;
				ctx.response = Response::ok();
			}
			Command::AddBook { id } => {
				self.engine.add_order_book(id)?;
				ctx.response = Response::ok();
			}
			Command::DeleteBook { id } => {
				self.engine.delete_order_book(id)?;
				ctx.response = Response::ok();
			}
			Command::GetBook { id } => {
				let book = self
					.engine
					.order_book(id)
					.ok_or(EngineError::UnknownOrderBook(id))?;
				ctx.response =
					Response::book(csv::book_csv(book, self.engine.orders(), &self.infos));
			}
			Command::GetOrder { id } => {
				let order = self.engine.get_order(id).ok_or(EngineError::UnknownOrder(id))?;
				let info = self.infos.get(id).unwrap_or("");
				ctx.response = Response::order(csv::order_csv(order, info));
			}
			Command::AddOrder(new_order) => {
				ctx.next_order_id = self.latest_order_id + 1;
				ctx.info = new_order.info.clone();
				let order = new_order.into_order(ctx.next_order_id, DEFAULT_SYMBOL_ID);
				// the response (the assigned id) is filled in when the
				// AddOrder event reaches the handler
				self.engine.add_order(order)?;
			}
			Command::ReduceOrder { id, quantity } => {
				self.engine.reduce_order(id, quantity)?;
				ctx.response = Response::ok();
			}
			Command::ModifyOrder { id, price, quantity } => {
				self.engine.modify_order(id, price, quantity)?;
				ctx.response = Response::ok();
			}
			Command::MitigateOrder { id, price, quantity } => {
				self.engine.mitigate_order(id, price, quantity)?;
				ctx.response = Response::ok();
			}
			Command::ReplaceOrder {
				id,
				new_id,
				price,
				quantity,
			} => {
				ctx.next_order_id = new_id;
				// the replacement inherits the original info string
				ctx.info = self.infos.get(id).unwrap_or("").to_string();
				self.engine.replace_order(id, new_id, price, quantity)?;
			}
			Command::DeleteOrder { info } => {
				let id = self
					.infos
					.find(&info)
					.ok_or_else(|| DispatchError::UnknownInfo(info.clone()))?;
				ctx.delete_command = true;
				self.engine.delete_order(id)?;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::MemoryOrderStorage;

	fn create_test_daemon() -> Daemon {
		let daemon = Daemon::bootstrap(
			Box::new(MemoryOrderStorage::new()),
			Symbol::new(DEFAULT_SYMBOL_ID, "TEST"),
		)
		.unwrap();
		assert!(daemon.engine().is_matching_enabled());
		daemon
	}

	fn text(response: Option<Response>) -> String {
		response.expect("response expected").text
	}

	#[test]
	fn test_add_returns_sequential_ids() {
		let mut daemon = create_test_daemon();
		assert_eq!(text(daemon.execute("add limit buy 100 10 A")), "1");
		assert_eq!(text(daemon.execute("add limit buy 99 5 B")), "2");
	}

	#[test]
	fn test_invalid_command_fails() {
		let mut daemon = create_test_daemon();
		assert_eq!(text(daemon.execute("frobnicate")), "FAIL");
		assert_eq!(text(daemon.execute("get order 99")), "FAIL");
	}

	#[test]
	fn test_get_order_returns_csv() {
		let mut daemon = create_test_daemon();
		daemon.execute("add limit buy 100 10 txn-1");
		let response = daemon.execute("get order 1").unwrap();
		assert_eq!(response.frame_size, RESPONSE_FRAME_ORDER);
		assert!(response.text.starts_with(csv::ORDER_HEADER));
		assert!(response.text.contains("1,1,LIMIT,BUY,100,"));
		assert!(response.text.contains("\"txn-1\""));
	}

	#[test]
	fn test_delete_by_info() {
		let mut daemon = create_test_daemon();
		daemon.execute("add limit buy 100 1 txn-ABC");
		assert_eq!(text(daemon.execute("delete order txn-ABC")), "OK");
		assert_eq!(text(daemon.execute("get order 1")), "FAIL");
		assert_eq!(text(daemon.execute("delete order txn-ABC")), "FAIL");
	}

	#[test]
	fn test_fok_rejection_answers_fail() {
		let mut daemon = create_test_daemon();
		daemon.execute("add limit sell 101 5 A");
		assert_eq!(text(daemon.execute("add fok limit buy 101 10 Y")), "FAIL");
		// nothing executed, the ask is untouched
		let book = daemon.engine().order_book(DEFAULT_SYMBOL_ID).unwrap();
		assert_eq!(book.best_ask(), Some(101));
		assert_eq!(daemon.engine().get_order(2), None);
	}

	#[test]
	fn test_replace_answers_new_id_and_inherits_info() {
		let mut daemon = create_test_daemon();
		daemon.execute("add limit buy 100 10 txn-old");
		assert_eq!(text(daemon.execute("replace order 1 5 101 7")), "5");
		let response = daemon.execute("get order 5").unwrap();
		assert!(response.text.contains("\"txn-old\""));
		assert_eq!(text(daemon.execute("delete order txn-old")), "OK");
	}

	#[test]
	fn test_persistence_failure_suppresses_response() {
		let mut storage = Box::new(MemoryOrderStorage::new());
		storage.fail_writes = true;
		let mut daemon = Daemon::new(
			{
				let mut engine = MatchingEngine::new();
				engine.add_symbol(Symbol::new(DEFAULT_SYMBOL_ID, "TEST")).unwrap();
				engine.add_order_book(DEFAULT_SYMBOL_ID).unwrap();
				engine.enable_matching();
				engine.drain_events();
				engine
			},
			storage,
			InfoMap::default(),
			0,
		);
		assert!(daemon.execute("add limit buy 100 10 A").is_none());
		// the in-memory mutation has still happened
		assert!(daemon.engine().get_order(1).is_some());
	}

	#[test]
	fn test_get_book_dump() {
		let mut daemon = create_test_daemon();
		daemon.execute("add limit buy 100 10 A");
		daemon.execute("add limit sell 105 4 B");
		daemon.execute("add stop buy 110 2 C");

		let response = daemon.execute("get book 1").unwrap();
		assert_eq!(response.frame_size, RESPONSE_FRAME_BOOK);
		let lines: Vec<&str> = response.text.lines().collect();
		assert!(lines[0].starts_with("Group,LevelType,LevelPrice,Id,"));
		assert!(lines.iter().any(|line| line.starts_with("BIDS,BID,100,1,")));
		assert!(lines.iter().any(|line| line.starts_with("ASKS,ASK,105,2,")));
		assert!(lines.iter().any(|line| line.starts_with("BUY_STOP,BID,110,3,")));
	}
}
