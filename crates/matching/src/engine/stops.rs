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

//! Stop activation and trailing-stop repegging
//!
//! Stops arm in their own ladders and trigger on the last trade price:
//! buy stops when it rises to the stop price, sell stops when it falls to
//! it. Activation migrates the order to the limit side of the book: a
//! plain or trailing stop becomes a market order, a stop-limit variant
//! becomes a limit order, keeping its id and remaining quantity.
//!
//! Trailing stops repeg against a per-side reference (best ask for buy
//! trailing, best bid for sell trailing, last trade as fallback). A
//! favorable reference move of at least the order's trailing step moves
//! the stop to `reference -/+ trailing_distance`; adverse moves never
//! touch it. The book keeps one anchor per trailing side: the reference
//! snapshot of the last repeg.

use bookd_sdk::types::{OrderType, Side, TimeInForce};
use tracing::debug;

use super::matching;
use crate::{
	book::{BookGroup, OrderBook, OrderStore},
	event::{EventBuffer, MarketEvent},
	types::Order,
};

/// Trigger test against the last trade price.
pub(super) fn is_triggered(last_trade: Option<u64>, side: Side, stop_price: u64) -> bool {
	match last_trade {
		Some(price) => match side {
			Side::Buy => price >= stop_price,
			Side::Sell => price <= stop_price,
		},
		None => false,
	}
}

/// Convert an activated stop order and inject it into the matching loop.
///
/// The order has already left its stop ladder (or never rested, when the
/// trigger condition held at entry). The type migration is reported as an
/// order update before any execution.
pub(super) fn activate(
	book: &mut OrderBook,
	store: &mut OrderStore,
	events: &mut EventBuffer,
	mut order: Order,
) {
	debug!("activating stop order {order}");
	match order.order_type {
		OrderType::Stop | OrderType::TrailingStop => {
			order.order_type = OrderType::Market;
			events.push(MarketEvent::UpdateOrder {
				order: order.clone(),
			});
			matching::match_order(book, store, events, &mut order);
			// activated stops behave as market orders: the remainder dies
			events.push(MarketEvent::DeleteOrder { order });
		}
		OrderType::StopLimit | OrderType::TrailingStopLimit => {
			order.order_type = OrderType::Limit;
			events.push(MarketEvent::UpdateOrder {
				order: order.clone(),
			});
			matching::match_order(book, store, events, &mut order);
			if order.leaves == 0
				|| matches!(order.time_in_force, TimeInForce::Ioc | TimeInForce::Fok)
			{
				events.push(MarketEvent::DeleteOrder { order });
			} else {
				matching::insert_resting(book, store, events, order);
			}
		}
		_ => {}
	}
}

/// Activate every stop the last trade price has reached.
///
/// Returns true when at least one order activated; the caller loops to a
/// fixpoint because activation executions move the last trade price.
pub(super) fn activate_triggered(
	book: &mut OrderBook,
	store: &mut OrderStore,
	events: &mut EventBuffer,
) -> bool {
	let Some(last_trade) = book.last_trade_price() else {
		return false;
	};

	let mut triggered: Vec<u64> = Vec::new();
	for group in [BookGroup::BuyStop, BookGroup::TrailingBuyStop] {
		for level in book.ladder(group).iter() {
			if level.price() > last_trade {
				break;
			}
			triggered.extend(level.orders());
		}
	}
	for group in [BookGroup::SellStop, BookGroup::TrailingSellStop] {
		for level in book.ladder(group).iter() {
			if level.price() < last_trade {
				break;
			}
			triggered.extend(level.orders());
		}
	}
	if triggered.is_empty() {
		return false;
	}

	for order_id in triggered {
		let Some(order) = matching::remove_resting(book, store, events, order_id) else {
			continue;
		};
		activate(book, store, events, order);
	}
	true
}

/// Repeg trailing stops after a reference move.
pub(super) fn update_trailing(
	book: &mut OrderBook,
	store: &mut OrderStore,
	events: &mut EventBuffer,
) {
	// trailing sell stops follow the bid upward
	if let Some(reference) = book.best_bid().or(book.last_trade_price()) {
		match book.trailing_bid_anchor {
			None => book.trailing_bid_anchor = Some(reference),
			Some(anchor) if reference > anchor => {
				let moved = reference - anchor;
				if repeg_side(
					book,
					store,
					events,
					BookGroup::TrailingSellStop,
					moved,
					reference,
					Side::Sell,
				) {
					book.trailing_bid_anchor = Some(reference);
				}
			}
			Some(_) => {}
		}
	}

	// trailing buy stops follow the ask downward
	if let Some(reference) = book.best_ask().or(book.last_trade_price()) {
		match book.trailing_ask_anchor {
			None => book.trailing_ask_anchor = Some(reference),
			Some(anchor) if reference < anchor => {
				let moved = anchor - reference;
				if repeg_side(
					book,
					store,
					events,
					BookGroup::TrailingBuyStop,
					moved,
					reference,
					Side::Buy,
				) {
					book.trailing_ask_anchor = Some(reference);
				}
			}
			Some(_) => {}
		}
	}
}

/// Repeg every order on one trailing side whose step the move satisfies.
///
/// Returns true when the anchor should advance to the new reference.
fn repeg_side(
	book: &mut OrderBook,
	store: &mut OrderStore,
	events: &mut EventBuffer,
	group: BookGroup,
	moved: u64,
	reference: u64,
	side: Side,
) -> bool {
	let candidates: Vec<u64> = book
		.ladder(group)
		.iter()
		.flat_map(|level| level.orders())
		.collect();

	let mut repegged = false;
	for order_id in candidates {
		let Some(record) = store.get(order_id) else {
			continue;
		};
		if record.order.trailing_step > moved {
			continue;
		}
		let new_stop = match side {
			Side::Sell => reference.saturating_sub(record.order.trailing_distance),
			Side::Buy => reference.saturating_add(record.order.trailing_distance),
		};
		if new_stop == record.order.stop_price {
			repegged = true;
			continue;
		}

		let Some(mut order) = matching::remove_resting(book, store, events, order_id) else {
			continue;
		};
		debug!(
			"repegging trailing stop {} from {} to {}",
			order.id, order.stop_price, new_stop
		);
		order.stop_price = new_stop;
		events.push(MarketEvent::UpdateOrder {
			order: order.clone(),
		});
		matching::insert_resting(book, store, events, order);
		repegged = true;
	}
	repegged
}
