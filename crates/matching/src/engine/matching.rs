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

//! Core matching loop and book plumbing
//!
//! Price-time priority: an incoming order consumes the front order of the
//! best opposing level, executing at the maker's price, until its quantity
//! is exhausted, the prices stop crossing, a slippage bound is hit, or a
//! time-in-force policy forbids the fill. Iceberg makers execute in
//! visible-sized slices with a display refresh after each; hidden makers
//! execute their full quantity without ever showing volume.

use bookd_sdk::types::{OrderType, Side, TimeInForce};

use super::stops;
use crate::{
	book::{BookGroup, OrderBook, OrderRecord, OrderStore},
	event::{EventBuffer, LevelInfo, MarketEvent},
	types::Order,
};

/// Book group an incoming order executes against
pub(super) fn opposing_group(side: Side) -> BookGroup {
	match side {
		Side::Buy => BookGroup::Asks,
		Side::Sell => BookGroup::Bids,
	}
}

/// Admission dry-run for the FOK and AON policies: would an incoming
/// order of `quantity` fill completely against the opposing side?
///
/// Walks resting orders in the exact price-time order `match_order`
/// consumes them, applying the same blocking rule: an all-or-none maker
/// whose remaining quantity exceeds what is left of the taker stops the
/// walk right there, so quantity behind it is unreachable and must not be
/// counted. Hidden and iceberg reserves count in full, as the loop
/// executes them.
pub(super) fn can_fill_quantity(
	book: &OrderBook,
	store: &OrderStore,
	side: Side,
	limit: Option<u64>,
	quantity: u64,
) -> bool {
	let mut remaining = quantity;
	for level in book.ladder(opposing_group(side)).iter() {
		if let Some(limit) = limit {
			let crosses = match side {
				Side::Buy => limit >= level.price(),
				Side::Sell => limit <= level.price(),
			};
			if !crosses {
				break;
			}
		}
		for order_id in level.orders() {
			let Some(maker) = store.get(order_id) else {
				continue;
			};
			if maker.order.time_in_force == TimeInForce::Aon && remaining < maker.order.leaves {
				return false;
			}
			remaining = remaining.saturating_sub(maker.order.leaves);
			if remaining == 0 {
				return true;
			}
		}
	}
	false
}

fn level_snapshot(book: &OrderBook, group: BookGroup, price: u64) -> LevelInfo {
	match book.ladder(group).get(price) {
		Some(level) => LevelInfo {
			symbol_id: book.symbol_id(),
			group,
			level_type: group.level_type(),
			price,
			visible: level.visible(),
			hidden: level.hidden(),
			orders: level.order_count(),
		},
		None => LevelInfo {
			symbol_id: book.symbol_id(),
			group,
			level_type: group.level_type(),
			price,
			visible: 0,
			hidden: 0,
			orders: 0,
		},
	}
}

/// Rest an order at the tail of its level, creating the level on demand.
pub(super) fn insert_resting(
	book: &mut OrderBook,
	store: &mut OrderStore,
	events: &mut EventBuffer,
	order: Order,
) {
	let group = OrderBook::group_for(&order);
	let price = OrderBook::resting_price(&order);
	let symbol_id = order.symbol_id;

	let best_before = book.ladder(group).best_price();
	let created = book
		.ladder_mut(group)
		.insert_order(price, order.id, order.visible(), order.hidden());
	let top_changed = best_before != book.ladder(group).best_price();

	let level = level_snapshot(book, group, price);
	if created {
		events.push(MarketEvent::AddLevel { level, top_changed });
	} else {
		events.push(MarketEvent::UpdateLevel { level, top_changed });
	}
	events.push(MarketEvent::UpdateOrderBook {
		symbol_id,
		top_changed,
	});

	store.insert(OrderRecord { order, group });
}

/// Remove an order from its level and the store.
///
/// Emits the level and book events; the caller decides whether the removal
/// is a deletion (`DeleteOrder`) or a migration (stop activation, repeg).
pub(super) fn remove_resting(
	book: &mut OrderBook,
	store: &mut OrderStore,
	events: &mut EventBuffer,
	order_id: u64,
) -> Option<Order> {
	let record = store.remove(order_id)?;
	let price = OrderBook::resting_price(&record.order);
	remove_from_ladder(
		book,
		events,
		record.order.symbol_id,
		record.group,
		price,
		order_id,
		record.order.visible(),
		record.order.hidden(),
	);
	Some(record.order)
}

#[allow(clippy::too_many_arguments)]
pub(super) fn remove_from_ladder(
	book: &mut OrderBook,
	events: &mut EventBuffer,
	symbol_id: u32,
	group: BookGroup,
	price: u64,
	order_id: u64,
	visible: u64,
	hidden: u64,
) {
	let best_before = book.ladder(group).best_price();
	let (found, level_removed) = book
		.ladder_mut(group)
		.remove_order(price, order_id, visible, hidden);
	if !found {
		return;
	}
	let top_changed = best_before != book.ladder(group).best_price();
	let level = level_snapshot(book, group, price);
	if level_removed {
		events.push(MarketEvent::DeleteLevel { level, top_changed });
	} else {
		events.push(MarketEvent::UpdateLevel { level, top_changed });
	}
	events.push(MarketEvent::UpdateOrderBook {
		symbol_id,
		top_changed,
	});
}

/// Adjust level volume after an in-place quantity change.
#[allow(clippy::too_many_arguments)]
pub(super) fn adjust_in_ladder(
	book: &mut OrderBook,
	events: &mut EventBuffer,
	symbol_id: u32,
	group: BookGroup,
	price: u64,
	old_visible: u64,
	old_hidden: u64,
	new_visible: u64,
	new_hidden: u64,
) {
	let best_before = book.ladder(group).best_price();
	book.ladder_mut(group)
		.adjust_order(price, old_visible, old_hidden, new_visible, new_hidden);
	let top_changed = best_before != book.ladder(group).best_price();
	let level = level_snapshot(book, group, price);
	events.push(MarketEvent::UpdateLevel { level, top_changed });
	events.push(MarketEvent::UpdateOrderBook {
		symbol_id,
		top_changed,
	});
}

fn crosses(taker: &Order, best_price: u64) -> bool {
	match taker.order_type {
		OrderType::Market => true,
		_ => match taker.side {
			Side::Buy => taker.price >= best_price,
			Side::Sell => taker.price <= best_price,
		},
	}
}

/// Quantity a resting order exposes to a single execution.
///
/// Icebergs trade in visible-sized bites; hidden and all-or-none orders
/// trade their full remaining quantity in one fill.
fn execution_slice(order: &Order) -> u64 {
	if order.is_hidden() || order.time_in_force == TimeInForce::Aon {
		order.leaves
	} else {
		order.visible()
	}
}

/// Match an incoming order against the opposing side of the book.
pub(super) fn match_order(
	book: &mut OrderBook,
	store: &mut OrderStore,
	events: &mut EventBuffer,
	taker: &mut Order,
) {
	// slippage is measured from the best opposing price seen at entry
	let slippage_bound = match (taker.order_type, taker.slippage) {
		(OrderType::Market, Some(slippage)) => book
			.ladder(opposing_group(taker.side))
			.best_price()
			.map(|best| match taker.side {
				Side::Buy => best.saturating_add(slippage),
				Side::Sell => best.saturating_sub(slippage),
			}),
		_ => None,
	};

	while taker.leaves > 0 {
		let group = opposing_group(taker.side);
		let Some(best_price) = book.ladder(group).best_price() else {
			break;
		};
		if !crosses(taker, best_price) {
			break;
		}
		if let Some(bound) = slippage_bound {
			let beyond = match taker.side {
				Side::Buy => best_price > bound,
				Side::Sell => best_price < bound,
			};
			if beyond {
				break;
			}
		}

		let Some(maker_id) = book.ladder(group).best().and_then(|level| level.front()) else {
			break;
		};
		let Some(maker) = store.get(maker_id).map(|record| record.order.clone()) else {
			break;
		};
		// an all-or-none maker only trades when covered completely
		if maker.time_in_force == TimeInForce::Aon && taker.leaves < maker.leaves {
			break;
		}

		let quantity = taker.leaves.min(execution_slice(&maker));
		if quantity == 0 {
			break;
		}
		let price = maker.price;

		// resting order first, both with pre-execution snapshots
		events.push(MarketEvent::ExecuteOrder {
			order: maker.clone(),
			price,
			quantity,
		});
		events.push(MarketEvent::ExecuteOrder {
			order: taker.clone(),
			price,
			quantity,
		});

		taker.executed += quantity;
		taker.leaves -= quantity;
		apply_maker_fill(book, store, events, maker_id, quantity);
		book.set_last_trade_price(price);
	}
}

/// Cross overlapping resting orders at the top of the book.
///
/// Runs after mutations that can leave the book crossed (enable matching,
/// stop activation, modify). The older order is the maker and sets the
/// price.
pub(super) fn cross_resting(book: &mut OrderBook, store: &mut OrderStore, events: &mut EventBuffer) {
	loop {
		let (Some(bid_price), Some(ask_price)) = (book.best_bid(), book.best_ask()) else {
			break;
		};
		if bid_price < ask_price {
			break;
		}

		let bid_id = book
			.ladder(BookGroup::Bids)
			.best()
			.and_then(|level| level.front());
		let ask_id = book
			.ladder(BookGroup::Asks)
			.best()
			.and_then(|level| level.front());
		let (Some(bid_id), Some(ask_id)) = (bid_id, ask_id) else {
			break;
		};
		let (Some(bid), Some(ask)) = (
			store.get(bid_id).map(|record| record.order.clone()),
			store.get(ask_id).map(|record| record.order.clone()),
		) else {
			break;
		};

		let (maker, taker) = if bid.id < ask.id { (bid, ask) } else { (ask, bid) };
		let quantity = execution_slice(&maker).min(execution_slice(&taker));
		if quantity == 0 {
			break;
		}
		if maker.time_in_force == TimeInForce::Aon && quantity < maker.leaves {
			break;
		}
		if taker.time_in_force == TimeInForce::Aon && quantity < taker.leaves {
			break;
		}
		let price = maker.price;

		events.push(MarketEvent::ExecuteOrder {
			order: maker.clone(),
			price,
			quantity,
		});
		events.push(MarketEvent::ExecuteOrder {
			order: taker.clone(),
			price,
			quantity,
		});
		apply_maker_fill(book, store, events, maker.id, quantity);
		apply_maker_fill(book, store, events, taker.id, quantity);
		book.set_last_trade_price(price);
	}
}

/// Put a modified or replaced order back through the add pipeline.
///
/// Applies the same time-in-force admission as the add path: an
/// all-or-none or fill-or-kill order only enters the matching loop when
/// the dry-run says it can fill completely at its new price.
pub(super) fn reenter_order(
	book: &mut OrderBook,
	store: &mut OrderStore,
	events: &mut EventBuffer,
	matching_enabled: bool,
	mut order: Order,
) {
	if order.is_stop_family() {
		if matching_enabled
			&& stops::is_triggered(book.last_trade_price(), order.side, order.stop_price)
		{
			stops::activate(book, store, events, order);
		} else {
			insert_resting(book, store, events, order);
		}
		return;
	}

	if matching_enabled {
		let blocked = matches!(
			order.time_in_force,
			TimeInForce::Aon | TimeInForce::Fok
		) && !can_fill_quantity(book, store, order.side, Some(order.price), order.leaves);
		if !blocked {
			match_order(book, store, events, &mut order);
		}
	}
	if order.leaves == 0
		|| matches!(order.time_in_force, TimeInForce::Ioc | TimeInForce::Fok)
	{
		events.push(MarketEvent::DeleteOrder { order });
	} else {
		insert_resting(book, store, events, order);
	}
}

/// Apply one fill to a resting order: decrement, refresh level volume, and
/// delete it when exhausted.
fn apply_maker_fill(
	book: &mut OrderBook,
	store: &mut OrderStore,
	events: &mut EventBuffer,
	maker_id: u64,
	quantity: u64,
) {
	let Some(record) = store.get_mut(maker_id) else {
		return;
	};
	let symbol_id = record.order.symbol_id;
	let group = record.group;
	let price = OrderBook::resting_price(&record.order);
	let old_visible = record.order.visible();
	let old_hidden = record.order.hidden();

	record.order.executed += quantity;
	record.order.leaves -= quantity;
	let leaves = record.order.leaves;
	let new_visible = record.order.visible();
	let new_hidden = record.order.hidden();
	let is_iceberg = record.order.is_iceberg();
	let order = record.order.clone();

	if leaves == 0 {
		store.remove(maker_id);
		remove_from_ladder(
			book, events, symbol_id, group, price, maker_id, old_visible, old_hidden,
		);
		events.push(MarketEvent::DeleteOrder { order });
	} else {
		adjust_in_ladder(
			book,
			events,
			symbol_id,
			group,
			price,
			old_visible,
			old_hidden,
			new_visible,
			new_hidden,
		);
		if is_iceberg {
			// visible portion replenished from the hidden reserve
			events.push(MarketEvent::UpdateOrder { order });
		}
	}
}
