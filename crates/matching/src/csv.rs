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

//! CSV rendering for query responses
//!
//! Optional numeric fields render as the literal `NULL` when the order
//! does not carry them. The info string is double-quoted with internal
//! quotes backslash-escaped.

use crate::{
	book::{BookGroup, OrderBook, OrderStore},
	handler::InfoMap,
	types::Order,
};

pub const ORDER_HEADER: &str = "Id,SymbolId,Type,Side,Price,StopPrice,Quantity,TimeInForce,\
MaxVisibleQuantity,Slippage,TrailingDistance,TrailingStep,ExecutedQuantity,LeavesQuantity,Info";

pub const BOOK_HEADER: &str = "Group,LevelType,LevelPrice";

const NULL: &str = "NULL";
const SEP: &str = ",";
const EOL: &str = "\n";

fn quote_info(info: &str) -> String {
	format!("\"{}\"", info.replace('"', "\\\""))
}

/// One order as a CSV row (no trailing newline).
pub fn order_row(order: &Order, info: &str) -> String {
	let max_visible = if order.is_hidden() || order.is_iceberg() {
		order.max_visible.unwrap_or(0).to_string()
	} else {
		NULL.to_string()
	};
	let slippage = match order.slippage {
		Some(slippage) => slippage.to_string(),
		None => NULL.to_string(),
	};
	let (trailing_distance, trailing_step) =
		if order.is_trailing_stop() || order.is_trailing_stop_limit() {
			(
				order.trailing_distance.to_string(),
				order.trailing_step.to_string(),
			)
		} else {
			(NULL.to_string(), NULL.to_string())
		};

	[
		order.id.to_string(),
		order.symbol_id.to_string(),
		order.order_type.as_str().to_string(),
		order.side.as_str().to_string(),
		order.price.to_string(),
		order.stop_price.to_string(),
		order.quantity.to_string(),
		order.time_in_force.as_str().to_string(),
		max_visible,
		slippage,
		trailing_distance,
		trailing_step,
		order.executed.to_string(),
		order.leaves.to_string(),
		quote_info(info),
	]
	.join(SEP)
}

/// Single-order CSV document: header plus one row.
pub fn order_csv(order: &Order, info: &str) -> String {
	format!("{ORDER_HEADER}{EOL}{}{EOL}", order_row(order, info))
}

/// Full book dump: every group in display order, levels in priority
/// order, orders in time priority within each level.
pub fn book_csv(book: &OrderBook, store: &OrderStore, infos: &InfoMap) -> String {
	let mut csv = format!("{BOOK_HEADER}{SEP}{ORDER_HEADER}{EOL}");
	for group in BookGroup::ALL {
		let ladder = book.ladder(group);
		for level in ladder.iter() {
			let level_props = format!(
				"{}{SEP}{}{SEP}{}",
				group.as_str(),
				level.level_type().as_str(),
				level.price()
			);
			for order_id in level.orders() {
				let Some(record) = store.get(order_id) else {
					continue;
				};
				let info = infos.get(order_id).unwrap_or("");
				csv.push_str(&level_props);
				csv.push_str(SEP);
				csv.push_str(&order_row(&record.order, info));
				csv.push_str(EOL);
			}
		}
	}
	csv
}

#[cfg(test)]
mod tests {
	use bookd_sdk::types::{Side, TimeInForce};

	use super::*;

	#[test]
	fn test_plain_limit_renders_null_optionals() {
		let order = Order::limit(1, 1, Side::Buy, 100, 10, TimeInForce::Gtc);
		let row = order_row(&order, "txn-1");
		assert_eq!(
			row,
			"1,1,LIMIT,BUY,100,0,10,GTC,NULL,NULL,NULL,NULL,0,10,\"txn-1\""
		);
	}

	#[test]
	fn test_trailing_stop_renders_trailing_fields() {
		let order = Order::trailing_stop(2, 1, Side::Sell, 90, 10, 100, 10);
		let row = order_row(&order, "Z");
		assert_eq!(
			row,
			"2,1,TRAILING_STOP,SELL,0,90,10,GTC,NULL,NULL,100,10,0,10,\"Z\""
		);
	}

	#[test]
	fn test_iceberg_and_slippage_fields() {
		let iceberg =
			Order::limit(3, 1, Side::Sell, 100, 50, TimeInForce::Gtc).with_max_visible(10);
		assert!(order_row(&iceberg, "i").contains(",GTC,10,NULL,"));

		let market = Order::market_with_slippage(4, 1, Side::Buy, 5, 2);
		assert!(order_row(&market, "s").contains(",IOC,NULL,2,"));
	}

	#[test]
	fn test_info_quoting_escapes_quotes() {
		let order = Order::limit(1, 1, Side::Buy, 100, 10, TimeInForce::Gtc);
		let row = order_row(&order, "he said \"go\"");
		assert!(row.ends_with("\"he said \\\"go\\\"\""));
	}

	#[test]
	fn test_order_csv_has_header() {
		let order = Order::limit(1, 1, Side::Buy, 100, 10, TimeInForce::Gtc);
		let csv = order_csv(&order, "a");
		let mut lines = csv.lines();
		assert_eq!(lines.next(), Some(ORDER_HEADER));
		assert!(lines.next().unwrap().starts_with("1,1,LIMIT,"));
	}
}
