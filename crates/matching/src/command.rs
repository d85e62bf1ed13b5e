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

//! Command grammar
//!
//! One textual command per frame. Longer productions are matched before
//! their prefixes (`add trailing stop-limit` before `add trailing stop`,
//! `add stop-limit` before `add stop`), and the free-form info field is
//! always the tail of the line, so it may contain spaces.

use bookd_sdk::types::{OrderType, Side, TimeInForce};
use thiserror::Error;

use crate::types::Order;

/// Error types for command parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
	#[error("invalid command: {0}")]
	Invalid(String),
}

/// A parsed add-order request; the id is assigned by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
	pub order_type: OrderType,
	pub side: Side,
	pub price: u64,
	pub stop_price: u64,
	pub quantity: u64,
	pub time_in_force: TimeInForce,
	pub slippage: Option<u64>,
	pub trailing_distance: u64,
	pub trailing_step: u64,
	pub info: String,
}

impl NewOrder {
	/// Build the engine order under the dispatcher-assigned id.
	pub fn into_order(self, id: u64, symbol_id: u32) -> Order {
		match self.order_type {
			OrderType::Market => match self.slippage {
				Some(slippage) => {
					Order::market_with_slippage(id, symbol_id, self.side, self.quantity, slippage)
				}
				None => Order::market(id, symbol_id, self.side, self.quantity),
			},
			OrderType::Limit => Order::limit(
				id,
				symbol_id,
				self.side,
				self.price,
				self.quantity,
				self.time_in_force,
			),
			OrderType::Stop => Order::stop(id, symbol_id, self.side, self.stop_price, self.quantity),
			OrderType::StopLimit => Order::stop_limit(
				id,
				symbol_id,
				self.side,
				self.stop_price,
				self.price,
				self.quantity,
			),
			OrderType::TrailingStop => Order::trailing_stop(
				id,
				symbol_id,
				self.side,
				self.stop_price,
				self.quantity,
				self.trailing_distance,
				self.trailing_step,
			),
			OrderType::TrailingStopLimit => Order::trailing_stop_limit(
				id,
				symbol_id,
				self.side,
				self.stop_price,
				self.price,
				self.quantity,
				self.trailing_distance,
				self.trailing_step,
			),
		}
	}
}

/// Parsed textual command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	EnableMatching,
	DisableMatching,
	AddSymbol { id: u32, name: String },
	DeleteSymbol { id: u32 },
	AddBook { id: u32 },
	DeleteBook { id: u32 },
	GetBook { id: u32 },
	AddOrder(NewOrder),
	ReduceOrder { id: u64, quantity: u64 },
	ModifyOrder { id: u64, price: u64, quantity: u64 },
	MitigateOrder { id: u64, price: u64, quantity: u64 },
	ReplaceOrder { id: u64, new_id: u64, price: u64, quantity: u64 },
	DeleteOrder { info: String },
	GetOrder { id: u64 },
}

impl Command {
	/// Parse one command line, matching longer prefixes first.
	pub fn parse(input: &str) -> Result<Self, CommandError> {
		let invalid = || CommandError::Invalid(input.to_string());

		match input {
			"enable matching" => return Ok(Command::EnableMatching),
			"disable matching" => return Ok(Command::DisableMatching),
			_ => {}
		}

		if let Some(rest) = input.strip_prefix("add symbol ") {
			let (id, name) = split_once_field(rest).ok_or_else(invalid)?;
			let id = parse_u32(id).ok_or_else(invalid)?;
			return Ok(Command::AddSymbol {
				id,
				name: name.to_string(),
			});
		}
		if let Some(rest) = input.strip_prefix("delete symbol ") {
			let id = parse_u32(rest).ok_or_else(invalid)?;
			return Ok(Command::DeleteSymbol { id });
		}
		if let Some(rest) = input.strip_prefix("add book ") {
			let id = parse_u32(rest).ok_or_else(invalid)?;
			return Ok(Command::AddBook { id });
		}
		if let Some(rest) = input.strip_prefix("delete book ") {
			let id = parse_u32(rest).ok_or_else(invalid)?;
			return Ok(Command::DeleteBook { id });
		}
		if let Some(rest) = input.strip_prefix("get book ") {
			let id = parse_u32(rest).ok_or_else(invalid)?;
			return Ok(Command::GetBook { id });
		}

		if let Some(rest) = input.strip_prefix("reduce order ") {
			let fields = split_fields::<2>(rest).ok_or_else(invalid)?;
			return Ok(Command::ReduceOrder {
				id: parse_u64(fields[0]).ok_or_else(invalid)?,
				quantity: parse_u64(fields[1]).ok_or_else(invalid)?,
			});
		}
		if let Some(rest) = input.strip_prefix("modify order ") {
			let fields = split_fields::<3>(rest).ok_or_else(invalid)?;
			return Ok(Command::ModifyOrder {
				id: parse_u64(fields[0]).ok_or_else(invalid)?,
				price: parse_u64(fields[1]).ok_or_else(invalid)?,
				quantity: parse_u64(fields[2]).ok_or_else(invalid)?,
			});
		}
		if let Some(rest) = input.strip_prefix("mitigate order ") {
			let fields = split_fields::<3>(rest).ok_or_else(invalid)?;
			return Ok(Command::MitigateOrder {
				id: parse_u64(fields[0]).ok_or_else(invalid)?,
				price: parse_u64(fields[1]).ok_or_else(invalid)?,
				quantity: parse_u64(fields[2]).ok_or_else(invalid)?,
			});
		}
		if let Some(rest) = input.strip_prefix("replace order ") {
			let fields = split_fields::<4>(rest).ok_or_else(invalid)?;
			return Ok(Command::ReplaceOrder {
				id: parse_u64(fields[0]).ok_or_else(invalid)?,
				new_id: parse_u64(fields[1]).ok_or_else(invalid)?,
				price: parse_u64(fields[2]).ok_or_else(invalid)?,
				quantity: parse_u64(fields[3]).ok_or_else(invalid)?,
			});
		}
		if let Some(rest) = input.strip_prefix("delete order ") {
			if rest.is_empty() {
				return Err(invalid());
			}
			return Ok(Command::DeleteOrder {
				info: rest.to_string(),
			});
		}
		if let Some(rest) = input.strip_prefix("get order ") {
			let id = parse_u64(rest).ok_or_else(invalid)?;
			return Ok(Command::GetOrder { id });
		}

		Self::parse_add_order(input).ok_or_else(invalid)
	}

	fn parse_add_order(input: &str) -> Option<Self> {
		// longest prefixes first
		if let Some(rest) = input.strip_prefix("add trailing stop-limit ") {
			let (side, fields, info) = order_fields::<5>(rest)?;
			return Some(Command::AddOrder(NewOrder {
				order_type: OrderType::TrailingStopLimit,
				side,
				stop_price: fields[0],
				price: fields[1],
				quantity: fields[2],
				time_in_force: TimeInForce::Gtc,
				slippage: None,
				trailing_distance: fields[3],
				trailing_step: fields[4],
				info,
			}));
		}
		if let Some(rest) = input.strip_prefix("add trailing stop ") {
			let (side, fields, info) = order_fields::<4>(rest)?;
			return Some(Command::AddOrder(NewOrder {
				order_type: OrderType::TrailingStop,
				side,
				stop_price: fields[0],
				price: 0,
				quantity: fields[1],
				time_in_force: TimeInForce::Gtc,
				slippage: None,
				trailing_distance: fields[2],
				trailing_step: fields[3],
				info,
			}));
		}
		if let Some(rest) = input.strip_prefix("add stop-limit ") {
			let (side, fields, info) = order_fields::<3>(rest)?;
			return Some(Command::AddOrder(NewOrder {
				order_type: OrderType::StopLimit,
				side,
				stop_price: fields[0],
				price: fields[1],
				quantity: fields[2],
				time_in_force: TimeInForce::Gtc,
				slippage: None,
				trailing_distance: 0,
				trailing_step: 0,
				info,
			}));
		}
		if let Some(rest) = input.strip_prefix("add stop ") {
			let (side, fields, info) = order_fields::<2>(rest)?;
			return Some(Command::AddOrder(NewOrder {
				order_type: OrderType::Stop,
				side,
				stop_price: fields[0],
				price: 0,
				quantity: fields[1],
				time_in_force: TimeInForce::Gtc,
				slippage: None,
				trailing_distance: 0,
				trailing_step: 0,
				info,
			}));
		}
		if let Some(rest) = input.strip_prefix("add slippage market ") {
			let (side, fields, info) = order_fields::<2>(rest)?;
			return Some(Command::AddOrder(NewOrder {
				order_type: OrderType::Market,
				side,
				price: 0,
				stop_price: 0,
				quantity: fields[0],
				time_in_force: TimeInForce::Ioc,
				slippage: Some(fields[1]),
				trailing_distance: 0,
				trailing_step: 0,
				info,
			}));
		}
		if let Some(rest) = input.strip_prefix("add market ") {
			let (side, fields, info) = order_fields::<1>(rest)?;
			return Some(Command::AddOrder(NewOrder {
				order_type: OrderType::Market,
				side,
				price: 0,
				stop_price: 0,
				quantity: fields[0],
				time_in_force: TimeInForce::Ioc,
				slippage: None,
				trailing_distance: 0,
				trailing_step: 0,
				info,
			}));
		}

		let (time_in_force, rest) = if let Some(rest) = input.strip_prefix("add ioc limit ") {
			(TimeInForce::Ioc, rest)
		} else if let Some(rest) = input.strip_prefix("add fok limit ") {
			(TimeInForce::Fok, rest)
		} else if let Some(rest) = input.strip_prefix("add aon limit ") {
			(TimeInForce::Aon, rest)
		} else if let Some(rest) = input.strip_prefix("add limit ") {
			(TimeInForce::Gtc, rest)
		} else {
			return None;
		};
		let (side, fields, info) = order_fields::<2>(rest)?;
		Some(Command::AddOrder(NewOrder {
			order_type: OrderType::Limit,
			side,
			price: fields[0],
			stop_price: 0,
			quantity: fields[1],
			time_in_force,
			slippage: None,
			trailing_distance: 0,
			trailing_step: 0,
			info,
		}))
	}
}

fn parse_u32(token: &str) -> Option<u32> {
	(!token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
		.then(|| token.parse().ok())
		.flatten()
}

fn parse_u64(token: &str) -> Option<u64> {
	(!token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
		.then(|| token.parse().ok())
		.flatten()
}

fn parse_side(token: &str) -> Option<Side> {
	match token {
		"buy" => Some(Side::Buy),
		"sell" => Some(Side::Sell),
		_ => None,
	}
}

/// Split one space-separated field off the front, the rest is free-form.
fn split_once_field(input: &str) -> Option<(&str, &str)> {
	let (field, rest) = input.split_once(' ')?;
	(!field.is_empty() && !rest.is_empty()).then_some((field, rest))
}

/// Split exactly N space-separated fields with nothing trailing.
fn split_fields<const N: usize>(input: &str) -> Option<[&str; N]> {
	let mut fields = [""; N];
	let mut it = input.split(' ');
	for field in fields.iter_mut() {
		let token = it.next()?;
		if token.is_empty() {
			return None;
		}
		*field = token;
	}
	it.next().is_none().then_some(fields)
}

/// Parse `<buy|sell> <N numeric fields> <info...>` for add-order commands.
fn order_fields<const N: usize>(input: &str) -> Option<(Side, [u64; N], String)> {
	let mut it = input.split(' ');
	let side = parse_side(it.next()?)?;
	let mut fields = [0u64; N];
	for field in fields.iter_mut() {
		*field = parse_u64(it.next()?)?;
	}
	let info = it.collect::<Vec<_>>().join(" ");
	(!info.is_empty()).then_some((side, fields, info))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_matching_toggle() {
		assert_eq!(
			Command::parse("enable matching").unwrap(),
			Command::EnableMatching
		);
		assert_eq!(
			Command::parse("disable matching").unwrap(),
			Command::DisableMatching
		);
	}

	#[test]
	fn test_symbol_and_book_commands() {
		assert_eq!(
			Command::parse("add symbol 1 BTC USD").unwrap(),
			Command::AddSymbol {
				id: 1,
				name: "BTC USD".to_string()
			}
		);
		assert_eq!(Command::parse("get book 1").unwrap(), Command::GetBook { id: 1 });
	}

	#[test]
	fn test_add_limit_variants() {
		let Command::AddOrder(order) = Command::parse("add limit buy 100 10 txn-1").unwrap() else {
			panic!("expected add order");
		};
		assert_eq!(order.order_type, OrderType::Limit);
		assert_eq!(order.time_in_force, TimeInForce::Gtc);
		assert_eq!(order.price, 100);
		assert_eq!(order.quantity, 10);
		assert_eq!(order.info, "txn-1");

		let Command::AddOrder(order) = Command::parse("add fok limit sell 101 10 Y").unwrap()
		else {
			panic!("expected add order");
		};
		assert_eq!(order.time_in_force, TimeInForce::Fok);
		assert_eq!(order.side, Side::Sell);
	}

	#[test]
	fn test_stop_limit_parsed_before_stop() {
		let Command::AddOrder(order) =
			Command::parse("add stop-limit buy 105 106 3 S").unwrap()
		else {
			panic!("expected add order");
		};
		assert_eq!(order.order_type, OrderType::StopLimit);
		assert_eq!(order.stop_price, 105);
		assert_eq!(order.price, 106);

		let Command::AddOrder(order) = Command::parse("add stop buy 49 3 S").unwrap() else {
			panic!("expected add order");
		};
		assert_eq!(order.order_type, OrderType::Stop);
		assert_eq!(order.stop_price, 49);
	}

	#[test]
	fn test_trailing_variants() {
		let Command::AddOrder(order) =
			Command::parse("add trailing stop sell 90 10 100 10 Z").unwrap()
		else {
			panic!("expected add order");
		};
		assert_eq!(order.order_type, OrderType::TrailingStop);
		assert_eq!(order.trailing_distance, 100);
		assert_eq!(order.trailing_step, 10);

		let Command::AddOrder(order) =
			Command::parse("add trailing stop-limit buy 105 106 3 5 1 T").unwrap()
		else {
			panic!("expected add order");
		};
		assert_eq!(order.order_type, OrderType::TrailingStopLimit);
		assert_eq!(order.stop_price, 105);
		assert_eq!(order.price, 106);
	}

	#[test]
	fn test_market_variants() {
		let Command::AddOrder(order) = Command::parse("add market buy 5 U").unwrap() else {
			panic!("expected add order");
		};
		assert_eq!(order.order_type, OrderType::Market);
		assert_eq!(order.slippage, None);

		let Command::AddOrder(order) =
			Command::parse("add slippage market sell 10 2 V").unwrap()
		else {
			panic!("expected add order");
		};
		assert_eq!(order.slippage, Some(2));
	}

	#[test]
	fn test_order_mutations() {
		assert_eq!(
			Command::parse("reduce order 3 5").unwrap(),
			Command::ReduceOrder { id: 3, quantity: 5 }
		);
		assert_eq!(
			Command::parse("replace order 3 9 101 7").unwrap(),
			Command::ReplaceOrder {
				id: 3,
				new_id: 9,
				price: 101,
				quantity: 7
			}
		);
		assert_eq!(
			Command::parse("delete order txn-ABC").unwrap(),
			Command::DeleteOrder {
				info: "txn-ABC".to_string()
			}
		);
	}

	#[test]
	fn test_info_may_contain_spaces() {
		let Command::AddOrder(order) =
			Command::parse("add limit buy 100 1 external txn 42").unwrap()
		else {
			panic!("expected add order");
		};
		assert_eq!(order.info, "external txn 42");
	}

	#[test]
	fn test_invalid_commands_rejected() {
		assert!(Command::parse("").is_err());
		assert!(Command::parse("add limit buy 100 10").is_err());
		assert!(Command::parse("add limit hold 100 10 X").is_err());
		assert!(Command::parse("add limit buy ten 10 X").is_err());
		assert!(Command::parse("reduce order 3").is_err());
		assert!(Command::parse("exit now").is_err());
	}
}
