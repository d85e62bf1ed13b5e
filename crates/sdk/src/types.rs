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

use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	/// Wire/CSV name of the side
	pub fn as_str(self) -> &'static str {
		match self {
			Side::Buy => "BUY",
			Side::Sell => "SELL",
		}
	}

	/// Integer code used by the relational store
	pub fn index(self) -> u8 {
		match self {
			Side::Buy => 0,
			Side::Sell => 1,
		}
	}

	pub fn from_index(index: u8) -> Option<Self> {
		match index {
			0 => Some(Side::Buy),
			1 => Some(Side::Sell),
			_ => None,
		}
	}

	/// The side this order executes against
	pub fn opposite(self) -> Self {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
	Market,
	Limit,
	Stop,
	StopLimit,
	TrailingStop,
	TrailingStopLimit,
}

impl OrderType {
	pub fn as_str(self) -> &'static str {
		match self {
			OrderType::Market => "MARKET",
			OrderType::Limit => "LIMIT",
			OrderType::Stop => "STOP",
			OrderType::StopLimit => "STOP_LIMIT",
			OrderType::TrailingStop => "TRAILING_STOP",
			OrderType::TrailingStopLimit => "TRAILING_STOP_LIMIT",
		}
	}

	pub fn index(self) -> u8 {
		match self {
			OrderType::Market => 0,
			OrderType::Limit => 1,
			OrderType::Stop => 2,
			OrderType::StopLimit => 3,
			OrderType::TrailingStop => 4,
			OrderType::TrailingStopLimit => 5,
		}
	}

	pub fn from_index(index: u8) -> Option<Self> {
		match index {
			0 => Some(OrderType::Market),
			1 => Some(OrderType::Limit),
			2 => Some(OrderType::Stop),
			3 => Some(OrderType::StopLimit),
			4 => Some(OrderType::TrailingStop),
			5 => Some(OrderType::TrailingStopLimit),
			_ => None,
		}
	}
}

/// Time-in-force policy for unmatched quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
	/// Good-till-cancelled: rest any remainder in the book
	Gtc,
	/// Immediate-or-cancel: cancel any remainder after matching
	Ioc,
	/// Fill-or-kill: reject the order unless it can fill completely
	Fok,
	/// All-or-none: rest in the book, never partially execute
	Aon,
}

impl TimeInForce {
	pub fn as_str(self) -> &'static str {
		match self {
			TimeInForce::Gtc => "GTC",
			TimeInForce::Ioc => "IOC",
			TimeInForce::Fok => "FOK",
			TimeInForce::Aon => "AON",
		}
	}

	pub fn index(self) -> u8 {
		match self {
			TimeInForce::Gtc => 0,
			TimeInForce::Ioc => 1,
			TimeInForce::Fok => 2,
			TimeInForce::Aon => 3,
		}
	}

	pub fn from_index(index: u8) -> Option<Self> {
		match index {
			0 => Some(TimeInForce::Gtc),
			1 => Some(TimeInForce::Ioc),
			2 => Some(TimeInForce::Fok),
			3 => Some(TimeInForce::Aon),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_index_round_trip() {
		for side in [Side::Buy, Side::Sell] {
			assert_eq!(Side::from_index(side.index()), Some(side));
		}
		for tif in [
			TimeInForce::Gtc,
			TimeInForce::Ioc,
			TimeInForce::Fok,
			TimeInForce::Aon,
		] {
			assert_eq!(TimeInForce::from_index(tif.index()), Some(tif));
		}
		for index in 0..6 {
			let order_type = OrderType::from_index(index).unwrap();
			assert_eq!(order_type.index(), index);
		}
		assert_eq!(OrderType::from_index(6), None);
	}

	#[test]
	fn test_opposite_side() {
		assert_eq!(Side::Buy.opposite(), Side::Sell);
		assert_eq!(Side::Sell.opposite(), Side::Buy);
	}
}
