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

use std::collections::VecDeque;

use super::MarketEvent;

/// Event ring for one engine entry point
///
/// The engine pushes events here instead of invoking listeners directly;
/// the dispatcher drains the ring once the entry point has returned. With
/// the strictly single-threaded scheduling model there is exactly one
/// producer and one consumer, alternating per request, so a plain deque is
/// sufficient.
#[derive(Debug, Default)]
pub struct EventBuffer {
	events: VecDeque<MarketEvent>,
}

impl EventBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, event: MarketEvent) {
		self.events.push_back(event);
	}

	/// Take all queued events in emission order.
	pub fn drain(&mut self) -> Vec<MarketEvent> {
		self.events.drain(..).collect()
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}
}
