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

//! Bookd Matching Daemon
//!
//! This crate provides a single-symbol limit-order matching engine served
//! over a local stream socket with durable state in a local SQLite file.
//!
//! Architecture:
//! - Single-threaded matching core for deterministic behavior
//! - Event ring drained per request; handlers never re-enter the engine
//! - SQLite-backed order rows plus a latest-id high-water mark
//! - Startup replay rebuilds the book from the rows
//! - Fixed-size textual frames with page-count framing for large replies

pub mod book;
pub mod command;
pub mod config;
pub mod csv;
pub mod dispatch;
pub mod engine;
pub mod event;
pub mod handler;
pub mod logging;
pub mod recovery;
pub mod server;
pub mod status;
pub mod storage;
pub mod types;

pub use book::{BookGroup, Ladder, LevelType, OrderBook, OrderRecord, OrderStore, PriceLevel};
pub use command::{Command, CommandError, NewOrder};
pub use config::{ConfigError, DaemonConfig};
pub use dispatch::{DEFAULT_SYMBOL_ID, Daemon, DispatchError, RequestContext, Response};
pub use engine::{EngineError, MatchingEngine};
pub use event::{EventBuffer, LevelInfo, MarketEvent, MarketHandler};
pub use handler::{DaemonHandler, InfoMap};
pub use recovery::{RecoveryCoordinator, RecoveryError, RecoveryReport};
pub use status::{DaemonStatus, StatusError};
pub use storage::{MemoryOrderStorage, OrderStorage, SqliteOrderStorage, StorageError};
pub use types::{Order, Symbol};
