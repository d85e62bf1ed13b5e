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

//! Logging initialization
//!
//! Two non-blocking file writers: everything at the configured level goes
//! to `<name>.log`, warnings and errors additionally to `<name>.err`.
//! `RUST_LOG` overrides the default `info` filter.

use std::{fs::OpenOptions, sync::OnceLock};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::{
	EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, registry::Registry,
	util::SubscriberInitExt,
};

use crate::config::DaemonConfig;

// Guards keep the writer threads alive for the process lifetime
static LOG_GUARDS: OnceLock<(WorkerGuard, WorkerGuard)> = OnceLock::new();

/// Initialize file logging for the daemon.
pub fn init(config: &DaemonConfig) -> Result<()> {
	let log_file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(config.log_path())
		.with_context(|| format!("failed to open {}", config.log_path().display()))?;
	let err_file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(config.err_path())
		.with_context(|| format!("failed to open {}", config.err_path().display()))?;

	let (log_writer, log_guard) = non_blocking::NonBlockingBuilder::default().finish(log_file);
	let (err_writer, err_guard) = non_blocking::NonBlockingBuilder::default().finish(err_file);
	LOG_GUARDS.set((log_guard, err_guard)).ok();

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	Registry::default()
		.with(filter)
		.with(
			fmt::layer()
				.with_writer(log_writer)
				.with_target(false)
				.with_ansi(false),
		)
		.with(
			fmt::layer()
				.with_writer(err_writer)
				.with_target(false)
				.with_ansi(false)
				.with_filter(LevelFilter::WARN),
		)
		.try_init()
		.context("failed to initialize logging")?;
	Ok(())
}
