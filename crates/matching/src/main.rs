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

//! Matching daemon entry point
//!
//! Setup order: validate the CLI, reconcile the status file, switch
//! logging to the daemon's files, open the database, replay the book,
//! bind the socket, mark RUNNING, serve. Shutdown unwinds in reverse and
//! marks GRACEFULLY_STOPPED. Any setup failure exits with code 1.

use std::{cell::RefCell, path::PathBuf, process::ExitCode, rc::Rc};

use anyhow::Context;
use bookd_matching::{
	DEFAULT_SYMBOL_ID, Daemon, DaemonConfig, DaemonStatus, SqliteOrderStorage, Symbol, logging,
	server, status,
};
use clap::Parser;
use tokio::net::UnixListener;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "bookd", version, about = "Single-symbol matching daemon")]
struct Args {
	/// Daemon name; runtime files are named after it
	#[arg(long)]
	name: String,
	/// Root directory for socket, database, log and status files
	#[arg(long)]
	path: PathBuf,
}

fn main() -> ExitCode {
	match run() {
		Ok(()) => ExitCode::SUCCESS,
		Err(error) => {
			eprintln!("bookd: {error:#}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> anyhow::Result<()> {
	let args = Args::parse();
	let config = DaemonConfig::new(args.name, args.path)?;

	status::startup_check(&config)?;
	logging::init(&config)?;
	info!("starting daemon {}", config.name);

	let storage = SqliteOrderStorage::open(config.db_path())
		.with_context(|| format!("failed to open {}", config.db_path().display()))?;
	info!("connected to sqlite");

	let daemon = Daemon::bootstrap(
		Box::new(storage),
		Symbol::new(DEFAULT_SYMBOL_ID, config.name.clone()),
	)?;
	let daemon = Rc::new(RefCell::new(daemon));

	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.context("failed to build runtime")?;
	let local = tokio::task::LocalSet::new();

	let socket_path = config.socket_path();
	runtime.block_on(local.run_until(async {
		let listener = UnixListener::bind(&socket_path)
			.with_context(|| format!("failed to bind {}", socket_path.display()))?;
		status::write(&config, DaemonStatus::Running)?;
		info!("listening on socket {}", socket_path.display());
		server::run(listener, daemon.clone())
			.await
			.context("connection loop failed")
	}))?;

	// graceful shutdown: clients are dropped with the runtime
	daemon.borrow_mut().disable_matching();
	let _ = std::fs::remove_file(config.socket_path());
	status::write(&config, DaemonStatus::GracefullyStopped)?;
	info!("graceful shutdown");
	Ok(())
}
