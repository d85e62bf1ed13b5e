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

//! Daemon status file
//!
//! `<root>/<name>.status` records the daemon's lifecycle state. On
//! startup, the previous state plus a probe of the socket decides whether
//! a daemon is already running (fatal), the last run crashed (recorded as
//! ABEND, stale socket removed), or the last shutdown was clean.

use std::{fs, os::unix::net::UnixStream};

use thiserror::Error;
use tracing::warn;

use crate::config::DaemonConfig;

/// Error types for status handling
#[derive(Debug, Error)]
pub enum StatusError {
	#[error("socket already in use by a running daemon")]
	SocketInUse,
	#[error("failed to write status file: {0}")]
	Io(#[from] std::io::Error),
}

/// Daemon lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
	Running,
	GracefullyStopped,
	Abend,
}

impl DaemonStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			DaemonStatus::Running => "RUNNING",
			DaemonStatus::GracefullyStopped => "GRACEFULLY_STOPPED",
			DaemonStatus::Abend => "ABEND",
		}
	}
}

/// Read the recorded status, if any.
pub fn read(config: &DaemonConfig) -> Option<String> {
	fs::read_to_string(config.status_path())
		.ok()
		.map(|text| text.trim().to_string())
}

/// Record the daemon status.
pub fn write(config: &DaemonConfig, status: DaemonStatus) -> Result<(), StatusError> {
	fs::write(config.status_path(), status.as_str())?;
	Ok(())
}

/// Startup state machine.
///
/// A socket that answers while the status says RUNNING means another
/// daemon owns this name. A socket file or a non-clean status without a
/// live listener means the previous run crashed: the crash is recorded and
/// the stale socket removed so the bind can succeed.
pub fn startup_check(config: &DaemonConfig) -> Result<(), StatusError> {
	let socket_path = config.socket_path();
	let previous = read(config);

	if previous.is_none() && !socket_path.exists() {
		// fresh root, nothing to reconcile
		return Ok(());
	}

	let socket_in_use = UnixStream::connect(&socket_path).is_ok();
	let unclean = socket_path.exists()
		|| previous.as_deref() != Some(DaemonStatus::GracefullyStopped.as_str());

	if socket_in_use && previous.as_deref() == Some(DaemonStatus::Running.as_str()) {
		return Err(StatusError::SocketInUse);
	}
	if !socket_in_use && unclean {
		warn!("previous run did not stop cleanly, recording ABEND");
		write(config, DaemonStatus::Abend)?;
		let _ = fs::remove_file(&socket_path);
	}
	Ok(())
}
