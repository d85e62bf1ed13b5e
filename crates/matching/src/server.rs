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

//! Unix-socket connection loop
//!
//! Single-threaded cooperative scheduling: the loop runs on a
//! current-thread runtime inside a `LocalSet`, with one local task per
//! accepted client. Each task reads one 256-byte command frame at a time
//! and dispatches it synchronously through the shared daemon state - there
//! is no await between parse and response construction, so commands from
//! different clients serialize and never preempt each other.
//!
//! Writes are bounded by a one-second timeout so a dead client cannot
//! stall the loop. The literal `exit` command (and ctrl-c) stops accepting
//! and lets the caller run the graceful shutdown sequence.

use std::{cell::RefCell, rc::Rc, time::Duration};

use bookd_sdk::frame::{self, COMMAND_FRAME};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::{UnixListener, UnixStream},
	sync::Notify,
	time::timeout,
};
use tracing::{debug, error, info, warn};

use crate::dispatch::Daemon;

const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Accept clients and serve commands until shutdown.
///
/// Must run inside a `tokio::task::LocalSet` on a current-thread runtime.
pub async fn run(listener: UnixListener, daemon: Rc<RefCell<Daemon>>) -> std::io::Result<()> {
	let shutdown = Rc::new(Notify::new());
	loop {
		tokio::select! {
			_ = shutdown.notified() => {
				info!("exit command received");
				break;
			}
			signal = tokio::signal::ctrl_c() => {
				if signal.is_ok() {
					info!("interrupt received");
					break;
				}
			}
			accepted = listener.accept() => {
				let (stream, _) = accepted?;
				debug!("client connected");
				tokio::task::spawn_local(handle_client(
					stream,
					daemon.clone(),
					shutdown.clone(),
				));
			}
		}
	}
	Ok(())
}

async fn handle_client(mut stream: UnixStream, daemon: Rc<RefCell<Daemon>>, shutdown: Rc<Notify>) {
	let mut buffer = [0u8; COMMAND_FRAME];
	loop {
		if stream.read_exact(&mut buffer).await.is_err() {
			debug!("client disconnected");
			return;
		}
		let command = match frame::unpad(&buffer) {
			Ok(command) => command.to_string(),
			Err(frame_error) => {
				warn!("dropping client: {frame_error}");
				return;
			}
		};

		if command == "exit" {
			// notify_one stores a permit, so the signal survives even if
			// the accept loop is not parked in select! right now
			shutdown.notify_one();
			return;
		}

		// synchronous dispatch; the borrow never crosses an await
		let response = daemon.borrow_mut().execute(&command);
		let Some(response) = response else {
			continue;
		};

		let frames = match frame::encode_response(&response.text, response.frame_size) {
			Ok(frames) => frames,
			Err(frame_error) => {
				error!("failed to frame response: {frame_error}");
				continue;
			}
		};
		for page in frames {
			match timeout(WRITE_TIMEOUT, stream.write_all(&page)).await {
				Ok(Ok(())) => {}
				Ok(Err(io_error)) => {
					warn!("failed sending response to client: {io_error}");
					return;
				}
				Err(_) => {
					warn!("client write timed out, dropping connection");
					return;
				}
			}
		}
	}
}
