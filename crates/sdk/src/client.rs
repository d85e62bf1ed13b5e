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

//! Typed client for the bookd daemon socket
//!
//! One request/response exchange per command: the command is written as a
//! single 256-byte frame, the response is read back with the frame size
//! that command implies, reassembling paginated responses transparently.

use std::path::Path;

use thiserror::Error;
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::UnixStream,
};

use crate::frame::{self, COMMAND_FRAME, FrameError};

/// Error types for client operations
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),
	#[error("frame error: {0}")]
	Frame(#[from] FrameError),
	#[error("command does not fit a single frame")]
	CommandTooLong,
}

/// Client connection to a bookd daemon over its unix stream socket
pub struct BookClient {
	stream: UnixStream,
}

impl BookClient {
	/// Connect to a daemon socket
	pub async fn connect(path: impl AsRef<Path>) -> Result<Self, ClientError> {
		let stream = UnixStream::connect(path).await?;
		Ok(Self { stream })
	}

	/// Send one command and read back the full response.
	///
	/// The daemon sends exactly one response per command; paginated
	/// responses are reassembled into a single string.
	pub async fn send(&mut self, command: &str) -> Result<String, ClientError> {
		if command.len() >= COMMAND_FRAME {
			return Err(ClientError::CommandTooLong);
		}
		let request = frame::pad(command, COMMAND_FRAME)?;
		self.stream.write_all(&request).await?;

		let size = frame::response_frame_size(command);
		let first = self.read_frame(size).await?;
		let content = frame::unpad(&first)?;

		let Some(pages) = frame::parse_pages_header(content)? else {
			return Ok(content.to_string());
		};

		let mut response = Vec::new();
		for _ in 0..pages {
			let page = self.read_frame(size).await?;
			let end = page.iter().position(|b| *b == 0).unwrap_or(page.len());
			response.extend_from_slice(&page[..end]);
		}
		String::from_utf8(response).map_err(|_| ClientError::Frame(FrameError::InvalidUtf8))
	}

	/// Request a graceful daemon shutdown.
	///
	/// The `exit` command receives no response; the daemon closes the
	/// socket after the current command completes.
	pub async fn exit(&mut self) -> Result<(), ClientError> {
		let request = frame::pad("exit", COMMAND_FRAME)?;
		self.stream.write_all(&request).await?;
		Ok(())
	}

	async fn read_frame(&mut self, size: usize) -> Result<Vec<u8>, ClientError> {
		let mut frame = vec![0u8; size];
		self.stream.read_exact(&mut frame).await?;
		Ok(frame)
	}
}
