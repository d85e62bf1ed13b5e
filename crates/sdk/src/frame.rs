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

//! Socket frame codec
//!
//! Commands and responses travel in fixed-size, NUL-padded textual frames.
//! A response that does not fit its frame is split into pages announced by
//! a `PAGES >> NNNN\n` header frame. This module is the only place that
//! knows about the pagination convention, so the transport framing can be
//! replaced without touching the engine or the dispatcher.

use thiserror::Error;

/// Command frame size in bytes (command text + trailing NUL padding)
pub const COMMAND_FRAME: usize = 256;

/// Response frame for small replies (ids, OK, FAIL)
pub const RESPONSE_FRAME_SMALL: usize = 64;

/// Response frame for single-order CSV
pub const RESPONSE_FRAME_ORDER: usize = 256;

/// Response frame for order-book CSV
pub const RESPONSE_FRAME_BOOK: usize = 1024;

/// Prefix of the pagination header frame
pub const PAGES_PREFIX: &str = "PAGES >> ";

/// Error types for frame encoding and decoding
#[derive(Debug, Error)]
pub enum FrameError {
	#[error("frame content is not valid UTF-8")]
	InvalidUtf8,
	#[error("content does not fit a {0}-byte frame")]
	ContentTooLong(usize),
	#[error("malformed pagination header: {0}")]
	InvalidHeader(String),
}

/// Pad textual content into a fixed-size frame.
///
/// The content must leave room for at least one trailing NUL.
pub fn pad(content: &str, size: usize) -> Result<Vec<u8>, FrameError> {
	if content.len() >= size {
		return Err(FrameError::ContentTooLong(size));
	}
	let mut frame = vec![0u8; size];
	frame[..content.len()].copy_from_slice(content.as_bytes());
	Ok(frame)
}

/// Extract the textual content of a frame (bytes up to the first NUL).
pub fn unpad(frame: &[u8]) -> Result<&str, FrameError> {
	let end = frame.iter().position(|b| *b == 0).unwrap_or(frame.len());
	std::str::from_utf8(&frame[..end]).map_err(|_| FrameError::InvalidUtf8)
}

/// Encode a response into one or more fixed-size frames.
///
/// A response that fits yields a single frame. Otherwise the first frame
/// carries a `PAGES >> NNNN\n` header and the content follows in that many
/// pages of `size - 1` bytes each (every page is NUL-terminated).
pub fn encode_response(response: &str, size: usize) -> Result<Vec<Vec<u8>>, FrameError> {
	if response.len() < size {
		return Ok(vec![pad(response, size)?]);
	}

	let chunk = size - 1;
	let bytes = response.as_bytes();
	let pages = bytes.len().div_ceil(chunk);
	if pages > 9999 {
		return Err(FrameError::ContentTooLong(size));
	}

	let mut frames = Vec::with_capacity(pages + 1);
	frames.push(pad(&format!("{}{:04}\n", PAGES_PREFIX, pages), size)?);
	for page in bytes.chunks(chunk) {
		let mut frame = vec![0u8; size];
		frame[..page.len()].copy_from_slice(page);
		frames.push(frame);
	}
	Ok(frames)
}

/// Parse a pagination header, returning the announced page count.
///
/// Returns `Ok(None)` when the content is not a pagination header (i.e. the
/// frame already holds the whole response).
pub fn parse_pages_header(content: &str) -> Result<Option<usize>, FrameError> {
	let Some(rest) = content.strip_prefix(PAGES_PREFIX) else {
		return Ok(None);
	};
	let digits = rest
		.strip_suffix('\n')
		.ok_or_else(|| FrameError::InvalidHeader(content.to_string()))?;
	if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return Err(FrameError::InvalidHeader(content.to_string()));
	}
	let pages = digits
		.parse::<usize>()
		.map_err(|_| FrameError::InvalidHeader(content.to_string()))?;
	Ok(Some(pages))
}

/// Response frame size the daemon uses for a given command.
///
/// Clients must read responses with the same mapping: book dumps use the
/// large frame, single-order CSV the medium one, everything else the small
/// one.
pub fn response_frame_size(command: &str) -> usize {
	if command.starts_with("get book") {
		RESPONSE_FRAME_BOOK
	} else if command.starts_with("get order") {
		RESPONSE_FRAME_ORDER
	} else {
		RESPONSE_FRAME_SMALL
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pad_and_unpad() {
		let frame = pad("OK", RESPONSE_FRAME_SMALL).unwrap();
		assert_eq!(frame.len(), RESPONSE_FRAME_SMALL);
		assert_eq!(unpad(&frame).unwrap(), "OK");
	}

	#[test]
	fn test_pad_rejects_oversized_content() {
		let content = "x".repeat(RESPONSE_FRAME_SMALL);
		assert!(pad(&content, RESPONSE_FRAME_SMALL).is_err());
	}

	#[test]
	fn test_single_frame_response() {
		let frames = encode_response("42", RESPONSE_FRAME_SMALL).unwrap();
		assert_eq!(frames.len(), 1);
		assert_eq!(unpad(&frames[0]).unwrap(), "42");
	}

	#[test]
	fn test_paginated_response() {
		let response = "a".repeat(100);
		let frames = encode_response(&response, RESPONSE_FRAME_SMALL).unwrap();
		// header + ceil(100 / 63) pages
		assert_eq!(frames.len(), 3);

		let header = unpad(&frames[0]).unwrap();
		assert_eq!(header, "PAGES >> 0002\n");
		assert_eq!(parse_pages_header(header).unwrap(), Some(2));

		let mut reassembled = String::new();
		for frame in &frames[1..] {
			reassembled.push_str(unpad(frame).unwrap());
		}
		assert_eq!(reassembled, response);
	}

	#[test]
	fn test_pages_header_is_zero_padded() {
		let response = "b".repeat(RESPONSE_FRAME_BOOK * 2);
		let frames = encode_response(&response, RESPONSE_FRAME_BOOK).unwrap();
		let header = unpad(&frames[0]).unwrap();
		assert!(header.starts_with("PAGES >> 000"));
	}

	#[test]
	fn test_non_header_content_passes_through() {
		assert_eq!(parse_pages_header("OK").unwrap(), None);
		assert!(parse_pages_header("PAGES >> 12\n").is_err());
		assert!(parse_pages_header("PAGES >> abcd\n").is_err());
	}

	#[test]
	fn test_response_frame_size_mapping() {
		assert_eq!(response_frame_size("get book 1"), RESPONSE_FRAME_BOOK);
		assert_eq!(response_frame_size("get order 7"), RESPONSE_FRAME_ORDER);
		assert_eq!(
			response_frame_size("add limit buy 100 10 abc"),
			RESPONSE_FRAME_SMALL
		);
	}
}
