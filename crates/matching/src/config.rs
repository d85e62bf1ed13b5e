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

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for configuration
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid root directory: {0}")]
	InvalidRoot(PathBuf),
}

/// Daemon configuration
///
/// All runtime files live under the root directory and share the daemon
/// name: `<root>/<name>.sock`, `.log`, `.err`, `.status` and `.db`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
	pub name: String,
	pub root: PathBuf,
}

impl DaemonConfig {
	/// Validate the root directory and build the configuration.
	pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
		let root: PathBuf = root.into();
		if !root.is_dir() {
			return Err(ConfigError::InvalidRoot(root));
		}
		let root = root.canonicalize().map_err(|_| ConfigError::InvalidRoot(root.clone()))?;
		Ok(Self {
			name: name.into(),
			root,
		})
	}

	fn file(&self, extension: &str) -> PathBuf {
		self.root.join(format!("{}.{extension}", self.name))
	}

	pub fn socket_path(&self) -> PathBuf {
		self.file("sock")
	}

	pub fn log_path(&self) -> PathBuf {
		self.file("log")
	}

	pub fn err_path(&self) -> PathBuf {
		self.file("err")
	}

	pub fn status_path(&self) -> PathBuf {
		self.file("status")
	}

	pub fn db_path(&self) -> PathBuf {
		self.file("db")
	}
}

impl AsRef<Path> for DaemonConfig {
	fn as_ref(&self) -> &Path {
		&self.root
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_paths_derive_from_name() {
		let config = DaemonConfig::new("books", std::env::temp_dir()).unwrap();
		assert!(config.socket_path().ends_with("books.sock"));
		assert!(config.log_path().ends_with("books.log"));
		assert!(config.err_path().ends_with("books.err"));
		assert!(config.status_path().ends_with("books.status"));
		assert!(config.db_path().ends_with("books.db"));
	}

	#[test]
	fn test_missing_root_rejected() {
		let missing = std::env::temp_dir().join("bookd-no-such-dir");
		assert!(DaemonConfig::new("books", missing).is_err());
	}
}
