//! Socket end-to-end tests
//!
//! The connection loop is served on a `LocalSet` while an SDK client
//! exchanges framed commands over the unix socket, including a paginated
//! book dump and the graceful `exit`.

use std::{cell::RefCell, fs, path::PathBuf, rc::Rc};

use bookd_matching::{DEFAULT_SYMBOL_ID, Daemon, MemoryOrderStorage, Symbol, server};
use bookd_sdk::BookClient;
use tokio::net::UnixListener;

fn temp_socket(tag: &str) -> PathBuf {
	let path = std::env::temp_dir().join(format!("bookd-{tag}-{}.sock", std::process::id()));
	let _ = fs::remove_file(&path);
	path
}

fn create_test_daemon() -> Rc<RefCell<Daemon>> {
	let daemon = Daemon::bootstrap(
		Box::new(MemoryOrderStorage::new()),
		Symbol::new(DEFAULT_SYMBOL_ID, "TEST"),
	)
	.expect("bootstrap on an empty store");
	Rc::new(RefCell::new(daemon))
}

#[tokio::test]
async fn test_command_round_trip_over_socket() {
	let socket_path = temp_socket("roundtrip");
	let daemon = create_test_daemon();
	let local = tokio::task::LocalSet::new();

	local
		.run_until(async {
			let listener = UnixListener::bind(&socket_path).unwrap();
			let server = tokio::task::spawn_local(server::run(listener, daemon.clone()));

			let mut client = BookClient::connect(&socket_path).await.unwrap();
			assert_eq!(client.send("add limit buy 100 10 A").await.unwrap(), "1");
			assert_eq!(client.send("add limit sell 100 4 B").await.unwrap(), "2");
			assert_eq!(client.send("nonsense").await.unwrap(), "FAIL");

			let order = client.send("get order 1").await.unwrap();
			assert!(order.starts_with("Id,SymbolId,Type,"));
			assert!(order.contains("1,1,LIMIT,BUY,100,"));

			client.exit().await.unwrap();
			server.await.unwrap().unwrap();
		})
		.await;

	let _ = fs::remove_file(&socket_path);
}

#[tokio::test]
async fn test_large_book_dump_is_paginated() {
	let socket_path = temp_socket("pages");
	let daemon = create_test_daemon();
	let local = tokio::task::LocalSet::new();

	local
		.run_until(async {
			let listener = UnixListener::bind(&socket_path).unwrap();
			let server = tokio::task::spawn_local(server::run(listener, daemon.clone()));

			let mut client = BookClient::connect(&socket_path).await.unwrap();
			for price in 0..30u64 {
				let command = format!("add limit buy {} 10 order-{price}", 100 + price);
				client.send(&command).await.unwrap();
			}

			// well over one 1024-byte frame; the client reassembles pages
			let book = client.send("get book 1").await.unwrap();
			assert!(book.len() > 1024);
			let bids = book
				.lines()
				.filter(|line| line.starts_with("BIDS,"))
				.count();
			assert_eq!(bids, 30);
			// best bid first in the dump
			assert!(book.lines().nth(1).unwrap().starts_with("BIDS,BID,129,"));

			client.exit().await.unwrap();
			server.await.unwrap().unwrap();
		})
		.await;

	let _ = fs::remove_file(&socket_path);
}

#[tokio::test]
async fn test_commands_from_two_clients_serialize() {
	let socket_path = temp_socket("two-clients");
	let daemon = create_test_daemon();
	let local = tokio::task::LocalSet::new();

	local
		.run_until(async {
			let listener = UnixListener::bind(&socket_path).unwrap();
			let server = tokio::task::spawn_local(server::run(listener, daemon.clone()));

			let mut first = BookClient::connect(&socket_path).await.unwrap();
			let mut second = BookClient::connect(&socket_path).await.unwrap();

			// ids are assigned in command arrival order across clients
			assert_eq!(first.send("add limit buy 100 1 A").await.unwrap(), "1");
			assert_eq!(second.send("add limit buy 101 1 B").await.unwrap(), "2");
			assert_eq!(first.send("add limit buy 102 1 C").await.unwrap(), "3");

			second.exit().await.unwrap();
			server.await.unwrap().unwrap();
		})
		.await;

	let _ = fs::remove_file(&socket_path);
}
