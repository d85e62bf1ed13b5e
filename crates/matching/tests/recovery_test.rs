//! Persistence round-trip tests
//!
//! A daemon is driven against a SQLite file, dropped, and rebuilt from the
//! same file. The reconstructed book must dump identically and the id
//! counter must continue where it left off.

use std::{fs, path::PathBuf};

use bookd_matching::{DEFAULT_SYMBOL_ID, Daemon, SqliteOrderStorage, Symbol};

fn temp_db(tag: &str) -> PathBuf {
	let path = std::env::temp_dir().join(format!("bookd-recovery-{tag}-{}.db", std::process::id()));
	let _ = fs::remove_file(&path);
	path
}

fn open_daemon(path: &PathBuf) -> Daemon {
	let storage = SqliteOrderStorage::open(path).expect("open sqlite");
	Daemon::bootstrap(Box::new(storage), Symbol::new(DEFAULT_SYMBOL_ID, "TEST"))
		.expect("bootstrap from store")
}

fn send(daemon: &mut Daemon, command: &str) -> String {
	daemon
		.execute(command)
		.unwrap_or_else(|| panic!("no response for {command:?}"))
		.text
}

#[test]
fn test_restart_rebuilds_identical_book() {
	let path = temp_db("roundtrip");

	let mut daemon = open_daemon(&path);
	send(&mut daemon, "add limit buy 100 10 A");
	send(&mut daemon, "add limit sell 101 7 B");
	send(&mut daemon, "add stop buy 110 2 C");
	// partially fills order 1 and disappears
	send(&mut daemon, "add limit sell 100 4 D");
	send(&mut daemon, "add trailing stop sell 90 5 100 10 E");
	let dump_before = send(&mut daemon, "get book 1");
	drop(daemon);

	let mut daemon = open_daemon(&path);
	let dump_after = send(&mut daemon, "get book 1");
	assert_eq!(dump_before, dump_after);

	// executed state survived the restart
	let order = send(&mut daemon, "get order 1");
	let row = order.lines().nth(1).unwrap();
	let fields: Vec<&str> = row.split(',').collect();
	assert_eq!(fields[12], "4");
	assert_eq!(fields[13], "6");

	let _ = fs::remove_file(&path);
}

#[test]
fn test_id_counter_continues_after_restart() {
	let path = temp_db("ids");

	let mut daemon = open_daemon(&path);
	assert_eq!(send(&mut daemon, "add limit buy 100 1 A"), "1");
	assert_eq!(send(&mut daemon, "add limit buy 99 1 B"), "2");
	assert_eq!(send(&mut daemon, "add limit buy 98 1 C"), "3");
	// deleting rows must not roll the counter back
	assert_eq!(send(&mut daemon, "delete order A"), "OK");
	assert_eq!(send(&mut daemon, "delete order B"), "OK");
	assert_eq!(send(&mut daemon, "delete order C"), "OK");
	drop(daemon);

	let mut daemon = open_daemon(&path);
	assert_eq!(send(&mut daemon, "add limit buy 97 1 D"), "4");

	let _ = fs::remove_file(&path);
}

#[test]
fn test_info_strings_survive_restart() {
	let path = temp_db("infos");

	let mut daemon = open_daemon(&path);
	send(&mut daemon, "add limit buy 100 1 external txn 42");
	drop(daemon);

	let mut daemon = open_daemon(&path);
	let order = send(&mut daemon, "get order 1");
	assert!(order.contains("\"external txn 42\""));
	assert_eq!(send(&mut daemon, "delete order external txn 42"), "OK");

	let _ = fs::remove_file(&path);
}

#[test]
fn test_fully_filled_orders_leave_no_rows() {
	let path = temp_db("filled");

	let mut daemon = open_daemon(&path);
	send(&mut daemon, "add limit buy 100 5 A");
	send(&mut daemon, "add limit sell 100 5 B");
	drop(daemon);

	let mut daemon = open_daemon(&path);
	assert_eq!(send(&mut daemon, "get order 1"), "FAIL");
	assert_eq!(send(&mut daemon, "get order 2"), "FAIL");
	// but their ids stay burned
	assert_eq!(send(&mut daemon, "add limit buy 90 1 C"), "3");

	let _ = fs::remove_file(&path);
}
