use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

static NEXT_HOSTS_FILE_ID: AtomicU64 = AtomicU64::new(0);

/// Write a minimal `/etc/hosts`-style file to a fresh temp path for
/// `hosts` backend tests, returning its path.
///
/// The path is suffixed with a per-call counter on top of the process id,
/// since `cargo test` runs tests in the same process concurrently by
/// default and a process-id-only name would let two tests race on the
/// same file.
pub fn write_hosts_file(contents: &str) -> std::path::PathBuf {
    let unique = NEXT_HOSTS_FILE_ID.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!("netresolve-test-hosts-{}-{unique}", std::process::id()));
    let mut file = std::fs::File::create(&path).expect("failed to create temp hosts file");
    file.write_all(contents.as_bytes()).expect("failed to write temp hosts file");
    path
}
