use std::path::{Path, PathBuf};

use roster_core::config::ROSTER_DIR;

pub const DAEMON_SOCKET: &str = "roster.sock";

pub fn roster_root(home: &Path) -> PathBuf {
    home.join(ROSTER_DIR)
}

pub fn socket_path(home: &Path) -> PathBuf {
    roster_root(home).join(DAEMON_SOCKET)
}
