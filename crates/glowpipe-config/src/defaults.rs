//! Built-in defaults shared by the daemon and the client.

use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::runtime_dir;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Endpoint name the driver listens on unless told otherwise.
pub const DEFAULT_ENDPOINT_NAME: &str = "OpenRGB_WDL_Driver";

/// TCP port used where Unix domain sockets are not available.
pub const DEFAULT_TCP_PORT: u16 = 47_311;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default cap on a single connection's buffers, in bytes.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Owned endpoint name for configuration defaults.
pub fn default_endpoint_name() -> String {
    DEFAULT_ENDPOINT_NAME.to_owned()
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required.
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Endpoint used when neither a socket nor a name is configured.
pub fn default_socket_endpoint() -> SocketEndpoint {
    endpoint_for_name(DEFAULT_ENDPOINT_NAME)
}

/// Maps an endpoint name onto the platform's local transport.
///
/// On Unix the name becomes `<runtime dir>/glowpipe/<name>.sock`. When no
/// per-user runtime directory exists the temporary directory is used instead,
/// namespaced by effective user id so two users never share a socket.
pub fn endpoint_for_name(name: &str) -> SocketEndpoint {
    endpoint_for_name_inner(name)
}

#[cfg(unix)]
fn endpoint_for_name_inner(name: &str) -> SocketEndpoint {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("glowpipe");
    if apply_namespace {
        base.push(user_namespace());
    }

    SocketEndpoint::unix(base.join(format!("{name}.sock")))
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn endpoint_for_name_inner(_name: &str) -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
