//! Behavioural coverage for configuration layering.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use glowpipe_config::{
    Config, DEFAULT_MAX_BUFFER_BYTES, SocketEndpoint, default_log_filter, default_log_format,
    default_socket_endpoint, endpoint_for_name,
};

const SOCKET_VARIABLE: &str = "GLOWPIPE_DAEMON_SOCKET";

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct Harness {
    temp_dir: TempDir,
    cli_args: RefCell<Vec<OsString>>,
    env_overrides: RefCell<Vec<(String, Option<OsString>)>>,
    loaded: RefCell<Option<Config>>,
    error: RefCell<Option<String>>,
    _env_guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn new() -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let temp_dir = TempDir::new().expect("temporary directory");
        let harness = Self {
            temp_dir,
            cli_args: RefCell::new(vec![OsString::from("glowpiped")]),
            env_overrides: RefCell::new(Vec::new()),
            loaded: RefCell::new(None),
            error: RefCell::new(None),
            _env_guard: guard,
        };
        // Ambient values from the developer's shell must not leak in.
        harness.clear_env(SOCKET_VARIABLE);
        harness.clear_env("GLOWPIPE_ENDPOINT_NAME");
        harness
    }

    fn write_config(&self, socket: &str) {
        let path = self.temp_dir.path().join("glowpipe.toml");
        fs::write(&path, format!("daemon_socket = \"{socket}\"\n")).expect("write configuration");
        let mut args = self.cli_args.borrow_mut();
        args.push(OsString::from("--config-path"));
        args.push(path.into_os_string());
    }

    fn remember(&self, key: &str) {
        let previous = std::env::var_os(key);
        self.env_overrides
            .borrow_mut()
            .push((key.to_owned(), previous));
    }

    fn set_env(&self, key: &str, value: &str) {
        self.remember(key);
        unsafe { std::env::set_var(key, value) };
    }

    fn clear_env(&self, key: &str) {
        self.remember(key);
        unsafe { std::env::remove_var(key) };
    }

    fn push_cli_arg(&self, arg: impl Into<OsString>) {
        self.cli_args.borrow_mut().push(arg.into());
    }

    fn load(&self) {
        if self.loaded.borrow().is_some() || self.error.borrow().is_some() {
            return;
        }
        let args = self.cli_args.borrow().clone();
        match Config::load_from_iter(args) {
            Ok(config) => *self.loaded.borrow_mut() = Some(config),
            Err(error) => *self.error.borrow_mut() = Some(error.to_string()),
        }
    }

    fn config(&self) -> Config {
        self.load();
        if let Some(error) = self.error.borrow().as_ref() {
            panic!("configuration failed to load: {error}");
        }
        self.loaded
            .borrow()
            .clone()
            .expect("configuration was not loaded")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let mut overrides = self.env_overrides.borrow_mut();
        while let Some((key, value)) = overrides.pop() {
            match value {
                Some(os_value) => unsafe { std::env::set_var(&key, os_value) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

#[given("a configuration file setting the daemon socket to \"{socket}\"")]
fn given_configuration_file(harness: &Harness, socket: String) {
    harness.write_config(&socket);
}

#[given("the environment overrides the daemon socket to \"{socket}\"")]
fn given_environment_override(harness: &Harness, socket: String) {
    harness.set_env(SOCKET_VARIABLE, &socket);
}

#[when("the CLI sets the daemon socket to \"{socket}\"")]
fn when_cli_sets_socket(harness: &Harness, socket: String) {
    harness.push_cli_arg("--daemon-socket");
    harness.push_cli_arg(socket);
}

#[when("the CLI sets the endpoint name to \"{name}\"")]
fn when_cli_sets_name(harness: &Harness, name: String) {
    harness.push_cli_arg("--endpoint-name");
    harness.push_cli_arg(name);
}

#[when("the configuration loads without overrides")]
fn when_load_without_overrides(harness: &Harness) {
    harness.load();
}

#[then("loading the configuration resolves the daemon socket to \"{socket}\"")]
fn then_resolved_socket(harness: &Harness, socket: String) {
    let expected: SocketEndpoint = socket.parse().expect("expected socket parses");
    assert_eq!(harness.config().daemon_socket(), Ok(expected));
}

#[then("loading the configuration resolves the endpoint named \"{name}\"")]
fn then_resolved_name(harness: &Harness, name: String) {
    let config = harness.config();
    assert_eq!(config.endpoint_name(), name);
    assert_eq!(config.daemon_socket(), Ok(endpoint_for_name(&name)));
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults_applied(harness: &Harness) {
    let config = harness.config();
    assert_eq!(config.daemon_socket(), Ok(default_socket_endpoint()));
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.max_buffer_bytes(), DEFAULT_MAX_BUFFER_BYTES);
}

#[scenario(path = "tests/features/configuration_precedence.feature")]
fn configuration_precedence(#[from(harness)] harness: Harness) {
    drop(harness);
}
