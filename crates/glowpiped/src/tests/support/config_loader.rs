//! Configuration loaders for success and failure paths.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use glowpipe_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that places the driver socket under a private temporary directory.
#[derive(Clone)]
pub(crate) struct TestConfigLoader {
    socket_dir: Arc<TempDir>,
}

impl TestConfigLoader {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary socket directory");
        Self {
            socket_dir: Arc::new(dir),
        }
    }

    pub(crate) fn socket_path(&self) -> PathBuf {
        self.socket_dir.path().join("run").join("driver.sock")
    }

    pub(crate) fn endpoint(&self) -> SocketEndpoint {
        let path = self.socket_path();
        SocketEndpoint::unix(path.to_str().expect("temporary socket path is UTF-8"))
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config::with_socket(self.endpoint()))
    }
}

/// Loader whose command line names an unsupported transport.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("glowpiped"),
            OsString::from("--daemon-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
