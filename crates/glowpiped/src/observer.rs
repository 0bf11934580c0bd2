//! Notifications about clients joining and leaving.

use std::sync::Arc;

use crate::server::ClientId;

const OBSERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::clients");

/// Observer notified as connections are accepted and torn down.
pub trait ClientObserver: Send + Sync {
    /// Invoked once a connection has been accepted and registered.
    fn client_connected(&self, client: ClientId);

    /// Invoked once a connection has left the live set.
    fn client_disconnected(&self, client: ClientId);
}

impl<T> ClientObserver for Arc<T>
where
    T: ClientObserver + ?Sized,
{
    fn client_connected(&self, client: ClientId) {
        (**self).client_connected(client);
    }

    fn client_disconnected(&self, client: ClientId) {
        (**self).client_disconnected(client);
    }
}

/// Default observer that records client churn using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredClientObserver;

impl StructuredClientObserver {
    /// Builds a new observer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ClientObserver for StructuredClientObserver {
    fn client_connected(&self, client: ClientId) {
        tracing::info!(
            target: OBSERVER_TARGET,
            event = "client_connected",
            %client,
            "client connected"
        );
    }

    fn client_disconnected(&self, client: ClientId) {
        tracing::info!(
            target: OBSERVER_TARGET,
            event = "client_disconnected",
            %client,
            "client disconnected"
        );
    }
}
