//! stage-control: Control server embedded in the controlled application
//!
//! The controlled application has exactly one owner thread, the only place
//! where state may be mutated. This crate runs a small TCP accept loop on a
//! background thread and hands every parsed command to the owner thread
//! through the [`executor::OwnerThreadExecutor`]; the host drives execution
//! by calling [`executor::OwnerTick::tick`] from its own loop.

pub mod commands;
pub mod config_store;
pub mod executor;
pub mod registry;
pub mod server;
pub mod session;

pub use config_store::ConfigStore;
pub use executor::{OwnerThreadExecutor, OwnerTick};
pub use registry::CommandRegistry;
pub use server::ControlServer;
pub use session::Session;

use std::sync::Arc;

use stage_core::ServerConfig;

/// Everything a host needs to embed the control plane
pub struct ControlPlane {
    /// The accept-loop server; call `start()` to begin listening
    pub server: ControlServer,
    /// Session state the built-in commands operate on
    pub session: Arc<Session>,
    /// Live configuration applied through the `config` command
    pub config_store: Arc<ConfigStore>,
}

/// Wire up the built-in command set around a session.
///
/// Returns the plane and the tick handle for the host's owner thread. The
/// plane is inert until the host starts the server and begins ticking.
pub fn build(config: ServerConfig, session: Session) -> (ControlPlane, OwnerTick) {
    let session = Arc::new(session);
    let config_store = Arc::new(ConfigStore::new());

    let (executor, tick) = OwnerThreadExecutor::new(config.dispatch_timeout);
    let registry = commands::builtin_registry(
        Arc::clone(&session),
        Arc::clone(&config_store),
        executor.poster(),
    );

    let server = ControlServer::new(config, executor, Arc::new(registry));

    (
        ControlPlane {
            server,
            session,
            config_store,
        },
        tick,
    )
}
