//! Built-in command set
//!
//! Wires the wire-level contracts onto the session model. Handlers run on
//! the owner thread; `stop`, `toggle`, and the `config` apply step defer
//! their mutation to the next tick through the executor's poster, so the
//! response goes out immediately and ordering against later commands is
//! preserved.

use std::sync::Arc;

use serde_json::Value;

use stage_protocol::tokens;

use crate::config_store::ConfigStore;
use crate::executor::DeferredPoster;
use crate::registry::CommandRegistry;
use crate::session::Session;

/// Build the registry with the built-in commands:
/// `start`, `stop`, `toggle`, `status`, `editor-health`, `playmode-health`,
/// `health`, `config`.
pub fn builtin_registry(
    session: Arc<Session>,
    config_store: Arc<ConfigStore>,
    poster: DeferredPoster,
) -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    let start_session = Arc::clone(&session);
    registry.register("start", move |argument: &str| {
        let Some(scene) = start_session.resolve_scene(argument) else {
            return tokens::ERROR_SCENE_NOT_FOUND.to_string();
        };
        if !start_session.open_scene(&scene) {
            return tokens::ERROR_OPEN_SCENE_FAILED.to_string();
        }
        if !start_session.start_playing() {
            return tokens::ERROR_START_FAILED.to_string();
        }
        tokens::OK_STARTED.to_string()
    });

    let stop_session = Arc::clone(&session);
    let stop_poster = poster.clone();
    registry.register("stop", move |_: &str| {
        let session = Arc::clone(&stop_session);
        if let Err(e) = stop_poster.post(move || session.stop_playing()) {
            tracing::warn!("Could not schedule stop: {}", e);
        }
        tokens::OK_STOPPED.to_string()
    });

    let toggle_session = Arc::clone(&session);
    let toggle_poster = poster.clone();
    registry.register("toggle", move |_: &str| {
        let session = Arc::clone(&toggle_session);
        if let Err(e) = toggle_poster.post(move || session.toggle_playing()) {
            tracing::warn!("Could not schedule toggle: {}", e);
        }
        tokens::OK_TOGGLED.to_string()
    });

    let status_session = Arc::clone(&session);
    registry.register("status", move |_: &str| {
        if status_session.is_playing() {
            tokens::STATUS_PLAYING.to_string()
        } else {
            tokens::STATUS_STOPPED.to_string()
        }
    });

    // Reachable and dispatching is what "editor healthy" means; the probe
    // must not mutate anything.
    registry.register("editor-health", |_: &str| tokens::HEALTHY.to_string());

    let playmode_session = Arc::clone(&session);
    registry.register("playmode-health", move |_: &str| {
        if playmode_session.is_playing() {
            tokens::HEALTHY.to_string()
        } else {
            tokens::UNHEALTHY.to_string()
        }
    });

    // Merged probe: healthy only when every facet is
    let health_session = Arc::clone(&session);
    registry.register("health", move |_: &str| {
        if health_session.is_playing() {
            tokens::HEALTHY.to_string()
        } else {
            tokens::UNHEALTHY.to_string()
        }
    });

    registry.register("config", move |argument: &str| {
        if argument.trim().is_empty() {
            return tokens::ERROR_EMPTY_BODY.to_string();
        }

        let document: Value = match serde_json::from_str(argument) {
            Ok(document) => document,
            Err(e) => return format!("error:invalid_json:{}", e),
        };

        let store = Arc::clone(&config_store);
        match poster.post(move || store.replace(document)) {
            Ok(()) => tokens::OK.to_string(),
            Err(e) => format!("error:apply_failed:{}", e),
        }
    });

    registry
}
