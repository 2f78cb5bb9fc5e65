//! Session state for the built-in commands
//!
//! The host-integration seam: a set of build scenes, the currently open
//! scene, and a playing flag. Real hosts mutate their own engine state from
//! the same hooks; this model carries the observable contract the commands
//! promise over the wire.

use std::path::Path;
use std::sync::Mutex;

/// Scene list, open scene, and play state of the controlled application
pub struct Session {
    inner: Mutex<SessionInner>,
}

struct SessionInner {
    /// Scene paths in build order
    scenes: Vec<String>,
    /// Currently open scene, if any
    open_scene: Option<String>,
    /// Whether a play session is running
    playing: bool,
}

impl Session {
    /// Create a session over the given build scene list
    pub fn new(scenes: Vec<String>) -> Self {
        let open_scene = scenes.first().cloned();
        Self {
            inner: Mutex::new(SessionInner {
                scenes,
                open_scene,
                playing: false,
            }),
        }
    }

    /// Resolve a start argument to a scene path.
    ///
    /// An integer argument indexes the build list; a negative index (and an
    /// empty argument) means the currently open scene; an out-of-range index
    /// is not found. A non-integer argument matches a scene by file stem or
    /// full path, case-insensitively, falling back to the literal argument.
    pub fn resolve_scene(&self, argument: &str) -> Option<String> {
        let inner = self.lock();

        let argument = argument.trim();
        if argument.is_empty() {
            return inner.open_scene.clone();
        }

        if let Ok(index) = argument.parse::<i64>() {
            if index < 0 {
                return inner.open_scene.clone();
            }
            return inner.scenes.get(index as usize).cloned();
        }

        for path in &inner.scenes {
            let stem = Path::new(path).file_stem().and_then(|s| s.to_str());
            if stem.is_some_and(|s| s.eq_ignore_ascii_case(argument))
                || path.eq_ignore_ascii_case(argument)
            {
                return Some(path.clone());
            }
        }

        // Let the open step decide whether the literal path is usable
        Some(argument.to_string())
    }

    /// Open a scene. Opening the scene that is already open is a no-op.
    ///
    /// Returns false when the path is not a known scene.
    pub fn open_scene(&self, path: &str) -> bool {
        let mut inner = self.lock();

        if inner
            .open_scene
            .as_deref()
            .is_some_and(|open| open.eq_ignore_ascii_case(path))
        {
            return true;
        }

        if inner.scenes.iter().any(|s| s.eq_ignore_ascii_case(path)) {
            inner.open_scene = Some(path.to_string());
            return true;
        }

        false
    }

    /// Begin playing. Fails when no scene is open to play.
    pub fn start_playing(&self) -> bool {
        let mut inner = self.lock();
        if inner.open_scene.is_none() {
            return false;
        }
        inner.playing = true;
        true
    }

    /// Stop playing if currently playing
    pub fn stop_playing(&self) {
        self.lock().playing = false;
    }

    /// Flip the play state
    pub fn toggle_playing(&self) {
        let mut inner = self.lock();
        inner.playing = !inner.playing;
    }

    /// Whether a play session is running
    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// The currently open scene path
    pub fn open_scene_path(&self) -> Option<String> {
        self.lock().open_scene.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(vec![
            "Scenes/Boot.scene".to_string(),
            "Scenes/Main.scene".to_string(),
            "Scenes/Credits.scene".to_string(),
        ])
    }

    #[test]
    fn test_resolve_by_index() {
        let s = session();
        assert_eq!(s.resolve_scene("1").as_deref(), Some("Scenes/Main.scene"));
        assert_eq!(s.resolve_scene("0").as_deref(), Some("Scenes/Boot.scene"));
    }

    #[test]
    fn test_resolve_out_of_range_index() {
        let s = session();
        assert_eq!(s.resolve_scene("3"), None);
        assert_eq!(s.resolve_scene("99"), None);
    }

    #[test]
    fn test_resolve_negative_or_empty_means_current() {
        let s = session();
        assert_eq!(s.resolve_scene("-1").as_deref(), Some("Scenes/Boot.scene"));
        assert_eq!(s.resolve_scene("").as_deref(), Some("Scenes/Boot.scene"));
    }

    #[test]
    fn test_resolve_negative_with_no_open_scene() {
        let s = Session::new(Vec::new());
        assert_eq!(s.resolve_scene("-1"), None);
    }

    #[test]
    fn test_resolve_by_name_case_insensitive() {
        let s = session();
        assert_eq!(s.resolve_scene("main").as_deref(), Some("Scenes/Main.scene"));
        assert_eq!(
            s.resolve_scene("CREDITS").as_deref(),
            Some("Scenes/Credits.scene")
        );
    }

    #[test]
    fn test_resolve_by_full_path() {
        let s = session();
        assert_eq!(
            s.resolve_scene("scenes/main.scene").as_deref(),
            Some("Scenes/Main.scene")
        );
    }

    #[test]
    fn test_resolve_unknown_name_falls_back_to_literal() {
        let s = session();
        assert_eq!(s.resolve_scene("Missing").as_deref(), Some("Missing"));
    }

    #[test]
    fn test_open_unknown_scene_fails() {
        let s = session();
        assert!(!s.open_scene("Missing"));
    }

    #[test]
    fn test_open_already_open_scene_is_noop() {
        let s = session();
        assert!(s.open_scene("Scenes/Boot.scene"));
        assert_eq!(s.open_scene_path().as_deref(), Some("Scenes/Boot.scene"));
    }

    #[test]
    fn test_start_playing_requires_open_scene() {
        let s = Session::new(Vec::new());
        assert!(!s.start_playing());
        assert!(!s.is_playing());

        let s = session();
        assert!(s.start_playing());
        assert!(s.is_playing());
    }

    #[test]
    fn test_play_state_transitions() {
        let s = session();
        assert!(!s.is_playing());
        assert!(s.start_playing());
        assert!(s.is_playing());
        s.toggle_playing();
        assert!(!s.is_playing());
        s.toggle_playing();
        s.stop_playing();
        assert!(!s.is_playing());
    }
}
