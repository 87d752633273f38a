//! Runtime configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use incident_map_map::DEFAULT_FOCUS_ZOOM;
use incident_map_panel::DEFAULT_PANEL_DELAY;

/// Directory holding the persisted key-value documents.
pub const DATA_DIR_ENV: &str = "INCIDENT_MAP_DATA_DIR";
/// Detail panel re-entry delay in milliseconds.
pub const PANEL_DELAY_ENV: &str = "INCIDENT_MAP_PANEL_DELAY_MS";
/// Zoom level used when navigating to an incident.
pub const FOCUS_ZOOM_ENV: &str = "INCIDENT_MAP_FOCUS_ZOOM";
/// Path of the credential store.
pub const CREDENTIALS_ENV: &str = "INCIDENT_MAP_CREDENTIALS";

const DEFAULT_DATA_DIR: &str = "data";
const CREDENTIALS_FILE: &str = "password_store.json";

/// Application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Where incidents and the counter are persisted.
    pub data_dir: PathBuf,
    /// Credential store file.
    pub credentials_path: PathBuf,
    /// Detail panel slide-out delay.
    pub panel_delay: Duration,
    /// Zoom used by marker clicks and "See More".
    pub focus_zoom: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            credentials_path: data_dir.join(CREDENTIALS_FILE),
            data_dir,
            panel_delay: DEFAULT_PANEL_DELAY,
            focus_zoom: DEFAULT_FOCUS_ZOOM,
        }
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, using defaults for unset or
    /// unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let data_dir = lookup(DATA_DIR_ENV).map_or(defaults.data_dir, PathBuf::from);
        let credentials_path = lookup(CREDENTIALS_ENV)
            .map_or_else(|| data_dir.join(CREDENTIALS_FILE), PathBuf::from);
        let panel_delay = parsed(&lookup, PANEL_DELAY_ENV)
            .map_or(defaults.panel_delay, Duration::from_millis);
        let focus_zoom = parsed(&lookup, FOCUS_ZOOM_ENV).unwrap_or(defaults.focus_zoom);

        Self {
            data_dir,
            credentials_path,
            panel_delay,
            focus_zoom,
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    let value = raw.trim().parse().ok();
    if value.is_none() {
        log::warn!("Ignoring invalid {name}={raw:?}; using default");
    }
    value
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.panel_delay, Duration::from_millis(500));
        assert_eq!(config.credentials_path, PathBuf::from("data/password_store.json"));
    }

    #[test]
    fn credentials_follow_data_dir() {
        let config = AppConfig::from_lookup(lookup(&[(DATA_DIR_ENV, "/var/lib/incidents")]));
        assert_eq!(
            config.credentials_path,
            PathBuf::from("/var/lib/incidents/password_store.json")
        );
    }

    #[test]
    fn overrides_and_invalid_values() {
        let config = AppConfig::from_lookup(lookup(&[
            (PANEL_DELAY_ENV, "250"),
            (FOCUS_ZOOM_ENV, "not a number"),
            (CREDENTIALS_ENV, "/etc/incident-map/creds.json"),
        ]));
        assert_eq!(config.panel_delay, Duration::from_millis(250));
        assert!((config.focus_zoom - DEFAULT_FOCUS_ZOOM).abs() < f64::EPSILON);
        assert_eq!(
            config.credentials_path,
            PathBuf::from("/etc/incident-map/creds.json")
        );
    }
}
