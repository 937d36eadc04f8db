use std::path::Path;

use anyhow::Context;
use bms_common::RuntimeConfig;
use tracing::{info, warn};

/// Defaults, optionally replaced by the JSON file named in `BMS_CONFIG`, then
/// individual environment overrides. A bad file is logged and ignored.
pub fn load_runtime_config() -> RuntimeConfig {
    runtime_config_from(|key| std::env::var(key).ok())
}

fn runtime_config_from(var: impl Fn(&str) -> Option<String>) -> RuntimeConfig {
    let mut runtime = match var("BMS_CONFIG") {
        Some(path) => read_config_file(Path::new(&path)).unwrap_or_else(|err| {
            warn!("failed to load runtime config from {path}: {err:#}");
            RuntimeConfig::default()
        }),
        None => RuntimeConfig::default(),
    };

    if let Some(url) = var("BMS_WEATHER_URL") {
        runtime.weather.base_url = url;
    }
    if let Some(key) = var("BMS_WEATHER_APP_KEY") {
        runtime.weather.app_key = key;
    }
    if let Some(tick_ms) = var("BMS_TICK_MS").and_then(|value| value.parse::<u64>().ok()) {
        runtime.controller.tick_ms = tick_ms;
    }

    runtime.sanitize();
    runtime
}

fn read_config_file(path: &Path) -> anyhow::Result<RuntimeConfig> {
    let raw = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let runtime = RuntimeConfig::from_json(&raw)?;
    info!("loaded runtime config from {}", path.display());
    Ok(runtime)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, path::PathBuf};

    use super::*;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "bms-controller-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn load_with(vars: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        runtime_config_from(|key| vars.get(key).cloned())
    }

    #[test]
    fn no_environment_gives_defaults() {
        let runtime = load_with(&[]);
        assert_eq!(runtime.controller.tick_ms, 250);
        assert_eq!(runtime.controller.initial_desired_temp_c, 29);
        assert!(runtime.weather.app_key.is_empty());
    }

    #[test]
    fn bad_json_is_an_error_and_falls_back_to_defaults() {
        let path = scratch_file("bad", "{\"controller\": {\"tick_ms\": ");

        assert!(read_config_file(&path).is_err());
        let runtime = load_with(&[("BMS_CONFIG", path.to_str().unwrap())]);
        assert_eq!(runtime.controller.tick_ms, 250);
        assert_eq!(runtime.pins.motion, 18);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let runtime = load_with(&[("BMS_CONFIG", "/nonexistent/bms-config.json")]);
        assert_eq!(runtime.controller.tick_ms, 250);
    }

    #[test]
    fn environment_overrides_the_file() {
        let path = scratch_file(
            "overrides",
            r#"{"controller":{"tick_ms":500},"weather":{"app_key":"from-file","targets":"2"}}"#,
        );

        let runtime = load_with(&[
            ("BMS_CONFIG", path.to_str().unwrap()),
            ("BMS_WEATHER_URL", "http://127.0.0.1:9/api/data"),
            ("BMS_WEATHER_APP_KEY", "from-env"),
        ]);
        assert_eq!(runtime.controller.tick_ms, 500);
        assert_eq!(runtime.weather.targets, "2");
        assert_eq!(runtime.weather.app_key, "from-env");
        assert_eq!(runtime.weather.base_url, "http://127.0.0.1:9/api/data");

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn tick_override_is_parsed_and_sanitized() {
        assert_eq!(load_with(&[("BMS_TICK_MS", "100")]).controller.tick_ms, 100);
        assert_eq!(load_with(&[("BMS_TICK_MS", "0")]).controller.tick_ms, 10);
        assert_eq!(load_with(&[("BMS_TICK_MS", "fast")]).controller.tick_ms, 250);
    }
}
