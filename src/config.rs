//! Typed configuration loaded from `config.yml`
//!
//! The file has two reserved top-level keys: `config` (global settings) and
//! `preset` (named device profiles). Every other top-level key defines a
//! service, with the key as the service name. Device presets referenced by
//! name are resolved into full [`Device`] records at load time, so a broken
//! reference fails here rather than deep inside the capture loop.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ShooterError;
use crate::utils::validate_url;

/// Artifact extension used when the `config` block does not set one.
pub const DEFAULT_EXTENSION: &str = "jpg";

const RESERVED_KEYS: [&str; 2] = ["config", "preset"];

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_renderer_binary() -> PathBuf {
    PathBuf::from("/usr/local/bin/phantomjs")
}

fn default_bridge_script() -> PathBuf {
    PathBuf::from("/opt/renderURL.js")
}

fn default_flip() -> bool {
    true
}

/// Global settings from the reserved `config` block
///
/// # Examples
///
/// ```yaml
/// config:
///   output-directory: /var/tmp/site-shooter
///   extension: jpg
///   headers:
///     X-Shooter: "1"
///   google-drive:
///     parent-id: 0B9yGdrive...
///     client-id: ...
///     client-secret: ...
///     refresh-token: ...
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfig {
    /// Directory for ephemeral render output, created on demand
    pub output_directory: PathBuf,

    /// Artifact file extension (default: `jpg`)
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Extra HTTP headers passed to the renderer for every request.
    /// Stored sorted so the renderer argv is deterministic.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Remote store root folder and credentials
    pub google_drive: DrivePreferences,

    /// External renderer executable (default: `/usr/local/bin/phantomjs`)
    #[serde(default = "default_renderer_binary")]
    pub renderer_binary: PathBuf,

    /// Bridging script handed to the renderer (default: `/opt/renderURL.js`)
    #[serde(default = "default_bridge_script")]
    pub bridge_script: PathBuf,
}

/// Root folder id plus the OAuth material the Drive client exchanges for
/// access tokens. Token lifecycle is entirely the client's concern.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DrivePreferences {
    pub parent_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// A named viewport profile under the reserved `preset` block
#[derive(Debug, Clone, Deserialize)]
pub struct DevicePreset {
    pub width: u32,
    pub height: u32,

    /// Additionally capture the transposed orientation (default: true)
    #[serde(default = "default_flip")]
    pub flip: bool,
}

/// A preset resolved against the name a service referenced it by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub flip: bool,
}

impl Device {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawService {
    url: String,
    devices: Vec<String>,
    #[serde(default)]
    schedule: Option<String>,
}

/// A configured capture target, immutable after load
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub url: String,
    pub devices: Vec<Device>,

    /// Parsed and carried but drives no control flow.
    pub schedule: Option<String>,
}

/// The whole parsed configuration file
#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub presets: BTreeMap<String, DevicePreset>,

    /// Services in document order.
    pub services: Vec<Service>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ShooterError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ShooterError::Config(format!("cannot read `{}`: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ShooterError> {
        // The document is walked as a mapping first so service definitions
        // keep their configuration order.
        let doc: serde_yaml::Mapping = serde_yaml::from_str(raw)?;

        let global: GlobalConfig = section(&doc, "config")?;
        let presets: BTreeMap<String, DevicePreset> = section(&doc, "preset")?;

        let mut services = Vec::new();
        for (key, value) in &doc {
            let name = match key.as_str() {
                Some(s) if !RESERVED_KEYS.contains(&s) => s.to_string(),
                _ => continue,
            };
            let raw_service: RawService = serde_yaml::from_value(value.clone())?;
            services.push(resolve_service(name, raw_service, &presets)?);
        }

        let config = Self {
            global,
            presets,
            services,
        };
        config.validate()?;
        Ok(config)
    }

    /// Services matching the target filter, in configuration order.
    /// An empty filter selects everything.
    pub fn selected(&self, targets: &[String]) -> Vec<Service> {
        self.services
            .iter()
            .filter(|s| targets.is_empty() || targets.iter().any(|t| t == &s.name))
            .cloned()
            .collect()
    }

    fn validate(&self) -> Result<(), ShooterError> {
        if self.global.output_directory.as_os_str().is_empty() {
            return Err(ShooterError::Config(
                "config.output-directory must not be empty".to_string(),
            ));
        }

        for service in &self.services {
            validate_url(&service.url).map_err(|e| {
                ShooterError::Config(format!(
                    "service `{}` has an invalid url `{}`: {e}",
                    service.name, service.url
                ))
            })?;
        }

        Ok(())
    }
}

fn section<T: serde::de::DeserializeOwned>(
    doc: &serde_yaml::Mapping,
    key: &str,
) -> Result<T, ShooterError> {
    let value = doc
        .get(serde_yaml::Value::from(key))
        .ok_or_else(|| ShooterError::Config(format!("missing `{key}` section")))?;
    Ok(serde_yaml::from_value(value.clone())?)
}

fn resolve_service(
    name: String,
    raw: RawService,
    presets: &BTreeMap<String, DevicePreset>,
) -> Result<Service, ShooterError> {
    let mut devices = Vec::new();
    for preset_name in &raw.devices {
        // Duplicate references collapse to the first occurrence.
        if devices.iter().any(|d: &Device| &d.name == preset_name) {
            continue;
        }
        let preset = presets.get(preset_name).ok_or_else(|| {
            ShooterError::Config(format!(
                "service `{name}` references unknown preset `{preset_name}`"
            ))
        })?;
        devices.push(Device {
            name: preset_name.clone(),
            width: preset.width,
            height: preset.height,
            flip: preset.flip,
        });
    }

    Ok(Service {
        name,
        url: raw.url,
        devices,
        schedule: raw.schedule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
config:
  output-directory: /tmp/site-shooter
  extension: png
  headers:
    X-Shooter: "1"
    Accept-Language: ko
  google-drive:
    parent-id: root-folder
    client-id: cid
    client-secret: secret
    refresh-token: rt
preset:
  iphone:
    width: 375
    height: 667
  desktop:
    width: 1920
    height: 1080
    flip: false
home:
  url: https://example.com/
  devices: [iphone, desktop]
  schedule: "06:00"
admin:
  url: https://example.com/admin
  devices: [desktop]
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.global.extension, "png");
        assert_eq!(config.global.google_drive.parent_id, "root-folder");
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].name, "home");
        assert_eq!(config.services[1].name, "admin");
        assert_eq!(config.services[0].schedule.as_deref(), Some("06:00"));
    }

    #[test]
    fn test_reserved_keys_are_not_services() {
        let config = Config::parse(SAMPLE).unwrap();
        assert!(config.services.iter().all(|s| s.name != "config"));
        assert!(config.services.iter().all(|s| s.name != "preset"));
    }

    #[test]
    fn test_preset_resolution() {
        let config = Config::parse(SAMPLE).unwrap();
        let home = &config.services[0];
        assert_eq!(home.devices.len(), 2);
        assert_eq!(home.devices[0].name, "iphone");
        assert_eq!(home.devices[0].size(), (375, 667));
        // flip defaults to true when the preset omits it
        assert!(home.devices[0].flip);
        assert!(!home.devices[1].flip);
    }

    #[test]
    fn test_unknown_preset_fails_fast() {
        let broken = SAMPLE.replace("devices: [iphone, desktop]", "devices: [tablet]");
        let err = Config::parse(&broken).unwrap_err();
        assert!(matches!(err, ShooterError::Config(_)));
        assert!(err.to_string().contains("tablet"));
    }

    #[test]
    fn test_missing_config_section() {
        let err = Config::parse("preset: {}\n").unwrap_err();
        assert!(matches!(err, ShooterError::Config(_)));
    }

    #[test]
    fn test_invalid_service_url() {
        let broken = SAMPLE.replace("https://example.com/admin", "ftp://example.com");
        assert!(Config::parse(&broken).is_err());
    }

    #[test]
    fn test_extension_defaults_to_jpg() {
        let minimal = SAMPLE.replace("  extension: png\n", "");
        let config = Config::parse(&minimal).unwrap();
        assert_eq!(config.global.extension, DEFAULT_EXTENSION);
    }

    #[test]
    fn test_duplicate_device_references_collapse() {
        let doubled = SAMPLE.replace("devices: [desktop]", "devices: [desktop, desktop]");
        let config = Config::parse(&doubled).unwrap();
        assert_eq!(config.services[1].devices.len(), 1);
    }

    #[test]
    fn test_selected_filters_by_name() {
        let config = Config::parse(SAMPLE).unwrap();

        let all = config.selected(&[]);
        assert_eq!(all.len(), 2);

        let only = config.selected(&["admin".to_string()]);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].name, "admin");

        let none = config.selected(&["missing".to_string()]);
        assert!(none.is_empty());
    }
}
