use std::{fmt, io, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub device: DeviceConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

/// The record produced by the setup wizard. Immutable once a coordinator owns it.
#[derive(Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub device_ip: String,
    pub mqtt_password: String,
    pub serial_number: String,
    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,
    #[serde(default = "default_root_topic")]
    pub root_topic: String,
    #[serde(default = "default_name")]
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_program")]
    pub program: PathBuf,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_s: u64,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_s: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl Config {
    pub async fn load(path: &str) -> Result<Self, ConfigError> {
        let data = fs::read(path).await?;
        Ok(serde_yaml::from_slice(&data)?)
    }
}

impl DeviceConfig {
    pub const ENV_DEVICE_IP: &'static str = "DEVICE_IP";
    pub const ENV_MQTT_PASSWORD: &'static str = "MQTT_PASSWORD";
    pub const ENV_SERIAL_NUMBER: &'static str = "SERIAL_NUMBER";
    pub const ENV_MQTT_PORT: &'static str = "MQTT_PORT";
    pub const ENV_ROOT_TOPIC: &'static str = "ROOT_TOPIC";

    /// Environment variables handed to every bridge invocation.
    pub fn env(&self) -> [(&'static str, String); 5] {
        [
            (Self::ENV_DEVICE_IP, self.device_ip.clone()),
            (Self::ENV_MQTT_PASSWORD, self.mqtt_password.clone()),
            (Self::ENV_SERIAL_NUMBER, self.serial_number.clone()),
            (Self::ENV_MQTT_PORT, self.mqtt_port.to_string()),
            (Self::ENV_ROOT_TOPIC, self.root_topic.clone()),
        ]
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("device_ip", &self.device_ip)
            .field("mqtt_password", &"***")
            .field("serial_number", &self.serial_number)
            .field("mqtt_port", &self.mqtt_port)
            .field("root_topic", &self.root_topic)
            .field("name", &self.name)
            .finish()
    }
}

impl CoordinatorConfig {
    const MIN_COMMAND_TIMEOUT_S: u64 = 1;

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_s)
    }

    /// At least one second, a zero budget would time out every bridge call.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_s.max(Self::MIN_COMMAND_TIMEOUT_S))
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            program: default_program(),
            scan_interval_s: default_scan_interval(),
            command_timeout_s: default_command_timeout(),
        }
    }
}

const fn default_mqtt_port() -> u16 {
    1883
}

fn default_root_topic() -> String {
    "438M".to_owned()
}

fn default_name() -> String {
    "BlowControl Fan".to_owned()
}

fn default_program() -> PathBuf {
    PathBuf::from("blowcontrol")
}

const fn default_scan_interval() -> u64 {
    30
}

const fn default_command_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = "
device:
  device_ip: 192.168.1.40
  mqtt_password: hunter2
  serial_number: 438-EU-ABC1234A
";

    #[test]
    fn test_record_defaults() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();

        assert_eq!(config.device.mqtt_port, 1883);
        assert_eq!(config.device.root_topic, "438M");
        assert_eq!(config.device.name, "BlowControl Fan");
        assert_eq!(config.coordinator.program, PathBuf::from("blowcontrol"));
        assert_eq!(config.coordinator.scan_interval(), Duration::from_secs(30));
        assert_eq!(config.coordinator.command_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_record_from_wizard_json() {
        let record = r#"{
            "device_ip": "10.0.0.7",
            "mqtt_password": "secret",
            "serial_number": "XYZ",
            "mqtt_port": 1884,
            "root_topic": "527",
            "name": "Bedroom"
        }"#;

        let device: DeviceConfig = serde_json::from_str(record).unwrap();

        assert_eq!(device.mqtt_port, 1884);
        assert_eq!(device.root_topic, "527");
        assert_eq!(device.name, "Bedroom");
    }

    #[test]
    fn test_zero_command_timeout_is_clamped() {
        let config: Config =
            serde_yaml::from_str(&format!("{MINIMAL}coordinator:\n  command_timeout_s: 0\n")).unwrap();

        assert_eq!(config.coordinator.command_timeout_s, 0);
        assert_eq!(config.coordinator.command_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_password_is_redacted() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        let debug = format!("{config:?}");

        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
        assert!(debug.contains("438-EU-ABC1234A"));
    }

    #[test]
    fn test_env() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        let env = config.device.env();

        assert!(env.contains(&("DEVICE_IP", "192.168.1.40".to_owned())));
        assert!(env.contains(&("MQTT_PORT", "1883".to_owned())));
        assert!(env.contains(&("ROOT_TOPIC", "438M".to_owned())));
    }

    #[tokio::test]
    async fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{MINIMAL}coordinator:\n  scan_interval_s: 5\n").unwrap();

        let path = file.path().to_str().unwrap();
        let config = Config::load(path).await.unwrap();

        assert_eq!(config.coordinator.scan_interval_s, 5);
        assert_eq!(config.coordinator.command_timeout_s, 10);

        assert!(matches!(
            Config::load("/nonexistent/config.yaml").await,
            Err(ConfigError::Read(_))
        ));
    }
}
