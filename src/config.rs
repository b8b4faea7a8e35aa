use crate::log_store::LogFields;
use crate::render::WindowMode;
use crate::ReplayError;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::time::Duration;

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub playback: PlaybackConfig,
    pub render: RenderConfig,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct LogConfig {
    /// Keep every n-th row as a playback frame
    pub stride: usize,
    /// Log time units per second (sdlog2 logs microseconds)
    pub time_scale: f64,
    pub fields: LogFields,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            stride: 5,
            time_scale: 1e6,
            fields: LogFields::default(),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct PlaybackConfig {
    pub tick_interval_ms: u64,
    /// Overrides the default loop point of `playback_len - 2`
    pub loop_threshold: Option<usize>,
    /// Wall-clock sampling window of the `rtf` command
    pub rtf_window_s: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10,
            loop_threshold: None,
            rtf_window_s: 3.0,
        }
    }
}

impl PlaybackConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
    pub fn rtf_window(&self) -> Duration {
        Duration::from_secs_f64(self.rtf_window_s)
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct RenderConfig {
    /// Factor applied to the logged z position, -1 flips a down-positive log
    pub z_sign: f64,
    pub window_mode: WindowMode,
    pub window_span: f64,
    pub model: ModelConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            z_sign: 1.0,
            window_mode: WindowMode::Hysteresis,
            window_span: 2.0,
            model: ModelConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelConfig {
    Quadrotor { arm_length: f64 },
    FixedWing,
    Custom { points: Vec<[f64; 3]> },
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::Quadrotor { arm_length: 0.5 }
    }
}

impl Config {
    pub fn from_yaml(filename: &str) -> Result<Self, ReplayError> {
        let mut contents = String::new();
        File::open(filename)?.read_to_string(&mut contents)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
    /// Rejects values the replay cannot run with
    /// # Errors
    /// * `InvalidConfig` naming the first offending value
    pub fn validate(&self) -> Result<(), ReplayError> {
        let invalid = |msg: &str| Err(ReplayError::InvalidConfig(msg.to_string()));
        if self.log.stride == 0 {
            return invalid("log.stride must be at least 1");
        }
        if !(self.log.time_scale > 0.0) {
            return invalid("log.time_scale must be positive");
        }
        if !(self.playback.rtf_window_s > 0.0 && self.playback.rtf_window_s.is_finite()) {
            return invalid("playback.rtf_window_s must be positive");
        }
        if !(self.render.window_span > 0.0) {
            return invalid("render.window_span must be positive");
        }
        if self.render.z_sign.abs() != 1.0 {
            return invalid("render.z_sign must be 1 or -1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.log.stride, 5);
        assert_eq!(config.log.fields.time, "TIME_StartTime");
        assert_eq!(config.playback.tick_interval(), Duration::from_millis(10));
        assert_eq!(config.playback.rtf_window(), Duration::from_secs(3));
        assert_eq!(config.render.model, ModelConfig::Quadrotor { arm_length: 0.5 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_sections() {
        let yaml = r#"
log:
  stride: 10
  fields:
    time: TIME
playback:
  loop_threshold: 40
render:
  z_sign: -1.0
  window_mode: fixed
  model:
    type: custom
    points: [[0, 0, 0], [1, 0, 0]]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log.stride, 10);
        assert_eq!(config.log.fields.time, "TIME");
        assert_eq!(config.log.fields.position[0], "LPOS_X");
        assert_eq!(config.playback.loop_threshold, Some(40));
        assert_eq!(config.render.window_mode, WindowMode::Fixed);
        assert_eq!(
            config.render.model,
            ModelConfig::Custom {
                points: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let config: Config = serde_yaml::from_str("log: {stride: 0}").unwrap();
        assert!(matches!(config.validate(), Err(ReplayError::InvalidConfig(_))));
        let config: Config = serde_yaml::from_str("render: {z_sign: 0.5}").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            Config::from_yaml("/nonexistent/replay.yaml"),
            Err(ReplayError::IoError(_))
        ));
    }
}
