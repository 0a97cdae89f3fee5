//! 遥控配置
//!
//! TOML 格式，所有字段都有默认值：
//!
//! ```toml
//! [velocity]
//! linear_step = 0.05
//! linear_max = 1.0
//! angular_step = 0.33
//! angular_max = 6.6
//!
//! [supervisor]
//! report_interval_ms = 1000
//! input_poll_ms = 100
//! ```

use crate::error::KeyopError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 遥控配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyopConfig {
    /// 速度步长与上限
    pub velocity: VelocityLimits,
    /// 主循环参数
    pub supervisor: SupervisorConfig,
}

/// 速度步长与上限
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VelocityLimits {
    /// 线速度步长（m/s）
    pub linear_step: f64,
    /// 线速度上限（m/s）
    pub linear_max: f64,
    /// 角速度步长（rad/s）
    pub angular_step: f64,
    /// 角速度上限（rad/s）
    pub angular_max: f64,
}

impl Default for VelocityLimits {
    fn default() -> Self {
        Self {
            linear_step: 0.05,
            linear_max: 1.0,
            angular_step: 0.33,
            angular_max: 6.6,
        }
    }
}

/// 主循环参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupervisorConfig {
    /// 位姿打印间隔（毫秒）
    pub report_interval_ms: u64,
    /// 键盘线程检查退出标志的间隔（毫秒）
    pub input_poll_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: 1000,
            input_poll_ms: 100,
        }
    }
}

impl SupervisorConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn input_poll(&self) -> Duration {
        Duration::from_millis(self.input_poll_ms)
    }
}

impl KeyopConfig {
    /// 从文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, KeyopError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| KeyopError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, KeyopError> {
        let config: KeyopConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), KeyopError> {
        let v = &self.velocity;
        for (name, value) in [
            ("linear_step", v.linear_step),
            ("linear_max", v.linear_max),
            ("angular_step", v.angular_step),
            ("angular_max", v.angular_max),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(KeyopError::InvalidConfig(format!(
                    "velocity.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if self.supervisor.report_interval_ms == 0 {
            return Err(KeyopError::InvalidConfig(
                "supervisor.report_interval_ms must be greater than 0".to_string(),
            ));
        }
        // poll 超时以 u16 毫秒传入
        if self.supervisor.input_poll_ms == 0 || self.supervisor.input_poll_ms > u64::from(u16::MAX) {
            return Err(KeyopError::InvalidConfig(format!(
                "supervisor.input_poll_ms must be in 1..={}",
                u16::MAX
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = KeyopConfig::default();
        assert_eq!(config.velocity.linear_step, 0.05);
        assert_eq!(config.velocity.linear_max, 1.0);
        assert_eq!(config.velocity.angular_step, 0.33);
        assert_eq!(config.velocity.angular_max, 6.6);
        assert_eq!(config.supervisor.report_interval(), Duration::from_secs(1));
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = KeyopConfig::from_toml_str(
            r#"
            [velocity]
            linear_step = 0.1
            "#,
        )
        .unwrap();
        assert_eq!(config.velocity.linear_step, 0.1);
        assert_eq!(config.velocity.angular_max, 6.6);
        assert_eq!(config.supervisor, SupervisorConfig::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(KeyopConfig::from_toml_str("").unwrap(), KeyopConfig::default());
    }

    #[test]
    fn test_rejects_non_positive_step() {
        let err = KeyopConfig::from_toml_str("[velocity]\nangular_step = -0.3\n").unwrap_err();
        assert!(matches!(err, KeyopError::InvalidConfig(msg) if msg.contains("angular_step")));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = KeyopConfig::from_toml_str("[supervisor]\nreport_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, KeyopError::InvalidConfig(_)));

        let err = KeyopConfig::from_toml_str("[supervisor]\ninput_poll_ms = 70000\n").unwrap_err();
        assert!(matches!(err, KeyopError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = KeyopConfig::from_toml_str("[velocity]\nlinear_stpe = 0.1\n").unwrap_err();
        assert!(matches!(err, KeyopError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[supervisor]\nreport_interval_ms = 250").unwrap();

        let config = KeyopConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.supervisor.report_interval_ms, 250);
    }

    #[test]
    fn test_load_missing_file() {
        let err = KeyopConfig::load_from_file("/nonexistent/kobuki/keyop.toml").unwrap_err();
        assert!(matches!(err, KeyopError::ConfigRead { .. }));
    }
}
