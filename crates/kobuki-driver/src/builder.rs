//! Builder 模式实现
//!
//! 提供链式构造 [`Kobuki`] 实例的便捷方式。

use crate::error::DriverError;
use crate::kobuki::Kobuki;
use crate::limiter::{AccelerationLimiter, AccelerationLimits};
use crate::pipeline::PipelineConfig;
use crate::transport::SerialTransport;
use kobuki_protocol::DEFAULT_BAUD_RATE;
use std::time::Duration;
use tracing::{info, warn};

/// 默认设备路径（udev 规则创建的符号链接）
pub const DEFAULT_DEVICE: &str = "/dev/kobuki";

/// Kobuki Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use kobuki_driver::{KobukiBuilder, PipelineConfig};
/// use std::time::Duration;
///
/// let kobuki = KobukiBuilder::new()
///     .device("/dev/ttyUSB0")
///     .pipeline_config(PipelineConfig {
///         read_timeout_ms: 10,
///         feedback_timeout_ms: 500,
///     })
///     .connect_timeout(Some(Duration::from_secs(5)))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct KobukiBuilder {
    device: String,
    baud_rate: u32,
    pipeline_config: PipelineConfig,
    acceleration_limiter: bool,
    limits: AccelerationLimits,
    /// 为 None 时不等待首帧反馈
    connect_timeout: Option<Duration>,
}

impl KobukiBuilder {
    pub fn new() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            pipeline_config: PipelineConfig::default(),
            acceleration_limiter: true,
            limits: AccelerationLimits::default(),
            connect_timeout: Some(Duration::from_secs(2)),
        }
    }

    /// 设置串口设备路径
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// 设置波特率
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// 设置 Pipeline 配置
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    /// 启用/关闭加速度限制器
    pub fn acceleration_limiter(mut self, enabled: bool) -> Self {
        self.acceleration_limiter = enabled;
        self
    }

    /// 设置加速度限制参数
    pub fn acceleration_limits(mut self, limits: AccelerationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// 设置首帧反馈等待时间
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// 打开串口、启动 IO 线程，并（可选）等待首帧反馈
    pub fn build(self) -> Result<Kobuki, DriverError> {
        if self.device.is_empty() {
            return Err(DriverError::InvalidInput("device path is empty".to_string()));
        }

        let read_timeout = Duration::from_millis(self.pipeline_config.read_timeout_ms);
        let transport = SerialTransport::open(&self.device, self.baud_rate, read_timeout)?;

        if !self.acceleration_limiter {
            warn!("Acceleration limiter disabled");
        }
        let limiter = AccelerationLimiter::new(self.limits, self.acceleration_limiter);

        let kobuki =
            Kobuki::new(transport, self.pipeline_config, limiter)?.with_device(self.device);

        if let Some(timeout) = self.connect_timeout {
            kobuki.wait_for_feedback(timeout)?;
            info!("Kobuki connected on {}", kobuki.device());
        }

        Ok(kobuki)
    }
}

impl Default for KobukiBuilder {
    fn default() -> Self {
        Self::new()
    }
}
