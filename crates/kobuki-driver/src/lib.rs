//! 驱动层模块
//!
//! 本模块提供 Kobuki 底盘的设备驱动功能，包括：
//! - IO 线程管理（串口读写、拆包）
//! - 状态同步（ArcSwap 无锁读取最近一帧传感器数据）
//! - 差速里程计（编码器 tick → 增量位姿）
//! - 加速度限制
//! - 钩子系统：每帧里程计回调
//! - 仿真底盘（无硬件时使用）
//!
//! 上层代码只依赖 [`BaseDriver`] / [`BaseControl`] 两个 trait，
//! 因此可以在 [`Kobuki`] 与 [`SimulatedBase`] 之间切换。

mod base;
mod builder;
mod error;
pub mod hooks;
mod kobuki;
pub mod limiter;
pub mod odometry;
pub mod pipeline;
mod sim;
pub mod transport;

pub use base::{BaseControl, BaseDriver, EnergyState};
pub use builder::{DEFAULT_DEVICE, KobukiBuilder};
pub use error::DriverError;
pub use hooks::{HookManager, OdometryCallback};
pub use kobuki::Kobuki;
pub use limiter::{AccelerationLimiter, AccelerationLimits};
pub use odometry::{DiffDriveOdometry, OdometrySample, Pose2D, forward_kinematics, wrap_angle};
pub use pipeline::{CommandSender, DriverContext, PipelineConfig, io_loop};
pub use sim::{DEFAULT_SIM_PERIOD, SimulatedBase};
pub use transport::{SerialTransport, Transport};

// 协议层常用类型
pub use kobuki_protocol::{BasicSensorData, ChargerSource};
