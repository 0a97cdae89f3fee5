//! # Kobuki Keyop
//!
//! 键盘遥控 Kobuki 底盘：方向键调整线/角速度，空格清零，`q` 退出。
//!
//! ## 线程模型
//!
//! - 主线程：[`KeyopManager::spin`] 定时打印位姿，负责有序退出
//! - 键盘线程：逐字节读取按键，修改共享速度
//! - 驱动回调线程：[`TelemetryHandler`] 积分位姿并下发当前速度
//!
//! ## 示例
//!
//! ```no_run
//! use kobuki_driver::{AccelerationLimiter, AccelerationLimits, SimulatedBase};
//! use kobuki_keyop::{KeyopConfig, KeyopManager, RawTerminal, StdinKeys};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let base = SimulatedBase::new(AccelerationLimiter::new(AccelerationLimits::default(), true))?;
//! let mut manager = KeyopManager::new(
//!     KeyopConfig::default(),
//!     Arc::new(base),
//!     Box::new(RawTerminal::stdin()?),
//! );
//! manager.init(Box::new(StdinKeys::new()?))?;
//! manager.spin(|pose| println!("current pose: {}", pose))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod keyboard;
mod manager;
pub mod pose;
pub mod shutdown;
pub mod telemetry;
pub mod terminal;
pub mod velocity;

pub use config::{KeyopConfig, SupervisorConfig, VelocityLimits};
pub use error::KeyopError;
pub use keyboard::{KeyCommand, KeySource, StdinKeys, run_input_loop};
pub use manager::{KeyopManager, startup_banner};
pub use pose::SharedPose;
pub use shutdown::ShutdownSignal;
pub use telemetry::TelemetryHandler;
pub use terminal::{RawTerminal, TerminalMode};
pub use velocity::{VelocityCommand, VelocityState};
