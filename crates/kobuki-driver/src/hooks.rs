//! 钩子系统（Hook System）
//!
//! 本模块管理里程计回调：驱动每解析出一帧基础传感器数据，
//! 就以注册顺序依次调用所有回调。
//!
//! # 使用示例
//!
//! ```rust
//! use kobuki_driver::hooks::{HookManager, OdometryCallback};
//! use kobuki_driver::{BaseControl, DriverError, OdometrySample, Pose2D};
//! use nalgebra::Vector3;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counter(AtomicUsize);
//!
//! impl OdometryCallback for Counter {
//!     fn on_odometry(&self, _base: &dyn BaseControl, _sample: &OdometrySample) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//!
//! struct NullBase;
//!
//! impl BaseControl for NullBase {
//!     fn set_velocity(&self, _linear: f64, _angular: f64) -> Result<(), DriverError> {
//!         Ok(())
//!     }
//! }
//!
//! let counter = Arc::new(Counter(AtomicUsize::new(0)));
//! let mut hooks = HookManager::new();
//! hooks.add_callback(counter.clone());
//!
//! let sample = OdometrySample {
//!     delta: Pose2D::IDENTITY,
//!     rates: Vector3::zeros(),
//!     timestamp_ms: 0,
//! };
//! hooks.trigger_all(&NullBase, &sample);
//! assert_eq!(counter.0.load(Ordering::Relaxed), 1);
//! ```

use crate::base::BaseControl;
use crate::odometry::OdometrySample;
use std::sync::Arc;

/// 里程计回调 Trait
///
/// # 调用上下文
///
/// - 在驱动的接收线程中同步调用，与主线程、键盘线程并发
/// - 回调内部应尽快返回；阻塞会推迟下一帧解析
/// - `base` 用于在回调内直接下发速度（控制节拍由反馈驱动）
pub trait OdometryCallback: Send + Sync {
    /// 收到新的里程计增量时调用
    fn on_odometry(&self, base: &dyn BaseControl, sample: &OdometrySample);
}

/// 钩子管理器
///
/// 回调列表本身不是线程安全的，需要外部同步（驱动中通过 `RwLock<HookManager>`）。
#[derive(Default)]
pub struct HookManager {
    /// 回调列表
    callbacks: Vec<Arc<dyn OdometryCallback>>,
}

impl HookManager {
    /// 创建新的钩子管理器
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// 添加回调
    pub fn add_callback(&mut self, callback: Arc<dyn OdometryCallback>) {
        self.callbacks.push(callback);
    }

    /// 按注册顺序触发所有回调
    pub fn trigger_all(&self, base: &dyn BaseControl, sample: &OdometrySample) {
        for callback in self.callbacks.iter() {
            callback.on_odometry(base, sample);
        }
    }

    /// 回调数量
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// 是否没有回调
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
