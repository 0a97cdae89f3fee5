//! 累积位姿
//!
//! 里程计回调是唯一写者，主循环读取。`ArcSwap` 保证读者拿到完整的 (x, y, heading)。

use arc_swap::ArcSwap;
use kobuki_driver::Pose2D;
use std::sync::Arc;

/// 线程安全的位姿
#[derive(Debug)]
pub struct SharedPose {
    pose: ArcSwap<Pose2D>,
}

impl SharedPose {
    pub fn new() -> Self {
        Self {
            pose: ArcSwap::from_pointee(Pose2D::IDENTITY),
        }
    }

    /// 读取当前位姿（无锁）
    pub fn load(&self) -> Pose2D {
        **self.pose.load()
    }

    /// 在当前位姿上组合增量：`pose = pose ∘ delta`
    pub fn compose(&self, delta: &Pose2D) -> Pose2D {
        let previous = self.pose.rcu(|pose| Arc::new(**pose * *delta));
        *previous * *delta
    }
}

impl Default for SharedPose {
    fn default() -> Self {
        Self::new()
    }
}
