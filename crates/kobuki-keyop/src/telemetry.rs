//! 里程计回调
//!
//! 每收到一帧里程计：先把增量组合到位姿上，再把当前速度命令下发给底盘。
//! 这是唯一的控制节拍，由底盘反馈（约 50Hz）驱动而不是定时器。

use crate::pose::SharedPose;
use crate::shutdown::ShutdownSignal;
use crate::velocity::VelocityState;
use kobuki_driver::{BaseControl, DriverError, OdometryCallback, OdometrySample};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// 位姿积分 + 速度转发
pub struct TelemetryHandler {
    velocity: Arc<VelocityState>,
    pose: Arc<SharedPose>,
    signal: Arc<ShutdownSignal>,
    /// 为 false 后回调不再下发速度
    actuation: Mutex<bool>,
}

impl TelemetryHandler {
    pub fn new(
        velocity: Arc<VelocityState>,
        pose: Arc<SharedPose>,
        signal: Arc<ShutdownSignal>,
    ) -> Self {
        Self {
            velocity,
            pose,
            signal,
            actuation: Mutex::new(true),
        }
    }

    /// 停止转发速度
    ///
    /// 返回时正在执行的回调已经结束，之后的回调只更新位姿。
    pub fn close_actuation(&self) {
        *self.actuation.lock() = false;
    }

    pub fn is_actuating(&self) -> bool {
        *self.actuation.lock()
    }
}

impl OdometryCallback for TelemetryHandler {
    fn on_odometry(&self, base: &dyn BaseControl, sample: &OdometrySample) {
        self.pose.compose(&sample.delta);

        let result = {
            let actuation = self.actuation.lock();
            if !*actuation || self.signal.is_requested() {
                return;
            }
            let command = self.velocity.snapshot();
            base.set_velocity(command.linear, command.angular)
        };

        match result {
            Ok(()) => {},
            // 队列暂满只丢这一拍，下一帧会重发最新命令
            Err(DriverError::ChannelFull) => warn!("Command queue full, skipping one control tick"),
            Err(e) => self.signal.fail(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeyopError;
    use kobuki_driver::Pose2D;

    fn sample(dx: f64, dtheta: f64) -> OdometrySample {
        OdometrySample::from_velocity(dx, dtheta, 1.0, 0)
    }

    struct Recording {
        calls: Mutex<Vec<(f64, f64)>>,
        error: Mutex<Option<DriverError>>,
    }

    impl Recording {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                error: Mutex::new(None),
            }
        }
    }

    impl BaseControl for Recording {
        fn set_velocity(&self, linear: f64, angular: f64) -> Result<(), DriverError> {
            if let Some(e) = self.error.lock().take() {
                return Err(e);
            }
            self.calls.lock().push((linear, angular));
            Ok(())
        }
    }

    fn handler() -> TelemetryHandler {
        TelemetryHandler::new(
            Arc::new(VelocityState::default()),
            Arc::new(SharedPose::new()),
            Arc::new(ShutdownSignal::new()),
        )
    }

    #[test]
    fn test_composes_then_forwards_velocity() {
        let handler = handler();
        handler.velocity.increment_linear();
        let base = Recording::new();

        handler.on_odometry(&base, &sample(0.5, 0.0));
        handler.on_odometry(&base, &sample(0.5, 0.0));

        assert!((handler.pose.load().x - 1.0).abs() < 1e-9);
        let calls = base.calls.lock();
        assert_eq!(calls.len(), 2);
        assert!((calls[1].0 - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_closed_actuation_only_updates_pose() {
        let handler = handler();
        let base = Recording::new();
        handler.close_actuation();
        assert!(!handler.is_actuating());

        handler.on_odometry(&base, &sample(0.2, 0.0));
        assert!(base.calls.lock().is_empty());
        assert_ne!(handler.pose.load(), Pose2D::IDENTITY);
    }

    #[test]
    fn test_quit_requested_stops_forwarding() {
        let handler = handler();
        let base = Recording::new();
        handler.signal.request();

        handler.on_odometry(&base, &sample(0.0, 0.1));
        assert!(base.calls.lock().is_empty());
    }

    #[test]
    fn test_driver_error_becomes_fault() {
        let handler = handler();
        let base = Recording::new();
        *base.error.lock() = Some(DriverError::ChannelClosed);

        handler.on_odometry(&base, &sample(0.0, 0.0));
        assert!(handler.signal.is_requested());
        assert!(matches!(
            handler.signal.take_fault(),
            Some(KeyopError::Driver(DriverError::ChannelClosed))
        ));
    }

    #[test]
    fn test_full_queue_is_tolerated() {
        let handler = handler();
        let base = Recording::new();
        *base.error.lock() = Some(DriverError::ChannelFull);

        handler.on_odometry(&base, &sample(0.0, 0.0));
        assert!(!handler.signal.is_requested());
        handler.on_odometry(&base, &sample(0.0, 0.0));
        assert_eq!(base.calls.lock().len(), 1);
    }
}
