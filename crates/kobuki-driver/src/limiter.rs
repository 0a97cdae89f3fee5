//! 加速度限制器
//!
//! 按时间间隔限制相邻两次速度命令的变化量，避免底盘突然加减速。

use std::time::Instant;

/// 加速度限制参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationLimits {
    /// 线加速度上限（m/s²）
    pub linear_acceleration_max: f64,
    /// 角加速度上限（rad/s²）
    pub angular_acceleration_max: f64,
    /// 线减速度下限（m/s²，负值）
    pub linear_deceleration_max: f64,
    /// 角减速度下限（rad/s²，负值）
    pub angular_deceleration_max: f64,
}

impl Default for AccelerationLimits {
    fn default() -> Self {
        Self {
            linear_acceleration_max: 0.3,
            angular_acceleration_max: 3.5,
            linear_deceleration_max: -0.3 * 1.2,
            angular_deceleration_max: -3.5 * 1.2,
        }
    }
}

/// 加速度限制器
#[derive(Debug, Clone)]
pub struct AccelerationLimiter {
    limits: AccelerationLimits,
    enabled: bool,
    last_linear: f64,
    last_angular: f64,
    last_time: Option<Instant>,
}

impl AccelerationLimiter {
    pub fn new(limits: AccelerationLimits, enabled: bool) -> Self {
        Self {
            limits,
            enabled,
            last_linear: 0.0,
            last_angular: 0.0,
            last_time: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 以当前时间限制速度命令
    pub fn limit(&mut self, linear: f64, angular: f64) -> (f64, f64) {
        self.limit_at(linear, angular, Instant::now())
    }

    /// 以指定时间限制速度命令
    ///
    /// 首次调用只建立时间基准，输出保持上一次（初始为零）的速度。
    pub fn limit_at(&mut self, linear: f64, angular: f64, now: Instant) -> (f64, f64) {
        if !self.enabled {
            self.record(linear, angular, now);
            return (linear, angular);
        }

        let dt = match self.last_time {
            Some(last) => now.saturating_duration_since(last).as_secs_f64(),
            None => 0.0,
        };

        let (linear, angular) = if dt > 0.0 {
            (
                limit_axis(
                    linear,
                    self.last_linear,
                    dt,
                    self.limits.linear_acceleration_max,
                    self.limits.linear_deceleration_max,
                ),
                limit_axis(
                    angular,
                    self.last_angular,
                    dt,
                    self.limits.angular_acceleration_max,
                    self.limits.angular_deceleration_max,
                ),
            )
        } else {
            (self.last_linear, self.last_angular)
        };

        self.record(linear, angular, now);
        (linear, angular)
    }

    /// 清零基准（底盘去使能后调用）
    pub fn reset(&mut self) {
        self.last_linear = 0.0;
        self.last_angular = 0.0;
        self.last_time = None;
    }

    fn record(&mut self, linear: f64, angular: f64, now: Instant) {
        self.last_linear = linear;
        self.last_angular = angular;
        self.last_time = Some(now);
    }
}

fn limit_axis(command: f64, last: f64, dt: f64, acc_max: f64, dec_max: f64) -> f64 {
    let acceleration = (command - last) / dt;
    if acceleration > acc_max {
        last + acc_max * dt
    } else if acceleration < dec_max {
        last + dec_max * dt
    } else {
        command
    }
}
