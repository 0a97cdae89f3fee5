//! 差速底盘里程计
//!
//! 将 16 位回绕的编码器 tick 与毫秒时间戳换算为增量位姿（机器人坐标系）和速度。

use kobuki_protocol::{BasicSensorData, TICK_TO_RAD, WHEEL_BIAS_M, WHEEL_RADIUS_M};
use nalgebra::{Isometry2, UnitComplex, Vector2, Vector3};
use std::fmt;
use std::ops::{Mul, MulAssign};

/// 把角度归一化到 (-π, π]
pub fn wrap_angle(angle: f64) -> f64 {
    UnitComplex::new(angle).angle()
}

/// 平面刚体变换（x, y, heading）
///
/// 组合使用刚体变换乘法而不是逐项相加：
/// `a * b` 表示在 `a` 的坐标系下再施加 `b`，航向角回绕到 (-π, π]。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose2D {
    /// 单位变换（原点、航向 0）
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        heading: 0.0,
    };

    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            x,
            y,
            heading: wrap_angle(heading),
        }
    }

    pub fn to_isometry(&self) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(self.x, self.y), self.heading)
    }

    pub fn from_isometry(iso: &Isometry2<f64>) -> Self {
        Self {
            x: iso.translation.vector.x,
            y: iso.translation.vector.y,
            heading: iso.rotation.angle(),
        }
    }

    /// 刚体变换组合 `self ∘ delta`
    pub fn compose(&self, delta: &Pose2D) -> Pose2D {
        Self::from_isometry(&(self.to_isometry() * delta.to_isometry()))
    }

    /// 逆变换
    pub fn inverse(&self) -> Pose2D {
        Self::from_isometry(&self.to_isometry().inverse())
    }
}

impl Mul for Pose2D {
    type Output = Pose2D;

    fn mul(self, rhs: Pose2D) -> Pose2D {
        self.compose(&rhs)
    }
}

impl MulAssign for Pose2D {
    fn mul_assign(&mut self, rhs: Pose2D) {
        *self = self.compose(&rhs);
    }
}

impl fmt::Display for Pose2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3}, {:.3}, {:.3}]", self.x, self.y, self.heading)
    }
}

/// 一次里程计更新
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometrySample {
    /// 相对上一帧的位姿增量（机器人坐标系）
    pub delta: Pose2D,
    /// 速度 (vx, vy, ω)，单位 m/s 与 rad/s
    pub rates: Vector3<f64>,
    /// 底盘时间戳（毫秒，16 位回绕）
    pub timestamp_ms: u16,
}

impl OdometrySample {
    /// 由期望速度和时间间隔构造（仿真底盘使用）
    pub fn from_velocity(linear: f64, angular: f64, dt: f64, timestamp_ms: u16) -> Self {
        Self {
            delta: Pose2D::new(linear * dt, 0.0, angular * dt),
            rates: Vector3::new(linear, 0.0, angular),
            timestamp_ms,
        }
    }
}

/// 差速运动学正解：车轮转角（弧度）→ 机器人坐标系增量
pub fn forward_kinematics(left_rad: f64, right_rad: f64) -> Pose2D {
    let ds = WHEEL_RADIUS_M * (left_rad + right_rad) / 2.0;
    let dtheta = WHEEL_RADIUS_M * (right_rad - left_rad) / WHEEL_BIAS_M;
    Pose2D::new(ds, 0.0, dtheta)
}

/// 编码器里程计
#[derive(Debug, Default)]
pub struct DiffDriveOdometry {
    /// 上一帧 (left, right, timestamp)，首帧之前为 None
    last: Option<(u16, u16, u16)>,
    /// 最近一次有效的时间间隔（秒）
    last_dt: f64,
}

impl DiffDriveOdometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输入一帧基础传感器数据，输出增量
    ///
    /// 首帧只记录基准，返回零增量。
    pub fn update(&mut self, data: &BasicSensorData) -> OdometrySample {
        let (last_left, last_right, last_ts) = self
            .last
            .unwrap_or((data.left_encoder, data.right_encoder, data.timestamp_ms));
        self.last = Some((data.left_encoder, data.right_encoder, data.timestamp_ms));

        // 16 位回绕：差值按有符号解释
        let left_ticks = data.left_encoder.wrapping_sub(last_left) as i16;
        let right_ticks = data.right_encoder.wrapping_sub(last_right) as i16;

        let left_rad = TICK_TO_RAD * f64::from(left_ticks);
        let right_rad = TICK_TO_RAD * f64::from(right_ticks);
        let delta = forward_kinematics(left_rad, right_rad);

        let dt_ms = data.timestamp_ms.wrapping_sub(last_ts) as i16;
        if dt_ms > 0 {
            self.last_dt = f64::from(dt_ms) / 1000.0;
        }

        let rates = if self.last_dt > 0.0 {
            Vector3::new(delta.x, delta.y, delta.heading) / self.last_dt
        } else {
            Vector3::zeros()
        };

        OdometrySample {
            delta,
            rates,
            timestamp_ms: data.timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    fn sensor(timestamp_ms: u16, left: u16, right: u16) -> BasicSensorData {
        BasicSensorData {
            timestamp_ms,
            left_encoder: left,
            right_encoder: right,
            ..Default::default()
        }
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < EPS);
        assert!((wrap_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < EPS);
        assert!((wrap_angle(2.0 * PI)).abs() < EPS);
    }

    #[test]
    fn test_compose_translates_in_rotated_frame() {
        // 先左转 90°，再前进 1m → 世界坐标 (0, 1)
        let turned = Pose2D::new(0.0, 0.0, FRAC_PI_2);
        let forward = Pose2D::new(1.0, 0.0, 0.0);
        let pose = turned * forward;
        assert!(pose.x.abs() < EPS);
        assert!((pose.y - 1.0).abs() < EPS);
        assert!((pose.heading - FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn test_compose_heading_wraps() {
        let mut pose = Pose2D::new(0.0, 0.0, 3.0);
        pose *= Pose2D::new(0.0, 0.0, 1.0);
        assert!((pose.heading - (4.0 - 2.0 * PI)).abs() < EPS);
    }

    #[test]
    fn test_inverse() {
        let pose = Pose2D::new(1.0, -2.0, 0.7);
        let identity = pose * pose.inverse();
        assert!(identity.x.abs() < EPS && identity.y.abs() < EPS && identity.heading.abs() < EPS);
    }

    #[test]
    fn test_display() {
        let pose = Pose2D::new(1.0, 0.25, 0.5);
        assert_eq!(pose.to_string(), "[1.000, 0.250, 0.500]");
    }

    #[test]
    fn test_first_update_is_zero() {
        let mut odom = DiffDriveOdometry::new();
        let sample = odom.update(&sensor(100, 5000, 7000));
        assert_eq!(sample.delta, Pose2D::IDENTITY);
        assert_eq!(sample.rates, Vector3::zeros());
    }

    #[test]
    fn test_straight_motion() {
        let mut odom = DiffDriveOdometry::new();
        odom.update(&sensor(0, 1000, 1000));
        let sample = odom.update(&sensor(20, 1100, 1100));

        let expected = WHEEL_RADIUS_M * TICK_TO_RAD * 100.0;
        assert!((sample.delta.x - expected).abs() < EPS);
        assert!(sample.delta.heading.abs() < EPS);
        assert!((sample.rates.x - expected / 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_encoder_wraparound() {
        let mut odom = DiffDriveOdometry::new();
        odom.update(&sensor(65530, 65500, 100));
        // 左轮前进 72 tick（回绕），右轮后退 72 tick
        let sample = odom.update(&sensor(14, 36, 28));

        let wheel = TICK_TO_RAD * 72.0;
        let expected_heading = WHEEL_RADIUS_M * (-wheel - wheel) / WHEEL_BIAS_M;
        assert!(sample.delta.x.abs() < EPS);
        assert!((sample.delta.heading - expected_heading).abs() < EPS);
        // 时间戳回绕：65530 → 14 为 20ms
        assert!((sample.rates.z - expected_heading / 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_repeated_timestamp_keeps_last_dt() {
        let mut odom = DiffDriveOdometry::new();
        odom.update(&sensor(0, 0, 0));
        odom.update(&sensor(20, 10, 10));
        let sample = odom.update(&sensor(20, 20, 20));
        assert!(sample.rates.x > 0.0);
        assert!(sample.rates.x.is_finite());
    }

    #[test]
    fn test_from_velocity() {
        let sample = OdometrySample::from_velocity(0.5, 1.0, 0.02, 7);
        assert!((sample.delta.x - 0.01).abs() < EPS);
        assert!((sample.delta.heading - 0.02).abs() < EPS);
        assert_eq!(sample.rates, Vector3::new(0.5, 0.0, 1.0));
    }
}
