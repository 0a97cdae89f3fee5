//! 控制子负载构建
//!
//! Kobuki 固件不直接接受 (v, ω)，而是接受「速度 + 转弯半径」：
//! - `radius == 0`：直线行驶，`speed` 为线速度（mm/s）
//! - `radius == 1`：原地旋转，`speed` 为轮缘线速度（mm/s），正值逆时针
//! - 其他：沿半径 `radius`（mm）的圆弧行驶，`speed` 为外侧轮速度

use crate::ProtocolError;
use crate::constants::{VELOCITY_EPSILON, WHEEL_BIAS_M};
use crate::framing::encode_packet;
use crate::i16_to_bytes_le;
use crate::ids::{BASE_CONTROL_LEN, CommandId};

/// 底盘运动控制指令（0x01）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaseControlCommand {
    /// 速度（mm/s）
    pub speed: i16,
    /// 转弯半径（mm）
    pub radius: i16,
}

impl BaseControlCommand {
    /// 停止指令
    pub const STOP: Self = Self {
        speed: 0,
        radius: 0,
    };

    /// 由差速底盘的线速度（m/s）和角速度（rad/s）换算
    pub fn from_velocity(linear: f64, angular: f64) -> Self {
        // 直线行驶
        if angular.abs() < VELOCITY_EPSILON {
            return Self {
                speed: (1000.0 * linear) as i16,
                radius: 0,
            };
        }

        let radius = linear * 1000.0 / angular;

        // 原地旋转，或半径小于等于 1mm（固件把 1 解释为原地旋转）
        if linear.abs() < VELOCITY_EPSILON || radius.abs() <= 1.0 {
            return Self {
                speed: (1000.0 * WHEEL_BIAS_M * angular / 2.0) as i16,
                radius: 1,
            };
        }

        let half_bias_mm = 1000.0 * WHEEL_BIAS_M / 2.0;
        let speed = if radius > 0.0 {
            (radius + half_bias_mm) * angular
        } else {
            (radius - half_bias_mm) * angular
        };

        Self {
            speed: speed as i16,
            radius: radius as i16,
        }
    }

    /// 编码为子负载 `| id | size | speed(2) | radius(2) |`
    pub fn to_sub_payload(&self) -> [u8; BASE_CONTROL_LEN + 2] {
        let speed = i16_to_bytes_le(self.speed);
        let radius = i16_to_bytes_le(self.radius);
        [
            CommandId::BaseControl.into(),
            BASE_CONTROL_LEN as u8,
            speed[0],
            speed[1],
            radius[0],
            radius[1],
        ]
    }

    /// 编码为完整数据包
    pub fn to_packet(&self) -> Result<Vec<u8>, ProtocolError> {
        encode_packet(&self.to_sub_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_run() {
        let cmd = BaseControlCommand::from_velocity(0.1, 0.0);
        assert_eq!(cmd, BaseControlCommand { speed: 100, radius: 0 });

        let cmd = BaseControlCommand::from_velocity(-0.25, 0.00001);
        assert_eq!(cmd, BaseControlCommand { speed: -250, radius: 0 });
    }

    #[test]
    fn test_pure_rotation() {
        // 1000 * 0.23 * 1.0 / 2 = 115
        let cmd = BaseControlCommand::from_velocity(0.0, 1.0);
        assert_eq!(cmd, BaseControlCommand { speed: 115, radius: 1 });

        let cmd = BaseControlCommand::from_velocity(0.0, -0.33);
        assert_eq!(cmd.radius, 1);
        assert!(cmd.speed < 0);
    }

    #[test]
    fn test_tiny_radius_is_rotation() {
        // radius = 0.0005 * 1000 / 1.0 = 0.5mm
        let cmd = BaseControlCommand::from_velocity(0.0005, 1.0);
        assert_eq!(cmd, BaseControlCommand { speed: 115, radius: 1 });
    }

    #[test]
    fn test_arc() {
        // radius = 400mm, speed = (400 + 115) * 0.5 = 257.5
        let cmd = BaseControlCommand::from_velocity(0.2, 0.5);
        assert_eq!(cmd, BaseControlCommand { speed: 257, radius: 400 });

        // radius = -400mm, speed = (-400 - 115) * -0.5 = 257.5
        let cmd = BaseControlCommand::from_velocity(0.2, -0.5);
        assert_eq!(cmd, BaseControlCommand { speed: 257, radius: -400 });
    }

    #[test]
    fn test_saturates_to_i16() {
        let cmd = BaseControlCommand::from_velocity(100.0, 0.0);
        assert_eq!(cmd.speed, i16::MAX);
    }

    #[test]
    fn test_sub_payload_encoding() {
        let cmd = BaseControlCommand {
            speed: 300,
            radius: -2,
        };
        assert_eq!(cmd.to_sub_payload(), [0x01, 0x04, 0x2C, 0x01, 0xFE, 0xFF]);
    }

    #[test]
    fn test_stop_packet() {
        let packet = BaseControlCommand::STOP.to_packet().unwrap();
        assert_eq!(packet, vec![0xAA, 0x55, 0x06, 0x01, 0x04, 0, 0, 0, 0, 0x03]);
    }
}
