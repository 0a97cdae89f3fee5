//! 反馈子负载解析

use crate::ids::{BASIC_SENSOR_DATA_LEN, FeedbackId};
use crate::{ProtocolError, bytes_to_u16_le};

/// 充电器状态字节中的「正在充电」位
const CHARGING_BIT: u8 = 0x04;
/// 充电器状态字节中的「适配器供电」位（否则为回充座）
const ADAPTER_BIT: u8 = 0x10;

/// 基础传感器数据（0x01）
///
/// 底盘以 50Hz 推送，是里程计与控制节拍的唯一来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasicSensorData {
    /// 底盘时间戳（毫秒，16 位回绕）
    pub timestamp_ms: u16,
    /// 碰撞传感器（bit0 右, bit1 中, bit2 左）
    pub bumper: u8,
    /// 轮子悬空（bit0 右, bit1 左）
    pub wheel_drop: u8,
    /// 悬崖（bit0 右, bit1 中, bit2 左）
    pub cliff: u8,
    /// 左轮编码器（16 位回绕）
    pub left_encoder: u16,
    /// 右轮编码器（16 位回绕）
    pub right_encoder: u16,
    /// 左轮 PWM
    pub left_pwm: i8,
    /// 右轮 PWM
    pub right_pwm: i8,
    /// 按键（bit0 B0, bit1 B1, bit2 B2）
    pub buttons: u8,
    /// 充电器状态
    pub charger: u8,
    /// 电池电压（0.1V）
    pub battery: u8,
    /// 过流（bit0 左轮, bit1 右轮）
    pub over_current: u8,
}

impl BasicSensorData {
    /// 从子负载数据区（不含 id/size）解析
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() != BASIC_SENSOR_DATA_LEN {
            return Err(ProtocolError::InvalidLength {
                id: FeedbackId::BasicSensorData.into(),
                expected: BASIC_SENSOR_DATA_LEN,
                actual: data.len(),
            });
        }

        Ok(Self {
            timestamp_ms: bytes_to_u16_le([data[0], data[1]]),
            bumper: data[2],
            wheel_drop: data[3],
            cliff: data[4],
            left_encoder: bytes_to_u16_le([data[5], data[6]]),
            right_encoder: bytes_to_u16_le([data[7], data[8]]),
            left_pwm: data[9] as i8,
            right_pwm: data[10] as i8,
            buttons: data[11],
            charger: data[12],
            battery: data[13],
            over_current: data[14],
        })
    }

    /// 是否正在充电
    pub fn is_charging(&self) -> bool {
        self.charger & CHARGING_BIT != 0
    }

    /// 充电来源
    pub fn charger_source(&self) -> ChargerSource {
        if self.charger == 0 {
            ChargerSource::None
        } else if self.charger & ADAPTER_BIT != 0 {
            ChargerSource::Adapter
        } else {
            ChargerSource::Dock
        }
    }

    /// 任一电机过流
    pub fn is_over_current(&self) -> bool {
        self.over_current & 0x03 != 0
    }
}

/// 充电来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChargerSource {
    /// 未连接充电器（放电中）
    #[default]
    None,
    /// 回充座
    Dock,
    /// 电源适配器
    Adapter,
}

/// 解析后的反馈子负载
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// 基础传感器数据
    BasicSensorData(BasicSensorData),
    /// 暂不处理的子负载（按长度跳过）
    Unhandled { id: u8, len: usize },
}

/// 解析一个 payload 中的全部子负载
///
/// 未知 ID 的子负载按其 size 字节跳过；size 超出剩余长度视为截断错误。
pub fn parse_feedback(payload: &[u8]) -> Result<Vec<Feedback>, ProtocolError> {
    let mut feedback = Vec::new();
    let mut rest = payload;

    while !rest.is_empty() {
        if rest.len() < 2 {
            return Err(ProtocolError::Truncated {
                claimed: 2,
                remaining: rest.len(),
            });
        }

        let id = rest[0];
        let size = rest[1] as usize;
        let body = &rest[2..];
        if body.len() < size {
            return Err(ProtocolError::Truncated {
                claimed: size,
                remaining: body.len(),
            });
        }
        let data = &body[..size];

        match FeedbackId::try_from(id) {
            Ok(FeedbackId::BasicSensorData) => {
                feedback.push(Feedback::BasicSensorData(BasicSensorData::parse(data)?));
            },
            _ => feedback.push(Feedback::Unhandled { id, len: size }),
        }

        rest = &body[size..];
    }

    Ok(feedback)
}
