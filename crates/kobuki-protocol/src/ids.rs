//! 包头与子负载 ID 常量定义

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 包头第一个字节
pub const HEADER_0: u8 = 0xAA;
/// 包头第二个字节
pub const HEADER_1: u8 = 0x55;

/// 下行（主机 → 底盘）子负载 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CommandId {
    /// 底盘运动控制（速度 + 转弯半径）
    BaseControl = 0x01,
    /// 蜂鸣
    Sound = 0x03,
    /// 预置音效序列
    SoundSequence = 0x04,
    /// 请求附加信息（版本号等）
    RequestExtra = 0x09,
    /// 通用输出（LED、外部电源）
    GeneralPurposeOutput = 0x0C,
}

/// 上行（底盘 → 主机）子负载 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum FeedbackId {
    /// 基础传感器数据（编码器、碰撞、电池等），50Hz
    BasicSensorData = 0x01,
    /// 回充红外
    DockingIr = 0x03,
    /// 惯性传感器（航向角）
    InertialSensor = 0x04,
    /// 悬崖传感器原始值
    Cliff = 0x05,
    /// 电机电流
    Current = 0x06,
    /// 硬件版本
    HardwareVersion = 0x0A,
    /// 固件版本
    FirmwareVersion = 0x0B,
    /// 陀螺仪原始数据
    RawGyro = 0x0D,
    /// 通用输入
    GeneralPurposeInput = 0x10,
    /// 设备唯一 ID
    UniqueDeviceId = 0x13,
    /// 控制器增益
    ControllerInfo = 0x15,
}

/// `BasicSensorData` 子负载的数据长度
pub const BASIC_SENSOR_DATA_LEN: usize = 15;

/// `BaseControl` 子负载的数据长度
pub const BASE_CONTROL_LEN: usize = 4;
