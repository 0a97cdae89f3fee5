//! # Kobuki Protocol
//!
//! Kobuki 底盘串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 包头与子负载 ID 常量定义
//! - `constants`: 底盘物理常量（轮距、轮半径、编码器分辨率）
//! - `framing`: 数据包封装与流式拆包
//! - `control`: 控制子负载构建
//! - `feedback`: 反馈子负载解析
//!
//! ## 包格式
//!
//! ```text
//! | 0xAA | 0x55 | length | payload (length 字节) | checksum |
//! ```
//!
//! `checksum` 为 `length` 与全部 payload 字节的异或。
//! payload 由若干子负载组成，每个子负载为 `| id | size | data (size 字节) |`。
//!
//! ## 字节序
//!
//! 协议使用小端字节序（低位在前）。

pub mod constants;
pub mod control;
pub mod feedback;
pub mod framing;
pub mod ids;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;
pub use framing::*;
pub use ids::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid sub-payload length for id {id:#04x}: expected {expected}, got {actual}")]
    InvalidLength { id: u8, expected: usize, actual: usize },

    #[error("Truncated sub-payload: header claims {claimed} bytes, {remaining} remaining")]
    Truncated { claimed: usize, remaining: usize },

    #[error("Checksum mismatch: expected {expected:#04x}, computed {computed:#04x}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("Payload too large: {len} bytes (max 255)")]
    PayloadTooLarge { len: usize },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u8 },
}

/// 小端字节序转换：2 字节 → u16
pub fn bytes_to_u16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// 小端字节序转换：2 字节 → i16
pub fn bytes_to_i16_le(bytes: [u8; 2]) -> i16 {
    i16::from_le_bytes(bytes)
}

/// 小端字节序转换：i16 → 2 字节
pub fn i16_to_bytes_le(value: i16) -> [u8; 2] {
    value.to_le_bytes()
}
