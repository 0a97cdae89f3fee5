//! 底盘驱动错误

use kobuki_protocol::ProtocolError;
use thiserror::Error;

/// 底盘驱动错误
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口打开/配置错误
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// 串口读写错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 协议编码/解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 命令队列已关闭，IO 线程已退出
    #[error("Command queue closed, driver is not running")]
    ChannelClosed,

    /// 命令队列已满
    #[error("Command queue full ({} pending commands)", crate::pipeline::COMMAND_QUEUE_CAPACITY)]
    ChannelFull,

    /// IO 线程异常退出或无法启动
    #[error("Driver IO thread failed: {0}")]
    IoThread(String),

    /// 等待底盘反馈超时
    #[error("Timed out waiting for base feedback")]
    Timeout,

    /// 参数不合法
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
