//! 串口传输层抽象
//!
//! IO 线程只通过 [`Transport`] 读写字节，测试中用内存实现替换真实串口。

use crate::error::DriverError;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::info;

/// 字节流传输接口
pub trait Transport: Send {
    /// 读取可用字节
    ///
    /// 超时返回 `Ok(0)`，其余错误视为链路故障。
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, DriverError>;

    /// 写入完整数据包
    fn write_all(&mut self, data: &[u8]) -> Result<(), DriverError>;
}

/// 串口传输（8N1，无流控）
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// 打开串口
    ///
    /// # 参数
    /// - `path`: 设备路径（如 "/dev/kobuki"、"/dev/ttyUSB0"）
    /// - `baud_rate`: 波特率（Kobuki 固定 115200）
    /// - `read_timeout`: 单次读取超时
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, DriverError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()?;

        info!("Opened serial port: {} at {} baud", path, baud_rate);
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, DriverError> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                Ok(0)
            },
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), DriverError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }
}
