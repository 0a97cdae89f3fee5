//! 数据包封装与流式拆包
//!
//! 串口是字节流，读到的数据可能包含半个包、多个包或者干扰字节。
//! [`PacketFinder`] 逐字节推进状态机，只输出校验通过的 payload。

use crate::ProtocolError;
use crate::ids::{HEADER_0, HEADER_1};

/// 计算校验和（length 与 payload 逐字节异或）
pub fn checksum(length: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(length, |acc, b| acc ^ b)
}

/// 将 payload 封装成完整数据包
///
/// # 错误
/// - `ProtocolError::PayloadTooLarge`: payload 超过 255 字节
pub fn encode_packet(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let length = u8::try_from(payload.len())
        .map_err(|_| ProtocolError::PayloadTooLarge { len: payload.len() })?;

    let mut packet = Vec::with_capacity(payload.len() + 4);
    packet.push(HEADER_0);
    packet.push(HEADER_1);
    packet.push(length);
    packet.extend_from_slice(payload);
    packet.push(checksum(length, payload));
    Ok(packet)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinderState {
    Header0,
    Header1,
    Length,
    Payload,
    Checksum,
}

/// 流式拆包器
///
/// # Example
///
/// ```
/// use kobuki_protocol::{PacketFinder, encode_packet};
///
/// let packet = encode_packet(&[0x01, 0x02, 0x03]).unwrap();
/// let mut finder = PacketFinder::new();
///
/// // 前半包：尚未完成
/// assert!(finder.extend(&packet[..3]).is_empty());
/// // 后半包：输出完整 payload
/// let found = finder.extend(&packet[3..]);
/// assert_eq!(found, vec![Ok(vec![0x01, 0x02, 0x03])]);
/// ```
#[derive(Debug)]
pub struct PacketFinder {
    state: FinderState,
    expected_len: u8,
    payload: Vec<u8>,
}

impl PacketFinder {
    pub fn new() -> Self {
        Self {
            state: FinderState::Header0,
            expected_len: 0,
            payload: Vec::with_capacity(u8::MAX as usize),
        }
    }

    /// 推进一个字节
    ///
    /// 返回 `Some(Ok(payload))` 表示收到一个完整且校验通过的包，
    /// `Some(Err(_))` 表示校验失败（状态机已复位），`None` 表示仍在等待。
    pub fn push(&mut self, byte: u8) -> Option<Result<Vec<u8>, ProtocolError>> {
        match self.state {
            FinderState::Header0 => {
                if byte == HEADER_0 {
                    self.state = FinderState::Header1;
                }
                None
            },
            FinderState::Header1 => {
                self.state = match byte {
                    HEADER_1 => FinderState::Length,
                    // 连续的 0xAA：仍可能是包头
                    HEADER_0 => FinderState::Header1,
                    _ => FinderState::Header0,
                };
                None
            },
            FinderState::Length => {
                self.expected_len = byte;
                self.payload.clear();
                self.state = if byte == 0 {
                    FinderState::Checksum
                } else {
                    FinderState::Payload
                };
                None
            },
            FinderState::Payload => {
                self.payload.push(byte);
                if self.payload.len() == self.expected_len as usize {
                    self.state = FinderState::Checksum;
                }
                None
            },
            FinderState::Checksum => {
                self.state = FinderState::Header0;
                let computed = checksum(self.expected_len, &self.payload);
                if computed == byte {
                    Some(Ok(std::mem::take(&mut self.payload)))
                } else {
                    self.payload.clear();
                    Some(Err(ProtocolError::ChecksumMismatch {
                        expected: byte,
                        computed,
                    }))
                }
            },
        }
    }

    /// 推进一段字节，返回其中完成的所有包
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Result<Vec<u8>, ProtocolError>> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }
}

impl Default for PacketFinder {
    fn default() -> Self {
        Self::new()
    }
}
