//! 键盘输入
//!
//! 方向键在终端中是转义序列 `ESC [ A..D`，这里只看最后一个字节，
//! 前缀字节落入「未识别」分支被忽略。

use crate::error::KeyopError;
use crate::shutdown::ShutdownSignal;
use crate::velocity::VelocityState;
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::time::Duration;
use tracing::{debug, info, trace};

/// 上方向键（`ESC [ A` 的末字节）
pub const KEY_UP: u8 = 65;
/// 下方向键
pub const KEY_DOWN: u8 = 66;
/// 右方向键
pub const KEY_RIGHT: u8 = 67;
/// 左方向键
pub const KEY_LEFT: u8 = 68;
pub const KEY_SPACE: u8 = b' ';
pub const KEY_QUIT: u8 = b'q';

/// 按键动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    IncrementLinear,
    DecrementLinear,
    IncrementAngular,
    DecrementAngular,
    Reset,
    Quit,
}

impl KeyCommand {
    /// 单字节映射，未识别的字节返回 None
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            KEY_LEFT => Some(KeyCommand::IncrementAngular),
            KEY_RIGHT => Some(KeyCommand::DecrementAngular),
            KEY_UP => Some(KeyCommand::IncrementLinear),
            KEY_DOWN => Some(KeyCommand::DecrementLinear),
            KEY_SPACE => Some(KeyCommand::Reset),
            KEY_QUIT => Some(KeyCommand::Quit),
            _ => None,
        }
    }
}

/// 按键来源
pub trait KeySource: Send {
    /// 最多等待 `timeout` 读取一个字节
    ///
    /// 超时返回 `Ok(None)`；错误（包括输入端关闭）不可恢复。
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<u8>>;
}

/// 标准输入按键来源
///
/// 先 `poll` 等待可读再读 1 字节，因此外部中断请求退出后键盘线程也能在一个超时周期内退出。
pub struct StdinKeys {
    input: File,
}

impl StdinKeys {
    pub fn new() -> io::Result<Self> {
        let fd = io::stdin().as_fd().try_clone_to_owned()?;
        // 直接读 fd，绕过 Stdin 的行缓冲
        Ok(Self {
            input: File::from(fd),
        })
    }
}

impl KeySource for StdinKeys {
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        let timeout_ms = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let ready = {
            let mut fds = [PollFd::new(self.input.as_fd(), PollFlags::POLLIN)];
            poll(&mut fds, PollTimeout::from(timeout_ms))
        };
        match ready {
            Ok(0) => return Ok(None),
            Ok(_) => {},
            Err(Errno::EINTR) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let mut byte = [0u8; 1];
        match self.input.read(&mut byte) {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "keyboard input closed",
            )),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// 键盘线程主循环
///
/// 正常退出：按下 `q`，或其他来源请求了退出。读取错误直接返回，由调用方转为故障。
pub fn run_input_loop(
    keys: &mut dyn KeySource,
    velocity: &VelocityState,
    signal: &ShutdownSignal,
    poll_interval: Duration,
) -> Result<(), KeyopError> {
    while !signal.is_requested() {
        let Some(byte) = keys.next_key(poll_interval).map_err(KeyopError::KeyboardRead)? else {
            continue;
        };

        match KeyCommand::from_byte(byte) {
            Some(KeyCommand::IncrementLinear) => {
                velocity.increment_linear();
            },
            Some(KeyCommand::DecrementLinear) => {
                velocity.decrement_linear();
            },
            Some(KeyCommand::IncrementAngular) => {
                velocity.increment_angular();
            },
            Some(KeyCommand::DecrementAngular) => {
                velocity.decrement_angular();
            },
            Some(KeyCommand::Reset) => {
                velocity.reset();
            },
            Some(KeyCommand::Quit) => {
                info!("Quit requested from keyboard");
                signal.request();
                break;
            },
            None => trace!("Ignoring key byte {}", byte),
        }
    }
    debug!("Keyboard input loop exited");
    Ok(())
}
