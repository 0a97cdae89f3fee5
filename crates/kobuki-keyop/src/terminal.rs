//! 终端原始模式
//!
//! 进入原始模式前保存终端属性；`restore()` 无条件写回，可重复调用，
//! 即使从未成功进入原始模式也安全。`Drop` 时自动恢复。

use crate::error::KeyopError;
use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use std::io;
use std::os::fd::{AsFd, OwnedFd};
use tracing::{debug, warn};

/// 终端模式控制
///
/// 协调器只通过这个接口操作终端，测试中用假实现记录调用。
pub trait TerminalMode: Send {
    /// 关闭行缓冲和回显，read 在收到 1 个字节后返回
    fn enter_raw_mode(&mut self) -> Result<(), KeyopError>;

    /// 恢复进入原始模式前的属性（尽力而为，失败只记日志）
    fn restore(&mut self);
}

/// 真实终端（默认为 stdin）
pub struct RawTerminal {
    fd: OwnedFd,
    saved: Termios,
    raw: bool,
}

impl RawTerminal {
    /// 保存 `fd` 当前的终端属性
    pub fn capture(fd: OwnedFd) -> Result<Self, KeyopError> {
        let saved = termios::tcgetattr(&fd)?;
        Ok(Self {
            fd,
            saved,
            raw: false,
        })
    }

    /// 保存标准输入的终端属性
    pub fn stdin() -> Result<Self, KeyopError> {
        let fd = io::stdin()
            .as_fd()
            .try_clone_to_owned()
            .map_err(KeyopError::Terminal)?;
        Self::capture(fd)
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }
}

impl TerminalMode for RawTerminal {
    fn enter_raw_mode(&mut self) -> Result<(), KeyopError> {
        let mut raw = self.saved.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&self.fd, SetArg::TCSANOW, &raw)?;
        self.raw = true;
        debug!("Terminal switched to raw mode");
        Ok(())
    }

    fn restore(&mut self) {
        match termios::tcsetattr(&self.fd, SetArg::TCSANOW, &self.saved) {
            Ok(()) => {
                if self.raw {
                    debug!("Terminal attributes restored");
                }
                self.raw = false;
            },
            Err(e) => warn!("Failed to restore terminal attributes: {}", e),
        }
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        self.restore();
    }
}
