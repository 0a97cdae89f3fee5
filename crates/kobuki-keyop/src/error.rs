//! 遥控层错误类型定义

use kobuki_driver::DriverError;
use std::path::PathBuf;
use thiserror::Error;

/// 遥控层错误类型
#[derive(Error, Debug)]
pub enum KeyopError {
    /// 终端属性读取/设置失败（stdin 不是终端等）
    #[error("Terminal configuration failed: {0}")]
    Terminal(#[source] std::io::Error),

    /// 键盘读取失败（不可恢复）
    #[error("Keyboard read failed: {0}")]
    KeyboardRead(#[source] std::io::Error),

    /// 底盘驱动错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 配置文件读取失败
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// 配置值无效
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 键盘线程创建失败
    #[error("Failed to spawn input thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// 键盘线程 panic
    #[error("Input thread panicked")]
    InputThreadPanicked,

    /// 重复启动或在退出后启动
    #[error("Keyop already started or shut down")]
    AlreadyStarted,
}

impl From<nix::Error> for KeyopError {
    fn from(errno: nix::Error) -> Self {
        KeyopError::Terminal(errno.into())
    }
}
