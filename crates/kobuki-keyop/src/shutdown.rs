//! 退出信号
//!
//! `quit_requested` 只会从 false 变为 true。来源有三个：键盘 `q`、外部中断（SIGINT）、
//! 运行期故障。主循环在条件变量上等待，请求到来时立即醒来。

use crate::error::KeyopError;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, warn};

/// 退出信号与首个故障
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    requested: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
    fault: Mutex<Option<KeyopError>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求退出
    ///
    /// 返回是否为第一次请求。
    pub fn request(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::SeqCst);
        // 持锁通知，避免等待方在检查标志与进入等待之间错过唤醒
        let _guard = self.lock.lock();
        self.condvar.notify_all();
        first
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// 最多等待 `timeout`，返回是否已请求退出
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.lock.lock();
        if !self.is_requested() {
            self.condvar
                .wait_while_for(&mut guard, |_| !self.is_requested(), timeout);
        }
        self.is_requested()
    }

    /// 记录故障并请求退出
    ///
    /// 只保留第一个故障，后续故障只记日志。
    pub fn fail(&self, err: KeyopError) {
        {
            let mut fault = self.fault.lock();
            if fault.is_none() {
                error!("{}", err);
                *fault = Some(err);
            } else {
                warn!("Additional fault during shutdown: {}", err);
            }
        }
        self.request();
    }

    pub fn has_fault(&self) -> bool {
        self.fault.lock().is_some()
    }

    /// 取出首个故障
    pub fn take_fault(&self) -> Option<KeyopError> {
        self.fault.lock().take()
    }
}
