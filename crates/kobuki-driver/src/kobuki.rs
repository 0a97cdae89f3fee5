//! 串口底盘驱动
//!
//! 提供对外的 [`Kobuki`] 结构体，封装后台 IO 线程和状态同步细节。

use crate::base::{BaseControl, BaseDriver, EnergyState};
use crate::error::DriverError;
use crate::hooks::OdometryCallback;
use crate::limiter::AccelerationLimiter;
use crate::pipeline::*;
use crate::transport::Transport;
use kobuki_protocol::{BATTERY_VOLTAGE_SCALE, BasicSensorData};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Extension trait for timeout-capable thread joins
pub(crate) trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 由看门狗线程 join，主线程只等待通知
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// Kobuki 底盘驱动
///
/// 构造后立即启动 IO 线程；`Drop` 时停止线程并等待退出（最多 2 秒）。
pub struct Kobuki {
    commander: CommandSender,
    ctx: Arc<DriverContext>,
    is_running: Arc<AtomicBool>,
    io_thread: Option<JoinHandle<()>>,
    device: String,
}

impl Kobuki {
    /// 以默认参数连接串口设备并等待首帧反馈
    pub fn connect(device: &str) -> Result<Self, DriverError> {
        crate::KobukiBuilder::new().device(device).build()
    }

    /// 在给定传输层上启动驱动
    ///
    /// 不等待反馈；需要时调用 [`wait_for_feedback`](Self::wait_for_feedback)。
    pub fn new(
        transport: impl Transport + 'static,
        config: PipelineConfig,
        limiter: AccelerationLimiter,
    ) -> Result<Self, DriverError> {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(COMMAND_QUEUE_CAPACITY);
        let ctx = Arc::new(DriverContext::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let commander = CommandSender::new(cmd_tx, limiter, is_running.clone());

        let io_thread = {
            let ctx = ctx.clone();
            let commander = commander.clone();
            let is_running = is_running.clone();
            std::thread::Builder::new()
                .name("kobuki-io".to_string())
                .spawn(move || io_loop(transport, cmd_rx, ctx, commander, config, is_running))
                .map_err(|e| DriverError::IoThread(e.to_string()))?
        };

        Ok(Self {
            commander,
            ctx,
            is_running,
            io_thread: Some(io_thread),
            device: String::new(),
        })
    }

    pub(crate) fn with_device(mut self, device: String) -> Self {
        self.device = device;
        self
    }

    /// 设备路径（通过 [`Kobuki::new`] 直接构造时为空）
    pub fn device(&self) -> &str {
        &self.device
    }

    /// 等待接收到第一帧基础传感器数据
    ///
    /// # 返回值
    /// - `Ok(())`: 已收到反馈
    /// - `Err(DriverError::Timeout)`: 超时
    /// - `Err(DriverError::IoThread)`: IO 线程已退出
    pub fn wait_for_feedback(&self, timeout: Duration) -> Result<(), DriverError> {
        let start = Instant::now();

        loop {
            if self.feedback_count() > 0 {
                return Ok(());
            }
            self.check_health()?;
            if start.elapsed() >= timeout {
                return Err(DriverError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// 最近一帧基础传感器数据（无锁读取）
    pub fn sensor_data(&self) -> BasicSensorData {
        **self.ctx.sensors.load()
    }

    /// 已解析的基础传感器帧数
    pub fn feedback_count(&self) -> u64 {
        self.ctx.feedback_count.load(Ordering::Acquire)
    }

    /// 丢弃的数据包数
    pub fn dropped_packets(&self) -> u64 {
        self.ctx.dropped_packets.load(Ordering::Relaxed)
    }

    /// IO 线程是否仍在运行
    pub fn is_alive(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }
}

impl BaseControl for Kobuki {
    fn set_velocity(&self, linear: f64, angular: f64) -> Result<(), DriverError> {
        self.commander.set_velocity(linear, angular)
    }
}

impl BaseDriver for Kobuki {
    fn enable(&self) -> Result<(), DriverError> {
        self.check_health()?;
        self.commander.enable();
        info!("Kobuki enabled");
        Ok(())
    }

    fn disable(&self) -> Result<(), DriverError> {
        self.commander.disable()?;
        info!("Kobuki disabled");
        Ok(())
    }

    fn register_odometry_callback(&self, callback: Arc<dyn OdometryCallback>) {
        let mut hooks = self.ctx.hooks.write();
        hooks.add_callback(callback);
        debug!("Registered odometry callback ({} total)", hooks.len());
    }

    fn energy_state(&self) -> EnergyState {
        energy_state_from(&self.ctx.sensors.load())
    }

    fn check_health(&self) -> Result<(), DriverError> {
        if self.is_alive() {
            return Ok(());
        }
        let reason = self
            .ctx
            .fatal_error
            .lock()
            .clone()
            .unwrap_or_else(|| "IO thread stopped".to_string());
        Err(DriverError::IoThread(reason))
    }
}

pub(crate) fn energy_state_from(data: &BasicSensorData) -> EnergyState {
    EnergyState {
        battery_voltage: f64::from(data.battery) * BATTERY_VOLTAGE_SCALE,
        charger: data.charger_source(),
        charging: data.is_charging(),
        over_current: data.is_over_current(),
    }
}

impl Drop for Kobuki {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.io_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "IO thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}
