//! 遥控协调器
//!
//! 持有终端、底盘与键盘线程，负责启动顺序和退出顺序：
//!
//! 1. `init`：原始模式 → 注册里程计回调 → 使能底盘 → 启动键盘线程
//! 2. `spin`：主循环按固定间隔打印位姿，直到退出请求
//! 3. `shutdown`：(a) 置退出标志 (b) 等待键盘线程 (c) 零速度 (d) 去使能 (e) 恢复终端
//!
//! 每一步即使前一步失败也会执行；`shutdown` 可重复调用，`Drop` 时兜底调用。

use crate::config::{KeyopConfig, VelocityLimits};
use crate::error::KeyopError;
use crate::keyboard::{KeySource, run_input_loop};
use crate::pose::SharedPose;
use crate::shutdown::ShutdownSignal;
use crate::telemetry::TelemetryHandler;
use crate::terminal::TerminalMode;
use crate::velocity::{VelocityCommand, VelocityState};
use kobuki_driver::{BaseDriver, Pose2D};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// 启动说明：步长/上限与按键
pub fn startup_banner(limits: &VelocityLimits) -> String {
    format!(
        "KobukiManager : using linear  vel step [{}].\n\
         KobukiManager : using linear  vel max  [{}].\n\
         KobukiManager : using angular vel step [{}].\n\
         KobukiManager : using angular vel max  [{}].\n\
         Reading from keyboard\n\
         ---------------------------\n\
         Forward/back arrows : linear velocity incr/decr.\n\
         Right/left arrows : angular velocity incr/decr.\n\
         Spacebar : reset linear/angular velocities.\n\
         q : quit.",
        limits.linear_step, limits.linear_max, limits.angular_step, limits.angular_max
    )
}

/// 遥控协调器
pub struct KeyopManager {
    config: KeyopConfig,
    driver: Arc<dyn BaseDriver>,
    velocity: Arc<VelocityState>,
    pose: Arc<SharedPose>,
    signal: Arc<ShutdownSignal>,
    telemetry: Arc<TelemetryHandler>,
    terminal: Box<dyn TerminalMode>,
    input_thread: Option<JoinHandle<()>>,
    started: bool,
    shut_down: bool,
}

impl KeyopManager {
    pub fn new(
        config: KeyopConfig,
        driver: Arc<dyn BaseDriver>,
        terminal: Box<dyn TerminalMode>,
    ) -> Self {
        let velocity = Arc::new(VelocityState::new(config.velocity));
        let pose = Arc::new(SharedPose::new());
        let signal = Arc::new(ShutdownSignal::new());
        let telemetry = Arc::new(TelemetryHandler::new(
            velocity.clone(),
            pose.clone(),
            signal.clone(),
        ));

        Self {
            config,
            driver,
            velocity,
            pose,
            signal,
            telemetry,
            terminal,
            input_thread: None,
            started: false,
            shut_down: false,
        }
    }

    /// 退出信号（交给 SIGINT 处理函数）
    pub fn signal(&self) -> Arc<ShutdownSignal> {
        self.signal.clone()
    }

    pub fn config(&self) -> &KeyopConfig {
        &self.config
    }

    /// 当前速度命令
    pub fn velocity(&self) -> VelocityCommand {
        self.velocity.snapshot()
    }

    /// 当前累积位姿
    pub fn pose(&self) -> Pose2D {
        self.pose.load()
    }

    /// 启动
    ///
    /// 任一步失败都会执行完整的退出流程（恢复终端、去使能）后返回错误。
    /// 只能调用一次；重复调用返回 [`KeyopError::AlreadyStarted`]，不影响当前会话。
    pub fn init(&mut self, keys: Box<dyn KeySource>) -> Result<(), KeyopError> {
        if self.started || self.shut_down {
            return Err(KeyopError::AlreadyStarted);
        }
        self.started = true;

        if let Err(e) = self.try_init(keys) {
            self.shutdown();
            return Err(e);
        }
        Ok(())
    }

    fn try_init(&mut self, mut keys: Box<dyn KeySource>) -> Result<(), KeyopError> {
        self.terminal.enter_raw_mode()?;
        self.driver.register_odometry_callback(self.telemetry.clone());
        self.driver.enable()?;

        let velocity = self.velocity.clone();
        let signal = self.signal.clone();
        let poll_interval = self.config.supervisor.input_poll();
        let handle = std::thread::Builder::new()
            .name("keyop-input".to_string())
            .spawn(move || {
                if let Err(e) = run_input_loop(keys.as_mut(), &velocity, &signal, poll_interval) {
                    signal.fail(e);
                }
            })
            .map_err(KeyopError::ThreadSpawn)?;
        self.input_thread = Some(handle);

        info!("Keyop started");
        Ok(())
    }

    /// 主循环
    ///
    /// 每个间隔检查一次退出请求与底盘健康状态，否则调用 `report` 输出位姿。
    /// 结束后执行退出流程；若期间有故障则返回首个故障。
    pub fn spin(&mut self, mut report: impl FnMut(&Pose2D)) -> Result<(), KeyopError> {
        let interval = self.config.supervisor.report_interval();
        loop {
            if self.signal.wait_timeout(interval) {
                break;
            }
            if let Err(e) = self.driver.check_health() {
                self.signal.fail(e.into());
                break;
            }
            report(&self.pose.load());
        }

        self.shutdown();
        match self.signal.take_fault() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// 有序退出（幂等）
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        debug!("Shutting down keyop");

        // (a)
        self.signal.request();

        // (b)
        if let Some(handle) = self.input_thread.take()
            && handle.join().is_err()
        {
            self.signal.fail(KeyopError::InputThreadPanicked);
        }

        // 回调此后只更新位姿，保证零速度是最后一条速度命令
        self.telemetry.close_actuation();
        self.velocity.reset();

        // (c)
        if let Err(e) = self.driver.set_velocity(0.0, 0.0) {
            warn!("Failed to send zero velocity: {}", e);
        }

        // (d)
        if let Err(e) = self.driver.disable() {
            warn!("Failed to disable base: {}", e);
        }

        // (e)
        self.terminal.restore();
        info!("Keyop stopped");
    }
}

impl Drop for KeyopManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
