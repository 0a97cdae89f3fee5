//! 仿真底盘
//!
//! 没有硬件时使用：后台线程以固定周期（默认 50Hz，与真实底盘反馈频率一致）
//! 按当前速度命令积分出里程计增量并触发回调。

use crate::base::{BaseControl, BaseDriver, EnergyState};
use crate::error::DriverError;
use crate::hooks::{HookManager, OdometryCallback};
use crate::kobuki::JoinTimeout;
use crate::limiter::AccelerationLimiter;
use crate::odometry::{OdometrySample, Pose2D};
use kobuki_protocol::ChargerSource;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// 默认仿真周期（50Hz）
pub const DEFAULT_SIM_PERIOD: Duration = Duration::from_millis(20);

/// 仿真电池电压（V）
const SIM_BATTERY_VOLTAGE: f64 = 16.0;

#[derive(Debug)]
struct SimCommand {
    enabled: bool,
    linear: f64,
    angular: f64,
    limiter: AccelerationLimiter,
}

struct SimState {
    command: Mutex<SimCommand>,
    hooks: RwLock<HookManager>,
    /// 积分得到的真实位姿（测试对照用）
    pose: Mutex<Pose2D>,
}

impl BaseControl for SimState {
    fn set_velocity(&self, linear: f64, angular: f64) -> Result<(), DriverError> {
        let mut command = self.command.lock();
        if !command.enabled {
            trace!("Simulated base disabled, dropping velocity command");
            return Ok(());
        }
        let (linear, angular) = command.limiter.limit(linear, angular);
        command.linear = linear;
        command.angular = angular;
        Ok(())
    }
}

/// 仿真底盘
pub struct SimulatedBase {
    state: Arc<SimState>,
    is_running: Arc<AtomicBool>,
    sim_thread: Option<JoinHandle<()>>,
}

impl SimulatedBase {
    /// 以默认周期启动
    pub fn new(limiter: AccelerationLimiter) -> Result<Self, DriverError> {
        Self::with_period(limiter, DEFAULT_SIM_PERIOD)
    }

    /// 以指定周期启动
    pub fn with_period(limiter: AccelerationLimiter, period: Duration) -> Result<Self, DriverError> {
        if period.is_zero() {
            return Err(DriverError::InvalidInput("simulation period must be positive".to_string()));
        }
        // 底盘时间戳为 16 位毫秒计数
        let step_ms = u16::try_from(period.as_millis()).map_err(|_| {
            DriverError::InvalidInput(format!(
                "simulation period must be below {} ms, got {:?}",
                u32::from(u16::MAX) + 1,
                period
            ))
        })?;

        let state = Arc::new(SimState {
            command: Mutex::new(SimCommand {
                enabled: false,
                linear: 0.0,
                angular: 0.0,
                limiter,
            }),
            hooks: RwLock::new(HookManager::new()),
            pose: Mutex::new(Pose2D::IDENTITY),
        });
        let is_running = Arc::new(AtomicBool::new(true));

        let sim_thread = {
            let state = state.clone();
            let is_running = is_running.clone();
            std::thread::Builder::new()
                .name("kobuki-sim".to_string())
                .spawn(move || sim_loop(&state, &is_running, period, step_ms))
                .map_err(|e| DriverError::IoThread(e.to_string()))?
        };

        info!("Simulated base started ({:?} period)", period);
        Ok(Self {
            state,
            is_running,
            sim_thread: Some(sim_thread),
        })
    }

    /// 仿真积分得到的位姿
    pub fn true_pose(&self) -> Pose2D {
        *self.state.pose.lock()
    }

    /// 当前生效的速度 (linear, angular)
    pub fn current_velocity(&self) -> (f64, f64) {
        let command = self.state.command.lock();
        (command.linear, command.angular)
    }
}

fn sim_loop(state: &SimState, is_running: &AtomicBool, period: Duration, step_ms: u16) {
    let dt = period.as_secs_f64();
    let mut timestamp_ms: u16 = 0;

    while is_running.load(Ordering::Acquire) {
        spin_sleep::sleep(period);
        timestamp_ms = timestamp_ms.wrapping_add(step_ms);

        // 回调会重新进入 set_velocity，先释放命令锁
        let (linear, angular) = {
            let command = state.command.lock();
            (command.linear, command.angular)
        };

        let sample = OdometrySample::from_velocity(linear, angular, dt, timestamp_ms);
        {
            let mut pose = state.pose.lock();
            *pose *= sample.delta;
        }
        state.hooks.read().trigger_all(state, &sample);
    }
    trace!("Simulation thread exiting");
}

impl BaseControl for SimulatedBase {
    fn set_velocity(&self, linear: f64, angular: f64) -> Result<(), DriverError> {
        self.state.set_velocity(linear, angular)
    }
}

impl BaseDriver for SimulatedBase {
    fn enable(&self) -> Result<(), DriverError> {
        let mut command = self.state.command.lock();
        command.limiter.reset();
        command.enabled = true;
        info!("Simulated base enabled");
        Ok(())
    }

    fn disable(&self) -> Result<(), DriverError> {
        let mut command = self.state.command.lock();
        command.enabled = false;
        command.linear = 0.0;
        command.angular = 0.0;
        command.limiter.reset();
        info!("Simulated base disabled");
        Ok(())
    }

    fn register_odometry_callback(&self, callback: Arc<dyn OdometryCallback>) {
        let mut hooks = self.state.hooks.write();
        hooks.add_callback(callback);
        debug!("Registered odometry callback ({} total)", hooks.len());
    }

    fn energy_state(&self) -> EnergyState {
        EnergyState {
            battery_voltage: SIM_BATTERY_VOLTAGE,
            charger: ChargerSource::None,
            charging: false,
            over_current: false,
        }
    }
}

impl Drop for SimulatedBase {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.sim_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "Simulation thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}
