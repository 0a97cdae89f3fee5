//! 底盘抽象接口
//!
//! 上层（键盘遥控、导航等）只依赖这两个 trait，
//! 串口驱动 [`Kobuki`](crate::Kobuki) 与仿真底盘 [`SimulatedBase`](crate::SimulatedBase) 都实现它们。

use crate::error::DriverError;
use crate::hooks::OdometryCallback;
use kobuki_protocol::ChargerSource;
use std::sync::Arc;

/// 速度下发接口
///
/// 里程计回调通过 `&dyn BaseControl` 拿到下发能力，
/// 回调对象因此不需要持有驱动本身（避免 Arc 循环引用）。
pub trait BaseControl: Send + Sync {
    /// 设置底盘速度
    ///
    /// # 参数
    /// - `linear`: 线速度（m/s）
    /// - `angular`: 角速度（rad/s），逆时针为正
    ///
    /// 底盘未使能时命令被丢弃，返回 `Ok(())`。
    fn set_velocity(&self, linear: f64, angular: f64) -> Result<(), DriverError>;
}

/// 底盘驱动接口
pub trait BaseDriver: BaseControl {
    /// 使能电机，之后 `set_velocity` 才会真正下发
    fn enable(&self) -> Result<(), DriverError>;

    /// 发送零速度并关闭下发
    fn disable(&self) -> Result<(), DriverError>;

    /// 注册里程计回调（在驱动的接收线程中调用）
    fn register_odometry_callback(&self, callback: Arc<dyn OdometryCallback>);

    /// 读取电量与故障状态
    fn energy_state(&self) -> EnergyState;

    /// 链路健康检查
    ///
    /// 后台线程因故障退出后返回错误，上层据此结束会话。
    fn check_health(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// 电量与故障状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyState {
    /// 电池电压（V），尚未收到反馈时为 0
    pub battery_voltage: f64,
    /// 充电来源
    pub charger: ChargerSource,
    /// 是否正在充电
    pub charging: bool,
    /// 任一电机过流
    pub over_current: bool,
}
