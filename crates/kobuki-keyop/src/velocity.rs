//! 共享速度命令
//!
//! 键盘线程写、里程计回调读，一把 `parking_lot::Mutex` 保证读到的是一致的 (v, ω) 对。
//!
//! 上限检查发生在递增之前（先判断再加），所以最终值可能超过上限一个步长：
//! 步长 0.25、上限 1.0 时连续按上键，线速度停在 1.25。

use crate::config::VelocityLimits;
use parking_lot::Mutex;
use tracing::info;

/// 速度命令
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    /// 线速度（m/s）
    pub linear: f64,
    /// 角速度（rad/s）
    pub angular: f64,
}

impl VelocityCommand {
    pub const ZERO: Self = Self {
        linear: 0.0,
        angular: 0.0,
    };
}

/// 速度状态
#[derive(Debug)]
pub struct VelocityState {
    command: Mutex<VelocityCommand>,
    limits: VelocityLimits,
}

impl VelocityState {
    pub fn new(limits: VelocityLimits) -> Self {
        Self {
            command: Mutex::new(VelocityCommand::ZERO),
            limits,
        }
    }

    pub fn limits(&self) -> &VelocityLimits {
        &self.limits
    }

    /// 线速度加一步（未超过上限时）
    pub fn increment_linear(&self) -> VelocityCommand {
        let step = self.limits.linear_step;
        let max = self.limits.linear_max;
        let command = self.update(|c| {
            if c.linear <= max {
                c.linear += step;
            }
        });
        info!("linear velocity incremented [{}|{}]", command.linear, command.angular);
        command
    }

    /// 线速度减一步（未低于下限时）
    pub fn decrement_linear(&self) -> VelocityCommand {
        let step = self.limits.linear_step;
        let max = self.limits.linear_max;
        let command = self.update(|c| {
            if c.linear >= -max {
                c.linear -= step;
            }
        });
        info!("linear velocity decremented [{}|{}]", command.linear, command.angular);
        command
    }

    /// 角速度加一步（逆时针）
    pub fn increment_angular(&self) -> VelocityCommand {
        let step = self.limits.angular_step;
        let max = self.limits.angular_max;
        let command = self.update(|c| {
            if c.angular <= max {
                c.angular += step;
            }
        });
        info!("angular velocity incremented [{}|{}]", command.linear, command.angular);
        command
    }

    /// 角速度减一步（顺时针）
    pub fn decrement_angular(&self) -> VelocityCommand {
        let step = self.limits.angular_step;
        let max = self.limits.angular_max;
        let command = self.update(|c| {
            if c.angular >= -max {
                c.angular -= step;
            }
        });
        info!("angular velocity decremented [{}|{}]", command.linear, command.angular);
        command
    }

    /// 线速度与角速度清零
    pub fn reset(&self) -> VelocityCommand {
        let command = self.update(|c| *c = VelocityCommand::ZERO);
        info!("reset linear/angular velocities");
        command
    }

    /// 读取当前命令
    pub fn snapshot(&self) -> VelocityCommand {
        *self.command.lock()
    }

    fn update(&self, f: impl FnOnce(&mut VelocityCommand)) -> VelocityCommand {
        let mut command = self.command.lock();
        f(&mut command);
        *command
    }
}

impl Default for VelocityState {
    fn default() -> Self {
        Self::new(VelocityLimits::default())
    }
}
