//! 底盘物理常量

/// 轮距（两轮中心距离，米）
pub const WHEEL_BIAS_M: f64 = 0.23;

/// 轮半径（米）
pub const WHEEL_RADIUS_M: f64 = 0.035;

/// 编码器单个 tick 对应的车轮转角（弧度）
pub const TICK_TO_RAD: f64 = 0.002_436_916_871_363_930_187_454;

/// 串口波特率
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// 电池电压单位（原始值 × 0.1V）
pub const BATTERY_VOLTAGE_SCALE: f64 = 0.1;

/// 低于此速度/角速度视为零（速度命令换算用）
pub const VELOCITY_EPSILON: f64 = 0.0001;
