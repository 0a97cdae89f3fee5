//! # Simple Keyop
//!
//! 用键盘驾驶 Kobuki 底盘。
//!
//! ```bash
//! # 默认串口 /dev/kobuki
//! simple-keyop
//!
//! # 指定串口与配置文件
//! simple-keyop /dev/ttyUSB0 --config ./keyop.toml
//!
//! # 无硬件时使用仿真底盘
//! simple-keyop --simulate
//! ```
//!
//! 日志写到 stderr（`RUST_LOG` 可调），stdout 只有启动说明和位姿。

use anyhow::{Context, Result};
use clap::Parser;
use kobuki_driver::{
    AccelerationLimiter, AccelerationLimits, BaseDriver, DEFAULT_DEVICE, Kobuki, KobukiBuilder,
    SimulatedBase,
};
use kobuki_keyop::{KeyopConfig, KeyopManager, RawTerminal, StdinKeys, startup_banner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Simple Keyop - Kobuki 键盘遥控
#[derive(Parser, Debug)]
#[command(name = "simple-keyop")]
#[command(about = "Utility for driving kobuki by keyboard", long_about = None)]
#[command(version)]
struct Args {
    /// 串口设备路径
    #[arg(default_value = DEFAULT_DEVICE)]
    device_port: String,

    /// 配置文件（默认读取 <config_dir>/kobuki/keyop.toml，不存在则使用内置默认值）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 使用仿真底盘代替串口
    #[arg(long)]
    simulate: bool,

    /// 关闭加速度限制器
    #[arg(long)]
    no_acceleration_limiter: bool,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kobuki").join("keyop.toml"))
}

fn load_config(explicit: Option<&Path>) -> Result<KeyopConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(KeyopConfig::default()),
        },
    };

    let config = KeyopConfig::load_from_file(&path)
        .with_context(|| format!("loading config {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

fn connect(args: &Args) -> Result<Arc<dyn BaseDriver>> {
    let limiter_enabled = !args.no_acceleration_limiter;

    if args.simulate {
        let limiter = AccelerationLimiter::new(AccelerationLimits::default(), limiter_enabled);
        let base = SimulatedBase::new(limiter).context("starting simulated base")?;
        return Ok(Arc::new(base));
    }

    let kobuki = if limiter_enabled {
        Kobuki::connect(&args.device_port)
    } else {
        KobukiBuilder::new()
            .device(args.device_port.as_str())
            .acceleration_limiter(false)
            .build()
    }
    .with_context(|| format!("connecting to kobuki on {}", args.device_port))?;
    Ok(Arc::new(kobuki))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simple_keyop=info".parse()?)
                .add_directive("kobuki_keyop=info".parse()?)
                .add_directive("kobuki_driver=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    println!("Simple Keyop : Utility for driving kobuki by keyboard.");

    // 先确认 stdin 是终端，再连接底盘
    let terminal = RawTerminal::stdin().context("keyboard input must be a terminal")?;
    let driver = connect(&args)?;

    let energy = driver.energy_state();
    info!(
        "Battery: {:.1} V, charger: {:?}, charging: {}",
        energy.battery_voltage, energy.charger, energy.charging
    );
    if energy.over_current {
        warn!("Wheel over-current reported by base");
    }

    let mut manager = KeyopManager::new(config, driver, Box::new(terminal));

    let signal = manager.signal();
    ctrlc::set_handler(move || {
        if signal.request() {
            info!("Interrupt received, shutting down");
        }
    })
    .context("installing Ctrl-C handler")?;

    println!("{}", startup_banner(&manager.config().velocity));

    let keys = StdinKeys::new().context("opening keyboard input")?;
    manager.init(Box::new(keys))?;
    manager.spin(|pose| println!("current pose: {}", pose))?;

    Ok(())
}
