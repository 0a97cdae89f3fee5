//! Pipeline IO 循环模块
//!
//! 后台 IO 线程负责：串口读取、拆包、解析基础传感器数据、
//! 计算里程计增量并触发回调，最后把命令队列中的控制包写回串口。

use crate::base::BaseControl;
use crate::error::DriverError;
use crate::hooks::HookManager;
use crate::limiter::AccelerationLimiter;
use crate::odometry::DiffDriveOdometry;
use crate::transport::Transport;
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use kobuki_protocol::{BaseControlCommand, BasicSensorData, Feedback, PacketFinder, parse_feedback};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// 命令通道容量
pub const COMMAND_QUEUE_CAPACITY: usize = 10;

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use kobuki_driver::PipelineConfig;
///
/// let config = PipelineConfig {
///     read_timeout_ms: 10,
///     feedback_timeout_ms: 500,
/// };
/// assert_eq!(config.read_timeout_ms, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 串口单次读取超时（毫秒）
    pub read_timeout_ms: u64,
    /// 超过此时间未收到有效反馈则告警（毫秒）
    pub feedback_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 5,
            feedback_timeout_ms: 200,
        }
    }
}

/// IO 线程与用户线程共享的状态
pub struct DriverContext {
    /// 最近一帧基础传感器数据
    pub sensors: ArcSwap<BasicSensorData>,
    /// 里程计回调
    pub hooks: RwLock<HookManager>,
    /// 已解析的基础传感器帧数
    pub feedback_count: AtomicU64,
    /// 丢弃的数据包数（校验和错误、子负载损坏）
    pub dropped_packets: AtomicU64,
    /// IO 线程退出原因（正常退出为 None）
    pub fatal_error: Mutex<Option<String>>,
}

impl DriverContext {
    pub fn new() -> Self {
        Self {
            sensors: ArcSwap::from_pointee(BasicSensorData::default()),
            hooks: RwLock::new(HookManager::new()),
            feedback_count: AtomicU64::new(0),
            dropped_packets: AtomicU64::new(0),
            fatal_error: Mutex::new(None),
        }
    }
}

impl Default for DriverContext {
    fn default() -> Self {
        Self::new()
    }
}

/// 使能状态与加速度限制器
///
/// 放在同一把锁下：`disable()` 发出的零速度之后不会再有旧的速度命令入队。
struct CommandGate {
    enabled: bool,
    limiter: AccelerationLimiter,
}

/// 速度命令发送端
///
/// 由驱动持有，同时作为 `&dyn BaseControl` 传给里程计回调。
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<BaseControlCommand>,
    gate: Arc<Mutex<CommandGate>>,
    is_running: Arc<AtomicBool>,
}

impl CommandSender {
    pub fn new(
        tx: Sender<BaseControlCommand>,
        limiter: AccelerationLimiter,
        is_running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tx,
            gate: Arc::new(Mutex::new(CommandGate {
                enabled: false,
                limiter,
            })),
            is_running,
        }
    }

    pub fn enable(&self) {
        let mut gate = self.gate.lock();
        gate.limiter.reset();
        gate.enabled = true;
    }

    /// 关闭下发并排队一个零速度命令
    pub fn disable(&self) -> Result<(), DriverError> {
        let mut gate = self.gate.lock();
        gate.enabled = false;
        gate.limiter.reset();
        self.ensure_running()?;
        self.tx
            .send_timeout(BaseControlCommand::STOP, Duration::from_millis(100))
            .map_err(|_| DriverError::ChannelFull)
    }

    pub fn is_enabled(&self) -> bool {
        self.gate.lock().enabled
    }

    fn ensure_running(&self) -> Result<(), DriverError> {
        if self.is_running.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(DriverError::IoThread("IO thread is not running".to_string()))
        }
    }
}

impl BaseControl for CommandSender {
    fn set_velocity(&self, linear: f64, angular: f64) -> Result<(), DriverError> {
        let mut gate = self.gate.lock();
        if !gate.enabled {
            trace!("Base disabled, dropping velocity command");
            return Ok(());
        }
        self.ensure_running()?;

        let (linear, angular) = gate.limiter.limit(linear, angular);
        let command = BaseControlCommand::from_velocity(linear, angular);
        match self.tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DriverError::ChannelFull),
            Err(TrySendError::Disconnected(_)) => Err(DriverError::ChannelClosed),
        }
    }
}

/// IO 线程主循环
///
/// # 参数
/// - `transport`: 串口（或测试用内存实现）
/// - `cmd_rx`: 命令队列接收端
/// - `ctx`: 共享状态
/// - `commander`: 传给回调的下发接口
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志，置 false 后循环退出；致命错误时由本循环置 false
pub fn io_loop(
    mut transport: impl Transport,
    cmd_rx: Receiver<BaseControlCommand>,
    ctx: Arc<DriverContext>,
    commander: CommandSender,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
) {
    let mut finder = PacketFinder::new();
    let mut odometry = DiffDriveOdometry::new();
    let mut buffer = [0u8; 256];

    let feedback_timeout = Duration::from_millis(config.feedback_timeout_ms);
    let mut last_feedback = Instant::now();
    let mut feedback_lost = false;

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("IO thread: is_running flag is false, exiting");
            break;
        }

        // 1. 读取并拆包
        match transport.read(&mut buffer) {
            Ok(0) => {},
            Ok(n) => {
                for packet in finder.extend(&buffer[..n]) {
                    match packet {
                        Ok(payload) => {
                            if handle_payload(&payload, &ctx, &commander, &mut odometry) {
                                if feedback_lost {
                                    info!("Feedback from base resumed");
                                    feedback_lost = false;
                                }
                                last_feedback = Instant::now();
                            }
                        },
                        Err(e) => {
                            ctx.dropped_packets.fetch_add(1, Ordering::Relaxed);
                            debug!("Dropped packet: {}", e);
                        },
                    }
                }
            },
            Err(e) => {
                fail(&ctx, &is_running, format!("serial read failed: {}", e));
                break;
            },
        }

        if !feedback_lost && last_feedback.elapsed() > feedback_timeout {
            warn!("No feedback from base for {:?}", feedback_timeout);
            feedback_lost = true;
        }

        // 2. 发送积压命令
        if let Err(e) = drain_tx_queue(&mut transport, &cmd_rx) {
            fail(&ctx, &is_running, format!("serial write failed: {}", e));
            break;
        }
    }
}

/// 解析一个完整 payload
///
/// 返回是否包含基础传感器数据。
fn handle_payload(
    payload: &[u8],
    ctx: &DriverContext,
    commander: &CommandSender,
    odometry: &mut DiffDriveOdometry,
) -> bool {
    let feedback = match parse_feedback(payload) {
        Ok(feedback) => feedback,
        Err(e) => {
            ctx.dropped_packets.fetch_add(1, Ordering::Relaxed);
            debug!("Malformed payload: {}", e);
            return false;
        },
    };

    let mut has_sensor_data = false;
    for item in feedback {
        match item {
            Feedback::BasicSensorData(data) => {
                has_sensor_data = true;
                ctx.sensors.store(Arc::new(data));
                ctx.feedback_count.fetch_add(1, Ordering::Release);

                let sample = odometry.update(&data);
                ctx.hooks.read().trigger_all(commander, &sample);
            },
            Feedback::Unhandled { id, len } => {
                trace!("Ignoring sub-payload {:#04x} ({} bytes)", id, len);
            },
        }
    }
    has_sensor_data
}

/// 把命令队列中的控制包写到串口
///
/// 单次最多发送 `MAX_DRAIN_PER_CYCLE` 个包，避免阻塞读取。
fn drain_tx_queue(
    transport: &mut impl Transport,
    cmd_rx: &Receiver<BaseControlCommand>,
) -> Result<(), DriverError> {
    const MAX_DRAIN_PER_CYCLE: usize = COMMAND_QUEUE_CAPACITY;

    for _ in 0..MAX_DRAIN_PER_CYCLE {
        match cmd_rx.try_recv() {
            Ok(command) => {
                let packet = command.to_packet()?;
                transport.write_all(&packet)?;
            },
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    Ok(())
}

fn fail(ctx: &DriverContext, is_running: &AtomicBool, reason: String) {
    error!("IO thread stopped: {}", reason);
    *ctx.fatal_error.lock() = Some(reason);
    is_running.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::OdometryCallback;
    use crate::limiter::AccelerationLimits;
    use crate::odometry::OdometrySample;
    use crossbeam_channel::bounded;
    use kobuki_protocol::{BASIC_SENSOR_DATA_LEN, FeedbackId, encode_packet};
    use std::collections::VecDeque;
    use std::thread;

    struct MockTransport {
        incoming: Arc<Mutex<VecDeque<Vec<u8>>>>,
        written: Arc<Mutex<Vec<Vec<u8>>>>,
        fail_reads: bool,
    }

    impl Transport for MockTransport {
        fn read(&mut self, buffer: &mut [u8]) -> Result<usize, DriverError> {
            if self.fail_reads {
                return Err(DriverError::Io(std::io::Error::other("unplugged")));
            }
            match self.incoming.lock().pop_front() {
                Some(chunk) => {
                    buffer[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                },
                None => {
                    thread::sleep(Duration::from_millis(1));
                    Ok(0)
                },
            }
        }

        fn write_all(&mut self, data: &[u8]) -> Result<(), DriverError> {
            self.written.lock().push(data.to_vec());
            Ok(())
        }
    }

    fn sensor_packet(timestamp_ms: u16, left: u16, right: u16) -> Vec<u8> {
        let mut payload = vec![FeedbackId::BasicSensorData.into(), BASIC_SENSOR_DATA_LEN as u8];
        let mut data = [0u8; BASIC_SENSOR_DATA_LEN];
        data[0..2].copy_from_slice(&timestamp_ms.to_le_bytes());
        data[5..7].copy_from_slice(&left.to_le_bytes());
        data[7..9].copy_from_slice(&right.to_le_bytes());
        data[13] = 160;
        payload.extend_from_slice(&data);
        encode_packet(&payload).unwrap()
    }

    /// 每帧下发一次固定速度
    struct Echo {
        samples: Mutex<Vec<OdometrySample>>,
    }

    impl OdometryCallback for Echo {
        fn on_odometry(&self, base: &dyn BaseControl, sample: &OdometrySample) {
            self.samples.lock().push(*sample);
            base.set_velocity(0.1, 0.0).unwrap();
        }
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.read_timeout_ms, 5);
        assert_eq!(config.feedback_timeout_ms, 200);
    }

    #[test]
    fn test_set_velocity_dropped_while_disabled() {
        let (tx, rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let sender = CommandSender::new(
            tx,
            AccelerationLimiter::new(AccelerationLimits::default(), false),
            running,
        );

        sender.set_velocity(0.2, 0.0).unwrap();
        assert!(rx.try_recv().is_err());

        sender.enable();
        sender.set_velocity(0.2, 0.0).unwrap();
        assert_eq!(rx.try_recv().unwrap(), BaseControlCommand::from_velocity(0.2, 0.0));

        sender.disable().unwrap();
        assert_eq!(rx.try_recv().unwrap(), BaseControlCommand::STOP);
        assert!(!sender.is_enabled());
    }

    #[test]
    fn test_set_velocity_reports_full_queue() {
        let (tx, _rx) = bounded(1);
        let sender = CommandSender::new(
            tx,
            AccelerationLimiter::new(AccelerationLimits::default(), false),
            Arc::new(AtomicBool::new(true)),
        );
        sender.enable();
        sender.set_velocity(0.1, 0.0).unwrap();
        assert!(matches!(
            sender.set_velocity(0.1, 0.0),
            Err(DriverError::ChannelFull)
        ));
    }

    #[test]
    fn test_set_velocity_fails_after_io_thread_stopped() {
        let (tx, _rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let sender = CommandSender::new(
            tx,
            AccelerationLimiter::new(AccelerationLimits::default(), false),
            Arc::new(AtomicBool::new(false)),
        );
        sender.enable();
        assert!(matches!(
            sender.set_velocity(0.1, 0.0),
            Err(DriverError::IoThread(_))
        ));
    }

    #[test]
    fn test_io_loop_parses_feedback_and_writes_commands() {
        let incoming = Arc::new(Mutex::new(VecDeque::new()));
        let written = Arc::new(Mutex::new(Vec::new()));

        // 第二帧拆成两半，中间夹一个校验错误的包
        let first = sensor_packet(1000, 0, 0);
        let second = sensor_packet(1020, 100, 100);
        let mut corrupted = sensor_packet(1010, 1, 1);
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        {
            let mut queue = incoming.lock();
            queue.push_back(first);
            queue.push_back(corrupted);
            queue.push_back(second[..5].to_vec());
            queue.push_back(second[5..].to_vec());
        }

        let transport = MockTransport {
            incoming: incoming.clone(),
            written: written.clone(),
            fail_reads: false,
        };

        let ctx = Arc::new(DriverContext::new());
        let echo = Arc::new(Echo {
            samples: Mutex::new(Vec::new()),
        });
        ctx.hooks.write().add_callback(echo.clone());

        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let commander = CommandSender::new(
            tx,
            AccelerationLimiter::new(AccelerationLimits::default(), false),
            running.clone(),
        );
        commander.enable();

        let handle = {
            let ctx = ctx.clone();
            let running = running.clone();
            thread::spawn(move || {
                io_loop(transport, rx, ctx, commander, PipelineConfig::default(), running)
            })
        };

        assert!(wait_until(Duration::from_secs(2), || {
            written.lock().len() >= 2
        }));
        running.store(false, Ordering::Release);
        handle.join().unwrap();

        assert_eq!(ctx.feedback_count.load(Ordering::Acquire), 2);
        assert_eq!(ctx.dropped_packets.load(Ordering::Relaxed), 1);
        assert_eq!(ctx.sensors.load().timestamp_ms, 1020);

        let samples = echo.samples.lock();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].delta, crate::Pose2D::IDENTITY);
        assert!(samples[1].delta.x > 0.0);

        let expected = BaseControlCommand::from_velocity(0.1, 0.0).to_packet().unwrap();
        assert!(written.lock().iter().all(|packet| *packet == expected));
    }

    #[test]
    fn test_io_loop_read_error_stops_thread() {
        let transport = MockTransport {
            incoming: Arc::new(Mutex::new(VecDeque::new())),
            written: Arc::new(Mutex::new(Vec::new())),
            fail_reads: true,
        };
        let ctx = Arc::new(DriverContext::new());
        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let commander = CommandSender::new(
            tx,
            AccelerationLimiter::new(AccelerationLimits::default(), false),
            running.clone(),
        );

        io_loop(transport, rx, ctx.clone(), commander, PipelineConfig::default(), running.clone());

        assert!(!running.load(Ordering::Acquire));
        assert!(ctx.fatal_error.lock().as_deref().unwrap().contains("unplugged"));
    }
}
