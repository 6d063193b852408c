use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use oscleash::bridge::{ControlLoop, LeashPhase, LoopSettings, MovementCommand};
use oscleash::leash::{LeashHandle, LeashUpdate, LeashWorker};
use oscleash::osc::{CommandSink, TransportError};

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(String, f32)>>,
}

impl RecordingSink {
    fn commands(&self) -> Vec<MovementCommand> {
        let sent = self.sent.lock().unwrap();
        assert_eq!(sent.len() % 3, 0, "partial command in {sent:?}");
        sent.chunks(3)
            .map(|chunk| {
                assert_eq!(chunk[0].0, "/input/Vertical");
                assert_eq!(chunk[1].0, "/input/Horizontal");
                assert_eq!(chunk[2].0, "/input/Run");
                MovementCommand {
                    vertical: chunk[0].1,
                    horizontal: chunk[1].1,
                    run: chunk[2].1 == 1.0,
                }
            })
            .collect()
    }

    fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn send_float(&self, address: &str, value: f32) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((address.to_string(), value));
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl CommandSink for FailingSink {
    async fn send_float(&self, address: &str, _value: f32) -> Result<(), TransportError> {
        Err(TransportError::Send {
            address: address.to_string(),
            target: SocketAddr::from(([127, 0, 0, 1], 9000)),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        })
    }
}

fn settings() -> LoopSettings {
    LoopSettings {
        active_delay: Duration::from_millis(100),
        inactive_delay: Duration::from_millis(150),
        ..LoopSettings::default()
    }
}

fn setup(
    sink: Arc<dyn CommandSink>,
) -> (
    ControlLoop<oscleash::bridge::control_loop::Waiting>,
    LeashHandle,
    CancellationToken,
) {
    let cancel = CancellationToken::new();
    let (leash, _worker) = LeashWorker::spawn(cancel.clone());
    let control = ControlLoop::create(leash.clone(), sink, settings(), cancel.clone());
    (control, leash, cancel)
}

async fn grab(leash: &LeashHandle, stretch: f32) {
    leash.apply(LeashUpdate::ZPositive(1.0)).await.unwrap();
    leash.apply(LeashUpdate::ZNegative(0.0)).await.unwrap();
    leash.apply(LeashUpdate::Stretch(stretch)).await.unwrap();
    leash.apply(LeashUpdate::Grabbed(true)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn idle_start_sends_only_the_initial_stop() {
    let sink = Arc::new(RecordingSink::default());
    let (mut control, _leash, _cancel) = setup(sink.clone());

    control.stop().await;
    assert_eq!(sink.commands(), vec![MovementCommand::STOP]);

    let started = tokio::time::Instant::now();
    let control = control.tick().await.unwrap();
    assert_eq!(sink.commands(), vec![MovementCommand::STOP]);
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(control.stats().ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn grab_release_cycle() {
    let sink = Arc::new(RecordingSink::default());
    let (control, leash, _cancel) = setup(sink.clone());

    grab(&leash, 0.9).await;
    let control = control.tick().await.unwrap();
    assert_eq!(
        sink.commands(),
        vec![MovementCommand {
            vertical: 0.9,
            horizontal: 0.0,
            run: true
        }]
    );
    sink.clear();

    leash.apply(LeashUpdate::Grabbed(false)).await.unwrap();
    let started = tokio::time::Instant::now();
    let control = control.tick().await.unwrap();
    assert_eq!(
        sink.commands(),
        vec![MovementCommand::STOP, MovementCommand::STOP]
    );
    assert!(started.elapsed() >= Duration::from_millis(150));
    sink.clear();

    let control = control.tick().await.unwrap();
    let control = control.tick().await.unwrap();
    assert!(sink.commands().is_empty());
    assert_eq!(control.stats().releases, 1);

    // grabbing again re-arms the release detection
    grab(&leash, 0.5).await;
    let control = control.tick().await.unwrap();
    assert_eq!(
        sink.commands(),
        vec![MovementCommand {
            vertical: 0.5,
            horizontal: 0.0,
            run: false
        }]
    );
    sink.clear();

    leash.apply(LeashUpdate::Grabbed(false)).await.unwrap();
    let control = control.tick().await.unwrap();
    assert_eq!(
        sink.commands(),
        vec![MovementCommand::STOP, MovementCommand::STOP]
    );
    sink.clear();

    let control = control.tick().await.unwrap();
    assert!(sink.commands().is_empty());
    assert_eq!(control.stats().releases, 2);
}

#[tokio::test(start_paused = true)]
async fn tick_uses_latest_value_of_each_field() {
    let sink = Arc::new(RecordingSink::default());
    let (control, leash, _cancel) = setup(sink.clone());

    grab(&leash, 0.5).await;
    leash.apply(LeashUpdate::ZPositive(0.25)).await.unwrap();
    leash.apply(LeashUpdate::XPositive(1.0)).await.unwrap();
    leash.apply(LeashUpdate::XNegative(0.5)).await.unwrap();
    leash.apply(LeashUpdate::Stretch(0.4)).await.unwrap();

    control.tick().await.unwrap();
    let commands = sink.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].vertical, 0.25 * 0.4);
    assert_eq!(commands[0].horizontal, 0.5 * 0.4);
    assert!(!commands[0].run);
}

#[tokio::test(start_paused = true)]
async fn deadzone_phases_while_grabbed() {
    let sink = Arc::new(RecordingSink::default());
    let (control, leash, _cancel) = setup(sink.clone());

    grab(&leash, 0.70).await;
    let deciding = control.observe().await.unwrap();
    let emitting = deciding.decide();
    assert_eq!(emitting.action().unwrap().phase, LeashPhase::Walking);
    let control = emitting.emit().await;

    leash.apply(LeashUpdate::Stretch(0.15)).await.unwrap();
    let control = control.tick().await.unwrap();

    assert_eq!(
        sink.commands(),
        vec![
            MovementCommand {
                vertical: 0.70,
                horizontal: 0.0,
                run: false
            },
            MovementCommand::STOP
        ]
    );
    assert_eq!(control.stats().commands, 2);
}

#[tokio::test(start_paused = true)]
async fn send_failures_do_not_stop_ticks() {
    let (control, leash, _cancel) = setup(Arc::new(FailingSink));

    grab(&leash, 0.9).await;
    let control = control.tick().await.unwrap();
    let control = control.tick().await.unwrap();

    let stats = control.stats();
    assert_eq!(stats.ticks, 2);
    assert_eq!(stats.commands, 2);
    assert_eq!(stats.send_failures, 6);
}

#[tokio::test(start_paused = true)]
async fn run_stops_movement_on_start_and_cancel() {
    let sink = Arc::new(RecordingSink::default());
    let (control, leash, cancel) = setup(sink.clone());

    grab(&leash, 0.9).await;
    let task = tokio::spawn(control.run());

    tokio::time::sleep(Duration::from_millis(450)).await;
    cancel.cancel();
    let stats = task.await.unwrap();

    // ticks start at 0, 100, 200, 300 and 400ms
    let running = MovementCommand {
        vertical: 0.9,
        horizontal: 0.0,
        run: true,
    };
    assert_eq!(stats.ticks, 5);
    let mut expected = vec![MovementCommand::STOP];
    expected.extend([running; 5]);
    expected.push(MovementCommand::STOP);
    assert_eq!(sink.commands(), expected);
}

#[tokio::test(start_paused = true)]
async fn idle_ticks_wait_active_delay_after_inactive_delay() {
    let sink = Arc::new(RecordingSink::default());
    let (control, _leash, cancel) = setup(sink.clone());

    let task = tokio::spawn(control.run());

    // 150ms idle wait plus 100ms between ticks: ticks start at
    // 0, 250, 500, 750, 1000 and 1250ms
    tokio::time::sleep(Duration::from_millis(1300)).await;
    cancel.cancel();
    let stats = task.await.unwrap();

    assert_eq!(stats.ticks, 6);
    assert_eq!(
        sink.commands(),
        vec![MovementCommand::STOP, MovementCommand::STOP]
    );
}

#[tokio::test(start_paused = true)]
async fn release_tick_is_followed_by_active_delay() {
    let sink = Arc::new(RecordingSink::default());
    let (control, leash, cancel) = setup(sink.clone());

    grab(&leash, 0.9).await;
    let task = tokio::spawn(control.run());

    // tick at 0ms observes the grab, the release lands before the 100ms tick
    tokio::time::sleep(Duration::from_millis(50)).await;
    leash.apply(LeashUpdate::Grabbed(false)).await.unwrap();

    // release tick spans 100..250ms, then idle ticks start at 350 and 600ms
    tokio::time::sleep(Duration::from_millis(650)).await;
    cancel.cancel();
    let stats = task.await.unwrap();

    assert_eq!(stats.ticks, 4);
    assert_eq!(stats.releases, 1);
}
