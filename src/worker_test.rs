use std::time::Duration;

use canvas::geometry::{Chrome, DecodeCorrection};
use tokio::time::timeout;

use super::*;
use crate::testing::{MemorySource, gradient, png};

// =============================================================
// Helpers
// =============================================================

fn config() -> WorkerConfig {
    WorkerConfig { chrome: Chrome { width: 0.0, height: 0.0 }, ..WorkerConfig::default() }
}

fn source() -> MemorySource {
    MemorySource::new().with("bg.png", png(&gradient(40, 20))).with("square.png", png(&gradient(20, 20)))
}

fn start(source: MemorySource) -> (mpsc::Sender<Command>, mpsc::Receiver<Event>, JoinHandle<()>) {
    let (events_tx, events_rx) = mpsc::channel(64);
    let (commands, task) = spawn_worker(config(), Arc::new(source), events_tx);
    (commands, events_rx, task)
}

fn init(background: &str) -> Command {
    Command::Init {
        values: InitValues {
            screen_width: 20.0,
            screen_height: 10.0,
            angle: 0.0,
            background: background.to_owned(),
            overlay: None,
        },
    }
}

async fn next(rx: &mut mpsc::Receiver<Event>) -> Event {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn send_all(tx: &mpsc::Sender<Command>, cmds: Vec<Command>) {
    for cmd in cmds {
        tx.send(cmd).await.unwrap();
    }
}

async fn initialized(tx: &mpsc::Sender<Command>, rx: &mut mpsc::Receiver<Event>) {
    tx.send(init("bg.png")).await.unwrap();
    assert_eq!(next(rx).await, Event::Initialized { width: 20, height: 10, full_width: 40, full_height: 20 });
}

fn record(x1: f64, y1: f64, x2: f64, y2: f64, buttons: u16) -> Command {
    Command::Record { x1, y1, x2, y2, buttons }
}

// =============================================================
// Lifecycle
// =============================================================

#[tokio::test]
async fn init_reports_sizes_after_chrome() {
    let (tx, mut rx, _task) = start(source());
    initialized(&tx, &mut rx).await;
}

#[tokio::test]
async fn chrome_is_subtracted_from_the_screen() {
    let (events_tx, mut rx) = mpsc::channel(8);
    let (tx, _task) = spawn_worker(WorkerConfig::default(), Arc::new(source()), events_tx);
    let mut cmd = init("bg.png");
    if let Command::Init { values } = &mut cmd {
        values.screen_height = 10.0 + 46.0;
    }
    tx.send(cmd).await.unwrap();
    assert_eq!(next(&mut rx).await, Event::Initialized { width: 20, height: 10, full_width: 40, full_height: 20 });
}

#[tokio::test]
async fn commands_before_init_report_not_initialized() {
    let (tx, mut rx, _task) = start(source());
    tx.send(Command::Obscure).await.unwrap();
    let Event::Error { command, code, .. } = next(&mut rx).await else {
        panic!("expected error event");
    };
    assert_eq!(command, "obscure");
    assert_eq!(code, "E_NOT_INITIALIZED");
}

#[tokio::test]
async fn failed_load_is_terminal_and_leaves_no_session() {
    let (tx, mut rx, _task) = start(source());
    send_all(&tx, vec![init("missing.png"), Command::Clear]).await;

    let Event::LoadFailed { code, message } = next(&mut rx).await else {
        panic!("expected load_failed");
    };
    assert_eq!(code, "E_IO");
    assert!(message.contains("missing.png"));
    assert!(matches!(next(&mut rx).await, Event::Error { ref code, .. } if code == "E_NOT_INITIALIZED"));
}

#[tokio::test]
async fn second_init_replaces_the_session() {
    let (tx, mut rx, _task) = start(source());
    initialized(&tx, &mut rx).await;
    tx.send(init("square.png")).await.unwrap();
    assert_eq!(next(&mut rx).await, Event::Initialized { width: 10, height: 10, full_width: 20, full_height: 20 });
}

#[tokio::test]
async fn worker_stops_when_commands_close() {
    let (tx, _rx, task) = start(source());
    drop(tx);
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn worker_stops_when_events_are_dropped() {
    let (tx, rx, task) = start(source());
    drop(rx);
    tx.send(Command::Clear).await.unwrap();
    timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

// =============================================================
// Fog edits
// =============================================================

#[tokio::test]
async fn obscure_emits_full_resolution_png() {
    let (tx, mut rx, _task) = start(source());
    initialized(&tx, &mut rx).await;
    send_all(
        &tx,
        vec![Command::StartRecording, record(2.0, 2.0, 10.0, 6.0, 1), Command::EndRecording, Command::Obscure],
    )
    .await;

    let Event::Overlay { blob } = next(&mut rx).await else {
        panic!("expected overlay");
    };
    let overlay = image::load_from_memory(&blob).unwrap().to_rgba8();
    assert_eq!(overlay.dimensions(), (40, 20));
    assert_eq!(overlay.get_pixel(5, 5).0, [255, 0, 0, 255]);
    assert_eq!(overlay.get_pixel(1, 1).0, [0, 0, 0, 0]);
}

#[tokio::test]
async fn colour_and_opacity_apply_to_next_obscure() {
    let (tx, mut rx, _task) = start(source());
    send_all(
        &tx,
        vec![
            Command::Colour { red: "0".into(), green: "0".into(), blue: "255".into() },
            Command::Opacity { opacity: "1".into() },
        ],
    )
    .await;
    initialized(&tx, &mut rx).await;
    send_all(&tx, vec![Command::StartRecording, record(0.0, 0.0, 4.0, 4.0, 1), Command::EndRecording, Command::Obscure])
        .await;

    let Event::Overlay { blob } = next(&mut rx).await else {
        panic!("expected overlay");
    };
    let overlay = image::load_from_memory(&blob).unwrap().to_rgba8();
    assert_eq!(overlay.get_pixel(1, 1).0, [0, 0, 255, 255]);
}

#[tokio::test]
async fn invalid_opacity_reports_error() {
    let (tx, mut rx, _task) = start(source());
    tx.send(Command::Opacity { opacity: "1.5".into() }).await.unwrap();
    let Event::Error { command, code, .. } = next(&mut rx).await else {
        panic!("expected error");
    };
    assert_eq!(command, "opacity");
    assert_eq!(code, "E_INVALID_STYLE");
}

#[tokio::test]
async fn clear_emits_blank_overlay() {
    let (tx, mut rx, _task) = start(source());
    initialized(&tx, &mut rx).await;
    tx.send(Command::Clear).await.unwrap();
    let Event::Overlay { blob } = next(&mut rx).await else {
        panic!("expected overlay");
    };
    let overlay = image::load_from_memory(&blob).unwrap().to_rgba8();
    assert!(overlay.pixels().all(|p| p.0[3] == 0));
}

#[tokio::test]
async fn degenerate_selection_is_silent() {
    let (tx, mut rx, _task) = start(source());
    initialized(&tx, &mut rx).await;
    send_all(
        &tx,
        vec![
            Command::StartRecording,
            record(3.0, 3.0, 3.0, 3.0, 1),
            Command::EndRecording,
            Command::Obscure,
            Command::Zoom { rect: WireRect { x: 0.0, y: 0.0, width: 1.0, height: 1.0 } },
        ],
    )
    .await;
    assert!(matches!(next(&mut rx).await, Event::Viewport { .. }));
}

// =============================================================
// Pan / zoom / player
// =============================================================

#[tokio::test]
async fn zoom_projects_editor_rect_to_full_image() {
    let (tx, mut rx, _task) = start(source());
    initialized(&tx, &mut rx).await;
    send_all(
        &tx,
        vec![
            Command::Rotate { angle: 0.0 },
            Command::Zoom { rect: WireRect { x: 2.0, y: 2.0, width: 8.0, height: 4.0 } },
        ],
    )
    .await;
    assert_eq!(next(&mut rx).await, Event::Viewport { viewport: WireRect { x: 4.0, y: 4.0, width: 16.0, height: 8.0 } });
}

#[tokio::test]
async fn pan_gesture_reports_completion() {
    let (tx, mut rx, _task) = start(source());
    initialized(&tx, &mut rx).await;
    send_all(
        &tx,
        vec![Command::ZoomIn, Command::StartRecording, record(5.0, 5.0, 2.0, 3.0, 2), Command::EndRecording],
    )
    .await;
    assert_eq!(next(&mut rx).await, Event::PanComplete);
}

#[tokio::test]
async fn player_without_viewport_shows_whole_table() {
    let (tx, mut rx, _task) = start(source());
    initialized(&tx, &mut rx).await;
    tx.send(Command::Player { screen_width: 20.0, screen_height: 10.0, viewport: None, table_width: None, table_height: None })
        .await
        .unwrap();
    let Event::PlayerFrame { crop, rotate, focus } = next(&mut rx).await else {
        panic!("expected player frame");
    };
    assert_eq!(crop, WireRect { x: 0.0, y: 0.0, width: 40.0, height: 20.0 });
    assert!(!rotate);
    assert_eq!(focus, WireRect { x: 0.0, y: 0.0, width: 20.0, height: 10.0 });
}

async fn player_crop(correction: DecodeCorrection) -> WireRect {
    let (events_tx, mut rx) = mpsc::channel(64);
    let (tx, _task) = spawn_worker(WorkerConfig { correction, ..config() }, Arc::new(source()), events_tx);
    initialized(&tx, &mut rx).await;
    tx.send(Command::Player {
        screen_width: 20.0,
        screen_height: 10.0,
        viewport: Some(WireRect { x: 40.0, y: 20.0, width: 40.0, height: 20.0 }),
        table_width: Some(80.0),
        table_height: Some(40.0),
    })
    .await
    .unwrap();
    let Event::PlayerFrame { crop, .. } = next(&mut rx).await else {
        panic!("expected player frame");
    };
    crop
}

#[tokio::test]
async fn player_crop_follows_decode_correction() {
    let squared = player_crop(DecodeCorrection::Squared).await;
    let linear = player_crop(DecodeCorrection::Linear).await;
    assert_eq!(squared, WireRect { x: 10.0, y: 5.0, width: 10.0, height: 5.0 });
    assert_eq!(linear, WireRect { x: 20.0, y: 10.0, width: 20.0, height: 10.0 });
}

// =============================================================
// Errors
// =============================================================

#[test]
fn worker_error_codes_follow_their_source() {
    assert_eq!(WorkerError::from(EngineError::EmptyImage).error_code(), "E_EMPTY_IMAGE");
    let load = WorkerError::from(LoadError::Timeout { millis: 5 });
    assert_eq!(load.error_code(), "E_TIMEOUT");
    assert!(load.retryable());
    assert!(!WorkerError::from(EngineError::NotInitialized).retryable());
}
