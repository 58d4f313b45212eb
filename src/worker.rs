//! The rendering worker: an isolated task that owns the [`Engine`] and its
//! surfaces.
//!
//! DESIGN
//! ======
//! The host talks to the worker only through a bounded command queue and
//! receives [`Event`]s on a separate channel. Surfaces never leave the task;
//! only PNG artifacts and rectangles cross the boundary.
//!
//! Commands are handled strictly in send order. `init` is awaited inline, so
//! everything queued behind it waits for the load to resolve. While the engine
//! is recording, a ticker drives one animation frame per interval. Commands
//! take priority over ticks, so `endrecording` always stops the next frame.
//!
//! ERROR HANDLING
//! ==============
//! Load failures become a terminal `load_failed` event and leave the previous
//! session untouched. Every other failure becomes an `error` event naming the
//! command. The worker stops when the command queue closes or nobody is
//! listening for events anymore.

use std::sync::Arc;
use std::time::Duration;

use canvas::engine::{Action, Engine, EngineError};
use canvas::geometry::{EditorRect, FullImageRect, Point, Rect, Size, get_max_container_size};
use frames::{Command, ErrorCode, Event, InitValues, WireRect};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::loader::{ImageSource, LoadError, load_images};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl ErrorCode for WorkerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Engine(EngineError::NotInitialized) => "E_NOT_INITIALIZED",
            Self::Engine(EngineError::EmptyImage) => "E_EMPTY_IMAGE",
            Self::Engine(EngineError::InvalidStyle(_)) => "E_INVALID_STYLE",
            Self::Engine(EngineError::Encode(_)) => "E_ENCODE",
            Self::Load(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Load(e) => e.retryable(),
            Self::Engine(_) => false,
        }
    }
}

// =============================================================================
// SPAWN
// =============================================================================

/// Spawn the worker. Returns the command sender and the task handle; the
/// task ends once every sender is dropped.
pub fn spawn_worker(
    config: WorkerConfig,
    source: Arc<dyn ImageSource>,
    events: mpsc::Sender<Event>,
) -> (mpsc::Sender<Command>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(config.command_queue_capacity);
    let worker = Worker { engine: Engine::new(), config, source, events, session: None };
    (tx, tokio::spawn(worker.run(rx)))
}

struct Worker {
    engine: Engine,
    config: WorkerConfig,
    source: Arc<dyn ImageSource>,
    events: mpsc::Sender<Event>,
    session: Option<Uuid>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.frame_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(frame_interval_ms = self.config.frame_interval_ms, "render worker started");

        loop {
            let open = tokio::select! {
                biased;
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => false,
                },
                _ = ticker.tick(), if self.engine.is_recording() => {
                    self.tick();
                    true
                }
            };
            if !open {
                break;
            }
        }
        info!(session = ?self.session, "render worker stopped");
    }

    /// Handle one command and publish its events. Returns `false` once the
    /// event receiver is gone.
    async fn handle(&mut self, cmd: Command) -> bool {
        let name = cmd.name();
        let events = match self.dispatch(cmd).await {
            Ok(actions) => actions.into_iter().map(action_event).collect(),
            Err(WorkerError::Load(e)) => {
                warn!(session = ?self.session, error = %e, code = e.error_code(), "image load failed");
                vec![Event::load_failed(&e)]
            }
            Err(e) => {
                warn!(session = ?self.session, command = name, error = %e, "command failed");
                vec![Event::error(name, &e)]
            }
        };
        for event in events {
            if self.events.send(event).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn dispatch(&mut self, cmd: Command) -> Result<Vec<Action>, WorkerError> {
        let actions = match cmd {
            Command::Init { values } => return self.init(values).await,
            Command::Resize { width, height } => self.engine.resize(self.container(width, height))?,
            Command::Rotate { angle } => self.engine.rotate(angle)?,
            Command::StartRecording => self.engine.start_recording()?,
            Command::Record { x1, y1, x2, y2, buttons } => {
                self.engine.record(Point::new(x1, y1), Point::new(x2, y2), buttons)?
            }
            Command::EndRecording => self.engine.end_recording()?,
            Command::Obscure => self.engine.obscure()?,
            Command::Reveal => self.engine.reveal()?,
            Command::Clear => self.engine.clear()?,
            Command::ClearSelection => self.engine.clear_selection()?,
            Command::Opacity { opacity } => self.engine.set_opacity(&opacity)?,
            Command::Colour { red, green, blue } => self.engine.set_colour(&red, &green, &blue)?,
            Command::Zoom { rect } => self.engine.project_viewport(EditorRect(rect_from_wire(rect)))?,
            Command::ZoomIn => self.engine.zoom_in()?,
            Command::ZoomOut => self.engine.zoom_out()?,
            Command::Player { screen_width, screen_height, viewport, table_width, table_height } => {
                self.engine.player_frame(
                    viewport.map(|v| FullImageRect(rect_from_wire(v))),
                    table_width.zip(table_height).map(|(w, h)| Size::new(w, h)),
                    Size::new(screen_width, screen_height),
                    self.config.correction,
                )?
            }
        };
        Ok(actions)
    }

    async fn init(&mut self, values: InitValues) -> Result<Vec<Action>, WorkerError> {
        let session = Uuid::new_v4();
        info!(%session, background = %values.background, overlay = ?values.overlay, "loading session");

        let limit = Duration::from_secs(self.config.timeouts.load_secs);
        let loaded = load_images(self.source.as_ref(), &values.background, values.overlay.as_deref(), limit).await?;
        let container = self.container(values.screen_width, values.screen_height);
        let actions = self.engine.initialize(loaded.background, loaded.overlay, container, values.angle)?;

        self.session = Some(session);
        info!(%session, angle = values.angle, "session ready");
        Ok(actions)
    }

    fn tick(&mut self) {
        if let Err(e) = self.engine.animate() {
            debug!(error = %e, "animation frame skipped");
        }
    }

    fn container(&self, screen_w: f64, screen_h: f64) -> Size {
        let (w, h) = get_max_container_size(screen_w, screen_h, self.config.chrome);
        Size::new(w, h)
    }
}

fn rect_from_wire(r: WireRect) -> Rect {
    Rect::new(r.x, r.y, r.width, r.height)
}

fn rect_to_wire(r: Rect) -> WireRect {
    WireRect { x: r.x, y: r.y, width: r.width, height: r.height }
}

fn action_event(action: Action) -> Event {
    match action {
        Action::Initialized { width, height, full_width, full_height } => {
            Event::Initialized { width, height, full_width, full_height }
        }
        Action::Overlay(blob) => Event::Overlay { blob },
        Action::Viewport(viewport) => Event::Viewport { viewport: rect_to_wire(viewport.rect()) },
        Action::PanComplete => Event::PanComplete,
        Action::PlayerFrame(frame) => Event::PlayerFrame {
            crop: rect_to_wire(frame.crop.rect()),
            rotate: frame.rotate,
            focus: rect_to_wire(frame.focus.rect()),
        },
    }
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;
