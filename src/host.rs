//! Host side of the worker boundary.
//!
//! Renderer commands pass straight through to the worker. Interactive-surface
//! inputs go through the [`Interaction`] machine first; its callbacks turn
//! gestures into the recording commands the worker understands, and committed
//! gestures are announced with a `selection` event.
//!
//! The callbacks only queue; [`Host::dispatch`] drains the queue and awaits
//! each send, so nothing is dropped when the worker's queue is full.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use canvas::geometry::{EditorRect, Point};
use canvas::input::{GestureKind, Input, Interaction, State, Tool};
use frames::{Command, Event, Inbound, InputCommand, PointerKind, ToolName, WireRect};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("render worker is gone")]
    WorkerClosed,
    #[error("event stream is closed")]
    EventsClosed,
}

#[derive(Debug)]
enum Outgoing {
    Command(Command),
    Event(Event),
}

type Pending = Arc<Mutex<VecDeque<Outgoing>>>;

fn push(pending: &Pending, out: Outgoing) {
    pending.lock().unwrap_or_else(PoisonError::into_inner).push_back(out);
}

pub struct Host {
    fsm: Interaction,
    pending: Pending,
    commands: mpsc::Sender<Command>,
    events: mpsc::Sender<Event>,
}

impl Host {
    pub fn new(commands: mpsc::Sender<Command>, events: mpsc::Sender<Event>) -> Self {
        let pending = Pending::default();
        let (on_start, on_progress, on_commit) = (pending.clone(), pending.clone(), pending.clone());

        let fsm = Interaction::new()
            .on_start(move |_| push(&on_start, Outgoing::Command(Command::StartRecording)))
            .on_progress(move |kind: GestureKind, start: Point, end: Point| {
                let record = Command::Record { x1: start.x, y1: start.y, x2: end.x, y2: end.y, buttons: kind.buttons() };
                push(&on_progress, Outgoing::Command(record));
            })
            .on_commit(move |kind: GestureKind, rect: EditorRect| {
                push(&on_commit, Outgoing::Command(Command::EndRecording));
                push(&on_commit, Outgoing::Event(Event::Selection { rect: wire(rect), gesture: kind.as_str().to_owned() }));
            });

        Self { fsm, pending, commands, events }
    }

    /// Route one inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] once the worker or the event stream has gone away.
    pub async fn dispatch(&mut self, inbound: Inbound) -> Result<(), HostError> {
        match inbound {
            Inbound::Render(cmd) => self.commands.send(cmd).await.map_err(|_| HostError::WorkerClosed),
            Inbound::Input(raw) => {
                self.input(raw);
                self.flush().await
            }
        }
    }

    fn input(&mut self, raw: InputCommand) {
        let input = to_input(raw);
        let before = self.fsm.state();
        let after = self.fsm.handle(input);
        debug!(?input, ?before, ?after, "interaction input");

        match (before, after) {
            (State::Dragging, State::Idle) => {
                push(&self.pending, Outgoing::Command(Command::EndRecording));
                push(&self.pending, Outgoing::Command(Command::ClearSelection));
            }
            (State::GestureComplete, State::Idle) => {
                push(&self.pending, Outgoing::Command(Command::ClearSelection));
            }
            (State::Dragging, State::GestureComplete) => self.follow_up(),
            _ => {}
        }
    }

    /// Extra work for a committed gesture, decided by its kind and the tool.
    fn follow_up(&mut self) {
        let Some(rect) = self.fsm.selection() else {
            return;
        };
        match (self.fsm.kind(), self.fsm.tool()) {
            (GestureKind::Paint, _) => push(&self.pending, Outgoing::Command(Command::Obscure)),
            (GestureKind::Select, Tool::Zoom) => push(&self.pending, Outgoing::Command(Command::Zoom { rect: wire(rect) })),
            _ => {}
        }
    }

    async fn flush(&mut self) -> Result<(), HostError> {
        let drained: Vec<Outgoing> = self.pending.lock().unwrap_or_else(PoisonError::into_inner).drain(..).collect();
        for out in drained {
            match out {
                Outgoing::Command(cmd) => self.commands.send(cmd).await.map_err(|_| HostError::WorkerClosed)?,
                Outgoing::Event(event) => self.events.send(event).await.map_err(|_| HostError::EventsClosed)?,
            }
        }
        Ok(())
    }
}

fn wire(rect: EditorRect) -> WireRect {
    let r = rect.rect();
    WireRect { x: r.x, y: r.y, width: r.width, height: r.height }
}

fn to_input(raw: InputCommand) -> Input {
    match raw {
        InputCommand::Pointer { kind, x, y, buttons } => match kind {
            PointerKind::Down => Input::Down { at: Point::new(x, y), buttons },
            PointerKind::Move => Input::Move { at: Point::new(x, y) },
            PointerKind::Up => Input::Up,
            PointerKind::Leave => Input::Leave,
        },
        InputCommand::Tool { tool } => Input::Tool(match tool {
            ToolName::Select => Tool::Select,
            ToolName::Paint => Tool::Paint,
            ToolName::Pan => Tool::Pan,
            ToolName::Rotate => Tool::Rotate,
            ToolName::Zoom => Tool::Zoom,
        }),
        InputCommand::Cancel => Input::Cancel,
    }
}

#[cfg(test)]
#[path = "host_test.rs"]
mod tests;
