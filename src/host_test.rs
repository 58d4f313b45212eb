use super::*;

// =============================================================
// Helpers
// =============================================================

struct Harness {
    host: Host,
    commands: mpsc::Receiver<Command>,
    events: mpsc::Receiver<Event>,
}

fn harness() -> Harness {
    let (cmd_tx, commands) = mpsc::channel(64);
    let (ev_tx, events) = mpsc::channel(64);
    Harness { host: Host::new(cmd_tx, ev_tx), commands, events }
}

impl Harness {
    async fn input(&mut self, input: InputCommand) {
        self.host.dispatch(Inbound::Input(input)).await.unwrap();
    }

    async fn pointer(&mut self, kind: PointerKind, x: f64, y: f64, buttons: u16) {
        self.input(InputCommand::Pointer { kind, x, y, buttons }).await;
    }

    async fn drag(&mut self, from: (f64, f64), to: (f64, f64), buttons: u16) {
        self.pointer(PointerKind::Down, from.0, from.1, buttons).await;
        self.pointer(PointerKind::Move, to.0, to.1, buttons).await;
        self.pointer(PointerKind::Up, to.0, to.1, 0).await;
    }

    fn sent(&mut self) -> Vec<Command> {
        std::iter::from_fn(|| self.commands.try_recv().ok()).collect()
    }

    fn emitted(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.events.try_recv().ok()).collect()
    }
}

fn record(x1: f64, y1: f64, x2: f64, y2: f64, buttons: u16) -> Command {
    Command::Record { x1, y1, x2, y2, buttons }
}

// =============================================================
// Pass-through
// =============================================================

#[tokio::test]
async fn render_commands_pass_straight_through() {
    let mut h = harness();
    h.host.dispatch(Inbound::Render(Command::Rotate { angle: 90.0 })).await.unwrap();
    assert_eq!(h.sent(), vec![Command::Rotate { angle: 90.0 }]);
    assert!(h.emitted().is_empty());
}

#[tokio::test]
async fn closed_worker_is_reported() {
    let mut h = harness();
    drop(h.commands);
    let err = h.host.dispatch(Inbound::Render(Command::Clear)).await.unwrap_err();
    assert!(matches!(err, HostError::WorkerClosed));
}

// =============================================================
// Gestures
// =============================================================

#[tokio::test]
async fn select_drag_records_and_announces_selection() {
    let mut h = harness();
    h.drag((1.0, 2.0), (5.0, 6.0), 1).await;

    assert_eq!(h.sent(), vec![Command::StartRecording, record(1.0, 2.0, 5.0, 6.0, 1), Command::EndRecording]);
    assert_eq!(
        h.emitted(),
        vec![Event::Selection {
            rect: WireRect { x: 1.0, y: 2.0, width: 4.0, height: 4.0 },
            gesture: "select".to_owned(),
        }]
    );
    assert_eq!(h.host.fsm.state(), State::GestureComplete);
}

#[tokio::test]
async fn paint_drag_obscures_on_commit() {
    let mut h = harness();
    h.input(InputCommand::Tool { tool: ToolName::Paint }).await;
    h.drag((0.0, 0.0), (3.0, 3.0), 1).await;

    let sent = h.sent();
    assert_eq!(sent.last(), Some(&Command::Obscure));
    assert!(sent.contains(&Command::EndRecording));
    assert!(matches!(h.emitted().as_slice(), [Event::Selection { gesture, .. }] if gesture == "paint"));
}

#[tokio::test]
async fn secondary_button_pans() {
    let mut h = harness();
    h.drag((4.0, 4.0), (1.0, 2.0), 2).await;
    assert_eq!(h.sent(), vec![Command::StartRecording, record(4.0, 4.0, 1.0, 2.0, 2), Command::EndRecording]);
}

#[tokio::test]
async fn zoom_tool_drag_projects_viewport() {
    let mut h = harness();
    h.input(InputCommand::Tool { tool: ToolName::Zoom }).await;
    h.drag((2.0, 2.0), (10.0, 6.0), 1).await;
    assert_eq!(
        h.sent().last(),
        Some(&Command::Zoom { rect: WireRect { x: 2.0, y: 2.0, width: 8.0, height: 4.0 } })
    );
}

#[tokio::test]
async fn click_without_movement_ends_and_clears() {
    let mut h = harness();
    h.pointer(PointerKind::Down, 3.0, 3.0, 1).await;
    h.pointer(PointerKind::Up, 3.0, 3.0, 0).await;
    assert_eq!(h.sent(), vec![Command::StartRecording, Command::EndRecording, Command::ClearSelection]);
    assert!(h.emitted().is_empty());
    assert_eq!(h.host.fsm.state(), State::Idle);
}

#[tokio::test]
async fn cancel_mid_drag_ends_and_clears() {
    let mut h = harness();
    h.pointer(PointerKind::Down, 0.0, 0.0, 1).await;
    h.pointer(PointerKind::Move, 4.0, 4.0, 1).await;
    h.input(InputCommand::Cancel).await;
    let sent = h.sent();
    assert_eq!(&sent[sent.len() - 2..], &[Command::EndRecording, Command::ClearSelection]);
    assert!(h.emitted().is_empty());
}

#[tokio::test]
async fn cancel_after_commit_clears_preview() {
    let mut h = harness();
    h.drag((0.0, 0.0), (4.0, 4.0), 1).await;
    h.sent();
    h.input(InputCommand::Cancel).await;
    assert_eq!(h.sent(), vec![Command::ClearSelection]);
}

#[tokio::test]
async fn tool_switch_is_tracked() {
    let mut h = harness();
    h.input(InputCommand::Tool { tool: ToolName::Pan }).await;
    assert_eq!(h.host.fsm.tool(), Tool::Pan);
    assert!(h.sent().is_empty());
}
