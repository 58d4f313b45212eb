//! Input model: tools, pointer buttons, and the interaction state machine that
//! turns raw pointer input into gestures.
//!
//! DESIGN
//! ======
//! The machine is a static table of [`Row`]s. Each row names the current
//! state, the kind of input, a guard over the recorded points, the next state
//! and an effect. [`Interaction::handle`] takes the first row that matches;
//! an input with no matching row changes nothing. Supporting a new tool means
//! adding rows, not branches.
//!
//! Coordinates are editor-space. Unset points hold the
//! [`UNSET`](crate::consts::UNSET) sentinel.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::geometry::{EditorRect, Point};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Drag out a selection rectangle (default).
    #[default]
    Select,
    /// Drag out a rectangle that is obscured as soon as it is committed.
    Paint,
    /// Drag to move the view.
    Pan,
    /// Rotation controls are active; drags still select.
    Rotate,
    /// Zoom controls are active; drags select the zoom target.
    Zoom,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger touch).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button.
    Secondary,
}

impl Button {
    /// Decode a DOM `buttons` bitmask. Primary wins when several are held; an
    /// empty mask (touch, pen) counts as primary.
    #[must_use]
    pub fn from_mask(mask: u16) -> Self {
        if mask & 1 != 0 || mask == 0 {
            Self::Primary
        } else if mask & 2 != 0 {
            Self::Secondary
        } else if mask & 4 != 0 {
            Self::Middle
        } else {
            Self::Primary
        }
    }
}

/// What a gesture does, fixed when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureKind {
    #[default]
    Select,
    Paint,
    Pan,
}

impl GestureKind {
    /// Decide the gesture from the held button and the active tool.
    #[must_use]
    pub fn decide(button: Button, tool: Tool) -> Self {
        match (button, tool) {
            (Button::Secondary | Button::Middle, _) | (_, Tool::Pan) => Self::Pan,
            (_, Tool::Paint) => Self::Paint,
            _ => Self::Select,
        }
    }

    /// The `buttons` value the renderer expects for this gesture.
    #[must_use]
    pub fn buttons(self) -> u16 {
        match self {
            Self::Select | Self::Paint => 1,
            Self::Pan => 2,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Paint => "paint",
            Self::Pan => "pan",
        }
    }
}

/// Interaction states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    Dragging,
    GestureComplete,
}

/// A single input delivered to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    Down { at: Point, buttons: u16 },
    Move { at: Point },
    Up,
    Leave,
    Cancel,
    Tool(Tool),
}

impl Input {
    fn kind(&self) -> InputKind {
        match self {
            Self::Down { .. } => InputKind::Down,
            Self::Move { .. } => InputKind::Move,
            Self::Up => InputKind::Up,
            Self::Leave => InputKind::Leave,
            Self::Cancel => InputKind::Cancel,
            Self::Tool(_) => InputKind::Tool,
        }
    }
}

// =============================================================
// Transition table
// =============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Down,
    Move,
    Up,
    Leave,
    Cancel,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    Any,
    /// The recorded rectangle has no area.
    Degenerate,
    /// The recorded rectangle has area.
    Spanning,
    /// A move to a new point.
    Moved,
    /// A move to the last recorded point.
    Unmoved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Nothing,
    /// Reset, record the start point, decide the gesture kind.
    Begin,
    /// Record the end point and report progress.
    Progress,
    /// Report the finished rectangle.
    Commit,
    /// Forget both points.
    Reset,
    /// Change tool.
    SelectTool,
    /// Abandon the gesture, then change tool.
    SwitchTool,
}

#[derive(Debug, Clone, Copy)]
struct Row {
    from: State,
    input: InputKind,
    guard: Guard,
    to: State,
    effect: Effect,
}

const fn row(from: State, input: InputKind, guard: Guard, to: State, effect: Effect) -> Row {
    Row { from, input, guard, to, effect }
}

use Effect as E;
use Guard as G;
use InputKind as I;
use State as S;

static TRANSITIONS: &[Row] = &[
    // Idle
    row(S::Idle, I::Down, G::Any, S::Dragging, E::Begin),
    row(S::Idle, I::Tool, G::Any, S::Idle, E::SelectTool),
    // Dragging
    row(S::Dragging, I::Move, G::Unmoved, S::Dragging, E::Nothing),
    row(S::Dragging, I::Move, G::Moved, S::Dragging, E::Progress),
    row(S::Dragging, I::Up, G::Degenerate, S::Idle, E::Reset),
    row(S::Dragging, I::Up, G::Spanning, S::GestureComplete, E::Commit),
    row(S::Dragging, I::Leave, G::Degenerate, S::Idle, E::Reset),
    row(S::Dragging, I::Leave, G::Spanning, S::GestureComplete, E::Commit),
    row(S::Dragging, I::Cancel, G::Any, S::Idle, E::Reset),
    row(S::Dragging, I::Tool, G::Any, S::Idle, E::SwitchTool),
    // GestureComplete
    row(S::GestureComplete, I::Down, G::Any, S::Dragging, E::Begin),
    row(S::GestureComplete, I::Cancel, G::Any, S::Idle, E::Reset),
    row(S::GestureComplete, I::Tool, G::Any, S::Idle, E::SwitchTool),
];

// =============================================================
// Interaction
// =============================================================

type StartFn = Box<dyn FnMut(GestureKind) + Send>;
type ProgressFn = Box<dyn FnMut(GestureKind, Point, Point) + Send>;
type CommitFn = Box<dyn FnMut(GestureKind, EditorRect) + Send>;

/// The interaction state machine for one editor surface.
pub struct Interaction {
    state: State,
    tool: Tool,
    kind: GestureKind,
    start: Point,
    end: Point,
    on_start: Option<StartFn>,
    on_progress: Option<ProgressFn>,
    on_commit: Option<CommitFn>,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            state: State::Idle,
            tool: Tool::default(),
            kind: GestureKind::default(),
            start: Point::unset(),
            end: Point::unset(),
            on_start: None,
            on_progress: None,
            on_commit: None,
        }
    }
}

impl std::fmt::Debug for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interaction")
            .field("state", &self.state)
            .field("tool", &self.tool)
            .field("kind", &self.kind)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

impl Interaction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when a gesture begins.
    #[must_use]
    pub fn on_start(mut self, f: impl FnMut(GestureKind) + Send + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Called for every move that changes the end point.
    #[must_use]
    pub fn on_progress(mut self, f: impl FnMut(GestureKind, Point, Point) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Called exactly once per gesture that ends with a non-degenerate rectangle.
    #[must_use]
    pub fn on_commit(mut self, f: impl FnMut(GestureKind, EditorRect) + Send + 'static) -> Self {
        self.on_commit = Some(Box::new(f));
        self
    }

    // --- Queries ---

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Kind of the current or most recent gesture.
    #[must_use]
    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    #[must_use]
    pub fn start(&self) -> Point {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> Point {
        self.end
    }

    /// The committed rectangle while in [`State::GestureComplete`].
    #[must_use]
    pub fn selection(&self) -> Option<EditorRect> {
        (self.state == State::GestureComplete).then(|| EditorRect::from_corners(self.start, self.end))
    }

    // --- Driving ---

    /// Feed one input through the table. Returns the new state.
    pub fn handle(&mut self, input: Input) -> State {
        let kind = input.kind();
        let Some(row) = TRANSITIONS
            .iter()
            .find(|r| r.from == self.state && r.input == kind && self.guard_holds(r.guard, &input))
        else {
            return self.state;
        };
        self.state = row.to;
        self.apply(row.effect, input);
        self.state
    }

    fn guard_holds(&self, guard: Guard, input: &Input) -> bool {
        match guard {
            Guard::Any => true,
            Guard::Degenerate => self.recorded_rect().rect().is_empty(),
            Guard::Spanning => !self.recorded_rect().rect().is_empty(),
            Guard::Moved => matches!(input, Input::Move { at } if *at != self.end),
            Guard::Unmoved => matches!(input, Input::Move { at } if *at == self.end),
        }
    }

    fn recorded_rect(&self) -> EditorRect {
        if self.start.is_unset() || self.end.is_unset() {
            return EditorRect::default();
        }
        EditorRect::from_corners(self.start, self.end)
    }

    fn apply(&mut self, effect: Effect, input: Input) {
        match (effect, input) {
            (Effect::Begin, Input::Down { at, buttons }) => {
                self.reset();
                self.start = at;
                self.end = at;
                self.kind = GestureKind::decide(Button::from_mask(buttons), self.tool);
                if let Some(f) = self.on_start.as_mut() {
                    f(self.kind);
                }
            }
            (Effect::Progress, Input::Move { at }) => {
                self.end = at;
                if let Some(f) = self.on_progress.as_mut() {
                    f(self.kind, self.start, self.end);
                }
            }
            (Effect::Commit, _) => {
                let rect = self.recorded_rect();
                if let Some(f) = self.on_commit.as_mut() {
                    f(self.kind, rect);
                }
            }
            (Effect::Reset, _) => self.reset(),
            (Effect::SelectTool, Input::Tool(tool)) => self.tool = tool,
            (Effect::SwitchTool, Input::Tool(tool)) => {
                self.reset();
                self.tool = tool;
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.start = Point::unset();
        self.end = Point::unset();
    }
}
