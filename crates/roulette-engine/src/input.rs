// crates/roulette-engine/src/input.rs
// Click, keyboard and touch input funneled into engine commands
//
// Debouncing is not done here: the engine ignores navigation while a
// transition is active, whichever input source it came from.

use tracing::debug;

/// Minimum horizontal travel, in pixels, for a touch to count as a swipe
pub const SWIPE_THRESHOLD_PX: f32 = 50.0;

/// On-screen buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Spin,
    Next,
    Previous,
    Back,
    Keep,
    ClearHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Space,
    Enter,
    Backspace,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Click(Button),
    Key(Key),
    TouchStart { x: f32, y: f32 },
    TouchEnd { x: f32, y: f32 },
    TouchCancel,
}

/// What the engine should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Spin,
    Next,
    Previous,
    GoBack,
    KeepCurrent,
    ClearHistory,
}

/// Translates raw input events into commands, tracking touch state
#[derive(Debug, Clone)]
pub struct InputDispatcher {
    touch_start: Option<(f32, f32)>,
    swipe_threshold: f32,
}

impl Default for InputDispatcher {
    fn default() -> Self {
        Self::new(SWIPE_THRESHOLD_PX)
    }
}

impl InputDispatcher {
    pub fn new(swipe_threshold: f32) -> Self {
        Self {
            touch_start: None,
            swipe_threshold,
        }
    }

    pub fn translate(&mut self, event: InputEvent) -> Option<Command> {
        let command = match event {
            InputEvent::Click(button) => Some(match button {
                Button::Spin => Command::Spin,
                Button::Next => Command::Next,
                Button::Previous => Command::Previous,
                Button::Back => Command::GoBack,
                Button::Keep => Command::KeepCurrent,
                Button::ClearHistory => Command::ClearHistory,
            }),
            InputEvent::Key(key) => match key {
                Key::ArrowRight => Some(Command::Next),
                Key::ArrowLeft => Some(Command::Previous),
                Key::Space | Key::Enter => Some(Command::Spin),
                Key::Backspace => Some(Command::GoBack),
                Key::Char('k') | Key::Char('K') => Some(Command::KeepCurrent),
                Key::Char(_) => None,
            },
            InputEvent::TouchStart { x, y } => {
                self.touch_start = Some((x, y));
                None
            }
            InputEvent::TouchEnd { x, y } => {
                let (x0, y0) = self.touch_start.take()?;
                self.swipe(x - x0, y - y0)
            }
            InputEvent::TouchCancel => {
                self.touch_start = None;
                None
            }
        };
        if let Some(command) = command {
            debug!(event = ?event, command = ?command, "Input translated");
        }
        command
    }

    /// Left swipe moves forward, right swipe moves back
    fn swipe(&self, dx: f32, dy: f32) -> Option<Command> {
        if dx.abs() < self.swipe_threshold || dx.abs() <= dy.abs() {
            return None;
        }
        Some(if dx < 0.0 {
            Command::Next
        } else {
            Command::Previous
        })
    }
}
