use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use engine::{InputAction, LoopHandle};
use tracing::{debug, info, warn};

const CONTROL_THREAD_NAME: &str = "stdin-control";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InputUpdate {
    pub(crate) action: InputAction,
    pub(crate) is_down: bool,
}

impl InputUpdate {
    const fn down(action: InputAction) -> Self {
        Self {
            action,
            is_down: true,
        }
    }

    const fn up(action: InputAction) -> Self {
        Self {
            action,
            is_down: false,
        }
    }
}

/// One line typed on stdin. Terminals deliver no key-up events, so held movement lasts
/// until another movement line replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlLine {
    Left,
    Right,
    Halt,
    Jump,
    Pause,
    /// Resumes a paused loop, or plays a stopped one again.
    Resume,
    Quit,
}

impl ControlLine {
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return line.contains(' ').then_some(ControlLine::Jump);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "a" => Some(ControlLine::Left),
            "d" => Some(ControlLine::Right),
            "s" => Some(ControlLine::Halt),
            "w" | "space" => Some(ControlLine::Jump),
            "p" => Some(ControlLine::Pause),
            "r" => Some(ControlLine::Resume),
            "q" => Some(ControlLine::Quit),
            _ => None,
        }
    }

    /// Action transitions to queue for the session. Presses are followed by a release so the
    /// press edge fires once.
    pub(crate) fn updates(self) -> &'static [InputUpdate] {
        const LEFT: [InputUpdate; 2] = [
            InputUpdate::up(InputAction::MoveRight),
            InputUpdate::down(InputAction::MoveLeft),
        ];
        const RIGHT: [InputUpdate; 2] = [
            InputUpdate::up(InputAction::MoveLeft),
            InputUpdate::down(InputAction::MoveRight),
        ];
        const HALT: [InputUpdate; 2] = [
            InputUpdate::up(InputAction::MoveLeft),
            InputUpdate::up(InputAction::MoveRight),
        ];
        const JUMP: [InputUpdate; 2] = [
            InputUpdate::down(InputAction::Jump),
            InputUpdate::up(InputAction::Jump),
        ];
        const PAUSE: [InputUpdate; 2] = [
            InputUpdate::down(InputAction::Pause),
            InputUpdate::up(InputAction::Pause),
        ];
        const QUIT: [InputUpdate; 2] = [
            InputUpdate::down(InputAction::Quit),
            InputUpdate::up(InputAction::Quit),
        ];

        match self {
            ControlLine::Left => &LEFT,
            ControlLine::Right => &RIGHT,
            ControlLine::Halt => &HALT,
            ControlLine::Jump => &JUMP,
            ControlLine::Pause => &PAUSE,
            ControlLine::Quit => &QUIT,
            ControlLine::Resume => &[],
        }
    }
}

pub(crate) fn spawn_stdin_reader(
    input: Sender<InputUpdate>,
    loop_handle: LoopHandle,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(CONTROL_THREAD_NAME.to_string())
        .spawn(move || {
            let stdin = io::stdin();
            read_commands(stdin.lock(), &input, &loop_handle);
        })
}

/// Forwards commands until input ends or the loop side has gone away.
pub(crate) fn read_commands(
    reader: impl BufRead,
    input: &Sender<InputUpdate>,
    loop_handle: &LoopHandle,
) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "control_input_failed");
                return;
            }
        };
        let Some(command) = ControlLine::parse(&line) else {
            debug!(line = line.as_str(), "control_line_ignored");
            continue;
        };

        let delivered = match command {
            ControlLine::Resume => loop_handle.resume_or_start(),
            _ => command
                .updates()
                .iter()
                .all(|update| input.send(*update).is_ok()),
        };
        if !delivered {
            return;
        }
    }
    info!("control_input_closed");
}
