#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Pause,
    Quit,
}

const ACTION_COUNT: usize = 5;

/// Held-state per action plus press edges that survive until consumed once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed_edge: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed_edge[index] = true;
        }
        self.down[index] = is_down;
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub fn take_pressed(&mut self, action: InputAction) -> bool {
        let index = action.index();
        let was_pressed = self.pressed_edge[index];
        self.pressed_edge[index] = false;
        was_pressed
    }

    pub fn release_all(&mut self) {
        self.down = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Pause => 3,
            InputAction::Quit => 4,
        }
    }
}
