// crates/roulette-engine/src/cursor.rs
// Circular index over an ordered item list (history browsing, carousels)

/// Step direction for a cursor move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

/// Index into `len` items; `index < len` whenever `len > 0`.
///
/// With looping disabled, stepping off either end is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationCursor {
    index: usize,
    len: usize,
    looping: bool,
}

impl NavigationCursor {
    pub fn new(len: usize, looping: bool) -> Self {
        Self {
            index: 0,
            len,
            looping,
        }
    }

    /// Current index, `None` when there are no items
    pub fn index(&self) -> Option<usize> {
        (self.len > 0).then_some(self.index)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn at_end(&self) -> bool {
        self.len == 0 || self.index + 1 >= self.len
    }

    pub fn at_start(&self) -> bool {
        self.index == 0
    }

    /// Move forward; returns whether the index changed
    pub fn next(&mut self) -> bool {
        self.step(Direction::Forward)
    }

    /// Move back; returns whether the index changed
    pub fn previous(&mut self) -> bool {
        self.step(Direction::Back)
    }

    pub fn step(&mut self, direction: Direction) -> bool {
        if self.len == 0 {
            return false;
        }
        let target = match (direction, self.looping) {
            (Direction::Forward, true) => (self.index + 1) % self.len,
            (Direction::Back, true) => (self.index + self.len - 1) % self.len,
            (Direction::Forward, false) if self.index + 1 < self.len => self.index + 1,
            (Direction::Back, false) if self.index > 0 => self.index - 1,
            _ => self.index,
        };
        let moved = target != self.index;
        self.index = target;
        moved
    }

    /// Jump to `index`; out-of-range jumps are ignored
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.index = index;
        true
    }

    pub fn jump_to_last(&mut self) {
        self.index = self.len.saturating_sub(1);
    }

    /// Resize to `len` items, clamping the index
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if self.index >= len {
            self.index = len.saturating_sub(1);
        }
    }
}
