// src/navigator.rs - Two-page spread navigation
use tracing::debug;

use crate::gate::PageTurnCommand;

/// Pages shown side by side, as 0-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Spread {
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl Spread {
    /// 1-based numbers for display.
    pub fn page_numbers(&self) -> (Option<usize>, Option<usize>) {
        (self.left.map(|p| p + 1), self.right.map(|p| p + 1))
    }
}

#[derive(Debug, Clone)]
pub struct PageNavigator {
    current: usize,
    page_count: usize,
}

impl PageNavigator {
    pub fn new(page_count: usize) -> Self {
        Self { current: 0, page_count }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Returns whether the visible pages changed.
    pub fn apply(&mut self, command: PageTurnCommand) -> bool {
        let moved = match command {
            PageTurnCommand::Next => self.next(),
            PageTurnCommand::Previous => self.previous(),
        };
        debug!(
            "{} -> page {} of {} (moved: {})",
            command.as_str(),
            self.current + 1,
            self.page_count,
            moved
        );
        moved
    }

    pub fn next(&mut self) -> bool {
        if self.page_count == 0 || self.current + 1 >= self.page_count {
            return false;
        }
        self.current = (self.current + 2).min(self.page_count - 1);
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current = self.current.saturating_sub(2);
        true
    }

    pub fn spread(&self) -> Spread {
        if self.page_count == 0 {
            return Spread::default();
        }
        let exists = |page: usize| (page < self.page_count).then_some(page);
        if self.current % 2 == 0 {
            Spread {
                left: self.current.checked_sub(1).and_then(exists),
                right: exists(self.current),
            }
        } else {
            Spread {
                left: exists(self.current),
                right: exists(self.current + 1),
            }
        }
    }
}
