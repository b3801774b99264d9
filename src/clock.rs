/// Frame counter that drives all per-frame bookkeeping. Never consults the
/// wall clock.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    next: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the frame being started, beginning at 0
    pub fn tick(&mut self) -> u64 {
        let index = self.next;
        self.next += 1;
        index
    }

    /// Frames started so far
    pub fn frames(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_sequential() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.frames(), 3);
    }
}
