/// Identifies one run. Every event produced on behalf of a run carries its
/// generation, so events from a superseded run can be recognised and
/// discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out strictly increasing generations. `Generation::default()` (0)
/// is never handed out and means "no run yet".
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: Generation,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.current
    }

    pub fn current(&self) -> Generation {
        self.current
    }
}

/// An event stamped with the run it belongs to.
#[derive(Debug)]
pub struct Tagged<T> {
    pub generation: Generation,
    pub event: T,
}

impl<T> Tagged<T> {
    pub fn new(generation: Generation, event: T) -> Self {
        Self { generation, event }
    }
}
