//! Display names for frames created without one.

/// Hands out `"Frame 1"`, `"Frame 2"`, ... in creation order.
///
/// Each [`World`](crate::World) owns its own namer, so two worlds never share
/// a counter.
#[derive(Debug, Default, Clone)]
pub struct FrameNamer {
    issued: u64,
}

impl FrameNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&mut self) -> String {
        self.issued += 1;
        format!("Frame {}", self.issued)
    }

    /// Number of names handed out so far.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sequential() {
        let mut namer = FrameNamer::new();
        assert_eq!(namer.next_name(), "Frame 1");
        assert_eq!(namer.next_name(), "Frame 2");
        assert_eq!(namer.issued(), 2);
    }

    #[test]
    fn namers_are_independent() {
        let mut a = FrameNamer::new();
        let mut b = FrameNamer::new();
        a.next_name();
        assert_eq!(b.next_name(), "Frame 1");
    }
}
