use crate::{
    error::{Error, Result},
    MAX_DEPTH,
};

/// Tracks how deeply nested the decoder currently is inside containers.
#[derive(Clone, Debug, Default)]
pub struct DepthTracker {
    depth: usize,
}

impl DepthTracker {
    /// Create a new depth tracker
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Step into a sequence, map, record, option, or enum variant.
    pub fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        // Check to see if we hit the nesting limit
        if self.depth > MAX_DEPTH {
            return Err(Error::ParseLimit("Depth limit exceeded".to_string()));
        }
        Ok(())
    }

    /// Step back out of a container entered with [`enter`](Self::enter).
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn limit() {
        let mut tracker = DepthTracker::new();
        for _ in 0..MAX_DEPTH {
            tracker.enter().unwrap();
        }
        assert!(tracker.enter().is_err());
        // Back out of the failed level and one more, then there's room again
        tracker.leave();
        tracker.leave();
        assert!(tracker.enter().is_ok());
        assert!(tracker.enter().is_err());
    }
}
