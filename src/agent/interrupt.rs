//! One-shot human override flag.
//!
//! The only cross-thread state in the agent: an auxiliary listener may set
//! it at any time, and the loop consumes it at the top of the next round.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct HumanOverride {
    requested: Arc<AtomicBool>,
}

impl HumanOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Reads and clears the flag in one atomic step so a single request
    /// never triggers two pauses.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_is_one_shot() {
        let flag = HumanOverride::new();
        assert!(!flag.take());
        flag.request();
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn clones_share_the_flag() {
        let flag = HumanOverride::new();
        let listener = flag.clone();
        listener.request();
        assert!(flag.take());
    }
}
