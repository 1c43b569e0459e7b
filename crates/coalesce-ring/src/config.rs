/// Configuration for a [`crate::Queue`].
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Maximum number of items the queue holds before producers block.
    pub capacity: usize,
}

impl Config {
    /// Creates a new configuration with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be at least 1");
        Self { capacity }
    }

    /// Returns the configured capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { capacity: 8192 }
    }
}
