/// The half-open range of ids `[next_id, upper_bound)` one generator instance
/// currently owns for a scope.
///
/// A window lives only in memory. It is replaced wholesale whenever a new
/// batch is acquired; whatever was left of the old one is discarded and never
/// handed out by anyone, which is what keeps ids unique across crashes.
///
/// The default window is `[0, 0)`: empty, so the first request for a scope
/// always acquires a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScopeWindow {
    next_id: u64,
    upper_bound: u64,
}

impl ScopeWindow {
    /// Creates a window over `[next_id, upper_bound)`.
    pub const fn new(next_id: u64, upper_bound: u64) -> Self {
        debug_assert!(next_id <= upper_bound);
        Self {
            next_id,
            upper_bound,
        }
    }

    /// Pops the next id, or returns `None` once the window is exhausted.
    ///
    /// # Example
    /// ```
    /// use blockid::ScopeWindow;
    ///
    /// let mut window = ScopeWindow::new(3, 5);
    /// assert_eq!(window.take(), Some(3));
    /// assert_eq!(window.take(), Some(4));
    /// assert_eq!(window.take(), None);
    /// ```
    #[inline]
    pub fn take(&mut self) -> Option<u64> {
        if self.is_exhausted() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        Some(id)
    }

    /// Returns `true` when no ids remain.
    #[inline]
    pub const fn is_exhausted(&self) -> bool {
        self.next_id >= self.upper_bound
    }

    /// Number of ids still available.
    pub const fn remaining(&self) -> u64 {
        self.upper_bound.saturating_sub(self.next_id)
    }

    /// The id [`Self::take`] would return next.
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Exclusive upper bound of the window.
    pub const fn upper_bound(&self) -> u64 {
        self.upper_bound
    }
}
