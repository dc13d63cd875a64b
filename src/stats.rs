//! Pool statistics for monitoring and logging.

/// Snapshot of the pool's counters at a point in time.
///
/// At every stable observation point `idle + checked-out == total`,
/// where checked-out is `active`. All values can change immediately
/// after reading.
///
/// # Example
///
/// ```rust
/// use html2pdf_pool::PoolStats;
///
/// let stats = PoolStats { total: 3, active: 1, idle: 2, waiting: 0 };
/// assert!(stats.has_idle());
/// println!("{}", stats);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Live sessions the pool owns (idle + handed out).
    pub total: usize,
    /// Sessions currently handed out to callers.
    pub active: usize,
    /// Sessions sitting in the idle set.
    pub idle: usize,
    /// Acquires queued waiting for a session.
    pub waiting: usize,
}

impl PoolStats {
    /// Whether a session is immediately available.
    #[inline]
    pub fn has_idle(&self) -> bool {
        self.idle > 0
    }

    /// Whether the pool owns no sessions at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ChromePool[total={}, active={}, idle={}, waiting={}]",
            self.total, self.active, self.idle, self.waiting
        )
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers() {
        let stats = PoolStats {
            total: 2,
            active: 2,
            idle: 0,
            waiting: 3,
        };
        assert!(!stats.has_idle());
        assert!(!stats.is_empty());

        let empty = PoolStats {
            total: 0,
            active: 0,
            idle: 0,
            waiting: 0,
        };
        assert!(empty.is_empty());
    }

    #[test]
    fn test_display_format() {
        let stats = PoolStats {
            total: 4,
            active: 1,
            idle: 3,
            waiting: 0,
        };
        assert_eq!(
            stats.to_string(),
            "ChromePool[total=4, active=1, idle=3, waiting=0]"
        );
    }
}
