//! Byte-progress snapshot for one hash session.

/// Processed/total byte pair, reset to `(0, file length)` at session
/// start. `total` is best-effort: 0 means "unknown", not "empty".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub processed: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self { processed: 0, total }
    }

    /// Completed fraction in `[0, 1]`; 0 while the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total as f64).min(1.0)
        }
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.processed >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_total_is_zero_fraction() {
        let p = Progress { processed: 500, total: 0 };
        assert_eq!(p.fraction(), 0.0);
        assert_eq!(p.percent(), 0);
        assert!(!p.is_complete());
    }

    #[test]
    fn test_fraction_clamps_to_one() {
        // A file can grow between stat and read; the fraction must not
        // exceed 1.
        let p = Progress { processed: 150, total: 100 };
        assert_eq!(p.fraction(), 1.0);
        assert_eq!(p.percent(), 100);
    }

    #[test]
    fn test_halfway() {
        let p = Progress { processed: 50, total: 100 };
        assert_eq!(p.fraction(), 0.5);
        assert_eq!(p.percent(), 50);
    }
}
