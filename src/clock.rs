use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time in nanoseconds since the Unix epoch.
///
/// Record timestamps are informational only; ordering between records comes
/// from the sequence number, so a clock that steps backwards is harmless.
/// Clocks set before the epoch read as 0.
#[inline]
pub fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(now_nanos() > 1_577_836_800_000_000_000);
    }
}
