//! Progress and ETA math shared by inbound and outbound transfers.
//!
//! Pure functions of `(bytes transferred, total bytes, elapsed millis)`,
//! recomputed on every chunk event rather than cached.

/// Byte progress as a percentage, clamped to [0, 100].
pub fn progress_percent(bytes_transferred: u64, total_bytes: u64) -> f64 {
    if total_bytes == 0 {
        return 0.0;
    }
    let percent = 100.0 * bytes_transferred as f64 / total_bytes as f64;
    percent.clamp(0.0, 100.0)
}

/// Estimated time remaining in milliseconds.
///
/// Remaining bytes divided by the observed average throughput so far.
/// Returns 0 (never infinite or NaN) when no bytes have moved or no time has
/// elapsed.
pub fn eta_millis(bytes_transferred: u64, total_bytes: u64, elapsed_millis: u64) -> u64 {
    if bytes_transferred == 0 || elapsed_millis == 0 {
        return 0;
    }
    let remaining = total_bytes.saturating_sub(bytes_transferred) as f64;
    let rate = bytes_transferred as f64 / elapsed_millis as f64;
    (remaining / rate).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(250, 1000), 25.0);
        assert_eq!(progress_percent(0, 1000), 0.0);
        assert_eq!(progress_percent(1000, 1000), 100.0);
        // Overshoot (rewritten final chunk accounting) clamps rather than exceeding.
        assert_eq!(progress_percent(1500, 1000), 100.0);
        assert_eq!(progress_percent(10, 0), 0.0);
    }

    #[test]
    fn test_eta_from_observed_throughput() {
        // 250 of 1000 bytes in 1000ms: 750 remaining at 0.25 bytes/ms.
        assert_eq!(eta_millis(250, 1000, 1000), 3000);
        assert_eq!(eta_millis(500, 1000, 2000), 2000);
    }

    #[test]
    fn test_eta_never_nan_or_infinite() {
        assert_eq!(eta_millis(0, 1000, 1000), 0);
        assert_eq!(eta_millis(250, 1000, 0), 0);
        assert_eq!(eta_millis(0, 0, 0), 0);
    }

    #[test]
    fn test_eta_complete_transfer() {
        assert_eq!(eta_millis(1000, 1000, 4000), 0);
    }
}
