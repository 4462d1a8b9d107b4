//! Deadline arithmetic on the tokio clock.

use std::time::Duration;
use tokio::time::Instant;

/// Latest deadline ever scheduled, about thirty years out.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + delay`, saturating at [`FAR_FUTURE`] instead of overflowing.
pub fn deadline_after(start: Instant, delay: Duration) -> Instant {
    start.checked_add(delay.min(FAR_FUTURE)).unwrap_or(start)
}
