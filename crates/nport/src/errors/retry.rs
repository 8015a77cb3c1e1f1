/// Classification for retry policy.
///
/// Used by the EDGAR client to decide whether a failed request is worth
/// another attempt, and how long to wait before it.
///
/// # Behavior Summary
///
/// | Class | Retry? | Delay |
/// |-------|--------|-------|
/// | `Never` | No | - |
/// | `WithBackoff` | Yes, up to the attempt ceiling | `base * 2^(attempt-1)` |
/// | `Throttled` | Yes, up to the attempt ceiling | `Retry-After`, else 4x the backoff |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - missing filing, rejected request, or unparsable payload.
    /// The request is fundamentally invalid and retrying won't help.
    Never,

    /// Retry with exponential backoff.
    ///
    /// Used for transient failures: timeouts, connection resets and 5xx
    /// responses from SEC servers.
    WithBackoff,

    /// SEC signalled throttling despite local rate limiting.
    ///
    /// Retried like `WithBackoff` but with a longer pause, so the process
    /// falls back under the fair-access threshold before trying again.
    Throttled,
}
