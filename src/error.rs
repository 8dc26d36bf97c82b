use alloc::string::String;

/// Errors returned by the user-facing send operations.
///
/// A successful exchange returns the accumulated response payload instead.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The peripheral concluded the exchange with `ERROR`.
    Error,
    /// The peripheral concluded the exchange with `+CME ERROR`. Carries
    /// everything after the `+CME ERROR` literal, verbatim.
    CmeError(String),
    /// No terminal response arrived within the caller's timeout. The
    /// peripheral may still answer later; such late results are discarded by
    /// the next session.
    Timeout,
}
