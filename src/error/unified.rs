//! Error classification.

use strum::{Display, EnumString};

/// Broad error category for routing caller-side handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Encode,
    Network,
    Status,
    Protocol,
    Decode,
    Context,
    Stream,
    Configuration,
}
