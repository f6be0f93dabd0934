//! Log output format selection.
//!
//! Pool and engine events (session start, replacement, engine `log` lines,
//! stderr warnings) are rendered in one of two shapes. Services that ship
//! logs to an aggregator keep the JSON default; a person running
//! `princepdf render` by hand usually wants `compact`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Shape of the log lines written to standard error.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, with `session`, `worker` and `pid`
    /// fields flattened to the top level.
    #[default]
    Json,
    /// One terse human-readable line per event.
    Compact,
}

/// Error returned when `--log-format` or `PRINCEPDF_LOG_FORMAT` names an
/// unknown format.
pub type LogFormatParseError = strum::ParseError;
