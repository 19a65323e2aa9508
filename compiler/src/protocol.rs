use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// First token of every successful record printed by a compiled parser.
pub const SUCCESS_SENTINEL: &str = "SUCCESS";

/// Substring present in every failure line printed by a compiled parser.
pub const FAILURE_SENTINEL: &str = "Failed to parse JSON";

/// Full failure line printed by the driver.
pub const FAILURE_LINE: &str = "ERROR|Failed to parse JSON";

pub const FIELD_DELIMITER: char = '|';

/// Argument that switches the driver into the length-framed worker loop.
pub const SERVE_FLAG: &str = "--serve";

/// How a compiled parser lays out the values of a successful record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireProtocol {
    /// `SUCCESS|v1|v2|...`, values correlated with fields by position.
    #[default]
    Positional,
    /// `SUCCESS|name=v1|age=v2|...`, values correlated with fields by name.
    Keyed,
}

impl WireProtocol {
    pub fn version(self) -> u32 {
        match self {
            WireProtocol::Positional => 1,
            WireProtocol::Keyed      => 2,
        }
    }
}

impl fmt::Display for WireProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireProtocol::Positional => f.write_str("positional"),
            WireProtocol::Keyed      => f.write_str("keyed"),
        }
    }
}

impl FromStr for WireProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<WireProtocol, String> {
        match s {
            "positional" | "v1" => Ok(WireProtocol::Positional),
            "keyed" | "v2"      => Ok(WireProtocol::Keyed),
            other => Err(format!("unknown wire protocol \"{}\" (expected positional or keyed)", other)),
        }
    }
}
