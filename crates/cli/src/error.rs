//! CLI errors and their exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: field or schema error (bad dimensions, invalid schema)
//! - 11: I/O error (PNG write)
//! - 12: input error (unknown preset, malformed JSON argument)
//! - 13: serialization error

use starfield_core::StarfieldError;
use std::fmt;

/// Why a `starfield` invocation failed. Each variant owns one exit code.
#[derive(Debug)]
pub enum CliError {
    /// The core rejected the field or its schema (exit 10).
    Field(StarfieldError),
    /// Writing the snapshot failed (exit 11).
    Io(String),
    /// A flag value was unusable: unknown preset, bad `--schema`/`--morph`
    /// JSON, or schema keys and values the core would refuse (exit 12).
    Input(String),
    /// JSON output could not be produced (exit 13).
    Serialization(String),
}

impl CliError {
    /// An [`CliError::Input`] naming the offending flag.
    pub fn argument(flag: &str, detail: impl fmt::Display) -> Self {
        CliError::Input(format!("{flag}: {detail}"))
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Field(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Field(e) => write!(f, "{e}"),
            CliError::Io(msg) | CliError::Input(msg) | CliError::Serialization(msg) => {
                f.write_str(msg)
            }
        }
    }
}

impl From<StarfieldError> for CliError {
    fn from(e: StarfieldError) -> Self {
        match e {
            StarfieldError::Io(msg) => CliError::Io(msg),
            StarfieldError::UnknownPreset(name) => {
                CliError::Input(format!("unknown preset: {name}"))
            }
            other => CliError::Field(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}
