//! Snapshots of the Linux `/proc` filesystem
//!
//! Files are read as line sequences (see [`source`]), normalized through the text transformations
//! of [`text`], then decoded into typed records by the extractors of [`parsers`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use os::{ClockTicks, FixedClockTicks, Procfs, SysconfClockTicks};

mod os;
pub mod parsers;
pub mod process;
pub mod source;
pub mod sysconf;
pub mod text;

#[derive(Error, Debug)]
pub enum ProcfsError {
    /// The file could not be opened or read, the process may have exited
    #[error("Could not read '{path:?}'")]
    MissingSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The content of the file does not match the expected format
    #[error("Unexpected file format: {0}")]
    SchemaMismatch(String),
    /// The file was parsed, but does not expose this field on this kernel
    #[error("Field '{0}' is not available")]
    FieldAbsent(String),
    #[error("Could not retrieve system configuration value")]
    SysconfError,
}
