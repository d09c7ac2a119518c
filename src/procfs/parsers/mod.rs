//! Schema extractors reading typed records out of the lines of /proc files

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::{Pid, Snapshot};
use crate::procfs::source::LineSource;
use crate::procfs::text::LineSequence;
use crate::procfs::ProcfsError;

pub mod cpuinfo;
pub mod process;
pub mod system;

/// Type which can be extracted from the lines of a file
pub trait Parse: Sized {
    fn parse(lines: &LineSequence) -> Result<Self, ProcfsError>;
}

/// Specialization of a `Parse` type which is not associated to a process
pub trait SystemData: Parse {
    /// Path of the file containing this data, within the given proc directory
    fn filepath(proc_dir: &Path) -> PathBuf;
}

/// Specialization of a `Parse` type which is associated to a process
pub trait ProcessData: Parse {
    /// Path of the file containing this data, within the given proc directory
    fn filepath(proc_dir: &Path, pid: Pid) -> PathBuf;
}

impl<D> Snapshot<D>
where
    D: Parse,
{
    /// Extracts a record from `lines`, the snapshot is stamped with the timestamp of `lines`
    pub fn parse(lines: &LineSequence) -> Result<Self, ProcfsError> {
        Ok(Snapshot::new(D::parse(lines)?, lines.timestamp()))
    }

    /// Reads the current content of `source` and extracts a record from it
    pub fn read<S>(source: &mut S) -> Result<Self, ProcfsError>
    where
        S: LineSource + ?Sized,
    {
        Self::parse(&source.read()?)
    }
}

/// Fails unless exactly `expected` tokens were found
pub(crate) fn check_arity(format: &str, expected: usize, actual: usize) -> Result<(), ProcfsError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ProcfsError::SchemaMismatch(format!(
            "{} should contain {} fields, found {}",
            format, expected, actual
        )))
    }
}

/// Parses the token assigned to a field
pub(crate) fn parse_field<T>(format: &str, field: &str, token: Option<&str>) -> Result<T, ProcfsError>
where
    T: FromStr,
{
    let token = token.ok_or_else(|| ProcfsError::SchemaMismatch(format!("{}: no value for '{}'", format, field)))?;

    token.parse::<T>().map_err(|_| {
        ProcfsError::SchemaMismatch(format!(
            "{}: value '{}' of field '{}' could not be parsed",
            format, token, field
        ))
    })
}

/// Returns the only non-empty line of `lines`
pub(crate) fn single_line(format: &str, lines: &LineSequence) -> Result<LineSequence, ProcfsError> {
    let lines = lines.non_empty();

    if lines.len() != 1 {
        return Err(ProcfsError::SchemaMismatch(format!(
            "{} should contain a single line, found {}",
            format,
            lines.len()
        )));
    }

    Ok(lines)
}
