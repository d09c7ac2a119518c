//! Sources of line sequences

use std::fs::File;
use std::io;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;

use crate::core::time::Timestamp;
use crate::procfs::text::LineSequence;
use crate::procfs::ProcfsError;

/// Type which can produce the current lines of some file
pub trait LineSource {
    /// Reads all lines currently available, stamped with the instant of the read
    fn read(&mut self) -> Result<LineSequence, ProcfsError>;
}

/// A file of the `/proc` directory, re-read from its beginning at each call of `read()`
pub struct ProcFile {
    path: PathBuf,
    file: File,
}

impl ProcFile {
    pub fn open(path: &Path) -> Result<Self, ProcfsError> {
        File::open(path)
            .map(|file| ProcFile {
                path: path.to_path_buf(),
                file,
            })
            .map_err(|source| ProcfsError::MissingSource {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSource for ProcFile {
    fn read(&mut self) -> Result<LineSequence, ProcfsError> {
        let lines = read_lines(&mut self.file).map_err(|source| ProcfsError::MissingSource {
            path: self.path.clone(),
            source,
        })?;

        debug!("Read {} lines from {:?}", lines.len(), self.path);
        Ok(lines)
    }
}

fn read_lines<R>(src: &mut R) -> io::Result<LineSequence>
where
    R: Read + Seek,
{
    // rather than re-opening the file at each read, we just seek back the start of the file
    src.seek(SeekFrom::Start(0))?;

    // executable names in stat files may hold any byte
    let mut content = Vec::new();
    src.read_to_end(&mut content)?;

    Ok(LineSequence::from_text(&String::from_utf8_lossy(&content), Timestamp::now()))
}

/// A source whose content never changes, each read is still stamped with its own instant
pub struct StaticSource {
    content: String,
}

impl StaticSource {
    pub fn new<C>(content: C) -> Self
    where
        C: Into<String>,
    {
        StaticSource {
            content: content.into(),
        }
    }
}

impl LineSource for StaticSource {
    fn read(&mut self) -> Result<LineSequence, ProcfsError> {
        Ok(LineSequence::from_text(&self.content, Timestamp::now()))
    }
}


#[cfg(test)]
mod test_proc_file {
    use std::io::Write;

    use tempfile::{tempdir, NamedTempFile};

    use crate::core::Snapshot;
    use crate::procfs::parsers::process::test_utils::stat_line;
    use crate::procfs::parsers::process::PidStat;

    use super::*;

    #[test]
    fn test_should_read_file_content() {
        let mut file = NamedTempFile::new().expect("Could not create temp file");
        file.write_all(b"1 2 3\n").unwrap();

        let mut proc_file = ProcFile::open(file.path()).expect("Could not open file");

        assert_eq!(proc_file.read().unwrap().lines(), &["1 2 3"]);
    }

    #[test]
    fn test_should_parse_stat_of_executable_with_non_utf8_name() {
        let mut file = NamedTempFile::new().expect("Could not create temp file");
        let line = stat_line(1, 2, 3);
        let (head, tail) = line.split_once("python3").unwrap();
        file.write_all(head.as_bytes()).unwrap();
        file.write_all(b"py\xffthon").unwrap();
        file.write_all(tail.as_bytes()).unwrap();

        let mut proc_file = ProcFile::open(file.path()).expect("Could not open file");
        let stat = Snapshot::<PidStat>::read(&mut proc_file).expect("Could not read PidStat");

        assert_eq!(stat.comm(), "py\u{FFFD}thon");
        assert_eq!(stat.utime(), 1);
    }

    #[test]
    fn test_should_return_missing_source_when_file_does_not_exist() {
        let dir = tempdir().expect("Could not create tmp dir");
        let path = dir.path().join("stat");

        let ret = ProcFile::open(&path);

        assert!(matches!(ret, Err(ProcfsError::MissingSource { path: p, .. }) if p == path));
    }
}
