//! Turns physical lines into logical events.
//!
//! A line the boundary regex matches starts a new event; any other line is a
//! continuation (stack-trace frames, wrapped messages) and is appended to the
//! event being buffered. Several files are read back to back, ordered by the
//! first date each one carries, so the output is one chronological stream.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::layout::{CompiledPattern, LogEvent};

/// A source of physical lines.
pub type Lines = Box<dyn Iterator<Item = Result<String>>>;

/// Reads lines from a `BufRead`, replacing invalid UTF-8 and stripping the
/// line terminator (`\n` or `\r\n`).
pub struct LossyLines<R> {
    reader: R,
    path: Option<PathBuf>,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        LossyLines {
            reader,
            path: None,
            buf: Vec::with_capacity(256),
        }
    }

    fn with_path(reader: R, path: &Path) -> Self {
        LossyLines {
            path: Some(path.to_path_buf()),
            ..LossyLines::new(reader)
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(source) => Some(Err(read_error(self.path.as_deref(), source))),
        }
    }
}

/// Lines of several files, one file after the other.
pub struct FileChain {
    pending: VecDeque<PathBuf>,
    current: Option<LossyLines<BufReader<File>>>,
}

impl FileChain {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        FileChain {
            pending: paths.into(),
            current: None,
        }
    }
}

impl Iterator for FileChain {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(lines) = self.current.as_mut() {
                match lines.next() {
                    Some(line) => return Some(line),
                    None => self.current = None,
                }
            }

            let path = self.pending.pop_front()?;
            log::debug!("reading {}", path.display());
            match File::open(&path) {
                Ok(file) => self.current = Some(LossyLines::with_path(BufReader::new(file), &path)),
                Err(source) => return Some(Err(read_error(Some(&path), source))),
            }
        }
    }
}

/// Groups physical lines into [`LogEvent`]s.
pub struct EventReassembler {
    lines: Lines,
    pattern: Arc<CompiledPattern>,
    pending: Option<String>,
}

impl EventReassembler {
    pub fn new(lines: Lines, pattern: Arc<CompiledPattern>) -> Self {
        EventReassembler {
            lines,
            pattern,
            pending: None,
        }
    }

    pub fn from_reader<R: BufRead + 'static>(reader: R, pattern: Arc<CompiledPattern>) -> Self {
        Self::new(Box::new(LossyLines::new(reader)), pattern)
    }

    /// Reassemble the given files as one stream, in the order given. Use
    /// [`order_files`] first to get chronological order.
    pub fn from_files(paths: Vec<PathBuf>, pattern: Arc<CompiledPattern>) -> Self {
        Self::new(Box::new(FileChain::new(paths)), pattern)
    }

    fn event(&self, text: String) -> LogEvent {
        LogEvent::new(text, Arc::clone(&self.pattern))
    }
}

impl Iterator for EventReassembler {
    type Item = Result<LogEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if self.pattern.is_boundary(&line) {
                        if let Some(previous) = self.pending.replace(line) {
                            return Some(Ok(self.event(previous)));
                        }
                    } else {
                        match self.pending.as_mut() {
                            Some(buffer) => {
                                buffer.push('\n');
                                buffer.push_str(&line);
                            }
                            None => self.pending = Some(line),
                        }
                    }
                }
                Some(Err(err)) => return Some(Err(err)),
                None => {
                    let text = self.pending.take()?;
                    return Some(Ok(self.event(text)));
                }
            }
        }
    }
}

/// Date of the first boundary line in `path` whose date token parses.
pub fn first_date(path: &Path, pattern: &Arc<CompiledPattern>) -> Result<Option<NaiveDateTime>> {
    if pattern.date_format().is_none() {
        return Ok(None);
    }

    let file = File::open(path).map_err(|source| read_error(Some(path), source))?;
    for line in LossyLines::with_path(BufReader::new(file), path) {
        let line = line?;
        if !pattern.is_boundary(&line) {
            continue;
        }
        // boundary lines always match, so the token lookup cannot fail
        if let Ok(Some(date)) = LogEvent::new(line, Arc::clone(pattern)).date() {
            return Ok(Some(date));
        }
    }
    Ok(None)
}

/// Order files by their first parseable date. Files without one keep their
/// relative order and go last.
pub fn order_files(paths: Vec<PathBuf>, pattern: &Arc<CompiledPattern>) -> Result<Vec<PathBuf>> {
    if paths.len() < 2 {
        return Ok(paths);
    }

    // each probe is an independent read-only scan
    let dates = paths
        .par_iter()
        .map(|path| first_date(path, pattern))
        .collect::<Result<Vec<_>>>()?;

    let mut keyed: Vec<(Option<NaiveDateTime>, PathBuf)> = dates.into_iter().zip(paths).collect();
    for (date, path) in &keyed {
        match date {
            Some(date) => log::debug!("{} starts at {}", path.display(), date),
            None => log::warn!("no parseable date in {}; reading it last", path.display()),
        }
    }
    keyed.sort_by_key(|(date, _)| (date.is_none(), *date));

    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}

fn read_error(path: Option<&Path>, source: io::Error) -> Error {
    match path {
        Some(path) => Error::Read {
            path: path.to_path_buf(),
            source,
        },
        None => Error::Io(source),
    }
}
