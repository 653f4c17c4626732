use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::error::Category;

use crate::error::{CheckError, Result};
use crate::outcome::{Diagnostic, ParseOutcome};
use crate::signal::FailureSignal;

/// Bytes read from disk around an error offset to build the context window.
pub const WINDOW_SIZE: u64 = 4096;
const HALF_WINDOW: u64 = WINDOW_SIZE / 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Reject anything but whitespace after the first JSON value
    pub strict: bool,
}

/// Checks that a single file holds a well-formed JSON document.
#[derive(Debug, Clone, Default)]
pub struct FileValidator {
    options: ValidatorOptions,
    base_dir: Option<PathBuf>,
}

impl FileValidator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self {
            options,
            base_dir: None,
        }
    }

    /// Resolve relative candidate paths against `dir` instead of the working directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Validates `path`, raising `signal` and logging a diagnostic when it is malformed.
    ///
    /// I/O failures (open, stat, seek, short read) are returned as errors and are meant to end
    /// the run. Malformed JSON is never an error.
    pub fn validate(&self, path: &Path, signal: &FailureSignal) -> Result<ParseOutcome> {
        let location = self.resolve(path);
        let file = File::open(&location).map_err(|source| CheckError::Open {
            path: location.to_path_buf(),
            source,
        })?;

        let mut reader = CountingReader::new(BufReader::new(file));
        let err = match decode_document(&mut reader, self.options.strict) {
            Ok(()) => return Ok(ParseOutcome::Valid),
            Err(err) => err,
        };

        signal.raise();

        let offset = error_offset(&err, reader.consumed());
        let message = err.to_string();
        let snippet = if offset == 0 {
            None
        } else {
            let mut file = reader.into_inner().into_inner();
            Some(read_context(&mut file, &location, offset)?)
        };

        let diagnostic = Diagnostic {
            path: path.to_path_buf(),
            message,
            offset,
            snippet,
        };
        log::error!("{diagnostic}");
        Ok(ParseOutcome::Invalid(diagnostic))
    }

    fn resolve<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match &self.base_dir {
            Some(dir) if path.is_relative() => Cow::Owned(dir.join(path)),
            _ => Cow::Borrowed(path),
        }
    }
}

/// Decodes the first JSON value of the stream without materialising it.
///
/// `null` is accepted, any non-object top-level value is a type error.
fn decode_document<R: Read>(reader: R, strict: bool) -> serde_json::Result<()> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    de.disable_recursion_limit();
    Document::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    if strict {
        de.end()?;
    }
    Ok(())
}

/// Shape check for the top-level value. Contents are skipped with [`IgnoredAny`], which still
/// runs the full syntax scan but keeps no strings around.
struct Document;

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object or null")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Document, E> {
        Ok(Document)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Document, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Document)
    }

    // Syntax errors inside the array win over the type mismatch.
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Document, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Err(de::Error::invalid_type(de::Unexpected::Seq, &self))
    }
}

/// Only syntax errors carry a usable position. The decoder pulls bytes one at a time, so the
/// count includes the offending byte and is never 0 for a syntax error.
fn error_offset(err: &serde_json::Error, consumed: u64) -> u64 {
    match err.classify() {
        Category::Syntax => consumed,
        _ => 0,
    }
}

/// Reads at most [`WINDOW_SIZE`] bytes around `offset` and extracts the context lines.
fn read_context(file: &mut File, path: &Path, offset: u64) -> Result<String> {
    let size = file
        .metadata()
        .map_err(|source| CheckError::Stat {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    let start = offset.saturating_sub(HALF_WINDOW);
    let end = start.saturating_add(WINDOW_SIZE).min(size);
    let len = usize::try_from(end.saturating_sub(start)).unwrap_or(0);

    file.seek(SeekFrom::Start(start))
        .map_err(|source| CheckError::Seek {
            path: path.to_path_buf(),
            offset: start,
            source,
        })?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf).map_err(|source| CheckError::Read {
        path: path.to_path_buf(),
        offset: start,
        len,
        source,
    })?;

    let relative = usize::try_from(offset - start).unwrap_or(usize::MAX);
    let window = jsoncheck_window::extract_window(&buf, relative);
    Ok(String::from_utf8_lossy(window).into_owned())
}

/// Counts bytes handed to the decoder.
struct CountingReader<R> {
    inner: R,
    consumed: u64,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    fn consumed(&self) -> u64 {
        self.consumed
    }

    fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }
}
