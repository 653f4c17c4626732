use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;

use crate::error::{CheckError, Result};
use crate::limits::ConcurrencyLimit;
use crate::outcome::ParseOutcome;
use crate::signal::AggregateStatus;
use crate::validator::{FileValidator, ValidatorOptions};

const JSON_EXTENSION: &[u8] = b".json";

/// How entries of a path listing are terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    /// One path per line; surrounding whitespace is trimmed
    #[default]
    Newline,
    /// NUL-terminated, as printed by `git -z`; entries are taken verbatim
    Nul,
}

impl Separator {
    const fn byte(self) -> u8 {
        match self {
            Separator::Newline => b'\n',
            Separator::Nul => b'\0',
        }
    }
}

/// Whether a listed path should be validated at all.
pub fn is_candidate(line: &str) -> bool {
    candidate_path(line.as_bytes(), Separator::Newline).is_some()
}

fn candidate_path(raw: &[u8], separator: Separator) -> Option<PathBuf> {
    let raw = match separator {
        Separator::Newline => trim_ascii_whitespace(raw),
        Separator::Nul => raw,
    };
    if raw.len() < JSON_EXTENSION.len() || !raw.ends_with(JSON_EXTENSION) {
        return None;
    }
    Some(path_from_bytes(raw))
}

fn trim_ascii_whitespace(raw: &[u8]) -> &[u8] {
    let start = raw
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(raw.len());
    let end = raw
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &raw[start..end]
}

#[cfg(unix)]
fn path_from_bytes(raw: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(raw))
}

#[cfg(not(unix))]
fn path_from_bytes(raw: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(raw).into_owned())
}

#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Directory relative candidate paths are resolved against
    pub base_dir: Option<PathBuf>,
    pub validator: ValidatorOptions,
    pub limit: ConcurrencyLimit,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckSummary {
    /// Files dispatched for validation
    pub checked: usize,
    /// Files that failed to parse
    pub failures: usize,
}

impl CheckSummary {
    pub fn passed(&self) -> bool {
        self.failures == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

/// Fans candidate paths out to one validation task each and folds the results into a
/// [`CheckSummary`].
#[derive(Debug, Clone)]
pub struct Coordinator {
    validator: Arc<FileValidator>,
    limit: ConcurrencyLimit,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let mut validator = FileValidator::new(config.validator);
        if let Some(dir) = config.base_dir {
            validator = validator.with_base_dir(dir);
        }
        Self {
            validator: Arc::new(validator),
            limit: config.limit,
        }
    }

    /// Reads newline-separated paths until end of stream and validates every `.json` entry.
    ///
    /// Returns on the first fatal error; validations still in flight are abandoned.
    pub async fn run<R>(&self, source: R) -> Result<CheckSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        self.run_separated(source, Separator::Newline).await
    }

    /// Like [`run`], with entries terminated by `separator`.
    ///
    /// [`run`]: Coordinator::run
    pub async fn run_separated<R>(&self, source: R, separator: Separator) -> Result<CheckSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut batch = Batch::new(self);
        let mut entries = source.split(separator.byte());
        while let Some(entry) = entries
            .next_segment()
            .await
            .map_err(CheckError::PathStream)?
        {
            batch.offer(candidate_path(&entry, separator)).await?;
        }
        batch.finish().await
    }

    /// Validates an explicit list of paths with the same filtering and aggregation as [`run`].
    /// Paths are taken verbatim.
    ///
    /// [`run`]: Coordinator::run
    pub async fn run_paths<I, S>(&self, paths: I) -> Result<CheckSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = Batch::new(self);
        for path in paths {
            batch
                .offer(candidate_path(path.as_ref().as_bytes(), Separator::Nul))
                .await?;
        }
        batch.finish().await
    }
}

/// In-flight state of one run. The join set is the completion barrier.
struct Batch<'a> {
    coordinator: &'a Coordinator,
    status: AggregateStatus,
    tasks: JoinSet<Result<ParseOutcome>>,
    checked: usize,
}

impl<'a> Batch<'a> {
    fn new(coordinator: &'a Coordinator) -> Self {
        Self {
            coordinator,
            status: AggregateStatus::spawn(),
            tasks: JoinSet::new(),
            checked: 0,
        }
    }

    async fn offer(&mut self, candidate: Option<PathBuf>) -> Result<()> {
        self.reap()?;
        let Some(path) = candidate else {
            return Ok(());
        };

        let permit = self.coordinator.limit.acquire().await;
        let validator = Arc::clone(&self.coordinator.validator);
        let signal = self.status.signal();
        log::debug!("checking {}", path.display());
        self.tasks.spawn_blocking(move || {
            let _permit = permit;
            validator.validate(&path, &signal)
        });
        self.checked += 1;
        Ok(())
    }

    /// Surfaces fatal errors from tasks that already finished.
    fn reap(&mut self) -> Result<()> {
        while let Some(joined) = self.tasks.try_join_next() {
            joined??;
        }
        Ok(())
    }

    async fn finish(mut self) -> Result<CheckSummary> {
        while let Some(joined) = self.tasks.join_next().await {
            joined??;
        }
        let report = self.status.finish().await?;
        let summary = CheckSummary {
            checked: self.checked,
            failures: report.failures,
        };
        log::debug!(
            "checked {} JSON file(s), {} invalid",
            summary.checked,
            summary.failures
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn fixture(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        for (name, text) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("mkdir");
            }
            fs::write(path, text).expect("write fixture");
        }
        dir
    }

    fn coordinator(dir: &TempDir, limit: ConcurrencyLimit) -> Coordinator {
        Coordinator::new(CoordinatorConfig {
            base_dir: Some(dir.path().to_path_buf()),
            validator: ValidatorOptions::default(),
            limit,
        })
    }

    #[test]
    fn candidate_filter_requires_json_suffix() {
        assert!(is_candidate("a.json"));
        assert!(is_candidate("  nested/dir/config.json \n"));
        assert!(is_candidate(".json"));
        assert!(!is_candidate("json"));
        assert!(!is_candidate(""));
        assert!(!is_candidate("notes.txt"));
        assert!(!is_candidate("data.json5"));
        assert!(!is_candidate("data.JSON"));
        assert!(!is_candidate("data.jsonl"));
    }

    #[tokio::test]
    async fn clean_run_exits_zero_and_never_opens_other_files() {
        // notes.txt does not exist; opening it would be fatal.
        let dir = fixture(&[("good.json", "{\"x\":1}")]);
        let summary = coordinator(&dir, ConcurrencyLimit::unbounded())
            .run(&b"good.json\nnotes.txt\n"[..])
            .await
            .expect("run");
        assert_eq!(
            summary,
            CheckSummary {
                checked: 1,
                failures: 0
            }
        );
        assert_eq!(summary.exit_code(), 0);
    }

    #[tokio::test]
    async fn counts_every_invalid_file() {
        let mut files = Vec::new();
        let names: Vec<String> = (0..40).map(|i| format!("f{i:02}.json")).collect();
        for (i, name) in names.iter().enumerate() {
            let text = if i % 4 == 0 { "{\"broken\" 1}" } else { "{\"ok\": true}" };
            files.push((name.as_str(), text));
        }
        let dir = fixture(&files);
        let listing = names.join("\n");

        for limit in [ConcurrencyLimit::unbounded(), ConcurrencyLimit::bounded(3)] {
            let summary = coordinator(&dir, limit)
                .run(listing.as_bytes())
                .await
                .expect("run");
            assert_eq!(summary.checked, 40);
            assert_eq!(summary.failures, 10);
            assert_eq!(summary.exit_code(), 1);
        }
    }

    #[tokio::test]
    async fn last_line_without_newline_is_still_checked() {
        let dir = fixture(&[("a.json", "{}"), ("b.json", "{")]);
        let summary = coordinator(&dir, ConcurrencyLimit::unbounded())
            .run(&b"a.json\nb.json"[..])
            .await
            .expect("run");
        assert_eq!(summary.checked, 2);
        assert_eq!(summary.failures, 1);
    }

    #[tokio::test]
    async fn nul_separated_entries_are_taken_verbatim() {
        let dir = fixture(&[
            ("\u{e4}.json", "{\"broken\" 1}"),
            (" lead.json", "{"),
            ("lead.json", "{}"),
            ("a b.json", "{\"ok\": 1}"),
        ]);
        let listing = "\u{e4}.json\0 lead.json\0a b.json\0notes.txt\0";
        let summary = coordinator(&dir, ConcurrencyLimit::unbounded())
            .run_separated(listing.as_bytes(), Separator::Nul)
            .await
            .expect("run");
        assert_eq!(
            summary,
            CheckSummary {
                checked: 3,
                failures: 2
            }
        );
    }

    #[test]
    fn newline_entries_are_trimmed() {
        assert_eq!(
            candidate_path(b"  conf/a.json\r", Separator::Newline),
            Some(PathBuf::from("conf/a.json"))
        );
        assert_eq!(
            candidate_path(b" a.json", Separator::Nul),
            Some(PathBuf::from(" a.json"))
        );
        assert_eq!(candidate_path(b"\"\\303\\244.json\"", Separator::Newline), None);
        assert_eq!(candidate_path(b"   ", Separator::Newline), None);
    }

    #[tokio::test]
    async fn empty_stream_passes() {
        let dir = fixture(&[]);
        let summary = coordinator(&dir, ConcurrencyLimit::unbounded())
            .run(&b""[..])
            .await
            .expect("run");
        assert_eq!(summary, CheckSummary::default());
        assert!(summary.passed());
    }

    #[tokio::test]
    async fn missing_file_aborts_the_run() {
        let dir = fixture(&[("good.json", "{}")]);
        let err = coordinator(&dir, ConcurrencyLimit::unbounded())
            .run(&b"good.json\ngone.json\n"[..])
            .await
            .expect_err("fatal");
        assert!(matches!(err, CheckError::Open { .. }), "{err}");
    }

    #[tokio::test]
    async fn explicit_paths_share_the_filter() {
        let dir = fixture(&[("conf/app.json", "[1]"), ("readme.md", "# hi")]);
        let summary = coordinator(&dir, ConcurrencyLimit::unbounded())
            .run_paths(["conf/app.json", "readme.md", "missing.txt"])
            .await
            .expect("run");
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.failures, 1);
    }
}
