use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Environment override for the worker pool size.
pub const JOBS_ENV: &str = "JSONCHECK_JOBS";

const MAX_JOBS: usize = 1024;

/// Optional cap on concurrently running validations. Unbounded unless configured.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyLimit {
    semaphore: Option<Arc<Semaphore>>,
    jobs: Option<usize>,
}

impl ConcurrencyLimit {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(jobs: usize) -> Self {
        let jobs = jobs.clamp(1, MAX_JOBS);
        Self {
            semaphore: Some(Arc::new(Semaphore::new(jobs))),
            jobs: Some(jobs),
        }
    }

    /// Reads [`JOBS_ENV`]; unset or unparsable values mean unbounded.
    pub fn from_env() -> Self {
        let raw = std::env::var(JOBS_ENV).ok();
        match parse_jobs(raw.as_deref()) {
            Some(jobs) => Self::bounded(jobs),
            None => Self::unbounded(),
        }
    }

    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }

    /// Waits for a worker slot. Always `None` when unbounded.
    pub(crate) async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        let semaphore = self.semaphore.as_ref()?;
        // The semaphore is never closed.
        Arc::clone(semaphore).acquire_owned().await.ok()
    }
}

fn parse_jobs(raw: Option<&str>) -> Option<usize> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .map(|v| v.clamp(1, MAX_JOBS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_jobs_trims_and_clamps() {
        assert_eq!(parse_jobs(None), None);
        assert_eq!(parse_jobs(Some("")), None);
        assert_eq!(parse_jobs(Some("   ")), None);
        assert_eq!(parse_jobs(Some("abc")), None);
        assert_eq!(parse_jobs(Some("-3")), None);
        assert_eq!(parse_jobs(Some("4")), Some(4));
        assert_eq!(parse_jobs(Some(" 8 ")), Some(8));
        assert_eq!(parse_jobs(Some("0")), Some(1));
        assert_eq!(parse_jobs(Some("100000")), Some(MAX_JOBS));
    }

    #[test]
    fn bounded_clamps_to_at_least_one() {
        assert_eq!(ConcurrencyLimit::bounded(0).jobs(), Some(1));
        assert_eq!(ConcurrencyLimit::unbounded().jobs(), None);
    }

    #[tokio::test]
    async fn bounded_limit_hands_out_permits() {
        let limit = ConcurrencyLimit::bounded(1);
        let first = limit.acquire().await;
        assert!(first.is_some());
        drop(first);
        assert!(limit.acquire().await.is_some());
        assert!(ConcurrencyLimit::unbounded().acquire().await.is_none());
    }
}
