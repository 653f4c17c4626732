use std::fmt;
use std::path::PathBuf;

/// Result of validating one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Valid,
    Invalid(Diagnostic),
}

impl ParseOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParseOutcome::Valid)
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseOutcome::Valid => None,
            ParseOutcome::Invalid(diagnostic) => Some(diagnostic),
        }
    }
}

/// A malformed-JSON report for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Path as it was listed by the candidate source
    pub path: PathBuf,
    /// Decoder error message
    pub message: String,
    /// Byte position reported by the decoder; 0 when none was usable
    pub offset: u64,
    /// Lines around `offset`, present only for position-bearing errors
    pub snippet: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.snippet {
            None => write!(f, "{}: {}", self.path.display(), self.message),
            Some(snippet) => write!(
                f,
                "{}:{}: {}; context:\n{}\n\n",
                self.path.display(),
                self.offset,
                self.message,
                snippet
            ),
        }
    }
}
