use std::future::Future;
use std::pin::Pin;

use attache_transfer::SourceFile;

use crate::mime::{extension_allowed, format_size, mime_allowed};

/// A check that cannot be decided synchronously.
///
/// Resolves to `Err(reason)` to reject the file.
pub type DeferredCheck = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// Result of running one filter.
pub enum FilterOutcome {
    Accept,
    Reject(String),
    Deferred(DeferredCheck),
}

impl FilterOutcome {
    /// Convenience for filters that compute a `Result` synchronously.
    pub fn from_result(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::Accept,
            Err(reason) => Self::Reject(reason),
        }
    }
}

impl std::fmt::Debug for FilterOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => f.write_str("Accept"),
            Self::Reject(reason) => f.debug_tuple("Reject").field(reason).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// One admission rule.
pub trait FileFilter: Send + Sync {
    fn check(&self, file: &SourceFile) -> FilterOutcome;
}

impl<F> FileFilter for F
where
    F: Fn(&SourceFile) -> FilterOutcome + Send + Sync,
{
    fn check(&self, file: &SourceFile) -> FilterOutcome {
        self(file)
    }
}

// ---------------------------------------------------------------------------
// Built-in filters
// ---------------------------------------------------------------------------

/// Refuses files whose name does not end with an allowed extension.
pub struct ExtensionFilter {
    allowed: Vec<String>,
}

impl ExtensionFilter {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }
}

impl FileFilter for ExtensionFilter {
    fn check(&self, file: &SourceFile) -> FilterOutcome {
        if extension_allowed(&file.name, &self.allowed) {
            return FilterOutcome::Accept;
        }
        let allowed = self
            .allowed
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        FilterOutcome::Reject(format!(
            "File `{}` has an invalid extension. Valid extension(s): {allowed}",
            file.name
        ))
    }
}

/// Refuses files whose MIME type matches none of the accepted patterns.
pub struct MimeFilter {
    patterns: Vec<String>,
}

impl MimeFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }
}

impl FileFilter for MimeFilter {
    fn check(&self, file: &SourceFile) -> FilterOutcome {
        if mime_allowed(&file.mime, &self.patterns) {
            return FilterOutcome::Accept;
        }
        FilterOutcome::Reject(format!(
            "File `{}` has an invalid mimetype '{}'",
            file.name, file.mime
        ))
    }
}

/// Enforces minimum and maximum file size, in bytes.
pub struct SizeFilter {
    min: Option<u64>,
    max: Option<u64>,
}

impl SizeFilter {
    pub fn new(min: Option<u64>, max: Option<u64>) -> Self {
        Self { min, max }
    }
}

impl FileFilter for SizeFilter {
    fn check(&self, file: &SourceFile) -> FilterOutcome {
        let size = file.size();
        if let Some(max) = self.max.filter(|max| size > *max) {
            return FilterOutcome::Reject(format!(
                "File `{}` is too large. Maximum file size is {}.",
                file.name,
                format_size(max)
            ));
        }
        if let Some(min) = self.min.filter(|min| size < *min) {
            return FilterOutcome::Reject(format!(
                "File `{}` is too small. Minimum file size is {}.",
                file.name,
                format_size(min)
            ));
        }
        FilterOutcome::Accept
    }
}
