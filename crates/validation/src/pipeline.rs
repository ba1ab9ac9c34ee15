use std::sync::Arc;

use attache_transfer::SourceFile;
use futures_util::future::try_join_all;
use tracing::debug;

use crate::config::ValidationConfig;
use crate::dimensions::DimensionFilter;
use crate::filter::{
    DeferredCheck, ExtensionFilter, FileFilter, FilterOutcome, MimeFilter, SizeFilter,
};
use crate::{Rejection, Verdict};

/// Ordered set of admission filters.
///
/// Caller-supplied filters run first, then the rules derived from
/// [`ValidationConfig`]: extension, MIME type, size, image dimensions.
#[derive(Clone, Default)]
pub struct Pipeline {
    custom: Vec<Arc<dyn FileFilter>>,
    builtin: Vec<Arc<dyn FileFilter>>,
}

impl Pipeline {
    /// A pipeline that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        let mut builtin: Vec<Arc<dyn FileFilter>> = Vec::new();
        if !config.allowed_extensions.is_empty() {
            builtin.push(Arc::new(ExtensionFilter::new(
                config.allowed_extensions.clone(),
            )));
        }
        if !config.accept_files.is_empty() {
            builtin.push(Arc::new(MimeFilter::new(config.accept_files.clone())));
        }
        if config.min_size().is_some() || config.size_limit().is_some() {
            builtin.push(Arc::new(SizeFilter::new(
                config.min_size(),
                config.size_limit(),
            )));
        }
        if let Some(bounds) = config.image_bounds() {
            builtin.push(Arc::new(DimensionFilter::new(
                bounds,
                config.strict_image_validation,
            )));
        }
        Self {
            custom: Vec::new(),
            builtin,
        }
    }

    /// Adds a filter that runs before the configured rules.
    pub fn with_filter(mut self, filter: impl FileFilter + 'static) -> Self {
        self.push_filter(Arc::new(filter));
        self
    }

    pub fn push_filter(&mut self, filter: Arc<dyn FileFilter>) {
        self.custom.push(filter);
    }

    pub fn len(&self) -> usize {
        self.custom.len() + self.builtin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every filter against `file`.
    ///
    /// Stops at the first synchronous rejection, unless a deferred check
    /// queued before it rejects too: filters earlier in the order win.
    /// Deferred checks are awaited together; the first one to reject decides
    /// the verdict.
    pub async fn validate(&self, file: &SourceFile) -> Verdict {
        let mut deferred = Vec::new();
        for filter in self.custom.iter().chain(&self.builtin) {
            match filter.check(file) {
                FilterOutcome::Accept => {}
                FilterOutcome::Reject(reason) => {
                    let reason = match settle(deferred).await {
                        Err(earlier) => earlier,
                        Ok(()) => reason,
                    };
                    debug!(file = %file.name, %reason, "file rejected");
                    return Err(Rejection(reason));
                }
                FilterOutcome::Deferred(check) => deferred.push(check),
            }
        }

        settle(deferred).await.map_err(|reason| {
            debug!(file = %file.name, %reason, "file rejected");
            Rejection(reason)
        })
    }
}

async fn settle(deferred: Vec<DeferredCheck>) -> Result<(), String> {
    if deferred.is_empty() {
        return Ok(());
    }
    try_join_all(deferred).await.map(|_| ())
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("custom", &self.custom.len())
            .field("builtin", &self.builtin.len())
            .finish()
    }
}
