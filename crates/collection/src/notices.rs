use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::collaborators::Notifier;

/// Default number of messages kept before the oldest are dropped.
pub const DEFAULT_NOTICE_CAPACITY: usize = 64;

/// Error messages collected while a batch of uploads runs.
///
/// Each container owns one buffer. Messages are shown in a single
/// [`Notifier::show_errors`] call when the buffer is flushed, so that a
/// multi-file drop interrupts the user once. When full, the oldest message
/// is evicted on each push.
#[derive(Debug, Clone)]
pub struct NoticeBuffer {
    inner: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl Default for NoticeBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_CAPACITY)
    }
}

impl NoticeBuffer {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "NoticeBuffer capacity must be > 0");
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Adds messages to the buffer.
    pub fn collect<I, S>(&self, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut buf = self.inner.lock().unwrap();
        for message in messages {
            if buf.len() == self.capacity {
                buf.pop_front();
            }
            buf.push_back(message.into());
        }
    }

    /// Shows every buffered message through `notifier` and empties the
    /// buffer. Returns `false` when there was nothing to show.
    pub fn flush(&self, notifier: &dyn Notifier) -> bool {
        let messages: Vec<String> = self.inner.lock().unwrap().drain(..).collect();
        if messages.is_empty() {
            return false;
        }
        notifier.show_errors(&messages);
        true
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    pub fn messages(&self) -> Vec<String> {
        self.inner.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        shown: Mutex<Vec<Vec<String>>>,
    }

    impl Notifier for Recorder {
        fn confirm(&self, _message: &str) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
            Box::pin(async { true })
        }

        fn show_errors(&self, errors: &[String]) {
            self.shown.lock().unwrap().push(errors.to_vec());
        }

        fn show_busy(&self) {}

        fn hide_busy(&self) {}
    }

    #[test]
    fn flush_shows_everything_once() {
        let buffer = NoticeBuffer::default();
        buffer.collect(["a is too wide"]);
        buffer.collect(vec!["b failed".to_string(), "c failed".to_string()]);
        assert_eq!(buffer.len(), 3);

        let notifier = Recorder::default();
        assert!(buffer.flush(&notifier));
        assert!(!buffer.flush(&notifier));

        let shown = notifier.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0], vec!["a is too wide", "b failed", "c failed"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn clones_share_messages() {
        let buffer = NoticeBuffer::default();
        let handle = buffer.clone();
        handle.collect(["x"]);
        assert_eq!(buffer.messages(), vec!["x"]);
        buffer.clear();
        assert!(handle.is_empty());
    }

    #[test]
    fn oldest_messages_are_evicted() {
        let buffer = NoticeBuffer::new(2);
        buffer.collect(["1", "2", "3"]);
        assert_eq!(buffer.messages(), vec!["2", "3"]);
        assert_eq!(buffer.capacity(), 2);
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn zero_capacity_panics() {
        NoticeBuffer::new(0);
    }
}
