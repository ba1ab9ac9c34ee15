/// Byte-level progress of one transfer, reported as a whole percentage.
///
/// The reported value is rounded down, so 100 means every byte was sent. It
/// never goes backwards, even if the caller reports a smaller byte count
/// (e.g. a chunk resent after a retry).
#[derive(Debug, Clone)]
pub struct ProgressMeter {
    total: u64,
    sent: u64,
    last: u8,
}

impl ProgressMeter {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            sent: 0,
            last: 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Records `bytes` more bytes and returns the updated percentage.
    pub fn advance(&mut self, bytes: u64) -> u8 {
        self.set_sent(self.sent.saturating_add(bytes))
    }

    /// Sets the absolute number of bytes sent and returns the percentage.
    pub fn set_sent(&mut self, sent: u64) -> u8 {
        self.sent = sent.min(self.total);
        let pct = if self.sent == self.total {
            100
        } else {
            (self.sent * 100 / self.total) as u8
        };
        self.last = self.last.max(pct);
        self.last
    }

    /// Last reported percentage (0..=100).
    pub fn percentage(&self) -> u8 {
        self.last
    }

    pub fn is_done(&self) -> bool {
        self.last == 100
    }
}
