//! Generation tokens for stale-response suppression
//!
//! Every asynchronous request a widget issues carries a token. A response is
//! applied only if its token is still the latest one issued. A younger request
//! always wins, whatever order the responses arrive in.

/// Token attached to one asynchronous request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationToken(u64);

impl GenerationToken {
    /// Raw counter value (for logging)
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GenerationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-instance monotonic counter
///
/// Each widget owns its own counter; there is no shared pool.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    latest: u64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token greater than every token issued before
    pub fn issue(&mut self) -> GenerationToken {
        self.latest += 1;
        GenerationToken(self.latest)
    }

    /// Advance without issuing, so every outstanding token goes stale
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    /// Whether `token` is the most recently issued one
    pub fn is_current(&self, token: GenerationToken) -> bool {
        token.0 == self.latest
    }
}
