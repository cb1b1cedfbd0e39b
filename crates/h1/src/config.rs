//! Process-wide limits for the protocol engine.
//!
//! A [`H1Config`] is built once at startup and copied into every connection. Nothing in the
//! engine mutates it afterwards.

/// Limits and thresholds applied to every connection.
///
/// # Example
///
/// ```
/// use micro_h1::config::H1Config;
///
/// let config = H1Config::default().with_max_headers(32).with_watermarks(128 * 1024, 32 * 1024);
/// assert_eq!(config.max_headers(), 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct H1Config {
    max_head_size: usize,
    max_line_size: usize,
    max_headers: usize,
    max_body_size: u64,
    high_watermark: usize,
    low_watermark: usize,
    error_response: bool,
}

/// The subset of [`H1Config`] that bounds a header block, shared by heads and trailers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadLimits {
    pub max_head_size: usize,
    pub max_line_size: usize,
    pub max_headers: usize,
}

impl Default for H1Config {
    fn default() -> Self {
        Self {
            max_head_size: 16 * 1024,
            max_line_size: 8 * 1024,
            max_headers: 64,
            max_body_size: 10 * 1024 * 1024,
            high_watermark: 64 * 1024,
            low_watermark: 16 * 1024,
            error_response: true,
        }
    }
}

impl H1Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum bytes of a start line plus header block.
    ///
    /// This also caps the inbound buffer while a head is still incomplete.
    pub fn max_head_size(&self) -> usize {
        self.max_head_size
    }

    /// Maximum bytes of a single start, header or trailer line.
    pub fn max_line_size(&self) -> usize {
        self.max_line_size
    }

    /// Maximum number of fields in a header or trailer block.
    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    /// Ceiling on the decoded body size of a single message.
    pub fn max_body_size(&self) -> u64 {
        self.max_body_size
    }

    pub fn high_watermark(&self) -> usize {
        self.high_watermark
    }

    pub fn low_watermark(&self) -> usize {
        self.low_watermark
    }

    /// Whether a server answers a fatal parse error with an error response before closing.
    pub fn error_response(&self) -> bool {
        self.error_response
    }

    pub fn head_limits(&self) -> HeadLimits {
        HeadLimits { max_head_size: self.max_head_size, max_line_size: self.max_line_size, max_headers: self.max_headers }
    }

    #[must_use]
    pub fn with_max_head_size(mut self, max_head_size: usize) -> Self {
        self.max_head_size = max_head_size;
        self
    }

    #[must_use]
    pub fn with_max_line_size(mut self, max_line_size: usize) -> Self {
        self.max_line_size = max_line_size;
        self
    }

    #[must_use]
    pub fn with_max_headers(mut self, max_headers: usize) -> Self {
        self.max_headers = max_headers;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, max_body_size: u64) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Sets the backpressure thresholds. `low` is clamped so it never exceeds `high`.
    #[must_use]
    pub fn with_watermarks(mut self, high: usize, low: usize) -> Self {
        self.high_watermark = high;
        self.low_watermark = low.min(high);
        self
    }

    #[must_use]
    pub fn with_error_response(mut self, error_response: bool) -> Self {
        self.error_response = error_response;
        self
    }
}
