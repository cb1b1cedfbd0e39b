//! Line-level validation of a header block before it is handed to `httparse`.
//!
//! `httparse` is lenient in places where leniency enables request smuggling: it accepts bare
//! `LF` line endings and says nothing about line length. The scan walks the complete lines
//! of a block once, enforces [`HeadLimits`], and reports where the block ends.

use crate::config::HeadLimits;
use crate::ensure;
use crate::protocol::ParseError;

/// Where a complete header block ends and how many fields it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockBounds {
    /// Length of the block including the terminating empty line.
    pub(crate) len: usize,
    pub(crate) fields: usize,
}

/// Whether the block opens with a start line (heads) or not (trailers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Head,
    Trailer,
}

/// Scans `src` for a complete header block.
///
/// Returns `Ok(None)` when more bytes are needed.
pub(crate) fn scan_block(src: &[u8], limits: &HeadLimits, kind: BlockKind) -> Result<Option<BlockBounds>, ParseError> {
    let mut pos = 0;
    let mut lines = 0usize;

    loop {
        let rest = &src[pos..];
        let Some(lf) = rest.iter().position(|b| *b == b'\n') else {
            // a trailing CR belongs to the line ending, not the line
            let partial = rest.strip_suffix(b"\r").unwrap_or(rest);
            ensure!(
                partial.len() <= limits.max_line_size,
                ParseError::head_too_large(format!("line exceed the limit {}", limits.max_line_size))
            );
            ensure!(
                src.len() <= limits.max_head_size,
                ParseError::head_too_large(format!("header block size {} exceed the limit {}", src.len(), limits.max_head_size))
            );
            return Ok(None);
        };

        ensure!(lf > 0 && rest[lf - 1] == b'\r', ParseError::malformed_head("line not terminated by CRLF"));
        let line = &rest[..lf - 1];
        ensure!(
            line.len() <= limits.max_line_size,
            ParseError::head_too_large(format!("line size {} exceed the limit {}", line.len(), limits.max_line_size))
        );

        pos += lf + 1;
        ensure!(
            pos <= limits.max_head_size,
            ParseError::head_too_large(format!("header block size {pos} exceed the limit {}", limits.max_head_size))
        );

        if line.is_empty() {
            let fields = match kind {
                BlockKind::Head => lines.saturating_sub(1),
                BlockKind::Trailer => lines,
            };
            return Ok(Some(BlockBounds { len: pos, fields }));
        }

        let is_field = kind == BlockKind::Trailer || lines > 0;
        if is_field {
            ensure!(!matches!(line[0], b' ' | b'\t'), ParseError::malformed_header("obsolete line folding"));
        }

        lines += 1;
        let fields = if kind == BlockKind::Head { lines - 1 } else { lines };
        ensure!(
            fields <= limits.max_headers,
            ParseError::head_too_large(format!("header number exceed the limit {}", limits.max_headers))
        );
    }
}
