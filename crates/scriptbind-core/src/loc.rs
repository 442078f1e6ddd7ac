//! Source locations for diagnostics.
//!
//! Annotation tags are whole-line constructs, so a location is just the file
//! path plus a zero-based line index. The `Display` form renders the line
//! one-based, matching what editors show.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

/// Where a tag (or an error) came from.
///
/// The path is shared via `Arc` because every record scanned from a file
/// carries its location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    /// Path of the scanned file.
    pub file: Arc<PathBuf>,
    /// Zero-based line index.
    pub line: u32,
}

impl SourceLoc {
    pub fn new(file: Arc<PathBuf>, line: u32) -> Self {
        Self { file, line }
    }
}

impl Display for SourceLoc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file.display(), self.line + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_based() {
        let loc = SourceLoc::new(Arc::new(PathBuf::from("Engine.h")), 0);
        assert_eq!(loc.to_string(), "Engine.h (1)");
    }
}
