//! Annotation scanner.
//!
//! Walks engine and script source files looking for `///@` tag comments and
//! `///#` doc comments, captures each tag's surrounding context per its
//! [`ContextRule`](scriptbind_core::ContextRule), and produces the
//! [`TagSet`] consumed by the declaration builders. Also home to the
//! whitespace-and-symbol [`tokenize`](tokenizer::tokenize) splitter the
//! builders share.

pub mod scanner;
pub mod tokenizer;

pub use scanner::{TagSet, collect_meta_files, scan_file, scan_source};
pub use tokenizer::tokenize;
