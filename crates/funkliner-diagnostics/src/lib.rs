//! Diagnostics for the funkliner inliner.
//!
//! Parsing failures are errors. Everything the inliner declines to rewrite
//! (unresolved callees, loops it cannot unroll, unsupported shapes) is
//! reported as a hint or warning instead, since the source is then passed
//! through unchanged.
//!
//! # Example
//!
//! ```
//! use funkliner_diagnostics::{
//!     Diagnostic, DiagnosticCode, DiagnosticEmitter, SimpleEmitter, SourceCache, Span,
//! };
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_file("snippet.js", "window.alert('hi')".to_string());
//!
//! let diag = Diagnostic::new(DiagnosticCode::UnresolvedCallee, "no function at `window.alert`")
//!     .with_span(Span::new(file_id, 0, 12))
//!     .build();
//!
//! let mut out = Vec::new();
//! SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("snippet.js:1:1: hint:"));
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{diagnostic_to_json, DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use source_cache::{SourceCache, SourceFile};
pub use span::{FileId, Location, Span};
