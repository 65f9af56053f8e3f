//! Entry points: parse both inputs, crawl the library, rewrite the snippet.
//!
//! The library is parsed once per call. Every pass builds a fresh
//! [`Environment`] from it and rewrites the previous pass's output, so a
//! nested `this.method()` left behind by one pass can be inlined by the next.

use std::fmt;
use std::ops::AddAssign;

use funkliner_diagnostics::{Diagnostic, Diagnostics, Severity, SourceCache};
use funkliner_parser::{parse_script_with_cache, ParseError};
use serde::Serialize;

use crate::env::Environment;
use crate::library::crawl_library;
use crate::snippet::rewrite_snippet;

/// Loops predicted to run this many times or more are left alone.
pub const DEFAULT_MAX_UNROLL: usize = 60;

/// Inlined call sites and generated switches allowed per pass.
pub const DEFAULT_MAX_EXPANSIONS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineOptions {
    pub max_unroll: usize,
    pub max_expansions: usize,
    /// Upper bound on passes; the driver stops earlier at a fixed point
    pub max_passes: usize,
}

impl Default for InlineOptions {
    fn default() -> Self {
        Self {
            max_unroll: DEFAULT_MAX_UNROLL,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            max_passes: 1,
        }
    }
}

/// What the rewrite did, summed over passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InlineStats {
    pub calls_inlined: usize,
    pub switches_generated: usize,
    pub loops_unrolled: usize,
}

impl InlineStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for InlineStats {
    fn add_assign(&mut self, other: Self) {
        self.calls_inlined += other.calls_inlined;
        self.switches_generated += other.switches_generated;
        self.loops_unrolled += other.loops_unrolled;
    }
}

/// Which input failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    Library,
    Snippet,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRole::Library => write!(f, "library"),
            SourceRole::Snippet => write!(f, "snippet"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InlineError {
    #[error("{role} does not parse: {source}")]
    Syntax {
        role: SourceRole,
        #[source]
        source: ParseError,
    },
}

impl InlineError {
    pub fn role(&self) -> SourceRole {
        match self {
            InlineError::Syntax { role, .. } => *role,
        }
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            InlineError::Syntax { source, .. } => source.diagnostic(),
        }
    }
}

/// A named input.
#[derive(Debug, Clone, Copy)]
pub struct SourceText<'t> {
    pub name: &'t str,
    pub text: &'t str,
}

impl<'t> SourceText<'t> {
    pub fn new(name: &'t str, text: &'t str) -> Self {
        Self { name, text }
    }
}

#[derive(Debug, Clone)]
pub struct InlineOutput {
    pub code: String,
    /// Passes actually run
    pub passes: usize,
    pub stats: InlineStats,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Default)]
pub struct Inliner {
    options: InlineOptions,
}

impl Inliner {
    pub fn new(options: InlineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &InlineOptions {
        &self.options
    }

    /// Inline `snippet` against `library`, running up to `max_passes` passes.
    pub fn inline(&self, snippet: &str, library: &str) -> Result<InlineOutput, InlineError> {
        let mut cache = SourceCache::new();
        self.inline_with_cache(
            SourceText::new("snippet.js", snippet),
            SourceText::new("library.js", library),
            &mut cache,
        )
    }

    /// Like [`Inliner::inline`], registering every parsed text in `cache` so
    /// diagnostic spans can be rendered afterwards.
    pub fn inline_with_cache(
        &self,
        snippet: SourceText<'_>,
        library: SourceText<'_>,
        cache: &mut SourceCache,
    ) -> Result<InlineOutput, InlineError> {
        let library = parse_script_with_cache(library.text, library.name, cache).map_err(|source| {
            InlineError::Syntax {
                role: SourceRole::Library,
                source,
            }
        })?;

        let mut diagnostics = library.diagnostics.clone();
        let mut code = snippet.text.to_string();
        let mut stats = InlineStats::default();
        let mut passes = 0;
        let max_passes = self.options.max_passes.max(1);

        while passes < max_passes {
            let mut parsed = parse_script_with_cache(&code, snippet.name, cache).map_err(|source| {
                InlineError::Syntax {
                    role: SourceRole::Snippet,
                    source,
                }
            })?;
            let mut found = std::mem::take(&mut parsed.diagnostics);

            let mut env = Environment::new();
            if passes == 0 {
                crawl_library(&mut env, &library, &mut found);
            } else {
                crawl_library(&mut env, &library, &mut Diagnostics::new());
            }
            let (next, pass_stats) = rewrite_snippet(&mut env, &library, &parsed, &self.options, &mut found);

            passes += 1;
            stats += pass_stats;
            log::info!(
                "pass {}: {} call(s) inlined, {} switch(es), {} loop(s) unrolled",
                passes,
                pass_stats.calls_inlined,
                pass_stats.switches_generated,
                pass_stats.loops_unrolled
            );

            let fixed_point = next == code;
            code = next;
            if fixed_point || passes == max_passes {
                diagnostics.extend(found);
                break;
            }
            // Hints from earlier passes describe text that no longer exists
            found.retain_at_least(Severity::Warning);
            diagnostics.extend(found);
        }

        Ok(InlineOutput {
            code,
            passes,
            stats,
            diagnostics,
        })
    }
}

/// Run one pass with default options and return only the text.
pub fn inline_single(snippet: &str, library: &str) -> Result<String, InlineError> {
    Inliner::default().inline(snippet, library).map(|output| output.code)
}
