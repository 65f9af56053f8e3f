//! JavaScript parser wrapper using SWC
//!
//! Parses library and snippet sources as classic scripts and keeps the
//! original text next to the AST, so the inliner can copy untouched source
//! byte for byte. All spans handed out by this crate are converted to
//! zero-based byte offsets into that text.

use std::ops::Range;

use funkliner_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, FileId, SourceCache, Span};
use swc_common::{input::StringInput, sync::Lrc, BytePos, FileName, SourceMap};
use swc_ecma_ast::Script;
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, Syntax};

// Re-export AST types for consumers that need to inspect the AST
pub use swc_ecma_ast;

// Re-export Spanned trait for getting spans from AST nodes
pub use swc_common::Spanned;

/// Failure to turn source text into a script.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{file}: syntax error at offset {offset}: {message}")]
    Syntax {
        file: String,
        message: String,
        offset: usize,
        diagnostic: Diagnostic,
    },
}

impl ParseError {
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            ParseError::Syntax { diagnostic, .. } => diagnostic,
        }
    }
}

/// A parsed script together with the text it was parsed from.
#[derive(Debug)]
pub struct ParsedScript {
    pub script: Script,
    pub source: String,
    pub file_id: FileId,
    /// Recoverable parser errors, reported as warnings
    pub diagnostics: Diagnostics,
    base: u32,
}

impl ParsedScript {
    /// Byte range of an SWC span within [`ParsedScript::source`].
    pub fn range(&self, span: swc_common::Span) -> Range<usize> {
        self.offset(span.lo)..self.offset(span.hi)
    }

    pub fn offset(&self, pos: BytePos) -> usize {
        pos.0.saturating_sub(self.base) as usize
    }

    /// Source text covered by an SWC span.
    pub fn text(&self, span: swc_common::Span) -> &str {
        self.source.get(self.range(span)).unwrap_or_default()
    }

    /// Diagnostic span for an SWC span.
    pub fn span(&self, span: swc_common::Span) -> Span {
        Span::from_range(self.file_id, self.range(span))
    }
}

/// Parse a JavaScript script and register it in `cache` under `filename`.
pub fn parse_script_with_cache(
    source: &str,
    filename: &str,
    cache: &mut SourceCache,
) -> Result<ParsedScript, ParseError> {
    let file_id = cache.add_file(filename, source.to_string());

    // SWC keeps its own map; positions in it start at the file's start_pos
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );
    let base = source_file.start_pos.0;

    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        swc_ecma_ast::EsVersion::Es2022,
        StringInput::from(&*source_file),
        None,
    );

    let mut parser = Parser::new_from(lexer);

    let script = parser.parse_script().map_err(|e| {
        let start = e.span().lo.0.saturating_sub(base);
        let end = e.span().hi.0.saturating_sub(base);
        let message = e.kind().msg().to_string();
        let diagnostic = Diagnostic::error(DiagnosticCode::ParseError, message.clone())
            .with_span(Span::new(file_id, start, end))
            .build();
        ParseError::Syntax {
            file: filename.to_string(),
            message,
            offset: start as usize,
            diagnostic,
        }
    })?;

    let mut diagnostics = Diagnostics::new();
    for error in parser.take_errors() {
        let start = error.span().lo.0.saturating_sub(base);
        let end = error.span().hi.0.saturating_sub(base);
        log::warn!("{}: recovered from: {}", filename, error.kind().msg());
        diagnostics.push(
            Diagnostic::warning(DiagnosticCode::ParseError, error.kind().msg().to_string())
                .with_span(Span::new(file_id, start, end))
                .build(),
        );
    }

    Ok(ParsedScript {
        script,
        source: source.to_string(),
        file_id,
        diagnostics,
        base,
    })
}

/// Parse without keeping the source registered anywhere.
pub fn parse_script(source: &str, filename: &str) -> Result<ParsedScript, ParseError> {
    let mut cache = SourceCache::new();
    parse_script_with_cache(source, filename, &mut cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_ecma_ast::{Decl, Stmt};

    #[test]
    fn test_parse_library_function() {
        let source = r#"
            function square(one) {
                var two = one;
                return one * two;
            }
        "#;

        let parsed = parse_script(source, "library.js").unwrap();
        assert_eq!(parsed.script.body.len(), 1);
        assert!(matches!(parsed.script.body[0], Stmt::Decl(Decl::Fn(_))));
    }

    #[test]
    fn test_ranges_are_zero_based() {
        let source = "var x = add(1,2);";
        let parsed = parse_script(source, "snippet.js").unwrap();

        let stmt = &parsed.script.body[0];
        assert_eq!(parsed.range(stmt.span()), 0..source.len());
        assert_eq!(parsed.text(stmt.span()), source);
    }

    #[test]
    fn test_ranges_with_leading_text() {
        let source = "  // lead\nlog(i) ;\nalert('hi')";
        let parsed = parse_script(source, "snippet.js").unwrap();

        assert_eq!(parsed.text(parsed.script.body[0].span()), "log(i) ;");
        assert_eq!(parsed.text(parsed.script.body[1].span()), "alert('hi')");
    }

    #[test]
    fn test_parse_with_cache() {
        let mut cache = SourceCache::new();
        let parsed = parse_script_with_cache("var x = 1;", "snippet.js", &mut cache).unwrap();

        assert!(parsed.diagnostics.is_empty());
        assert!(cache.get_file(parsed.file_id).is_some());
    }

    #[test]
    fn test_parse_error() {
        let mut cache = SourceCache::new();
        let err = parse_script_with_cache("var x = ;", "snippet.js", &mut cache).unwrap_err();

        let ParseError::Syntax { file, offset, .. } = &err;
        assert_eq!(file, "snippet.js");
        assert_eq!(*offset, 8);
        assert_eq!(err.diagnostic().code, DiagnosticCode::ParseError);
        assert!(cache.location(err.diagnostic().span).is_some());
    }
}
