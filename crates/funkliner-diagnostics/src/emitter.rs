//! Rendering of diagnostics for terminals and tools.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use std::io::Write;

pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diag in diagnostics.iter() {
            self.emit(diag, cache)?;
        }
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// Terminal output with optional ANSI colors and a source excerpt.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.colored {
            code
        } else {
            ""
        }
    }

    fn severity_color(&self, severity: Severity) -> &'static str {
        self.paint(match severity {
            Severity::Error => "\x1b[31m",
            Severity::Warning => "\x1b[33m",
            Severity::Hint => "\x1b[34m",
        })
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let color = self.severity_color(diagnostic.severity);
        let reset = self.paint("\x1b[0m");
        let bold = self.paint("\x1b[1m");
        let cyan = self.paint("\x1b[36m");

        // warning[A001]: message
        writeln!(
            self.writer,
            "{}{}{}[{}]{}: {}",
            bold,
            color,
            diagnostic.severity.as_str(),
            diagnostic.code.as_str(),
            reset,
            diagnostic.message
        )?;

        if let Some(loc) = cache.location(diagnostic.span) {
            writeln!(self.writer, "  {}-->{} {}", cyan, reset, loc)?;

            if let Some(file) = cache.get_file(diagnostic.span.file_id) {
                let (line_num, start_col) = file.line_column(diagnostic.span.start);
                if let Some(line_text) = file.line_text(line_num) {
                    let line_str = line_num.to_string();
                    let padding = " ".repeat(line_str.len());
                    let indent = (start_col - 1) as usize;
                    let room = line_text.len().saturating_sub(indent);
                    let underline = "^".repeat((diagnostic.span.len() as usize).min(room).max(1));

                    writeln!(self.writer, "{} {}|{}", padding, cyan, reset)?;
                    writeln!(self.writer, "{}{} |{} {}", cyan, line_str, reset, line_text)?;
                    writeln!(
                        self.writer,
                        "{} {}|{} {}{}{}{}",
                        padding,
                        cyan,
                        reset,
                        " ".repeat(indent),
                        color,
                        underline,
                        reset
                    )?;
                }
            }
        }

        if let Some(ref explanation) = diagnostic.explanation {
            writeln!(self.writer, "  {}= help:{} {}", cyan, reset, explanation)?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let errors = diagnostics.error_count();
        let warnings = diagnostics.warning_count();
        if errors == 0 && warnings == 0 {
            return Ok(());
        }

        let color = if errors > 0 {
            self.severity_color(Severity::Error)
        } else {
            self.severity_color(Severity::Warning)
        };
        let reset = self.paint("\x1b[0m");

        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(format!("{} error{}", errors, if errors == 1 { "" } else { "s" }));
        }
        if warnings > 0 {
            parts.push(format!(
                "{} warning{}",
                warnings,
                if warnings == 1 { "" } else { "s" }
            ));
        }
        writeln!(self.writer, "{}{} emitted{}", color, parts.join(" and "), reset)
    }
}

/// One JSON object per line, for editor and CI integration.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

/// JSON value for one diagnostic, shared by [`JsonEmitter`] and callers that
/// embed diagnostics in a larger document.
pub fn diagnostic_to_json(diagnostic: &Diagnostic, cache: &SourceCache) -> serde_json::Value {
    let loc = cache.location(diagnostic.span);
    serde_json::json!({
        "code": diagnostic.code.as_str(),
        "severity": diagnostic.severity.as_str(),
        "message": diagnostic.message,
        "location": loc.map(|l| serde_json::json!({
            "file": l.file,
            "line": l.line,
            "column": l.column,
        })),
        "span": if diagnostic.span.is_dummy() {
            serde_json::Value::Null
        } else {
            serde_json::json!({
                "start": diagnostic.span.start,
                "end": diagnostic.span.end,
            })
        },
        "help": diagnostic.explanation,
    })
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, &diagnostic_to_json(diagnostic, cache))?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "warnings": diagnostics.warning_count(),
            "hints": diagnostics.hint_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// `file:line:col: severity: message [code]`, no colors.
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        if let Some(loc) = cache.location(diagnostic.span) {
            write!(self.writer, "{}: ", loc)?;
        }
        writeln!(
            self.writer,
            "{}: {} [{}]",
            diagnostic.severity.as_str(),
            diagnostic.message,
            diagnostic.code.as_str()
        )
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} error(s), {} warning(s)",
            diagnostics.error_count(),
            diagnostics.warning_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiagnosticCode, Span};

    fn sample() -> (SourceCache, Diagnostics) {
        let mut cache = SourceCache::new();
        let id = cache.add_file("snippet", "var x = f(a, b++);".to_string());
        let mut diags = Diagnostics::new();
        diags.push(
            Diagnostic::new(DiagnosticCode::ExtraArguments, "f takes 1 argument, 2 given")
                .with_span(Span::new(id, 8, 17))
                .with_help("the dropped arguments are not evaluated")
                .build(),
        );
        (cache, diags)
    }

    #[test]
    fn test_simple_emitter() {
        let (cache, diags) = sample();
        let mut out = Vec::new();
        let mut emitter = SimpleEmitter::new(&mut out);
        emitter.emit_all(&diags, &cache).unwrap();
        emitter.emit_summary(&diags).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "snippet:1:9: warning: f takes 1 argument, 2 given [A001]\n0 error(s), 1 warning(s)\n"
        );
    }

    #[test]
    fn test_terminal_emitter_without_color() {
        let (cache, diags) = sample();
        let mut out = Vec::new();
        let mut emitter = TerminalEmitter::new(&mut out, false);
        emitter.emit_all(&diags, &cache).unwrap();
        emitter.emit_summary(&diags).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("warning[A001]: f takes 1 argument, 2 given\n"));
        assert!(text.contains("  --> snippet:1:9\n"));
        assert!(text.contains("1 | var x = f(a, b++);\n"));
        assert!(text.contains("  |         ^^^^^^^^^\n"));
        assert!(text.contains("= help: the dropped arguments are not evaluated"));
        assert!(text.ends_with("1 warning emitted\n"));
    }

    #[test]
    fn test_json_emitter() {
        let (cache, diags) = sample();
        let mut out = Vec::new();
        JsonEmitter::new(&mut out).emit_all(&diags, &cache).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(String::from_utf8(out).unwrap().trim()).unwrap();
        assert_eq!(value["code"], "A001");
        assert_eq!(value["location"]["column"], 9);
        assert_eq!(value["span"]["end"], 17);
    }
}
