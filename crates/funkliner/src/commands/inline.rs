//! Inline command - rewrite a snippet against a library

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use funkliner_diagnostics::{
    diagnostic_to_json, DiagnosticEmitter, Diagnostics, Severity, SourceCache, TerminalEmitter,
};
use funkliner_transform::{InlineOutput, Inliner, SourceText};
use similar::{ChangeTag, TextDiff};

use crate::config::Config;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct InlineArgs {
    /// JavaScript file providing the functions to inline
    pub library: PathBuf,

    /// JavaScript file whose call sites are rewritten
    pub snippet: PathBuf,

    /// Write the result to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum number of passes (stops early once nothing changes)
    #[arg(long)]
    pub passes: Option<usize>,

    /// Print a unified diff of the snippet against the result
    #[arg(long)]
    pub diff: bool,

    /// Show all diagnostics including hints
    #[arg(long)]
    pub all: bool,
}

pub fn run(
    args: InlineArgs,
    config: &Config,
    format: OutputFormat,
    use_color: bool,
    verbose: u8,
) -> Result<()> {
    let library = fs::read_to_string(&args.library)
        .with_context(|| format!("failed to read library {}", args.library.display()))?;
    let snippet = fs::read_to_string(&args.snippet)
        .with_context(|| format!("failed to read snippet {}", args.snippet.display()))?;
    let library_name = args.library.to_string_lossy().to_string();
    let snippet_name = args.snippet.to_string_lossy().to_string();

    let inliner = Inliner::new(config.inline_options(args.passes));
    log::debug!("inlining with {:?}", inliner.options());

    let mut cache = SourceCache::new();
    let result = inliner.inline_with_cache(
        SourceText::new(&snippet_name, &snippet),
        SourceText::new(&library_name, &library),
        &mut cache,
    );
    let mut output = match result {
        Ok(output) => output,
        Err(err) => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.push(err.diagnostic().clone());
            report(&diagnostics, &cache, format, use_color)?;
            return Err(anyhow!("{} failed to parse", err.role()));
        }
    };

    if !(args.all || config.output.show_hints) {
        output.diagnostics.retain_at_least(Severity::Warning);
    }

    if let Some(path) = &args.output {
        fs::write(path, &output.code).with_context(|| format!("failed to write {}", path.display()))?;
    }

    match format {
        OutputFormat::Text => {
            if args.diff {
                print!(
                    "{}",
                    render_diff(&snippet, &output.code, &snippet_name, "inlined", use_color)
                );
            } else if args.output.is_none() {
                println!("{}", output.code);
            }

            report(&output.diagnostics, &cache, format, use_color)?;

            if verbose > 0 || args.output.is_some() {
                let status = status_line(&output);
                if use_color {
                    eprintln!("{}", console::style(status).green().bold());
                } else {
                    eprintln!("{}", status);
                }
            }
        }
        OutputFormat::Json => {
            let mut result = serde_json::json!({
                "output": output.code,
                "passes": output.passes,
                "stats": output.stats,
                "diagnostics": output
                    .diagnostics
                    .iter()
                    .map(|d| diagnostic_to_json(d, &cache))
                    .collect::<Vec<_>>(),
            });
            if args.diff {
                result["diff"] = serde_json::Value::String(render_diff(
                    &snippet,
                    &output.code,
                    &snippet_name,
                    "inlined",
                    false,
                ));
            }
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    Ok(())
}

/// Print diagnostics to stderr. JSON output embeds them in the result
/// instead, except for parse errors, which have no result to go in.
fn report(
    diagnostics: &Diagnostics,
    cache: &SourceCache,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    match format {
        OutputFormat::Text => {
            let mut emitter = TerminalEmitter::new(std::io::stderr().lock(), use_color);
            emitter.emit_all(diagnostics, cache)?;
            emitter.emit_summary(diagnostics)?;
        }
        OutputFormat::Json => {
            if diagnostics.has_errors() {
                let errors: Vec<_> = diagnostics.iter().map(|d| diagnostic_to_json(d, cache)).collect();
                println!("{}", serde_json::json!({ "success": false, "diagnostics": errors }));
            }
        }
    }
    Ok(())
}

fn status_line(output: &InlineOutput) -> String {
    format!(
        "Inlined {} call(s), generated {} switch(es), unrolled {} loop(s) in {} pass(es)",
        output.stats.calls_inlined,
        output.stats.switches_generated,
        output.stats.loops_unrolled,
        output.passes
    )
}

/// Unified diff of `old` against `new`, optionally colored by line.
fn render_diff(old: &str, new: &str, old_name: &str, new_name: &str, use_color: bool) -> String {
    let diff = TextDiff::from_lines(old, new);
    if !use_color {
        return diff
            .unified_diff()
            .context_radius(3)
            .header(old_name, new_name)
            .to_string();
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n", console::style(format!("--- {}", old_name)).bold()));
    out.push_str(&format!("{}\n", console::style(format!("+++ {}", new_name)).bold()));
    for change in diff.iter_all_changes() {
        let line = change.to_string_lossy();
        let line = line.trim_end_matches('\n');
        let rendered = match change.tag() {
            ChangeTag::Delete => console::style(format!("-{}", line)).red().to_string(),
            ChangeTag::Insert => console::style(format!("+{}", line)).green().to_string(),
            ChangeTag::Equal => format!(" {}", line),
        };
        out.push_str(&rendered);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use funkliner_transform::InlineStats;

    #[test]
    fn test_plain_diff() {
        let diff = render_diff("var x = add(1,2);\n", "var x = (1 + 2);\n", "snippet.js", "inlined", false);
        assert!(diff.starts_with("--- snippet.js\n+++ inlined\n"));
        assert!(diff.contains("-var x = add(1,2);\n"));
        assert!(diff.contains("+var x = (1 + 2);\n"));
    }

    #[test]
    fn test_identical_diff_is_empty() {
        assert_eq!(render_diff("var x = 1;\n", "var x = 1;\n", "a", "b", false), "");
    }

    #[test]
    fn test_status_line() {
        let output = InlineOutput {
            code: String::new(),
            passes: 2,
            stats: InlineStats {
                calls_inlined: 3,
                switches_generated: 1,
                loops_unrolled: 0,
            },
            diagnostics: Diagnostics::new(),
        };
        assert_eq!(
            status_line(&output),
            "Inlined 3 call(s), generated 1 switch(es), unrolled 0 loop(s) in 2 pass(es)"
        );
    }

    #[test]
    fn test_run_writes_output_file() {
        let dir = std::env::temp_dir().join(format!("funkliner-inline-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let library = dir.join("lib.js");
        let snippet = dir.join("snippet.js");
        let result = dir.join("out.js");
        fs::write(&library, "function add(one, two) { return one + two; }").unwrap();
        fs::write(&snippet, "var x = add(1,2);").unwrap();

        let args = InlineArgs {
            library,
            snippet,
            output: Some(result.clone()),
            passes: None,
            diff: false,
            all: false,
        };
        run(args, &Config::default(), OutputFormat::Json, false, 0).unwrap();
        assert_eq!(fs::read_to_string(&result).unwrap(), "var x = (1 + 2);");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_reports_parse_failure() {
        let dir = std::env::temp_dir().join(format!("funkliner-parse-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let library = dir.join("lib.js");
        let snippet = dir.join("snippet.js");
        fs::write(&library, "function (").unwrap();
        fs::write(&snippet, "f();").unwrap();

        let args = InlineArgs {
            library,
            snippet,
            output: None,
            passes: None,
            diff: false,
            all: false,
        };
        let err = run(args, &Config::default(), OutputFormat::Json, false, 0).unwrap_err();
        assert_eq!(err.to_string(), "library failed to parse");

        fs::remove_dir_all(&dir).unwrap();
    }
}
