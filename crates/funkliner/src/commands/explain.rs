//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;
use funkliner_diagnostics::DiagnosticCode;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., R001, L001)
    pub code: String,
}

struct CodeExplanation {
    code: DiagnosticCode,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const CODE_EXPLANATIONS: &[CodeExplanation] = &[
    CodeExplanation {
        code: DiagnosticCode::ParseError,
        example: Some("var x = ;  // Missing value"),
        suggestion: Some("Fix the syntax error in the file named by the diagnostic and run again."),
        related: &[],
    },
    CodeExplanation {
        code: DiagnosticCode::UnsupportedPath,
        example: Some("handlers[getName()](event);  // call result used as a key"),
        suggestion: Some("Store the key in a variable first: var name = getName(); handlers[name](event);"),
        related: &["R001"],
    },
    CodeExplanation {
        code: DiagnosticCode::UnsupportedStatement,
        example: Some("function log(m) { function inner() {} inner(m); }"),
        suggestion: Some("Move nested declarations out of the function, or check the inlined text by hand."),
        related: &[],
    },
    CodeExplanation {
        code: DiagnosticCode::UnresolvedCallee,
        example: Some("window.alert('Test');  // alert is not defined by the library"),
        suggestion: Some(r#"Nothing to do if the call is meant to stay. Otherwise define the function in
the library under the same path, e.g. window.alert = function (m) { ... }"#),
        related: &["U001"],
    },
    CodeExplanation {
        code: DiagnosticCode::UnresolvedArgument,
        example: Some("log(format(message));  // argument is a call"),
        suggestion: Some("Pass a variable, a literal or a plain member path instead."),
        related: &["R001"],
    },
    CodeExplanation {
        code: DiagnosticCode::ExtraArguments,
        example: Some("function twoargs(one, two) { ... }\ntwoargs(a, b, c++);  // c++ is dropped"),
        suggestion: Some("Remove the extra arguments, or declare them as parameters."),
        related: &[],
    },
    CodeExplanation {
        code: DiagnosticCode::UnrollLimit,
        example: Some("for (var i = 0; i < 1000; i++) log(i);"),
        suggestion: Some("Raise `max_unroll` in funkliner.toml if the copies are really wanted."),
        related: &["L002"],
    },
    CodeExplanation {
        code: DiagnosticCode::ExpansionLimit,
        example: Some("function again(n) { again(n); }  // expands forever"),
        suggestion: Some(r#"Check the library for recursive functions. Raise `max_expansions` in
funkliner.toml if the snippet simply has many calls."#),
        related: &["L001"],
    },
    CodeExplanation {
        code: DiagnosticCode::InternalError,
        example: None,
        suggestion: Some("Please report the library and snippet that triggered it."),
        related: &[],
    },
];

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let code = args.code.to_uppercase();

    let explanation = DiagnosticCode::from_code(&code)
        .and_then(|code| CODE_EXPLANATIONS.iter().find(|e| e.code == code))
        .ok_or_else(|| anyhow!("Unknown diagnostic code: {}", code))?;
    let title = explanation.code.title();
    let description = explanation.code.description();

    match format {
        OutputFormat::Text => {
            if use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(&code).bold().cyan(),
                    console::style(title).bold(),
                    "=".repeat(code.len() + title.len() + 2)
                );
            } else {
                println!("\n{}: {}\n{}", code, title, "=".repeat(code.len() + title.len() + 2));
            }

            println!(
                "\n{}\n\nDefault severity: {}\n",
                description,
                explanation.code.default_severity()
            );

            if let Some(example) = explanation.example {
                if use_color {
                    println!("{}:", console::style("Example").bold());
                } else {
                    println!("Example:");
                }
                for line in example.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if let Some(suggestion) = explanation.suggestion {
                if use_color {
                    println!("{}:", console::style("Suggestion").bold().green());
                } else {
                    println!("Suggestion:");
                }
                for line in suggestion.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if !explanation.related.is_empty() {
                if use_color {
                    println!(
                        "{}: {}",
                        console::style("Related").dim(),
                        explanation.related.join(", ")
                    );
                } else {
                    println!("Related: {}", explanation.related.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": explanation.code.as_str(),
                "title": title,
                "severity": explanation.code.default_severity().as_str(),
                "description": description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_is_explained() {
        for code in DiagnosticCode::ALL {
            assert!(
                CODE_EXPLANATIONS.iter().any(|e| e.code == *code),
                "{} has no explanation",
                code
            );
        }
    }

    #[test]
    fn test_related_codes_exist() {
        for explanation in CODE_EXPLANATIONS {
            for related in explanation.related {
                assert!(DiagnosticCode::from_code(related).is_some(), "{}", related);
            }
        }
    }

    #[test]
    fn test_unknown_code() {
        let err = run(ExplainArgs { code: "Z999".to_string() }, OutputFormat::Text, false).unwrap_err();
        assert_eq!(err.to_string(), "Unknown diagnostic code: Z999");
    }
}
