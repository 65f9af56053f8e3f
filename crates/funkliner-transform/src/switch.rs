//! Dispatch through computed members, rendered as a `switch`.

use funkliner_parser::swc_ecma_ast::*;

use crate::rewrite::RewrittenBody;

/// How the receiver of a dynamic call is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    /// `obj[key](...)`: the object itself
    Direct,
    /// `obj[key].call(receiver, ...)`
    Call,
    /// `obj[key].apply(receiver, [...])`
    Apply,
}

/// A call through `obj[key]`.
#[derive(Debug, Clone, Copy)]
pub struct DynamicCall<'e> {
    pub object: &'e Expr,
    pub key: &'e Expr,
    pub via: Via,
}

impl<'e> DynamicCall<'e> {
    /// Recognise a computed-member callee, possibly behind `.call`/`.apply`.
    pub fn from_callee(callee: &'e Expr) -> Option<Self> {
        let Expr::Member(member) = callee else {
            return None;
        };
        match &member.prop {
            MemberProp::Computed(computed) => Some(Self {
                object: &member.obj,
                key: &computed.expr,
                via: Via::Direct,
            }),
            MemberProp::Ident(name) => {
                let via = match &*name.sym {
                    "call" => Via::Call,
                    "apply" => Via::Apply,
                    _ => return None,
                };
                let Expr::Member(inner) = &*member.obj else {
                    return None;
                };
                let MemberProp::Computed(computed) = &inner.prop else {
                    return None;
                };
                Some(Self {
                    object: &inner.obj,
                    key: &computed.expr,
                    via,
                })
            }
            MemberProp::PrivateName(_) => None,
        }
    }
}

/// One `case` of the generated switch.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub member: String,
    pub body: RewrittenBody,
}

/// Render the switch. `temp`, when given, also receives the result of the
/// dynamic fallback in the `default` branch.
pub fn render_switch(key: &str, cases: &[SwitchCase], fallback: &str, temp: Option<&str>) -> String {
    let mut out = format!("switch ({}) {{\n", key);
    for case in cases {
        out.push_str(&format!("\tcase \"{}\":\n", escape(&case.member)));
        if is_integer_key(&case.member) {
            out.push_str(&format!("\tcase {}:\n", case.member));
        }
        out.push_str(&case.body.text);
        if !case.body.text.ends_with('\n') {
            out.push_str(";\n");
        }
        out.push_str("\tbreak;\n");
    }
    out.push_str("\tdefault:\n\t");
    if let Some(temp) = temp {
        out.push_str(temp);
        out.push_str(" = ");
    }
    out.push_str(fallback);
    out.push_str(";\n}");
    out
}

fn is_integer_key(member: &str) -> bool {
    member
        .parse::<i64>()
        .map(|n| n.to_string() == member)
        .unwrap_or(false)
}

fn escape(member: &str) -> String {
    member.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use funkliner_parser::parse_script;

    fn case(member: &str, text: &str, uses_temp: bool) -> SwitchCase {
        SwitchCase {
            member: member.to_string(),
            body: RewrittenBody {
                text: text.to_string(),
                uses_temp,
                verbatim: Vec::new(),
            },
        }
    }

    #[test]
    fn test_render_without_temp() {
        let text = render_switch(
            "step",
            &[case("0", "datablob.increment(1)", false), case("log", "log(x)", false)],
            "steps[step].call(datablob)",
            None,
        );
        assert_eq!(
            text,
            "switch (step) {\n\tcase \"0\":\n\tcase 0:\ndatablob.increment(1);\n\tbreak;\n\
             \tcase \"log\":\nlog(x);\n\tbreak;\n\tdefault:\n\tsteps[step].call(datablob);\n}"
        );
    }

    #[test]
    fn test_render_with_temp() {
        let text = render_switch(
            "select",
            &[case("add", "var retx0 = undefined;\nretx0 = 1 + 2;\n", true)],
            "cases[select](1, 2)",
            Some("retx0"),
        );
        assert_eq!(
            text,
            "switch (select) {\n\tcase \"add\":\nvar retx0 = undefined;\nretx0 = 1 + 2;\n\tbreak;\n\
             \tdefault:\n\tretx0 = cases[select](1, 2);\n}"
        );
    }

    #[test]
    fn test_case_body_is_always_terminated() {
        let text = render_switch(
            "k",
            &[case("a", "var retr0 = undefined;\ngo(1)", true)],
            "cases[k](1)",
            Some("retr0"),
        );
        assert_eq!(
            text,
            "switch (k) {\n\tcase \"a\":\nvar retr0 = undefined;\ngo(1);\n\tbreak;\n\
             \tdefault:\n\tretr0 = cases[k](1);\n}"
        );
    }

    #[test]
    fn test_integer_keys() {
        assert!(is_integer_key("12"));
        assert!(is_integer_key("-1"));
        assert!(!is_integer_key("01"));
        assert!(!is_integer_key("1.5"));
        assert!(!is_integer_key("log"));
    }

    #[test]
    fn test_from_callee() {
        let parsed = parse_script(
            "cases[select](); steps[step].call(blob); steps[step].apply(blob, []); a.b(); a[b].bind(c)",
            "snippet.js",
        )
        .unwrap();
        let vias: Vec<Option<Via>> = parsed
            .script
            .body
            .iter()
            .map(|stmt| {
                let Stmt::Expr(stmt) = stmt else {
                    panic!("expected expression statements")
                };
                let Expr::Call(call) = &*stmt.expr else {
                    panic!("expected a call")
                };
                let Callee::Expr(callee) = &call.callee else {
                    panic!("expected an expression callee")
                };
                DynamicCall::from_callee(callee).map(|d| d.via)
            })
            .collect();
        assert_eq!(
            vias,
            [Some(Via::Direct), Some(Via::Call), Some(Via::Apply), None, None]
        );
    }
}
