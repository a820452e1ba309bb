//! Canonical unparser: renders an interned `Handle` back into grammar DSL
//! source text in its normalized form (spec.md §8's round-trip law,
//! `parse(unparse(N)) = N`). Mostly exercised by tests and by a debugging/
//! `recli-cli` dump flag; the engine itself never needs to print a grammar
//! to do its job.

use crate::algebra::flatten_alternatives;
use crate::node::{Handle, NodeData};

/// Renders `n` as grammar source, fully parenthesized where precedence
/// would otherwise be ambiguous (a `Concat` or `Alternate` sitting where a
/// single atom is expected).
pub fn unparse(n: &Handle) -> String {
    render(n, false)
}

fn render(n: &Handle, needs_atom: bool) -> String {
    match n.data() {
        NodeData::Word(w) => {
            let mut s = w.text.clone();
            if w.case_insensitive {
                s.push_str("/i");
            } else if w.needs_terminal {
                s.push_str("/t");
            }
            s
        }
        NodeData::Varargs => "...".to_string(),
        NodeData::Optional(x) => format!("[{}]", render(x, false)),
        NodeData::Plus(x, min) => {
            let body = render(x, true);
            format!("{}{}", body, if *min == 0 { "*" } else { "+" })
        }
        NodeData::Concat(..) => {
            let text = render_concat(n);
            if needs_atom {
                format!("({})", text)
            } else {
                text
            }
        }
        NodeData::Alternate(..) => {
            let alts: Vec<String> = flatten_alternatives(n).iter().map(|a| render(a, false)).collect();
            format!("({})", alts.join("|"))
        }
        NodeData::Macro(name, _) => name.clone(),
    }
}

fn render_concat(n: &Handle) -> String {
    let mut parts = Vec::new();
    let mut cur = n.clone();
    loop {
        match cur.data() {
            NodeData::Concat(a, b, _) => {
                parts.push(render(a, matches!(a.data(), NodeData::Alternate(..))));
                cur = b.clone();
            }
            _ => {
                parts.push(render(&cur, matches!(cur.data(), NodeData::Alternate(..))));
                break;
            }
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn roundtrip(lines: &[&str]) -> (String, bool) {
        let mut e = Engine::new();
        let mut g: Option<Handle> = None;
        for line in lines {
            g = e.parse_line(g, line).unwrap();
        }
        let first = g.unwrap();
        let text = unparse(&first);
        let second = e.parse_line(None, &text).unwrap().unwrap();
        (text, first == second)
    }

    #[test]
    fn prefix_factoring_unparses_to_factored_form() {
        let (text, stable) = roundtrip(&["foo bar", "foo baz"]);
        assert_eq!(text, "foo (bar|baz)");
        assert!(stable);
    }

    #[test]
    fn optional_collapse_unparses_with_brackets() {
        let (text, stable) = roundtrip(&["a", "a b"]);
        assert_eq!(text, "a [b]");
        assert!(stable);
    }

    #[test]
    fn grouping_parens_roundtrip_for_a_bare_word() {
        let (text, stable) = roundtrip(&["foo"]);
        assert_eq!(text, "foo");
        assert!(stable);
    }

    #[test]
    fn varargs_roundtrips() {
        let (text, stable) = roundtrip(&["echo ..."]);
        assert_eq!(text, "echo ...");
        assert!(stable);
    }

    #[test]
    fn plus_and_star_roundtrip() {
        let (text, stable) = roundtrip(&["a+"]);
        assert_eq!(text, "a+");
        assert!(stable);
        let (text, stable) = roundtrip(&["a*"]);
        assert_eq!(text, "a*");
        assert!(stable);
    }

    #[test]
    fn case_insensitive_modifier_roundtrips() {
        let (text, stable) = roundtrip(&["quit/i"]);
        assert_eq!(text, "quit/i");
        assert!(stable);
    }
}
