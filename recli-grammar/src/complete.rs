//! Tab Completion (spec.md §4.5): turns a raw, possibly-partial input buffer
//! into a list of completion strings by walking the grammar's first-position
//! frontier (`matcher::frontier`/`matcher::match_word`).

use crate::engine::Engine;
use crate::matcher::match_word;
use crate::node::{Handle, NodeData};
use crate::tokenize::{ends_mid_token, tokenize};

/// `tab_complete(engine, grammar, buffer, max)`: the full algorithm of
/// spec.md §4.5. Returns an empty vector if a middle word fails to match at
/// all, or if neither Exact nor Prefix mode finds anything for the last
/// word.
pub fn tab_complete(engine: &mut Engine, grammar: &Handle, buffer: &str, max: usize) -> Vec<String> {
    let argv = tokenize(buffer);
    let (consumed, last_word): (&[String], &str) = if argv.is_empty() {
        (&[], "")
    } else if ends_mid_token(buffer) {
        (&argv[..argv.len() - 1], argv[argv.len() - 1].as_str())
    } else {
        (&argv[..], "")
    };

    let mut residual = grammar.clone();
    for word in consumed {
        match match_word(engine, &residual, word, true) {
            Some(Some(next)) => residual = next,
            Some(None) => return Vec::new(), // fully consumed grammar, nothing left for more words
            None => return Vec::new(),
        }
    }

    // An empty last word has no useful "exact" sense — every candidate is
    // trivially a prefix match of "" — so go straight to Prefix mode rather
    // than letting the synthetic Optional-skip candidate (whose text is
    // itself "") short-circuit the fallback and hide the real words.
    let mut candidates = if last_word.is_empty() {
        candidate_texts(engine, &residual, last_word, false)
    } else {
        candidate_texts(engine, &residual, last_word, true)
    };
    if candidates.is_empty() && !last_word.is_empty() {
        candidates = candidate_texts(engine, &residual, last_word, false);
    }
    if candidates.is_empty() {
        return Vec::new();
    }

    let prefix: String = if consumed.is_empty() {
        String::new()
    } else {
        let mut s = consumed.join(" ");
        s.push(' ');
        s
    };

    candidates.truncate(max);
    candidates.into_iter().map(|c| format!("{}{} ", prefix, c)).collect()
}

/// Collects the literal text of every frontier leaf matching `last_word`
/// under the requested sense (`exact` or prefix), suppressing validator
/// `Word`s (spec.md §9's open question, resolved in DESIGN.md: their
/// literal names aren't legal input and shouldn't be offered as one).
fn candidate_texts(engine: &mut Engine, node: &Handle, last_word: &str, exact: bool) -> Vec<String> {
    let mut out = Vec::new();
    for item in crate::matcher::frontier(engine, node) {
        if item.is_empty_alternative {
            if last_word.is_empty() {
                out.push(String::new());
            }
            continue;
        }
        match item.leaf.data() {
            NodeData::Word(w) if w.validator.is_some() => continue,
            NodeData::Word(w) => {
                let matches = if exact {
                    if w.case_insensitive {
                        w.text.eq_ignore_ascii_case(last_word)
                    } else {
                        w.text == last_word
                    }
                } else if w.case_insensitive {
                    last_word.len() <= w.text.len() && w.text[..last_word.len()].eq_ignore_ascii_case(last_word)
                } else {
                    w.text.starts_with(last_word)
                };
                if matches {
                    out.push(w.text.clone());
                }
            }
            NodeData::Varargs => {
                let matches = if exact { last_word == "..." } else { "...".starts_with(last_word) };
                if matches {
                    out.push("...".to_string());
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn build(e: &mut Engine, lines: &[&str]) -> Handle {
        let mut g = None;
        for line in lines {
            g = e.parse_line(g, line).unwrap();
        }
        g.unwrap()
    }

    #[test]
    fn completes_single_candidate_from_prefix() {
        let mut e = Engine::new();
        let g = build(&mut e, &["show version", "set key STRING"]);
        assert_eq!(tab_complete(&mut e, &g, "sh", 10), vec!["show "]);
    }

    #[test]
    fn completes_second_word_after_full_first_word() {
        let mut e = Engine::new();
        let g = build(&mut e, &["show version", "show status"]);
        let mut got = tab_complete(&mut e, &g, "show ", 10);
        got.sort();
        assert_eq!(got, vec!["show status ", "show version "]);
    }

    #[test]
    fn no_candidates_when_middle_word_is_wrong() {
        let mut e = Engine::new();
        let g = build(&mut e, &["show version"]);
        assert!(tab_complete(&mut e, &g, "xyz ver", 10).is_empty());
    }

    #[test]
    fn optional_contributes_empty_candidate() {
        let mut e = Engine::new();
        let g = build(&mut e, &["a", "a b"]);
        let mut got = tab_complete(&mut e, &g, "a ", 10);
        got.sort();
        assert_eq!(got, vec!["a  ", "a b "]);
    }

    #[test]
    fn validator_words_are_suppressed() {
        let mut e = Engine::new();
        let g = build(&mut e, &["ping IPV4ADDR"]);
        assert!(tab_complete(&mut e, &g, "ping ", 10).is_empty());
    }

    #[test]
    fn candidate_count_is_truncated() {
        let mut e = Engine::new();
        let g = build(&mut e, &["show aa", "show bb", "show cc"]);
        assert_eq!(tab_complete(&mut e, &g, "show ", 2).len(), 2);
    }
}
