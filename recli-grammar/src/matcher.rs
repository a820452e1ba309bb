//! The Matcher (spec.md §4.4): walks a normalized grammar node against an
//! argv token stream, either to validate (`check`) or to greedily
//! reconstruct a full match with interned leaves for matched words
//! (`match_max`). `frontier` is the shared derivative-style primitive behind
//! both Match-word and Tab Completion's first-position enumeration.
//!
//! Grammar nodes nest through `Concat`/`Alternate` chains that can run
//! hundreds of elements deep for a busy command tree, so every walk here
//! threads an explicit stack rather than recursing once per element — the
//! same right-spine-iteration discipline `Node`'s own `Drop` impl uses.

use crate::engine::Engine;
use crate::error::{EngineError, MatchError};
use crate::node::{Handle, NodeData};

/// The outcome of matching a grammar node against a run of argv tokens that
/// may not fill every required slot yet — the "signed progress integer" of
/// spec.md §4.4, modeled as an enum instead of a sign-encoded `int` (see
/// DESIGN.md). `needs_terminal` is the OR of every needs-terminal `Word`
/// touched along the path that produced this result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Complete { consumed: usize, needs_terminal: bool },
    WantMore { consumed: usize, needs_terminal: bool },
    /// `at` is the argv index of the rejecting token, or `argv.len()` when
    /// the failure is "ran out of input". `message` is the rejecting leaf's
    /// own error text — a validator's message (spec.md §4.4: "Validators may
    /// set an error string") when the leaf was a validator `Word`, or a
    /// plain "expected 'x'" for a literal keyword mismatch.
    Fail { at: usize, message: String },
}

impl Progress {
    fn consumed(&self) -> usize {
        match self {
            Progress::Complete { consumed, .. } | Progress::WantMore { consumed, .. } => *consumed,
            Progress::Fail { .. } => 0,
        }
    }

    pub fn needs_terminal(&self) -> bool {
        match self {
            Progress::Complete { needs_terminal, .. } | Progress::WantMore { needs_terminal, .. } => *needs_terminal,
            Progress::Fail { .. } => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Progress::Complete { .. })
    }
}

fn match_leaf(node: &Handle, word: &str) -> Result<(), String> {
    match node.data() {
        NodeData::Word(w) => {
            if let Some(validator) = &w.validator {
                return validator.check(word);
            }
            let matches = if w.case_insensitive { w.text.eq_ignore_ascii_case(word) } else { w.text == word };
            if matches {
                Ok(())
            } else {
                Err(format!("expected '{}'", w.text))
            }
        }
        _ => Err("not a word".to_string()),
    }
}

/// Validates `argv[start..]` against `node`, returning how far the walk got.
/// This is the read-only "does this much input make sense so far" query
/// used for live validation as a user types (spec.md §4.4).
pub fn check(node: &Handle, argv: &[String], start: usize) -> Progress {
    match node.data() {
        NodeData::Word(w) => {
            if start >= argv.len() {
                return Progress::WantMore { consumed: 0, needs_terminal: false };
            }
            match match_leaf(node, &argv[start]) {
                Ok(()) => Progress::Complete { consumed: 1, needs_terminal: w.needs_terminal },
                Err(message) => Progress::Fail { at: start, message },
            }
        }
        NodeData::Varargs => Progress::Complete { consumed: argv.len() - start, needs_terminal: false },
        NodeData::Optional(inner) => match check(inner, argv, start) {
            Progress::Fail { .. } => Progress::Complete { consumed: 0, needs_terminal: false },
            other => other,
        },
        NodeData::Plus(inner, min) => check_plus(inner, *min, argv, start),
        NodeData::Concat(..) => check_concat(node, argv, start),
        NodeData::Alternate(a, b) => pick_best(check(a, argv, start), check(b, argv, start)),
        NodeData::Macro(_, body) => check(body, argv, start),
    }
}

/// Alternation picks the branch that got furthest; a `Complete` beats a
/// `WantMore` at the same consumption, and both beat `Fail` (spec.md §4.4
/// "furthest failure wins", applied symmetrically to the success case so a
/// fully-specified alternative is preferred over a still-open one).
fn pick_best(a: Progress, b: Progress) -> Progress {
    match (a, b) {
        (Progress::Fail { at: fa, message: ma }, Progress::Fail { at: fb, message: mb }) => {
            if fa >= fb {
                Progress::Fail { at: fa, message: ma }
            } else {
                Progress::Fail { at: fb, message: mb }
            }
        }
        (Progress::Fail { .. }, b) => b,
        (a, Progress::Fail { .. }) => a,
        (a, b) => {
            if rank(&a) != rank(&b) {
                if rank(&a) > rank(&b) {
                    a
                } else {
                    b
                }
            } else if a.consumed() >= b.consumed() {
                a
            } else {
                b
            }
        }
    }
}

fn rank(p: &Progress) -> u8 {
    match p {
        Progress::Fail { .. } => 0,
        Progress::WantMore { .. } => 1,
        Progress::Complete { .. } => 2,
    }
}

fn check_plus(inner: &Handle, min: u8, argv: &[String], start: usize) -> Progress {
    let mut pos = start;
    let mut reps = 0u32;
    let mut needs_terminal = false;
    loop {
        match check(inner, argv, pos) {
            Progress::Complete { consumed, needs_terminal: nt } if consumed > 0 => {
                pos += consumed;
                reps += 1;
                needs_terminal |= nt;
                if pos >= argv.len() {
                    return finish_plus(reps, min, pos - start, needs_terminal);
                }
            }
            // A zero-width match (e.g. an inner Optional that skipped) would
            // loop forever; stop repeating once it stops consuming input.
            Progress::Complete { .. } => return finish_plus(reps, min, pos - start, needs_terminal),
            Progress::WantMore { needs_terminal: nt, .. } => {
                return Progress::WantMore { consumed: pos - start, needs_terminal: needs_terminal | nt };
            }
            Progress::Fail { at, message } => {
                return if reps >= min as u32 {
                    Progress::Complete { consumed: pos - start, needs_terminal }
                } else if reps > 0 || pos < argv.len() {
                    Progress::Fail { at, message }
                } else {
                    Progress::WantMore { consumed: 0, needs_terminal: false }
                };
            }
        }
    }
}

fn finish_plus(reps: u32, min: u8, consumed: usize, needs_terminal: bool) -> Progress {
    if reps >= min as u32 {
        Progress::Complete { consumed, needs_terminal }
    } else {
        Progress::WantMore { consumed, needs_terminal }
    }
}

/// Walks a `Concat` chain's right spine iteratively, threading the furthest
/// failure seen so error reporting can point at the real culprit even when
/// an earlier element in the chain could also be blamed.
fn check_concat(node: &Handle, argv: &[String], start: usize) -> Progress {
    let mut cur = node.clone();
    let mut pos = start;
    let mut needs_terminal = false;
    loop {
        let (first, rest) = match cur.data() {
            NodeData::Concat(a, b, _) => (a.clone(), Some(b.clone())),
            _ => (cur.clone(), None),
        };
        match check(&first, argv, pos) {
            Progress::Complete { consumed, needs_terminal: nt } => {
                pos += consumed;
                needs_terminal |= nt;
                match rest {
                    Some(next) => cur = next,
                    None => return Progress::Complete { consumed: pos - start, needs_terminal },
                }
            }
            other => return shift(other, pos - start, needs_terminal),
        }
    }
}

fn shift(p: Progress, already: usize, needs_terminal: bool) -> Progress {
    match p {
        Progress::Complete { consumed, needs_terminal: nt } => Progress::Complete { consumed: consumed + already, needs_terminal: needs_terminal | nt },
        Progress::WantMore { consumed, needs_terminal: nt } => Progress::WantMore { consumed: consumed + already, needs_terminal: needs_terminal | nt },
        Progress::Fail { at, message } => Progress::Fail { at, message },
    }
}

/// Greedily reconstructs a full match of `node` against `argv`, producing an
/// interned node whose `Word` leaves are the matched argv text (via
/// `force_word`) rather than the grammar's own keyword/data-type leaves —
/// this is what the Help Binder and a command dispatcher walk to recover
/// "what did the user actually type" (spec.md §4.4).
pub fn match_max(engine: &mut Engine, node: &Handle, argv: &[String]) -> Result<Handle, EngineError> {
    let progress = check(node, argv, 0);
    if !progress.is_complete() || progress.consumed() != argv.len() {
        // A syntax mismatch carries the rejecting leaf's own message
        // (spec.md §4.4); grammar exhausted with input left over (the
        // "Exhausted" error kind, §7) points at the first leftover token;
        // grammar wants more input than was given has no single token to
        // blame.
        let (at, message) = match progress {
            Progress::Fail { at, message } => (at, message),
            Progress::Complete { consumed, .. } => (consumed, format!("unexpected token '{}'", argv[consumed])),
            Progress::WantMore { .. } => (argv.len(), "expected more input".to_string()),
        };
        return Err(MatchError { argv_index: at.min(argv.len().saturating_sub(1)), message }.into());
    }
    reconstruct(engine, node, argv, 0).map(|(h, _)| h)
}

/// Rebuilds the matched subtree, returning the reconstructed handle plus how
/// many argv tokens it consumed.
fn reconstruct(engine: &mut Engine, node: &Handle, argv: &[String], start: usize) -> Result<(Handle, usize), EngineError> {
    match node.data() {
        NodeData::Word(_) => {
            let text = argv[start].clone();
            Ok((engine.force_word(&text), 1))
        }
        NodeData::Varargs => {
            let mut cur = None;
            for tok in &argv[start..] {
                let leaf = engine.force_word(tok);
                cur = Some(match cur {
                    None => leaf,
                    Some(prev) => engine.build_concat(prev, leaf)?,
                });
            }
            let body = cur.unwrap_or_else(|| engine.force_word(""));
            Ok((body, argv.len() - start))
        }
        NodeData::Optional(inner) => match check(inner, argv, start) {
            Progress::Complete { .. } => {
                let (h, n) = reconstruct(engine, inner, argv, start)?;
                Ok((engine.build_optional(h)?, n))
            }
            // Not taken: keep the original (unexpanded) Optional node as a
            // placeholder, consuming nothing.
            _ => Ok((node.clone(), 0)),
        },
        NodeData::Plus(inner, _) => {
            let mut pos = start;
            let mut acc: Option<Handle> = None;
            loop {
                match check(inner, argv, pos) {
                    Progress::Complete { consumed, .. } if consumed > 0 => {
                        let (h, n) = reconstruct(engine, inner, argv, pos)?;
                        pos += n;
                        acc = Some(match acc {
                            None => h,
                            Some(prev) => engine.build_concat(prev, h)?,
                        });
                        if pos >= argv.len() {
                            break;
                        }
                    }
                    _ => break,
                }
            }
            let body = acc.ok_or_else(|| MatchError { argv_index: start, message: "expected at least one repetition".to_string() })?;
            Ok((body, pos - start))
        }
        NodeData::Concat(a, b, _) => {
            let (ha, na) = reconstruct(engine, a, argv, start)?;
            let (hb, nb) = reconstruct(engine, b, argv, start + na)?;
            Ok((engine.build_concat(ha, hb)?, na + nb))
        }
        NodeData::Alternate(a, b) => {
            let pa = check(a, argv, start);
            let pb = check(b, argv, start);
            if pa.is_complete() && (!pb.is_complete() || pa.consumed() >= pb.consumed()) {
                reconstruct(engine, a, argv, start)
            } else if pb.is_complete() {
                reconstruct(engine, b, argv, start)
            } else {
                Err(MatchError { argv_index: start, message: "no alternative matches".to_string() }.into())
            }
        }
        NodeData::Macro(_, body) => reconstruct(engine, body, argv, start),
    }
}

/// One item of a grammar node's first-position frontier: a leaf that could
/// legally appear next, plus what remains to match after it (`None` means
/// nothing more is required). `is_empty_alternative` marks the synthetic
/// "skip me" candidate an `Optional` contributes at its own position.
pub struct FrontierItem {
    pub leaf: Handle,
    pub residual: Option<Handle>,
    pub is_empty_alternative: bool,
}

/// Enumerates every word that could legally appear next in `node`, flattened
/// across `Optional`/`Alternate`/`Plus`/`Concat`/`Macro` (spec.md §4.5 step
/// 4; also the structural basis for Match-word, spec.md §4.4). Iterative
/// over an explicit worklist for the same reason `check`'s spine walks are.
pub fn frontier(engine: &mut Engine, node: &Handle) -> Vec<FrontierItem> {
    let mut out = Vec::new();
    let mut stack = vec![(node.clone(), None::<Handle>)];
    while let Some((n, cont)) = stack.pop() {
        match n.data().clone_shape() {
            Shape::Leaf => out.push(FrontierItem { leaf: n.clone(), residual: cont, is_empty_alternative: false }),
            Shape::Optional(inner) => {
                out.push(FrontierItem { leaf: n.clone(), residual: cont.clone(), is_empty_alternative: true });
                stack.push((inner, cont));
            }
            Shape::Plus(inner, min) => {
                let after_one = if min > 0 {
                    match engine.build_plus(inner.clone(), 0) {
                        Ok(relaxed) => match &cont {
                            Some(k) => engine.build_concat(relaxed, k.clone()).ok(),
                            None => Some(relaxed),
                        },
                        Err(_) => cont.clone(),
                    }
                } else {
                    match cont {
                        Some(k) => match engine.build_concat(n.clone(), k) {
                            Ok(c) => Some(c),
                            Err(_) => Some(n.clone()),
                        },
                        None => Some(n.clone()),
                    }
                };
                stack.push((inner, after_one));
            }
            Shape::Concat(a, b) => {
                let new_cont = match cont {
                    Some(k) => engine.build_concat(b.clone(), k).ok().or(Some(b)),
                    None => Some(b),
                };
                stack.push((a, new_cont));
            }
            Shape::Alternate(a, b) => {
                stack.push((a, cont.clone()));
                stack.push((b, cont));
            }
            Shape::Macro(body) => stack.push((body, cont)),
        }
    }
    out
}

enum Shape {
    Leaf,
    Optional(Handle),
    Plus(Handle, u8),
    Concat(Handle, Handle),
    Alternate(Handle, Handle),
    Macro(Handle),
}

trait ClassifyShape {
    fn clone_shape(&self) -> Shape;
}

impl ClassifyShape for NodeData {
    fn clone_shape(&self) -> Shape {
        match self {
            NodeData::Word(_) | NodeData::Varargs => Shape::Leaf,
            NodeData::Optional(x) => Shape::Optional(x.clone()),
            NodeData::Plus(x, min) => Shape::Plus(x.clone(), *min),
            NodeData::Concat(a, b, _) => Shape::Concat(a.clone(), b.clone()),
            NodeData::Alternate(a, b) => Shape::Alternate(a.clone(), b.clone()),
            NodeData::Macro(_, body) => Shape::Macro(body.clone()),
        }
    }
}

/// The primitive "Match-word" step of spec.md §4.4: consumes exactly one
/// word from `node`'s first position and returns what remains (`None`
/// inside `Some` meaning "nothing left"), or `None` if no frontier leaf
/// accepts `word` under the requested sense.
pub fn match_word(engine: &mut Engine, node: &Handle, word: &str, exact: bool) -> Option<Option<Handle>> {
    for item in frontier(engine, node) {
        if item.is_empty_alternative {
            continue;
        }
        if item.leaf.is_varargs() {
            return Some(Some(item.leaf));
        }
        let text = match item.leaf.data() {
            NodeData::Word(w) => &w.text,
            _ => continue,
        };
        let accepted = match item.leaf.data() {
            NodeData::Word(w) if w.validator.is_some() => {
                if exact {
                    w.validator.as_ref().unwrap().check(word).is_ok()
                } else {
                    false
                }
            }
            NodeData::Word(w) if w.case_insensitive => {
                if exact {
                    text.eq_ignore_ascii_case(word)
                } else {
                    word.len() <= text.len() && text[..word.len()].eq_ignore_ascii_case(word)
                }
            }
            _ => {
                if exact {
                    text == word
                } else {
                    text.starts_with(word)
                }
            }
        };
        if accepted {
            return Some(item.residual);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn complete_literal_match() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "show version").unwrap().unwrap();
        assert_eq!(check(&g, &argv(&["show", "version"]), 0), Progress::Complete { consumed: 2, needs_terminal: false });
    }

    #[test]
    fn want_more_on_partial_prefix() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "show version").unwrap().unwrap();
        assert_eq!(check(&g, &argv(&["show"]), 0), Progress::WantMore { consumed: 1, needs_terminal: false });
    }

    #[test]
    fn fail_on_wrong_word() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "show version").unwrap().unwrap();
        assert_eq!(
            check(&g, &argv(&["show", "status"]), 0),
            Progress::Fail { at: 1, message: "expected 'version'".to_string() }
        );
    }

    #[test]
    fn optional_may_be_skipped() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "show [verbose] version").unwrap().unwrap();
        assert_eq!(check(&g, &argv(&["show", "version"]), 0), Progress::Complete { consumed: 2, needs_terminal: false });
        assert_eq!(check(&g, &argv(&["show", "verbose", "version"]), 0), Progress::Complete { consumed: 3, needs_terminal: false });
    }

    #[test]
    fn case_insensitive_keyword_matches() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "quit/i").unwrap().unwrap();
        assert_eq!(check(&g, &argv(&["QUIT"]), 0), Progress::Complete { consumed: 1, needs_terminal: false });
    }

    #[test]
    fn needs_terminal_flag_propagates() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "reload/t").unwrap().unwrap();
        assert_eq!(check(&g, &argv(&["reload"]), 0), Progress::Complete { consumed: 1, needs_terminal: true });
    }

    #[test]
    fn varargs_consumes_remaining_tokens() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "echo ...").unwrap().unwrap();
        assert_eq!(check(&g, &argv(&["echo", "a", "b", "c"]), 0), Progress::Complete { consumed: 4, needs_terminal: false });
    }

    #[test]
    fn match_max_reconstructs_varargs_tail() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "echo ...").unwrap().unwrap();
        let result = match_max(&mut e, &g, &argv(&["echo", "a", "b"])).unwrap();
        assert!(matches!(result.data(), NodeData::Concat(..)));
    }

    #[test]
    fn validator_rejects_bad_input() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "ping IPV4ADDR").unwrap().unwrap();
        assert!(matches!(check(&g, &argv(&["ping", "not-an-ip"]), 0), Progress::Fail { at: 1, .. }));
        assert_eq!(check(&g, &argv(&["ping", "10.0.0.1"]), 0), Progress::Complete { consumed: 2, needs_terminal: false });
    }

    #[test]
    fn match_word_consumes_one_token_and_returns_residual() {
        let mut e = Engine::new();
        let g = e.parse_line(None, "show version").unwrap().unwrap();
        let residual = match_word(&mut e, &g, "show", true).unwrap().unwrap();
        assert!(matches!(residual.data(), NodeData::Word(w) if w.text == "version"));
    }
}
