//! Node Algebra (spec.md §4.2): constructors that produce normalized,
//! interned handles. Every constructor here either succeeds with a fully
//! normalized node or returns a `SemanticError` — there is no path that
//! leaks a partially-built node, since Rust's ownership rules give us the
//! "ref-count discipline on every error path" design note for free (an
//! `Err` return simply drops whatever temporaries were built).

use std::rc::Rc;

use crate::error::{EngineError, SemanticError, SemanticErrorKind};
use crate::node::{
    cmp_nodes, concat_length, fingerprint_alternate, fingerprint_concat, fingerprint_macro,
    fingerprint_optional, fingerprint_plus, fingerprint_varargs, fingerprint_word, head, tail, Handle,
    NodeData, Validator, WordData,
};
use crate::pool::Pool;

fn semantic(kind: SemanticErrorKind) -> EngineError {
    SemanticError { byte_offset: None, kind }.into()
}

/// Splits a trailing `/i` or `/t` modifier off a raw keyword token. Returns
/// the bare text plus the flags it carries. An unrecognized suffix after a
/// `/` is a `SemanticError`.
fn strip_modifiers(raw: &str) -> Result<(&str, bool, bool), EngineError> {
    if let Some(slash) = raw.rfind('/') {
        let (text, suffix) = (&raw[..slash], &raw[slash + 1..]);
        return match suffix {
            "i" => Ok((text, true, false)),
            "t" => Ok((text, false, true)),
            other => Err(semantic(SemanticErrorKind::UnknownModifierSuffix(other.to_string()))),
        };
    }
    Ok((raw, false, false))
}

fn validate_keyword_text(text: &str) -> Result<(), EngineError> {
    let first = text.as_bytes().first().copied();
    if !matches!(first, Some(b) if b.is_ascii_alphabetic()) {
        return Err(semantic(SemanticErrorKind::KeywordStartsWithNonLetter));
    }
    if text.bytes().any(|b| !(0x20..=0x7e).contains(&b)) {
        return Err(semantic(SemanticErrorKind::KeywordInvalidByte));
    }
    if text.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(semantic(SemanticErrorKind::MixedCaseKeyword));
    }
    Ok(())
}

/// Builds a literal keyword `Word`, stripping and applying `/i`/`/t`
/// modifiers and enforcing the keyword lexical rules of spec.md §3. This is
/// never called with an all-uppercase token — the Parser resolves those
/// against the macro/data-type registry instead (§4.3's `UPPER` handling).
pub fn word(pool: &mut Pool, raw: &str) -> Result<Handle, EngineError> {
    let (text, case_insensitive, needs_terminal) = strip_modifiers(raw)?;
    validate_keyword_text(text)?;
    let fp = fingerprint_word(text, case_insensitive, needs_terminal, None);
    Ok(pool.intern(
        fp,
        NodeData::Word(WordData {
            text: text.to_string(),
            validator: None,
            case_insensitive,
            needs_terminal,
        }),
    ))
}

/// Builds a data-type `Word` carrying a validator, used once per registered
/// data-type name (§4.6) and rooted for the process lifetime.
pub fn validator_word(pool: &mut Pool, name: &str, validator: Rc<dyn Validator>) -> Handle {
    let fp = fingerprint_word(name, false, false, Some(validator.name()));
    pool.intern(
        fp,
        NodeData::Word(WordData {
            text: name.to_string(),
            validator: Some(validator),
            case_insensitive: false,
            needs_terminal: false,
        }),
    )
}

/// Interns a literal word leaf bypassing all keyword rules, used by the
/// Matcher (`match_max`) to store matched argv text and by the Help Binder
/// to store opaque help-text blobs (spec.md §4.2, §4.7).
pub fn force_word(pool: &mut Pool, text: &str) -> Handle {
    let fp = fingerprint_word(text, false, false, None);
    pool.intern(
        fp,
        NodeData::Word(WordData {
            text: text.to_string(),
            validator: None,
            case_insensitive: false,
            needs_terminal: false,
        }),
    )
}

pub fn varargs(pool: &mut Pool) -> Handle {
    pool.intern(fingerprint_varargs(), NodeData::Varargs)
}

pub fn optional(pool: &mut Pool, x: Handle) -> Result<Handle, EngineError> {
    if x.is_varargs() {
        return Err(semantic(SemanticErrorKind::VarargsInOptional));
    }
    if x.is_optional() {
        return Ok(x);
    }
    let fp = fingerprint_optional(x.fp());
    Ok(pool.intern(fp, NodeData::Optional(x)))
}

pub fn plus(pool: &mut Pool, x: Handle, min: u8) -> Result<Handle, EngineError> {
    if x.is_varargs() {
        return Err(semantic(SemanticErrorKind::VarargsInPlus));
    }
    if matches!(x.data(), NodeData::Plus(..)) {
        return Err(semantic(SemanticErrorKind::DoublePlus));
    }
    let fp = fingerprint_plus(x.fp(), min);
    Ok(pool.intern(fp, NodeData::Plus(x, min)))
}

/// `concat(concat(x,y), z) = concat(x, concat(y,z))`. Because normalized
/// `Concat` nodes are already right-leaning, `a`'s own left child (if any)
/// is guaranteed non-`Concat`, so this rewrite never recurses more than one
/// level deep regardless of how long the overall chain ends up being.
pub fn concat(pool: &mut Pool, a: Handle, b: Handle) -> Result<Handle, EngineError> {
    if a.is_varargs() {
        return Err(semantic(SemanticErrorKind::VarargsNotLast));
    }
    match a.data() {
        NodeData::Concat(x, y, _) => {
            let (x, y) = (x.clone(), y.clone());
            let tail = concat(pool, y, b)?;
            concat(pool, x, tail)
        }
        _ => {
            let length = if b.is_concat() { 1 + concat_length(&b) } else { 1 };
            let fp = fingerprint_concat(a.fp(), b.fp(), length);
            Ok(pool.intern(fp, NodeData::Concat(a, b, length)))
        }
    }
}

fn intern_alternate_pair(pool: &mut Pool, a: Handle, b: Handle) -> Handle {
    let fp = fingerprint_alternate(a.fp(), b.fp());
    pool.intern(fp, NodeData::Alternate(a, b))
}

/// Reconstructs the leading `count` elements of a `Concat` chain as a fresh
/// (already-normalized) `Concat`, used to rebuild a factored-out common
/// prefix.
fn take_prefix(pool: &mut Pool, n: &Handle, count: usize) -> Result<Handle, EngineError> {
    let mut heads = Vec::with_capacity(count);
    let mut cur = n.clone();
    for _ in 0..count {
        heads.push(head(&cur));
        cur = tail(&cur).expect("count must not exceed n's length");
    }
    let mut acc = heads.pop().expect("count > 0");
    while let Some(h) = heads.pop() {
        acc = concat(pool, h, acc)?;
    }
    Ok(acc)
}

/// Walks the right spine of `Concat` pairs while the `first` children are
/// pointer-identical (interning guarantees structural equality implies
/// identity), counting how many leading elements `a` and `b` share.
pub fn longest_common_prefix(a: &Handle, b: &Handle) -> usize {
    let mut count = 0;
    let mut pa = Some(a.clone());
    let mut pb = Some(b.clone());
    loop {
        match (&pa, &pb) {
            (Some(x), Some(y)) if Handle::ptr_eq(&head(x), &head(y)) => {
                count += 1;
                pa = tail(x);
                pb = tail(y);
            }
            _ => break,
        }
    }
    count
}

/// Returns the suffix of `n` after its first `count` elements, or `None`
/// when `count` equals `n`'s full length (nothing remains — the "empty"
/// marker of spec.md §4.2).
fn skip_prefix(n: &Handle, count: usize) -> Option<Handle> {
    let mut cur = n.clone();
    let mut remaining = count;
    while remaining > 0 {
        match tail(&cur) {
            Some(next) => {
                cur = next;
                remaining -= 1;
            }
            None => return None,
        }
    }
    Some(cur)
}

pub(crate) fn flatten_alternatives(n: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut stack = vec![n.clone()];
    while let Some(cur) = stack.pop() {
        match cur.data() {
            NodeData::Alternate(a, b) => {
                stack.push(b.clone());
                stack.push(a.clone());
            }
            _ => out.push(cur),
        }
    }
    out
}

/// Folds a non-empty list of handles into a single alternation via repeated
/// pairwise `alternate()` calls, left to right.
fn alternate_fold(pool: &mut Pool, mut items: Vec<Handle>) -> Result<Handle, EngineError> {
    let mut acc = items.remove(0);
    for item in items {
        acc = alternate(pool, acc, item)?;
    }
    Ok(acc)
}

/// Scans a sorted, duplicate-free array of alternatives for runs of two or
/// more entries sharing a one-node prefix, factors each run out
/// (`a b | a c => a (b|c)`, recursing on the stripped suffixes so deeper
/// shared structure is also factored), and returns the resulting array —
/// still in the same relative order, ready to be rebuilt into a right-
/// leaning `Alternate` spine.
fn factor_prefixes(pool: &mut Pool, items: Vec<Handle>) -> Result<Vec<Handle>, EngineError> {
    let mut output = Vec::with_capacity(items.len());
    let mut i = 0;
    while i < items.len() {
        let prefix_head = head(&items[i]);
        let mut j = i + 1;
        while j < items.len() && Handle::ptr_eq(&head(&items[j]), &prefix_head) {
            j += 1;
        }
        if j - i >= 2 {
            let mut suffixes = Vec::with_capacity(j - i);
            let mut has_epsilon = false;
            for item in &items[i..j] {
                match tail(item) {
                    Some(s) => suffixes.push(s),
                    None => has_epsilon = true,
                }
            }
            let mut combined = alternate_fold(pool, suffixes)?;
            if has_epsilon {
                combined = optional(pool, combined)?;
            }
            let prefix = take_prefix(pool, &items[i], 1)?;
            output.push(concat(pool, prefix, combined)?);
        } else {
            output.push(items[i].clone());
        }
        i = j;
    }
    Ok(output)
}

fn build_alternate_spine(mut items: Vec<Handle>, pool: &mut Pool) -> Handle {
    let mut acc = items.pop().expect("alternate() always has >= 1 alternative");
    while let Some(item) = items.pop() {
        acc = intern_alternate_pair(pool, item, acc);
    }
    acc
}

/// `alternate(a, b)`: ordered alternation, normalized per spec.md §4.2 —
/// commutative and idempotent up to the identity of the interned result,
/// longest-common-prefix factored, sorted, and deduplicated.
pub fn alternate(pool: &mut Pool, a: Handle, b: Handle) -> Result<Handle, EngineError> {
    if Handle::ptr_eq(&a, &b) {
        return Ok(a);
    }
    if a.is_varargs() || b.is_varargs() {
        return Err(semantic(SemanticErrorKind::VarargsInAlternate));
    }

    let lcp = longest_common_prefix(&a, &b);
    if lcp > 0 {
        let prefix = take_prefix(pool, &a, lcp)?;
        let (sa, sb) = (skip_prefix(&a, lcp), skip_prefix(&b, lcp));
        let inner = match (sa, sb) {
            (Some(x), Some(y)) => alternate(pool, x, y)?,
            (Some(x), None) | (None, Some(x)) => optional(pool, x)?,
            (None, None) => unreachable!("a != b but they share their entire length as a prefix"),
        };
        return concat(pool, prefix, inner);
    }

    let mut items = flatten_alternatives(&a);
    items.extend(flatten_alternatives(&b));
    items.sort_by(cmp_nodes);
    items.dedup_by(|x, y| Handle::ptr_eq(x, y));

    let items = factor_prefixes(pool, items)?;
    Ok(build_alternate_spine(items, pool))
}

/// `NAME=body`: `name` must be all-uppercase. Construction only; the caller
/// (the Parser, via `Engine::register_macro`) is responsible for recording
/// the binding so later `UPPER` references can find it.
pub fn macro_def(pool: &mut Pool, name: &str, body: Handle) -> Result<Handle, EngineError> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_uppercase() || b == b'_' || b.is_ascii_digit()) || !name.as_bytes()[0].is_ascii_alphabetic()
    {
        return Err(semantic(SemanticErrorKind::MacroNameNotUppercase));
    }
    let fp = fingerprint_macro(name, body.fp());
    Ok(pool.intern(fp, NodeData::Macro(name.to_string(), body)))
}
