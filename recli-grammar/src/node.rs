//! The syntax DAG's node representation (spec §3) and its total order (§4.2).
//!
//! Nodes are interned, reference-counted values. `Handle` wraps an `Rc<Node>`;
//! cloning a handle is the "take a ref" operation spec.md describes, and
//! dropping the last clone releases the node from the Pool and (iteratively,
//! see `Node`'s `Drop` impl) its right-spine children.

use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::fingerprint::{Fingerprint, Hasher32};

/// A `Word`'s recognizer. `Ok(())` means the text matches; `Err` carries the
/// validator's own error message (surfaced by the Matcher on a MatchError).
pub trait Validator: fmt::Debug {
    fn name(&self) -> &str;
    fn check(&self, word: &str) -> Result<(), String>;
}

#[derive(Debug)]
pub struct WordData {
    pub text: String,
    pub validator: Option<Rc<dyn Validator>>,
    pub case_insensitive: bool,
    pub needs_terminal: bool,
}

impl PartialEq for WordData {
    fn eq(&self, other: &Self) -> bool {
        if self.text != other.text
            || self.case_insensitive != other.case_insensitive
            || self.needs_terminal != other.needs_terminal
        {
            return false;
        }
        match (&self.validator, &other.validator) {
            (None, None) => true,
            (Some(a), Some(b)) => a.name() == b.name(),
            _ => false,
        }
    }
}
impl Eq for WordData {}

/// The six structural variants plus `Macro`, matching spec.md §3's table.
#[derive(Debug, PartialEq, Eq)]
pub enum NodeData {
    Word(WordData),
    Varargs,
    Optional(Handle),
    Plus(Handle, u8),
    Concat(Handle, Handle, u32),
    Alternate(Handle, Handle),
    Macro(String, Handle),
}

pub struct Node {
    pub fp: Fingerprint,
    pub data: NodeData,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("fp", &self.fp)
            .field("data", &self.data)
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}
impl Eq for Node {}

/// Drop the right-spine of a `Concat`/`Alternate` chain iteratively so that
/// releasing a long grammar forest never recurses once per element (spec.md
/// §3 "Lifecycle" and §9 "Recursion depth").
impl Drop for Node {
    fn drop(&mut self) {
        let mut next = take_right_child(&mut self.data);
        while let Some(handle) = next {
            match Rc::try_unwrap(handle.0) {
                Ok(mut inner) => next = take_right_child(&mut inner.data),
                Err(_) => break,
            }
        }
    }
}

fn take_right_child(data: &mut NodeData) -> Option<Handle> {
    lazy_static::lazy_static! {
        static ref PLACEHOLDER: Handle = Handle(Rc::new(Node {
            fp: Fingerprint(0),
            data: NodeData::Varargs,
        }));
    }
    match data {
        NodeData::Concat(_, next, _) => Some(mem::replace(next, PLACEHOLDER.clone())),
        NodeData::Alternate(_, next) => Some(mem::replace(next, PLACEHOLDER.clone())),
        _ => None,
    }
}

/// A reference-counted handle to an interned `Node`. Equality and hashing on
/// a `Handle` are pointer identity, which is sound because interning
/// guarantees structural equality implies the same `Rc`.
#[derive(Clone, Debug)]
pub struct Handle(pub Rc<Node>);

impl Handle {
    pub fn fp(&self) -> Fingerprint {
        self.0.fp
    }

    pub fn data(&self) -> &NodeData {
        &self.0.data
    }

    pub fn ptr_eq(a: &Handle, b: &Handle) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn is_varargs(&self) -> bool {
        matches!(self.data(), NodeData::Varargs)
    }

    pub fn is_concat(&self) -> bool {
        matches!(self.data(), NodeData::Concat(..))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.data(), NodeData::Optional(..))
    }

    pub fn is_alternate(&self) -> bool {
        matches!(self.data(), NodeData::Alternate(..))
    }

    /// `needs_terminal` propagates out of a successful match (spec.md §6) for
    /// `Word` leaves; composite nodes don't carry the flag themselves, the
    /// Matcher ORs it in as it walks.
    pub fn word_needs_terminal(&self) -> bool {
        matches!(self.data(), NodeData::Word(w) if w.needs_terminal)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Handle::ptr_eq(self, other)
    }
}
impl Eq for Handle {}

/// The first element of a `Concat` chain, or the node itself when it isn't a
/// `Concat`. Used by longest-common-prefix factoring (§4.2).
pub fn head(n: &Handle) -> Handle {
    match n.data() {
        NodeData::Concat(first, _, _) => first.clone(),
        _ => n.clone(),
    }
}

/// Everything after the first element of a `Concat` chain, or `None` when
/// `n` has no more elements (it is a length-1 sequence).
pub fn tail(n: &Handle) -> Option<Handle> {
    match n.data() {
        NodeData::Concat(_, next, _) => Some(next.clone()),
        _ => None,
    }
}

pub fn concat_length(n: &Handle) -> u32 {
    match n.data() {
        NodeData::Concat(_, _, len) => *len,
        _ => 1,
    }
}

fn atom_rank(n: &Handle) -> u8 {
    match n.data() {
        NodeData::Word(_) => 0,
        NodeData::Plus(..) => 1,
        NodeData::Macro(..) => 2,
        _ => 3,
    }
}

/// The strict total order of spec.md §4.2, used to sort alternation operands
/// and to deduplicate. Variant-specific rules are applied in the order the
/// spec lists them; pairings the spec leaves unspecified (`Plus`/`Macro`
/// cross-comparisons, `Alternate` vs `Alternate`) fall back to a rank tier
/// and, ultimately, handle identity — see DESIGN.md's Open Question
/// Decisions for why this extension is safe.
pub fn cmp_nodes(a: &Handle, b: &Handle) -> Ordering {
    if Handle::ptr_eq(a, b) {
        return Ordering::Equal;
    }

    // 1. Varargs sorts before everything else.
    match (a.is_varargs(), b.is_varargs()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    // 4. Two Concats order lexicographically by (first, next).
    if let (NodeData::Concat(a1, a2, _), NodeData::Concat(b1, b2, _)) = (a.data(), b.data()) {
        let c = cmp_nodes(a1, b1);
        return if c != Ordering::Equal { c } else { cmp_nodes(a2, b2) };
    }
    // 3. A non-Concat vs a Concat orders by comparing it against Concat.first.
    if let NodeData::Concat(b1, _, _) = b.data() {
        let c = cmp_nodes(a, b1);
        return if c == Ordering::Equal { Ordering::Less } else { c };
    }
    if let NodeData::Concat(a1, _, _) = a.data() {
        let c = cmp_nodes(a1, b);
        return if c == Ordering::Equal { Ordering::Greater } else { c };
    }

    // 6. Optional vs Optional compares the children.
    if let (NodeData::Optional(ax), NodeData::Optional(bx)) = (a.data(), b.data()) {
        return cmp_nodes(ax, bx);
    }
    // 5. A non-Optional vs an Optional(x) orders by comparing it against x.
    if let NodeData::Optional(bx) = b.data() {
        let c = cmp_nodes(a, bx);
        return if c == Ordering::Equal { Ordering::Less } else { c };
    }
    if let NodeData::Optional(ax) = a.data() {
        let c = cmp_nodes(ax, b);
        return if c == Ordering::Equal { Ordering::Greater } else { c };
    }

    // Alternate vs Alternate: extend the Concat treatment (documented
    // extension, spec.md §9 leaves this pairing unspecified).
    if let (NodeData::Alternate(a1, a2), NodeData::Alternate(b1, b2)) = (a.data(), b.data()) {
        let c = cmp_nodes(a1, b1);
        return if c != Ordering::Equal { c } else { cmp_nodes(a2, b2) };
    }
    // 7. Alternate sorts after non-Alternate.
    match (a.is_alternate(), b.is_alternate()) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }

    // 2. Two Words order by (validator-present first), then bytewise literal.
    if let (NodeData::Word(wa), NodeData::Word(wb)) = (a.data(), b.data()) {
        let (va, vb) = (wa.validator.is_some(), wb.validator.is_some());
        if va != vb {
            return if va { Ordering::Less } else { Ordering::Greater };
        }
        return wa.text.as_bytes().cmp(wb.text.as_bytes());
    }
    // Plus vs Plus: compare children, then min.
    if let (NodeData::Plus(ax, amin), NodeData::Plus(bx, bmin)) = (a.data(), b.data()) {
        let c = cmp_nodes(ax, bx);
        return if c != Ordering::Equal { c } else { amin.cmp(bmin) };
    }
    // Macro vs Macro: compare names, then bodies.
    if let (NodeData::Macro(an, ab), NodeData::Macro(bn, bb)) = (a.data(), b.data()) {
        let c = an.as_bytes().cmp(bn.as_bytes());
        return if c != Ordering::Equal { c } else { cmp_nodes(ab, bb) };
    }

    // 8. Stable fallback: rank tier, then handle identity.
    let (ra, rb) = (atom_rank(a), atom_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    a.identity().cmp(&b.identity())
}

pub fn fingerprint_word(text: &str, case_insensitive: bool, needs_terminal: bool, validator_name: Option<&str>) -> Fingerprint {
    let mut h = Hasher32::new();
    h.write_u8(0);
    h.write_bytes(text.as_bytes());
    h.write_u8(case_insensitive as u8);
    h.write_u8(needs_terminal as u8);
    if let Some(name) = validator_name {
        h.write_u8(1);
        h.write_bytes(name.as_bytes());
    } else {
        h.write_u8(0);
    }
    h.finish()
}

pub fn fingerprint_varargs() -> Fingerprint {
    let mut h = Hasher32::new();
    h.write_u8(1);
    h.finish()
}

pub fn fingerprint_optional(x: Fingerprint) -> Fingerprint {
    let mut h = Hasher32::new();
    h.write_u8(2);
    h.write_fingerprint(x);
    h.finish()
}

pub fn fingerprint_plus(x: Fingerprint, min: u8) -> Fingerprint {
    let mut h = Hasher32::new();
    h.write_u8(3);
    h.write_fingerprint(x);
    h.write_u8(min);
    h.finish()
}

pub fn fingerprint_concat(a: Fingerprint, b: Fingerprint, length: u32) -> Fingerprint {
    let mut h = Hasher32::new();
    h.write_u8(4);
    h.write_fingerprint(a);
    h.write_fingerprint(b);
    h.write_u32(length);
    h.finish()
}

pub fn fingerprint_alternate(a: Fingerprint, b: Fingerprint) -> Fingerprint {
    let mut h = Hasher32::new();
    h.write_u8(5);
    h.write_fingerprint(a);
    h.write_fingerprint(b);
    h.finish()
}

pub fn fingerprint_macro(name: &str, body: Fingerprint) -> Fingerprint {
    let mut h = Hasher32::new();
    h.write_u8(6);
    h.write_bytes(name.as_bytes());
    h.write_fingerprint(body);
    h.finish()
}
