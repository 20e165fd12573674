//! The structured value type stored as keys and values.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A structured, immutable value.
///
/// Terms are totally ordered. The order is the contract the byte encoding
/// preserves: `a < b` implies `encode(a) < encode(b)` bytewise.
///
/// - kinds sort as `Integer < Float < Atom < Binary < Tuple < List < Map`
/// - integers numerically, floats by IEEE-754 total order
/// - atoms and binaries bytewise
/// - tuples, lists and maps element by element, a strict prefix first
///
/// Map equality and ordering do not depend on the order the pairs were given
/// in; both compare the entries sorted by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Term {
    /// Symbolic constant.
    Atom(String),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit float. NaN is representable but not encodable.
    Float(f64),
    /// Byte string.
    Binary(Vec<u8>),
    /// Fixed-size ordered group.
    Tuple(Vec<Term>),
    /// Variable-length sequence.
    List(Vec<Term>),
    /// Key/value mapping.
    Map(Vec<(Term, Term)>),
}

/// The kind of a [`Term`], in cross-kind sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TermKind {
    /// [`Term::Integer`]
    Integer,
    /// [`Term::Float`]
    Float,
    /// [`Term::Atom`]
    Atom,
    /// [`Term::Binary`]
    Binary,
    /// [`Term::Tuple`]
    Tuple,
    /// [`Term::List`]
    List,
    /// [`Term::Map`]
    Map,
}

impl Term {
    /// Creates an atom.
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    /// Creates a binary.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Term::Binary(bytes.into())
    }

    /// Creates a tuple.
    pub fn tuple(elements: impl IntoIterator<Item = Term>) -> Self {
        Term::Tuple(elements.into_iter().collect())
    }

    /// Creates a list.
    pub fn list(elements: impl IntoIterator<Item = Term>) -> Self {
        Term::List(elements.into_iter().collect())
    }

    /// Creates a map with its pairs sorted by key.
    pub fn map(pairs: impl IntoIterator<Item = (Term, Term)>) -> Self {
        let mut pairs: Vec<_> = pairs.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Term::Map(pairs)
    }

    /// Returns the kind of this term.
    pub fn kind(&self) -> TermKind {
        match self {
            Term::Integer(_) => TermKind::Integer,
            Term::Float(_) => TermKind::Float,
            Term::Atom(_) => TermKind::Atom,
            Term::Binary(_) => TermKind::Binary,
            Term::Tuple(_) => TermKind::Tuple,
            Term::List(_) => TermKind::List,
            Term::Map(_) => TermKind::Map,
        }
    }

    /// Get this term as an atom name, if it is one.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Term::Atom(a) => Some(a),
            _ => None,
        }
    }

    /// Get this term as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Term::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this term as a float, if it is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Term::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get this term as bytes, if it is a binary.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Term::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Get the elements of a tuple.
    pub fn as_tuple(&self) -> Option<&[Term]> {
        match self {
            Term::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Get the elements of a list.
    pub fn as_list(&self) -> Option<&[Term]> {
        match self {
            Term::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get the pairs of a map.
    pub fn as_map(&self) -> Option<&[(Term, Term)]> {
        match self {
            Term::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the 1-based `position`th element of a tuple.
    pub fn element(&self, position: usize) -> Option<&Term> {
        let index = position.checked_sub(1)?;
        self.as_tuple()?.get(index)
    }

    /// Looks up `key` in a map.
    pub fn get(&self, key: &Term) -> Option<&Term> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

fn sorted_entries(pairs: &[(Term, Term)]) -> Vec<&(Term, Term)> {
    let mut entries: Vec<_> = pairs.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

fn cmp_sequence<'a, A, B>(a: A, b: B) -> Ordering
where
    A: IntoIterator<Item = &'a Term>,
    B: IntoIterator<Item = &'a Term>,
{
    let mut a = a.into_iter();
    let mut b = b.into_iter();
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.cmp(y) {
                Ordering::Equal => {}
                ord => return ord,
            },
        }
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Term::Integer(a), Term::Integer(b)) => a.cmp(b),
            (Term::Float(a), Term::Float(b)) => a.total_cmp(b),
            (Term::Atom(a), Term::Atom(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Term::Binary(a), Term::Binary(b)) => a.cmp(b),
            (Term::Tuple(a), Term::Tuple(b)) | (Term::List(a), Term::List(b)) => {
                cmp_sequence(a, b)
            }
            (Term::Map(a), Term::Map(b)) => {
                // flatten each entry to key, value so a map compares like the
                // sequence its encoding writes
                let a = sorted_entries(a);
                let b = sorted_entries(b);
                cmp_sequence(
                    a.iter().flat_map(|(k, v)| [k, v]),
                    b.iter().flat_map(|(k, v)| [k, v]),
                )
            }
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Term {}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[Term]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            Term::Atom(a) => write!(f, "{a}"),
            Term::Integer(n) => write!(f, "{n}"),
            Term::Float(x) => write!(f, "{x:?}"),
            Term::Binary(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "<<{s:?}>>"),
                Err(_) => {
                    f.write_str("<<")?;
                    for (i, byte) in b.iter().enumerate() {
                        if i > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{byte}")?;
                    }
                    f.write_str(">>")
                }
            },
            Term::Tuple(t) => {
                f.write_str("{")?;
                join(f, t)?;
                f.write_str("}")
            }
            Term::List(l) => {
                f.write_str("[")?;
                join(f, l)?;
                f.write_str("]")
            }
            Term::Map(m) => {
                f.write_str("#{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k} => {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<i64> for Term {
    fn from(n: i64) -> Self {
        Term::Integer(n)
    }
}

impl From<i32> for Term {
    fn from(n: i32) -> Self {
        Term::Integer(i64::from(n))
    }
}

impl From<u32> for Term {
    fn from(n: u32) -> Self {
        Term::Integer(i64::from(n))
    }
}

impl From<f64> for Term {
    fn from(x: f64) -> Self {
        Term::Float(x)
    }
}

/// Strings become UTF-8 binaries; use [`Term::atom`] for atoms.
impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term::Binary(s.as_bytes().to_vec())
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Term::Binary(s.into_bytes())
    }
}

impl From<Vec<u8>> for Term {
    fn from(b: Vec<u8>) -> Self {
        Term::Binary(b)
    }
}

impl From<&[u8]> for Term {
    fn from(b: &[u8]) -> Self {
        Term::Binary(b.to_vec())
    }
}
