//! Runtime value representation (§3 "Value").
//!
//! Heap-allocated variants carry a [`HeapId`] handle into the arena in
//! `heap.rs` rather than an owned payload, so `Value` itself is cheap to
//! clone: unlike the teacher's `Value`, nothing here is reference-counted.
//! See `heap.rs` for why that tracking was dropped.

use std::{fmt, rc::Rc};

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::heap::HeapId;

/// A Nemo integer: a machine word that promotes to arbitrary precision on
/// overflow and demotes back when the result fits again (§10.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Integer {
    Small(i64),
    Big(BigInt),
}

impl Integer {
    #[must_use]
    pub fn small(n: i64) -> Self {
        Self::Small(n)
    }

    fn normalize(big: BigInt) -> Self {
        match big.to_i64() {
            Some(n) => Self::Small(n),
            None => Self::Big(big),
        }
    }

    #[must_use]
    pub fn to_big(&self) -> BigInt {
        match self {
            Self::Small(n) => BigInt::from(*n),
            Self::Big(b) => b.clone(),
        }
    }

    #[must_use]
    pub fn to_f64(&self) -> f64 {
        match self {
            Self::Small(n) => *n as f64,
            Self::Big(b) => b.to_f64().unwrap_or(f64::INFINITY),
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Small(n) => *n == 0,
            Self::Big(b) => b.is_zero(),
        }
    }

    #[must_use]
    pub fn checked_add(&self, other: &Self) -> Self {
        if let (Self::Small(a), Self::Small(b)) = (self, other)
            && let Some(r) = a.checked_add(*b)
        {
            return Self::Small(r);
        }
        Self::normalize(self.to_big() + other.to_big())
    }

    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Self {
        if let (Self::Small(a), Self::Small(b)) = (self, other)
            && let Some(r) = a.checked_sub(*b)
        {
            return Self::Small(r);
        }
        Self::normalize(self.to_big() - other.to_big())
    }

    #[must_use]
    pub fn checked_mul(&self, other: &Self) -> Self {
        if let (Self::Small(a), Self::Small(b)) = (self, other)
            && let Some(r) = a.checked_mul(*b)
        {
            return Self::Small(r);
        }
        Self::normalize(self.to_big() * other.to_big())
    }

    /// Floored division, matching Smalltalk's `//`.
    #[must_use]
    pub fn div_floor(&self, other: &Self) -> Self {
        use num_integer::Integer as _;
        Self::normalize(self.to_big().div_floor(&other.to_big()))
    }

    /// Floored modulo, matching Smalltalk's `\\`.
    #[must_use]
    pub fn mod_floor(&self, other: &Self) -> Self {
        use num_integer::Integer as _;
        Self::normalize(self.to_big().mod_floor(&other.to_big()))
    }

    #[must_use]
    pub fn neg(&self) -> Self {
        match self {
            Self::Small(n) => n.checked_neg().map_or_else(|| Self::normalize(-self.to_big()), Self::Small),
            Self::Big(b) => Self::normalize(-b),
        }
    }

    #[must_use]
    pub fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Self::Small(a), Self::Small(b)) => a.cmp(b),
            _ => self.to_big().cmp(&other.to_big()),
        }
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small(n) => write!(f, "{n}"),
            Self::Big(b) => write!(f, "{b}"),
        }
    }
}

/// A runtime value (§3 "Value"). `Clone` is cheap: immediates are inline,
/// strings/symbols are `Rc<str>`, and the rest are `Copy` arena handles.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(Integer),
    Float(f64),
    Boolean(bool),
    Nil,
    /// Immutable byte sequence, 1-indexed at the language level.
    String(Rc<str>),
    /// Interned by content equality, not by pointer — two `#foo` literals
    /// compare equal regardless of where they were parsed.
    Symbol(Rc<str>),
    Array(HeapId),
    Table(HeapId),
    Block(HeapId),
    Class(HeapId),
    Instance(HeapId),
}

impl Value {
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::Boolean(_) => "Boolean",
            Self::Nil => "UndefinedObject",
            Self::String(_) => "String",
            Self::Symbol(_) => "Symbol",
            Self::Array(_) => "Array",
            Self::Table(_) => "Table",
            Self::Block(_) => "Block",
            Self::Class(_) => "Class",
            Self::Instance(_) => "Object",
        }
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(Integer::Small(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Rc::from(s))
    }
}
