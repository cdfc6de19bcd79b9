#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use crate::types::EvaluatedType;

/// Array elements shown before the listing is cut short.
const ARRAY_DISPLAY_LIMIT: usize = 8;

/// A value fully known during analysis.
#[derive(Clone, Debug)]
pub enum Comptime {
    Boolean(bool),
    Character(char),
    Integer(i32),
    Real(f64),
    String(String),
    Array(ComptimeArray),
    /// Components in declaration order.
    Structure(Vec<(String, Value)>),
}

/// Contents of a comptime array.
///
/// Only written elements are stored; every other element reads as the fill
/// value, so the cost follows the initializer and not the array length.
#[derive(Clone, Debug)]
pub struct ComptimeArray {
    length: usize,
    fill: Box<Value>,
    written: BTreeMap<usize, Value>,
}

impl ComptimeArray {
    /// `length` copies of `fill`.
    pub fn filled(length: usize, fill: Value) -> Self {
        Self {
            length,
            fill: Box::new(fill),
            written: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Element at the zero-based `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        if index >= self.length {
            return None;
        }
        Some(self.written.get(&index).unwrap_or(&*self.fill))
    }

    /// Element at the zero-based `index`, stored from now on.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        if index >= self.length {
            return None;
        }
        let fill = &self.fill;
        Some(
            self.written
                .entry(index)
                .or_insert_with(|| Value::clone(fill)),
        )
    }

    /// Number of elements stored apart from the fill value.
    pub fn written_len(&self) -> usize {
        self.written.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> + '_ {
        (0..self.length).filter_map(|i| self.get(i))
    }
}

#[derive(Clone, Debug)]
pub enum ValueStatus {
    Comptime(Comptime),
    /// Type known, value only known at run time.
    Runtime,
    /// Uninitialized contents of a declared object.
    Garbage,
    /// Result of an erroneous expression. Never triggers follow-up errors.
    Invalid,
}

#[derive(Clone, Debug)]
pub struct Value {
    pub ty: EvaluatedType,
    pub status: ValueStatus,
}

impl Value {
    pub fn comptime(ty: EvaluatedType, value: Comptime) -> Self {
        Self {
            ty,
            status: ValueStatus::Comptime(value),
        }
    }

    pub fn runtime(ty: EvaluatedType) -> Self {
        Self {
            ty,
            status: ValueStatus::Runtime,
        }
    }

    pub fn garbage(ty: EvaluatedType) -> Self {
        Self {
            ty,
            status: ValueStatus::Garbage,
        }
    }

    pub fn invalid(ty: EvaluatedType) -> Self {
        Self {
            ty,
            status: ValueStatus::Invalid,
        }
    }

    pub fn boolean(b: bool) -> Self {
        Self::comptime(EvaluatedType::Boolean, Comptime::Boolean(b))
    }

    pub fn integer(n: i32) -> Self {
        Self::comptime(EvaluatedType::Integer, Comptime::Integer(n))
    }

    pub fn real(x: f64) -> Self {
        Self::comptime(EvaluatedType::Real, Comptime::Real(x))
    }

    pub fn character(c: char) -> Self {
        Self::comptime(EvaluatedType::Character, Comptime::Character(c))
    }

    /// String literals are typed by their length.
    pub fn string(s: impl Into<String>) -> Self {
        let s = s.into();
        let len = s.chars().count();
        Self::comptime(EvaluatedType::LengthedString(len), Comptime::String(s))
    }

    pub fn as_comptime(&self) -> Option<&Comptime> {
        match &self.status {
            ValueStatus::Comptime(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_comptime(&self) -> bool {
        matches!(self.status, ValueStatus::Comptime(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.status, ValueStatus::Invalid)
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self.as_comptime()? {
            Comptime::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self.as_comptime()? {
            Comptime::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self.as_comptime()? {
            Comptime::Real(x) => Some(*x),
            Comptime::Integer(n) => Some(f64::from(*n)),
            _ => None,
        }
    }

    pub fn as_character(&self) -> Option<char> {
        match self.as_comptime()? {
            Comptime::Character(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.as_comptime()? {
            Comptime::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn elements(&self) -> Option<&ComptimeArray> {
        match self.as_comptime()? {
            Comptime::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn component(&self, name: &str) -> Option<&Value> {
        match self.as_comptime()? {
            Comptime::Structure(components) => components
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Retypes a value already known to be assignable to `target`,
    /// promoting comptime integers to reals.
    pub fn converted_to(&self, target: &EvaluatedType) -> Value {
        let status = match (&self.status, target.unaliased()) {
            (ValueStatus::Comptime(Comptime::Integer(n)), EvaluatedType::Real) => {
                ValueStatus::Comptime(Comptime::Real(f64::from(*n)))
            }
            (status, _) => status.clone(),
        };
        Value {
            ty: target.clone(),
            status,
        }
    }
}

impl fmt::Display for Comptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comptime::Boolean(true) => f.write_str("vrai"),
            Comptime::Boolean(false) => f.write_str("faux"),
            Comptime::Character(c) => write!(f, "'{}'", c.escape_default()),
            Comptime::Integer(n) => write!(f, "{n}"),
            Comptime::Real(x) => write!(f, "{x:?}"),
            Comptime::String(s) => write!(f, "\"{}\"", s.escape_default()),
            Comptime::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().take(ARRAY_DISPLAY_LIMIT).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item.status)?;
                }
                if items.len() > ARRAY_DISPLAY_LIMIT {
                    write!(f, ", ({} more...)", items.len() - ARRAY_DISPLAY_LIMIT)?;
                }
                f.write_str("}")
            }
            Comptime::Structure(components) => {
                f.write_str("{")?;
                for (i, (name, value)) in components.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, ".{name} := {}", value.status)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl fmt::Display for ValueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueStatus::Comptime(c) => write!(f, "{c}"),
            ValueStatus::Runtime => f.write_str("<runtime>"),
            ValueStatus::Garbage => f.write_str("<garbage>"),
            ValueStatus::Invalid => f.write_str("<invalid>"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.status, self.ty.display())
    }
}
