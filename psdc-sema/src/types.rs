#![forbid(unsafe_code)]

use psdc_ast::Span;

use crate::value::{Comptime, ComptimeArray, Value};

/// Structure components shown before the listing is cut short.
const STRUCTURE_DISPLAY_LIMIT: usize = 3;

/// A canonical type, produced by evaluating a syntactic type expression.
///
/// Equality between evaluated types is semantic (see [`EvaluatedType::semantically_equals`]):
/// aliases are transparent and `Unknown` equals everything.
#[derive(Clone, Debug)]
pub enum EvaluatedType {
    /// Poisoned type; carries the extent of the type expression that failed.
    Unknown(Span),
    Void,
    Boolean,
    Character,
    Integer,
    Real,
    File,
    String,
    LengthedString(usize),
    /// `tableau[2, 3] de entier` is `Array { length: 2, item: Array { length: 3, item: Integer } }`.
    Array {
        item: Box<EvaluatedType>,
        length: usize,
    },
    /// Components in declaration order.
    Structure(Vec<(String, EvaluatedType)>),
    Alias {
        name: String,
        target: Box<EvaluatedType>,
    },
}

impl EvaluatedType {
    pub fn alias(name: impl Into<String>, target: EvaluatedType) -> Self {
        EvaluatedType::Alias {
            name: name.into(),
            target: Box::new(target),
        }
    }

    pub fn array(item: EvaluatedType, length: usize) -> Self {
        EvaluatedType::Array {
            item: Box::new(item),
            length,
        }
    }

    /// Follows alias references down to the underlying type.
    pub fn unaliased(&self) -> &EvaluatedType {
        match self {
            EvaluatedType::Alias { target, .. } => target.unaliased(),
            other => other,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.unaliased(), EvaluatedType::Unknown(_))
    }

    pub fn is_string_like(&self) -> bool {
        matches!(
            self.unaliased(),
            EvaluatedType::String | EvaluatedType::LengthedString(_)
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.unaliased(), EvaluatedType::Integer | EvaluatedType::Real)
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self.unaliased(),
            EvaluatedType::Array { .. } | EvaluatedType::Structure(_)
        )
    }

    /// Lengths of the nested array levels, outermost first.
    pub fn dimensions(&self) -> Vec<usize> {
        let mut dims = Vec::new();
        let mut ty = self.unaliased();
        while let EvaluatedType::Array { item, length } = ty {
            dims.push(*length);
            ty = item.unaliased();
        }
        dims
    }

    pub fn component(&self, name: &str) -> Option<&EvaluatedType> {
        match self.unaliased() {
            EvaluatedType::Structure(components) => components
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, ty)| ty),
            _ => None,
        }
    }

    pub fn semantically_equals(&self, other: &EvaluatedType) -> bool {
        use EvaluatedType as T;
        match (self.unaliased(), other.unaliased()) {
            (T::Unknown(_), _) | (_, T::Unknown(_)) => true,
            (T::Void, T::Void)
            | (T::Boolean, T::Boolean)
            | (T::Character, T::Character)
            | (T::Integer, T::Integer)
            | (T::Real, T::Real)
            | (T::File, T::File)
            | (T::String, T::String) => true,
            (T::LengthedString(a), T::LengthedString(b)) => a == b,
            (
                T::Array {
                    item: ai,
                    length: al,
                },
                T::Array {
                    item: bi,
                    length: bl,
                },
            ) => al == bl && ai.semantically_equals(bi),
            (T::Structure(a), T::Structure(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|((an, at), (bn, bt))| an == bn && at.semantically_equals(bt))
            }
            _ => false,
        }
    }

    /// Implicit conversion: identity, integer to real, lengthed string to string.
    pub fn is_convertible_to(&self, target: &EvaluatedType) -> bool {
        use EvaluatedType as T;
        self.semantically_equals(target)
            || matches!(
                (self.unaliased(), target.unaliased()),
                (T::Integer, T::Real) | (T::LengthedString(_), T::String)
            )
    }

    /// Convertible, or a lengthed string fitting into a longer one.
    pub fn is_assignable_to(&self, target: &EvaluatedType) -> bool {
        self.is_convertible_to(target)
            || matches!(
                (self.unaliased(), target.unaliased()),
                (EvaluatedType::LengthedString(n), EvaluatedType::LengthedString(m)) if m >= n
            )
    }

    /// Value held by a freshly declared object of this type.
    pub fn default_value(&self) -> Value {
        use EvaluatedType as T;
        match self {
            T::Boolean => Value::comptime(self.clone(), Comptime::Boolean(false)),
            T::Character => Value::comptime(self.clone(), Comptime::Character('\0')),
            T::Integer => Value::comptime(self.clone(), Comptime::Integer(0)),
            T::Real => Value::comptime(self.clone(), Comptime::Real(0.0)),
            T::String | T::LengthedString(_) | T::File => Value::garbage(self.clone()),
            T::Void => Value::runtime(self.clone()),
            T::Unknown(_) => Value::invalid(self.clone()),
            T::Array { item, length } => Value::comptime(
                self.clone(),
                Comptime::Array(ComptimeArray::filled(*length, item.default_value())),
            ),
            T::Structure(components) => Value::comptime(
                self.clone(),
                Comptime::Structure(
                    components
                        .iter()
                        .map(|(name, ty)| (name.clone(), ty.default_value()))
                        .collect(),
                ),
            ),
            T::Alias { target, .. } => {
                let mut value = target.default_value();
                value.ty = self.clone();
                value
            }
        }
    }

    pub fn runtime_value(&self) -> Value {
        Value::runtime(self.clone())
    }

    pub fn invalid_value(&self) -> Value {
        Value::invalid(self.clone())
    }

    /// Short form used in messages: aliases show their name.
    pub fn display(&self) -> String {
        use EvaluatedType as T;
        match self {
            T::Unknown(_) => "<unknown-type>".to_string(),
            T::Void => "<void>".to_string(),
            T::Boolean => "booléen".to_string(),
            T::Character => "caractère".to_string(),
            T::Integer => "entier".to_string(),
            T::Real => "réel".to_string(),
            T::File => "nomFichierLog".to_string(),
            T::String => "chaîne".to_string(),
            T::LengthedString(n) => format!("chaîne({n})"),
            T::Array { .. } => {
                let mut ty = self;
                let mut dims = String::new();
                while let T::Array { item, length } = ty {
                    dims.push_str(&format!("[{length}]"));
                    ty = item.as_ref();
                }
                format!("tableau({}){dims}", ty.display())
            }
            T::Structure(components) => {
                if components.is_empty() {
                    return "structure { }".to_string();
                }
                let shown = components
                    .iter()
                    .take(STRUCTURE_DISPLAY_LIMIT)
                    .map(|(n, t)| format!("{n}: {}", t.display()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let hidden = components.len().saturating_sub(STRUCTURE_DISPLAY_LIMIT);
                if hidden > 0 {
                    format!("structure {{ {shown}, ... ({hidden} more...) }}")
                } else {
                    format!("structure {{ {shown} }}")
                }
            }
            T::Alias { name, .. } => name.clone(),
        }
    }

    /// Long form: aliases also show what they stand for.
    pub fn display_full(&self) -> String {
        match self {
            EvaluatedType::Alias { name, target } => {
                format!("'{name}' {{aka '{}'}}", target.unaliased().display())
            }
            other => format!("'{}'", other.display()),
        }
    }
}
