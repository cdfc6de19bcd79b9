#![forbid(unsafe_code)]

//! Cursor over the shape of an aggregate being filled by a braced
//! initializer.

use crate::types::EvaluatedType;
use crate::value::{Comptime, Value, ValueStatus};

/// One level of an [`InitializerPath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathStep {
    /// Zero-based array index.
    Index(usize),
    Component(String),
}

/// Why a designator cannot select a sub-object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DesignatorError {
    /// One-based `index` outside `1..=length`.
    IndexOutOfBounds { index: i32, length: usize },
    NoSuchComponent,
    /// Array designator on a structure, or the other way around.
    WrongAggregate,
}

/// Resolves the one-based array designator `[index]` against `aggregate`.
pub fn index_step(
    aggregate: &EvaluatedType,
    index: i32,
) -> Result<(PathStep, &EvaluatedType), DesignatorError> {
    let EvaluatedType::Array { item, length } = aggregate.unaliased() else {
        return Err(DesignatorError::WrongAggregate);
    };
    match usize::try_from(index) {
        Ok(i) if (1..=*length).contains(&i) => Ok((PathStep::Index(i - 1), item.as_ref())),
        _ => Err(DesignatorError::IndexOutOfBounds {
            index,
            length: *length,
        }),
    }
}

/// Resolves the structure designator `.name` against `aggregate`.
pub fn component_step<'t>(
    aggregate: &'t EvaluatedType,
    name: &str,
) -> Result<(PathStep, &'t EvaluatedType), DesignatorError> {
    let EvaluatedType::Structure(components) = aggregate.unaliased() else {
        return Err(DesignatorError::WrongAggregate);
    };
    components
        .iter()
        .find(|(n, _)| n == name)
        .map(|(n, ty)| (PathStep::Component(n.clone()), ty))
        .ok_or(DesignatorError::NoSuchComponent)
}

fn step_type<'t>(aggregate: &'t EvaluatedType, step: &PathStep) -> Option<&'t EvaluatedType> {
    match (aggregate.unaliased(), step) {
        (EvaluatedType::Array { item, length }, PathStep::Index(i)) if i < length => {
            Some(item.as_ref())
        }
        (EvaluatedType::Structure(components), PathStep::Component(name)) => components
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| ty),
        _ => None,
    }
}

fn first_step(aggregate: &EvaluatedType) -> Option<(PathStep, &EvaluatedType)> {
    match aggregate.unaliased() {
        EvaluatedType::Array { item, length } if *length > 0 => {
            Some((PathStep::Index(0), item.as_ref()))
        }
        EvaluatedType::Structure(components) => components
            .first()
            .map(|(n, ty)| (PathStep::Component(n.clone()), ty)),
        _ => None,
    }
}

fn next_step<'t>(
    aggregate: &'t EvaluatedType,
    current: &PathStep,
) -> Option<(PathStep, &'t EvaluatedType)> {
    match (aggregate.unaliased(), current) {
        (EvaluatedType::Array { item, length }, PathStep::Index(i)) => {
            (i + 1 < *length).then(|| (PathStep::Index(i + 1), item.as_ref()))
        }
        (EvaluatedType::Structure(components), PathStep::Component(name)) => {
            let pos = components.iter().position(|(n, _)| n == name)?;
            components
                .get(pos + 1)
                .map(|(n, ty)| (PathStep::Component(n.clone()), ty))
        }
        _ => None,
    }
}

/// A position inside an aggregate: a first step, an optional path into the
/// sub-aggregate it selects, and the type found at the end.
#[derive(Clone, Debug)]
pub struct InitializerPath {
    first: PathStep,
    rest: Option<Box<InitializerPath>>,
    ty: EvaluatedType,
}

impl InitializerPath {
    /// First element or component of `aggregate`, if it has any.
    pub fn first_object(aggregate: &EvaluatedType) -> Option<Self> {
        let (first, ty) = first_step(aggregate)?;
        Some(Self {
            first,
            rest: None,
            ty: ty.clone(),
        })
    }

    /// Builds a path from resolved designator steps; `leaf` is the type
    /// selected by the last one.
    pub fn from_steps(steps: Vec<PathStep>, leaf: EvaluatedType) -> Option<Self> {
        let mut steps = steps.into_iter().rev();
        let mut path = Self {
            first: steps.next()?,
            rest: None,
            ty: leaf,
        };
        for step in steps {
            path = Self {
                first: step,
                ty: path.ty.clone(),
                rest: Some(Box::new(path)),
            };
        }
        Some(path)
    }

    /// Type of the object at the end of the path.
    pub fn ty(&self) -> &EvaluatedType {
        &self.ty
    }

    pub fn steps(&self) -> Vec<&PathStep> {
        let mut steps = vec![&self.first];
        let mut rest = self.rest.as_deref();
        while let Some(path) = rest {
            steps.push(&path.first);
            rest = path.rest.as_deref();
        }
        steps
    }

    /// Next position in natural order, innermost level first. `None` once
    /// the last element of `aggregate` has been passed.
    pub fn advance(&self, aggregate: &EvaluatedType) -> Option<Self> {
        if let Some(rest) = &self.rest {
            let inner = step_type(aggregate, &self.first)?;
            if let Some(next) = rest.advance(inner) {
                return Some(Self {
                    first: self.first.clone(),
                    ty: next.ty.clone(),
                    rest: Some(Box::new(next)),
                });
            }
        }
        let (first, ty) = next_step(aggregate, &self.first)?;
        Some(Self {
            first,
            rest: None,
            ty: ty.clone(),
        })
    }

    /// Writes `value` at this position of `target`. Stops without writing as
    /// soon as an ancestor on the path is not comptime.
    pub fn set_value(&self, target: &mut Value, value: Value) {
        let ValueStatus::Comptime(aggregate) = &mut target.status else {
            return;
        };
        let slot = match (aggregate, &self.first) {
            (Comptime::Array(items), PathStep::Index(i)) => items.get_mut(*i),
            (Comptime::Structure(components), PathStep::Component(name)) => components
                .iter_mut()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v),
            _ => None,
        };
        let Some(slot) = slot else {
            return;
        };
        match &self.rest {
            Some(rest) => rest.set_value(slot, value),
            None => *slot = value,
        }
    }

    /// Value at this position of `target`, if every ancestor is comptime.
    pub fn get_value<'v>(&self, target: &'v Value) -> Option<&'v Value> {
        let slot = match (target.as_comptime()?, &self.first) {
            (Comptime::Array(items), PathStep::Index(i)) => items.get(*i),
            (Comptime::Structure(components), PathStep::Component(name)) => components
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v),
            _ => None,
        }?;
        match &self.rest {
            Some(rest) => rest.get_value(slot),
            None => Some(slot),
        }
    }
}
