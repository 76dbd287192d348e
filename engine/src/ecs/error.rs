use std::fmt;

use crate::ecs::entity::{Entity, Range};

/// Errors reported by storage operations.
///
/// The runtime turns these into [`Violation`](crate::ecs::contract::Violation)s for its
/// diagnostics hook; code driving pools directly can match on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Two different values were staged for a single-value component in the same cycle.
    Conflict { component: &'static str },
    /// A component was expected on an entity that does not have it.
    Missing {
        component: &'static str,
        entity: Entity,
    },
    /// A global component has no value yet.
    Unset { component: &'static str },
    /// An entity-scoped operation was applied to a global component.
    NotEntityScoped {
        component: &'static str,
        range: Range,
    },
    /// A commit left a pool whose value count does not match its entities.
    Corrupt {
        component: &'static str,
        entities: usize,
        values: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Conflict { component } => write!(
                f,
                "conflicting values staged for single-value component {component}"
            ),
            Error::Missing { component, entity } => {
                write!(f, "entity {entity} has no {component} component")
            }
            Error::Unset { component } => write!(f, "global component {component} has no value"),
            Error::NotEntityScoped { component, range } => write!(
                f,
                "global component {component} can not be attached to entities {}..={}",
                range.first(),
                range.last()
            ),
            Error::Corrupt {
                component,
                entities,
                values,
            } => write!(
                f,
                "pool for {component} holds {values} values for {entities} entities"
            ),
        }
    }
}

impl std::error::Error for Error {}
