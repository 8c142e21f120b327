//! Collaborator contracts. The crate never talks to a data store or a
//! permission backend directly; the hosting application supplies these.

use serde_json::Value;

use crate::errors::GuardError;
use crate::types::{Entity, EntityRef, Scope, Verb};

/// Abstract data-store capability: fetch one entity within a scope, or build
/// a fresh unpersisted one from it. A scope with a parent must only yield
/// that parent's children.
pub trait Repository {
    /// Fails with `GuardError::NotFound` when the id does not resolve inside
    /// the scope.
    fn find(&self, scope: &Scope, id: &str) -> Result<Entity, GuardError>;

    /// Build a new, unpersisted entity belonging to the scope. The default
    /// pre-fills the parent foreign key when the scope is parent-bound.
    fn build(&self, scope: &Scope) -> Entity {
        let mut entity = Entity::new(&scope.entity_type);
        if let Some(parent) = &scope.parent {
            entity.attributes.insert(
                format!("{}_id", parent.entity_type),
                Value::String(parent.id.clone()),
            );
        }
        entity
    }
}

/// The boolean authorization predicate. Implementations decide however they
/// like (roles, ownership, grants); the pipeline only asks yes/no.
pub trait Oracle {
    fn can(&self, actor: &EntityRef, verb: &Verb, resource: &Entity) -> bool;
}

/// Closures work as oracles, which keeps test setups short.
impl<F> Oracle for F
where
    F: Fn(&EntityRef, &Verb, &Entity) -> bool,
{
    fn can(&self, actor: &EntityRef, verb: &Verb, resource: &Entity) -> bool {
        self(actor, verb, resource)
    }
}

/// Supplies the actor for the current request (typically read from the
/// session by the hosting framework).
pub trait ActorProvider {
    fn current_actor(&self) -> EntityRef;
}

impl ActorProvider for EntityRef {
    fn current_actor(&self) -> EntityRef {
        self.clone()
    }
}
