//! In-memory collaborator implementations. Used by this crate's own tests
//! and handy for consumers' tests: a typed entity table that honors parent
//! scoping through `<parent>_id` foreign-key attributes, and a grant-table
//! oracle with explicit allow tuples.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::errors::GuardError;
use crate::repository::{Oracle, Repository};
use crate::types::{Entity, EntityRef, Scope, Verb};

#[derive(Debug, Default)]
pub struct MemoryRepository {
    /// (entity_type, id) -> entity
    entities: HashMap<(String, String), Entity>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a persisted fixture. Panics on an id-less entity; fixtures are
    /// test setup, not runtime data.
    pub fn insert(&mut self, entity: Entity) -> &mut Self {
        let id = entity
            .id
            .clone()
            .expect("fixture entities must carry an id");
        self.entities
            .insert((entity.entity_type.clone(), id), entity);
        self
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Repository for MemoryRepository {
    fn find(&self, scope: &Scope, id: &str) -> Result<Entity, GuardError> {
        let not_found = || GuardError::NotFound {
            entity_type: scope.entity_type.clone(),
            id: id.to_string(),
        };
        let entity = self
            .entities
            .get(&(scope.entity_type.clone(), id.to_string()))
            .ok_or_else(not_found)?;

        // a parent-bound scope only yields that parent's children
        if let Some(parent) = &scope.parent {
            let fk = format!("{}_id", parent.entity_type);
            let owned = entity.attributes.get(&fk)
                == Some(&Value::String(parent.id.clone()));
            if !owned {
                return Err(not_found());
            }
        }
        Ok(entity.clone())
    }
}

/// Explicit allow tuples: (actor, verb, resource). Resources are "type/id",
/// or "type/*" to allow a verb on every entity of a type (including
/// unpersisted ones).
#[derive(Debug, Default)]
pub struct GrantTable {
    grants: HashSet<(String, String, String)>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&mut self, actor: &str, verb: &str, resource: &str) -> &mut Self {
        self.grants
            .insert((actor.to_string(), verb.to_string(), resource.to_string()));
        self
    }
}

impl Oracle for GrantTable {
    fn can(&self, actor: &EntityRef, verb: &Verb, resource: &Entity) -> bool {
        let actor = actor.to_string();
        let verb = verb.to_string();
        let exact = (actor.clone(), verb.clone(), resource.describe());
        let type_wide = (actor, verb, format!("{}/*", resource.entity_type));
        self.grants.contains(&exact) || self.grants.contains(&type_wide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_unscoped() {
        let mut repo = MemoryRepository::new();
        repo.insert(Entity::with_id("note", "n-1"));

        let found = repo.find(&Scope::unscoped("note"), "n-1").unwrap();
        assert_eq!(found.describe(), "note/n-1");

        let err = repo.find(&Scope::unscoped("note"), "n-2").unwrap_err();
        assert!(matches!(err, GuardError::NotFound { .. }));
    }

    #[test]
    fn test_find_scoped_checks_foreign_key() {
        let mut repo = MemoryRepository::new();
        repo.insert(Entity::with_id("note", "n-1").attr("group_id", "g-1"));

        let owner = Scope::scoped("note", EntityRef::new("group", "g-1"));
        assert!(repo.find(&owner, "n-1").is_ok());

        // id exists unscoped, but belongs to a different parent
        let stranger = Scope::scoped("note", EntityRef::new("group", "g-2"));
        let err = repo.find(&stranger, "n-1").unwrap_err();
        assert!(matches!(err, GuardError::NotFound { .. }));
    }

    #[test]
    fn test_grant_table_exact_and_wildcard() {
        let mut oracle = GrantTable::new();
        oracle
            .allow("user/alice", "read", "note/n-1")
            .allow("user/alice", "create", "note/*");

        let alice = EntityRef::new("user", "alice");
        let bob = EntityRef::new("user", "bob");
        let note = Entity::with_id("note", "n-1");
        let other = Entity::with_id("note", "n-2");
        let fresh = Entity::new("note");

        assert!(oracle.can(&alice, &Verb::Read, &note));
        assert!(!oracle.can(&alice, &Verb::Read, &other));
        assert!(!oracle.can(&alice, &Verb::Delete, &note));
        assert!(!oracle.can(&bob, &Verb::Read, &note));

        // wildcard covers the unpersisted entity built for new/create
        assert!(oracle.can(&alice, &Verb::Create, &fresh));
        assert!(oracle.can(&alice, &Verb::Create, &other));
    }
}
