//! Axum glue: one state object bundling the compiled controller registry
//! with the repository/oracle/actor collaborators. Handlers call `enforce`
//! before their action body; `GuardError` already renders as a response.

use std::collections::HashMap;
use std::path::Path;

use crate::errors::GuardError;
use crate::loader;
use crate::pipeline::{self, RequestContext};
use crate::registry::ControllerConfig;
use crate::repository::{ActorProvider, Oracle, Repository};
use crate::types::Request;

/// Shared application state, typically wrapped in an `Arc` and handed to the
/// router. Read-only once built.
pub struct GuardState<R, O, A> {
    pub controllers: HashMap<String, ControllerConfig>,
    pub repository: R,
    pub oracle: O,
    pub actors: A,
}

impl<R, O, A> GuardState<R, O, A>
where
    R: Repository,
    O: Oracle,
    A: ActorProvider,
{
    pub fn new(
        controllers: HashMap<String, ControllerConfig>,
        repository: R,
        oracle: O,
        actors: A,
    ) -> Self {
        Self {
            controllers,
            repository,
            oracle,
            actors,
        }
    }

    /// Build the registry from a KDL declarations directory.
    pub fn from_declarations(
        dir: &Path,
        repository: R,
        oracle: O,
        actors: A,
    ) -> Result<Self, GuardError> {
        Ok(Self::new(
            loader::load_declarations(dir)?,
            repository,
            oracle,
            actors,
        ))
    }

    /// Run the declared pipeline for one request. The returned context holds
    /// the loaded entity slots for the action body.
    pub fn enforce(
        &self,
        controller: &str,
        request: &Request,
    ) -> Result<RequestContext, GuardError> {
        let config = self.controllers.get(controller).ok_or_else(|| {
            GuardError::InvalidRule(format!(
                "no declarations registered for controller `{controller}`"
            ))
        })?;
        let actor = self.actors.current_actor();
        pipeline::run(config, &self.repository, &self.oracle, &actor, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{GrantTable, MemoryRepository};
    use crate::registry::ResourceOptions;
    use crate::types::{Entity, EntityRef};

    fn state() -> GuardState<MemoryRepository, GrantTable, EntityRef> {
        let mut repo = MemoryRepository::new();
        repo.insert(Entity::with_id("note", "n-1"));

        let mut oracle = GrantTable::new();
        oracle.allow("user/alice", "read", "note/n-1");

        let mut config = ControllerConfig::new("notes");
        config.load_and_authorize_resource(ResourceOptions::default());

        GuardState::new(
            HashMap::from([("notes".to_string(), config)]),
            repo,
            oracle,
            EntityRef::new("user", "alice"),
        )
    }

    #[test]
    fn test_enforce_populates_slots() {
        let state = state();
        let request = Request::new("show").with_param("id", "n-1");
        let ctx = state.enforce("notes", &request).unwrap();
        assert_eq!(ctx.get("note").unwrap().describe(), "note/n-1");
    }

    #[test]
    fn test_enforce_denies_missing_grant() {
        let state = state();
        let request = Request::new("destroy").with_param("id", "n-1");
        let err = state.enforce("notes", &request).unwrap_err();
        assert!(matches!(err, GuardError::AccessDenied { .. }));
    }

    #[test]
    fn test_enforce_unknown_controller_is_config_error() {
        let state = state();
        let err = state.enforce("widgets", &Request::new("show")).unwrap_err();
        assert!(matches!(err, GuardError::InvalidRule(_)));
    }
}
