//! Scope-accessor synthesis: given an accessor name declared by a parent
//! rule, resolve the collection scope for the current request. Pure read
//! over the request context; callable any number of times.

use crate::inflect;
use crate::pipeline::RequestContext;
use crate::registry::{ControllerConfig, ScopeAccessor};
use crate::types::{EntityRef, Scope};

/// Resolve the scope behind `accessor_name` for the current request: the
/// first declared parent candidate with a populated slot wins and scopes the
/// child collection; with no populated slot (shallow route, or no accessor
/// declared at all) the scope is the unscoped collection of the entity type
/// derived from the accessor name.
pub fn resolve(config: &ControllerConfig, ctx: &RequestContext, accessor_name: &str) -> Scope {
    let entity_type = inflect::singularize(accessor_name);
    if let Some(accessor) = config.accessor(accessor_name) {
        if let Some(parent_ref) = first_bound_parent(accessor, ctx) {
            return Scope::scoped(&entity_type, parent_ref);
        }
    }
    Scope::unscoped(&entity_type)
}

/// Resolve the scope for the controller's primary resource. Prefers the
/// accessor named after the plural resource name; when every parent rule
/// declared a custom accessor name, the first registered accessor still
/// carries the parent scoping (a populated parent slot must never be
/// silently ignored). The entity type is always the controller's singular
/// resource name.
pub fn resolve_resource(config: &ControllerConfig, ctx: &RequestContext) -> Scope {
    let accessor = config
        .accessor(&config.resource_plural)
        .or_else(|| config.accessors.first());
    if let Some(accessor) = accessor {
        if let Some(parent_ref) = first_bound_parent(accessor, ctx) {
            return Scope::scoped(&config.resource_singular, parent_ref);
        }
    }
    Scope::unscoped(&config.resource_singular)
}

/// First candidate (in declared order) with a populated, persisted slot.
fn first_bound_parent(accessor: &ScopeAccessor, ctx: &RequestContext) -> Option<EntityRef> {
    accessor
        .candidates
        .iter()
        .find_map(|candidate| ctx.get(candidate))
        .and_then(|parent| parent.entity_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParentOptions;
    use crate::types::{Entity, EntityRef};

    fn config_with_candidates() -> ControllerConfig {
        let mut config = ControllerConfig::new("notes");
        config
            .load_parent(&["person", "group"], ParentOptions::default())
            .unwrap();
        config
    }

    #[test]
    fn test_first_populated_candidate_scopes() {
        let config = config_with_candidates();
        let mut ctx = RequestContext::new();
        ctx.insert("group".into(), Entity::with_id("group", "g-1"));

        let scope = resolve(&config, &ctx, "notes");
        assert_eq!(scope, Scope::scoped("note", EntityRef::new("group", "g-1")));
    }

    #[test]
    fn test_candidate_order_is_precedence() {
        let config = config_with_candidates();
        let mut ctx = RequestContext::new();
        ctx.insert("person".into(), Entity::with_id("person", "p-1"));
        ctx.insert("group".into(), Entity::with_id("group", "g-1"));

        let scope = resolve(&config, &ctx, "notes");
        assert_eq!(scope.parent, Some(EntityRef::new("person", "p-1")));
    }

    #[test]
    fn test_no_populated_slot_falls_back_to_unscoped() {
        let config = config_with_candidates();
        let ctx = RequestContext::new();
        assert_eq!(resolve(&config, &ctx, "notes"), Scope::unscoped("note"));
    }

    #[test]
    fn test_unknown_accessor_is_unscoped() {
        let config = ControllerConfig::new("notes");
        let ctx = RequestContext::new();
        assert_eq!(resolve(&config, &ctx, "stories"), Scope::unscoped("story"));
    }

    #[test]
    fn test_resource_scope_prefers_plural_accessor() {
        let config = config_with_candidates();
        let mut ctx = RequestContext::new();
        ctx.insert("group".into(), Entity::with_id("group", "g-1"));

        let scope = resolve_resource(&config, &ctx);
        assert_eq!(scope, Scope::scoped("note", EntityRef::new("group", "g-1")));
    }

    #[test]
    fn test_resource_scope_uses_custom_accessor_when_no_plural_one() {
        let mut config = ControllerConfig::new("notes");
        config
            .load_parent(
                &["group"],
                ParentOptions {
                    accessor: Some("group_notes".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let mut ctx = RequestContext::new();
        ctx.insert("group".into(), Entity::with_id("group", "g-1"));

        // the populated parent slot still scopes the primary resource, and
        // the entity type comes from the controller, not the accessor name
        let scope = resolve_resource(&config, &ctx);
        assert_eq!(scope, Scope::scoped("note", EntityRef::new("group", "g-1")));
    }

    #[test]
    fn test_resource_scope_without_parent_rules_is_unscoped() {
        let config = ControllerConfig::new("notes");
        let ctx = RequestContext::new();
        assert_eq!(resolve_resource(&config, &ctx), Scope::unscoped("note"));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let config = config_with_candidates();
        let mut ctx = RequestContext::new();
        ctx.insert("group".into(), Entity::with_id("group", "g-1"));

        let first = resolve(&config, &ctx, "notes");
        let second = resolve(&config, &ctx, "notes");
        assert_eq!(first, second);
    }
}
