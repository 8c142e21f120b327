//! The request-time pipeline: load parent, authorize parent, load primary
//! resource, authorize primary resource. Stages run in declaration order,
//! filtered by action name; the first failure aborts the rest.

use std::collections::HashMap;

use crate::errors::GuardError;
use crate::registry::{
    ControllerConfig, ParentAuthRule, ParentRule, ResourceAuthRule, Stage,
};
use crate::repository::{Oracle, Repository};
use crate::scope;
use crate::types::{Entity, EntityRef, Request, Scope, Verb};

/// Per-request resolution state: entity slots keyed by name (one per parent
/// candidate, plus the controller's singular resource name). Owned by one
/// request, discarded with it.
#[derive(Debug, Default)]
pub struct RequestContext {
    slots: HashMap<String, Entity>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: &str) -> Option<&Entity> {
        self.slots.get(slot)
    }

    pub fn insert(&mut self, slot: String, entity: Entity) {
        self.slots.insert(slot, entity);
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Run every registered stage whose action filter covers the request's
/// action, in registration order, stopping at the first failure. On success
/// the returned context holds the populated slots for the action body.
pub fn run<R, O>(
    config: &ControllerConfig,
    repository: &R,
    oracle: &O,
    actor: &EntityRef,
    request: &Request,
) -> Result<RequestContext, GuardError>
where
    R: Repository + ?Sized,
    O: Oracle + ?Sized,
{
    let mut ctx = RequestContext::new();
    for stage in config.stages() {
        match *stage {
            Stage::LoadParent(i) => {
                let rule = &config.parent_rules[i];
                if rule.filter.applies_to(&request.action) {
                    load_parent(rule, repository, request, &mut ctx)?;
                }
            }
            Stage::AuthorizeParent(i) => {
                let rule = &config.parent_auth_rules[i];
                if rule.filter.applies_to(&request.action) {
                    authorize_parent(config, rule, oracle, actor, &ctx)?;
                }
            }
            Stage::LoadResource(i) => {
                let rule = &config.resource_rules[i];
                if rule.filter.applies_to(&request.action) {
                    load_resource(config, repository, request, &mut ctx)?;
                }
            }
            Stage::AuthorizeResource(i) => {
                let rule = &config.resource_auth_rules[i];
                if rule.filter.applies_to(&request.action) {
                    authorize_resource(config, rule, oracle, actor, request, &ctx)?;
                }
            }
        }
    }
    Ok(ctx)
}

/// First-match-wins: the first candidate whose `<name>_id` parameter is
/// present is fetched into its slot; later candidates are not consulted.
fn load_parent<R: Repository + ?Sized>(
    rule: &ParentRule,
    repository: &R,
    request: &Request,
    ctx: &mut RequestContext,
) -> Result<(), GuardError> {
    for candidate in &rule.candidates {
        let param = format!("{candidate}_id");
        if let Some(id) = request.param(&param) {
            let entity = repository.find(&Scope::unscoped(candidate), id)?;
            tracing::debug!(parent = %candidate, id = %id, "resolved parent");
            ctx.insert(candidate.clone(), entity);
            return Ok(());
        }
    }
    if rule.required {
        return Err(GuardError::MissingParameter {
            candidates: rule
                .candidates
                .iter()
                .map(|c| format!(":{c}_id"))
                .collect(),
        });
    }
    Ok(())
}

/// An empty slot is an error only when the rule requires a parent; the empty
/// case never reaches the oracle.
fn authorize_parent<O: Oracle + ?Sized>(
    config: &ControllerConfig,
    rule: &ParentAuthRule,
    oracle: &O,
    actor: &EntityRef,
    ctx: &RequestContext,
) -> Result<(), GuardError> {
    let parent = if rule.candidates.is_empty() {
        config
            .all_parent_candidates()
            .into_iter()
            .find_map(|c| ctx.get(c))
    } else {
        rule.candidates.iter().find_map(|c| ctx.get(c))
    };

    match parent {
        None if rule.required => Err(GuardError::MissingParent),
        None => Ok(()),
        Some(entity) => check(oracle, actor, &rule.verb, entity),
    }
}

fn load_resource<R: Repository + ?Sized>(
    config: &ControllerConfig,
    repository: &R,
    request: &Request,
    ctx: &mut RequestContext,
) -> Result<(), GuardError> {
    let resolved = match request.action.as_str() {
        "new" => Some(repository.build(&scope::resolve_resource(config, ctx))),
        "create" => {
            let mut entity = repository.build(&scope::resolve_resource(config, ctx));
            for (key, value) in &request.attributes {
                entity.attributes.insert(key.clone(), value.clone());
            }
            Some(entity)
        }
        _ => match request.param("id") {
            Some(id) => Some(repository.find(&scope::resolve_resource(config, ctx), id)?),
            // collection actions like index leave the slot empty
            None => None,
        },
    };

    if let Some(entity) = resolved {
        tracing::debug!(resource = %entity.describe(), action = %request.action, "resolved resource");
        ctx.insert(config.resource_singular.clone(), entity);
    }
    Ok(())
}

/// A missing slot or an undeterminable verb here is a wiring mistake, not an
/// access-control decision, hence the distinct error.
fn authorize_resource<O: Oracle + ?Sized>(
    config: &ControllerConfig,
    rule: &ResourceAuthRule,
    oracle: &O,
    actor: &EntityRef,
    request: &Request,
    ctx: &RequestContext,
) -> Result<(), GuardError> {
    let slot = rule.slot.as_deref().unwrap_or(&config.resource_singular);
    let entity = ctx.get(slot).ok_or_else(|| {
        GuardError::UnresolvedAuthorization(format!(
            "no resource loaded in slot `{slot}` for action `{}`",
            request.action
        ))
    })?;

    let verb = match &rule.verb {
        Some(verb) => verb.clone(),
        None if request.action.is_empty() => {
            return Err(GuardError::UnresolvedAuthorization(
                "no verb declared and the request carries no action name".into(),
            ));
        }
        None => Verb::for_action(&request.action),
    };

    check(oracle, actor, &verb, entity)
}

fn check<O: Oracle + ?Sized>(
    oracle: &O,
    actor: &EntityRef,
    verb: &Verb,
    entity: &Entity,
) -> Result<(), GuardError> {
    if oracle.can(actor, verb, entity) {
        return Ok(());
    }
    tracing::warn!(actor = %actor, verb = %verb, resource = %entity.describe(), "access denied");
    Err(GuardError::AccessDenied {
        actor: actor.to_string(),
        verb: verb.to_string(),
        resource: entity.describe(),
    })
}
