//! The configuration registry: rules a controller declares once, at
//! definition time, describing which resources to load and which checks to
//! run before each action. Immutable once the controller starts serving
//! requests (clone a config to derive a specialized controller from it).

use crate::errors::GuardError;
use crate::inflect;
use crate::types::Verb;

/// Actions covered by a resource rule when no filter is declared.
pub const CRUD_ACTIONS: [&str; 6] = ["show", "new", "create", "edit", "update", "destroy"];

/// only/except action filtering for a single rule's pre-action stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionFilter {
    /// None means "all actions".
    pub only: Option<Vec<String>>,
    pub except: Vec<String>,
}

impl ActionFilter {
    pub fn only(actions: &[&str]) -> Self {
        Self {
            only: Some(actions.iter().map(|a| a.to_string()).collect()),
            except: Vec::new(),
        }
    }

    pub fn except(actions: &[&str]) -> Self {
        Self {
            only: None,
            except: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn applies_to(&self, action: &str) -> bool {
        if let Some(only) = &self.only {
            if !only.iter().any(|a| a == action) {
                return false;
            }
        }
        !self.except.iter().any(|a| a == action)
    }
}

/// One declared group of acceptable parent identities. Candidate order is
/// resolution precedence.
#[derive(Debug, Clone)]
pub struct ParentRule {
    pub candidates: Vec<String>,
    pub required: bool,
    pub verb: Verb,
    pub accessor: String,
    pub filter: ActionFilter,
}

/// An authorization check against a parent slot, run after parent loading.
/// Empty `candidates` means "whichever declared parent slot is populated".
#[derive(Debug, Clone)]
pub struct ParentAuthRule {
    pub candidates: Vec<String>,
    pub required: bool,
    pub verb: Verb,
    pub filter: ActionFilter,
}

#[derive(Debug, Clone)]
pub struct ResourceRule {
    pub filter: ActionFilter,
}

#[derive(Debug, Clone)]
pub struct ResourceAuthRule {
    /// Explicit verb; None means "derive from the action name".
    pub verb: Option<Verb>,
    /// Slot to authorize; None means the controller's singular resource slot.
    pub slot: Option<String>,
    pub filter: ActionFilter,
}

/// A synthesized scope accessor: by name, the ordered parent candidates whose
/// populated slot (if any) scopes the child collection.
#[derive(Debug, Clone)]
pub struct ScopeAccessor {
    pub name: String,
    pub candidates: Vec<String>,
}

/// Pre-action stages in registration order. Indices point into the
/// corresponding rule vectors on `ControllerConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadParent(usize),
    AuthorizeParent(usize),
    LoadResource(usize),
    AuthorizeResource(usize),
}

/// Options for `load_parent`. `required` defaults to true unless
/// `shallow`/`optional` (synonyms) is set; an explicit `required` wins.
#[derive(Debug, Clone, Default)]
pub struct ParentOptions {
    pub required: Option<bool>,
    pub shallow: bool,
    pub optional: bool,
    pub permit: Option<Verb>,
    pub accessor: Option<String>,
    pub filter: ActionFilter,
}

impl ParentOptions {
    fn resolved_required(&self) -> bool {
        self.required.unwrap_or(!(self.shallow || self.optional))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParentAuthOptions {
    pub required: Option<bool>,
    pub permit: Option<Verb>,
    pub filter: ActionFilter,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    /// None uses the default CRUD filter.
    pub filter: Option<ActionFilter>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceAuthOptions {
    pub permit: Option<Verb>,
    pub slot: Option<String>,
    /// None uses the default CRUD filter.
    pub filter: Option<ActionFilter>,
}

fn default_crud_filter() -> ActionFilter {
    ActionFilter::only(&CRUD_ACTIONS)
}

/// The declared configuration for one controller type. Built once, then read
/// on every request by the pipeline.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller name, conventionally the plural resource name.
    pub name: String,
    pub resource_singular: String,
    pub resource_plural: String,
    pub(crate) parent_rules: Vec<ParentRule>,
    pub(crate) parent_auth_rules: Vec<ParentAuthRule>,
    pub(crate) resource_rules: Vec<ResourceRule>,
    pub(crate) resource_auth_rules: Vec<ResourceAuthRule>,
    pub(crate) accessors: Vec<ScopeAccessor>,
    pub(crate) stages: Vec<Stage>,
}

impl ControllerConfig {
    pub fn new(name: &str) -> Self {
        let singular = inflect::singularize(name);
        let plural = inflect::pluralize(&singular);
        Self::with_names(name, &singular, &plural)
    }

    /// Explicit singular/plural forms, for irregular nouns.
    pub fn with_names(name: &str, singular: &str, plural: &str) -> Self {
        Self {
            name: name.to_string(),
            resource_singular: singular.to_string(),
            resource_plural: plural.to_string(),
            parent_rules: Vec::new(),
            parent_auth_rules: Vec::new(),
            resource_rules: Vec::new(),
            resource_auth_rules: Vec::new(),
            accessors: Vec::new(),
            stages: Vec::new(),
        }
    }

    /// Declare a parent-loading rule. Repeated calls accumulate independent
    /// rule groups. Zero candidates is a definition-time error.
    pub fn load_parent(
        &mut self,
        candidates: &[&str],
        opts: ParentOptions,
    ) -> Result<&mut Self, GuardError> {
        if candidates.is_empty() {
            return Err(GuardError::InvalidRule(format!(
                "load_parent for controller `{}` declares no candidate names",
                self.name
            )));
        }
        let candidates: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
        let accessor = opts
            .accessor
            .clone()
            .unwrap_or_else(|| self.resource_plural.clone());
        self.install_accessor(&accessor, &candidates);
        self.parent_rules.push(ParentRule {
            candidates,
            required: opts.resolved_required(),
            verb: opts.permit.unwrap_or(Verb::Read),
            accessor,
            filter: opts.filter,
        });
        self.stages.push(Stage::LoadParent(self.parent_rules.len() - 1));
        Ok(self)
    }

    /// Declare an authorization check on the parent slot(s). `candidates`
    /// None means "any declared parent slot".
    pub fn authorize_parent(
        &mut self,
        candidates: Option<&[&str]>,
        opts: ParentAuthOptions,
    ) -> &mut Self {
        self.parent_auth_rules.push(ParentAuthRule {
            candidates: candidates
                .map(|c| c.iter().map(|n| n.to_string()).collect())
                .unwrap_or_default(),
            required: opts.required.unwrap_or(true),
            verb: opts.permit.unwrap_or(Verb::Read),
            filter: opts.filter,
        });
        self.stages
            .push(Stage::AuthorizeParent(self.parent_auth_rules.len() - 1));
        self
    }

    /// Convenience composition: load then authorize with one declaration.
    pub fn load_and_authorize_parent(
        &mut self,
        candidates: &[&str],
        opts: ParentOptions,
    ) -> Result<&mut Self, GuardError> {
        let auth = ParentAuthOptions {
            required: Some(opts.resolved_required()),
            permit: opts.permit.clone(),
            filter: opts.filter.clone(),
        };
        self.load_parent(candidates, opts)?;
        self.authorize_parent(Some(candidates), auth);
        Ok(self)
    }

    /// Declare primary-resource loading for the CRUD actions (or a custom
    /// filter).
    pub fn load_resource(&mut self, opts: ResourceOptions) -> &mut Self {
        self.resource_rules.push(ResourceRule {
            filter: opts.filter.unwrap_or_else(default_crud_filter),
        });
        self.stages
            .push(Stage::LoadResource(self.resource_rules.len() - 1));
        self
    }

    /// Declare primary-resource authorization.
    pub fn authorize_resource(&mut self, opts: ResourceAuthOptions) -> &mut Self {
        self.resource_auth_rules.push(ResourceAuthRule {
            verb: opts.permit,
            slot: opts.slot,
            filter: opts.filter.unwrap_or_else(default_crud_filter),
        });
        self.stages
            .push(Stage::AuthorizeResource(self.resource_auth_rules.len() - 1));
        self
    }

    /// Convenience composition: load then authorize the primary resource.
    pub fn load_and_authorize_resource(&mut self, opts: ResourceOptions) -> &mut Self {
        let filter = opts.filter.clone();
        self.load_resource(opts);
        self.authorize_resource(ResourceAuthOptions {
            permit: None,
            slot: None,
            filter,
        });
        self
    }

    /// Install a scope accessor, idempotently: the first declaration of a
    /// name wins and later declarations do not overwrite it.
    fn install_accessor(&mut self, name: &str, candidates: &[String]) {
        if self.accessors.iter().any(|a| a.name == name) {
            return;
        }
        self.accessors.push(ScopeAccessor {
            name: name.to_string(),
            candidates: candidates.to_vec(),
        });
    }

    pub fn accessor(&self, name: &str) -> Option<&ScopeAccessor> {
        self.accessors.iter().find(|a| a.name == name)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn parent_rules(&self) -> &[ParentRule] {
        &self.parent_rules
    }

    /// Every candidate name across all parent rules, in declaration order.
    /// Used by parent authorization rules that name no candidates.
    pub(crate) fn all_parent_candidates(&self) -> Vec<&str> {
        self.parent_rules
            .iter()
            .flat_map(|r| r.candidates.iter().map(|c| c.as_str()))
            .collect()
    }
}
