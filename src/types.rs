use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Reference to a persisted entity: "type/id" e.g. "group/g-1"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub id: String,
}

impl EntityRef {
    pub fn new(entity_type: &str, id: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (t, id) = s.split_once('/')?;
        if t.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self {
            entity_type: t.to_string(),
            id: id.to_string(),
        })
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.id)
    }
}

/// A loaded (or freshly built, not yet persisted) entity. Attributes are an
/// open JSON map so the crate stays agnostic of the consumer's schema;
/// foreign keys are plain `<parent>_id` attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub entity_type: String,
    /// None until the entity has been persisted.
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
}

impl Entity {
    pub fn new(entity_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            id: None,
            attributes: Map::new(),
        }
    }

    pub fn with_id(entity_type: &str, id: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            id: Some(id.to_string()),
            attributes: Map::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn entity_ref(&self) -> Option<EntityRef> {
        self.id.as_deref().map(|id| EntityRef::new(&self.entity_type, id))
    }

    /// "type/id", or "type/(new)" for an unpersisted entity. Used in error
    /// diagnostics and denial logs.
    pub fn describe(&self) -> String {
        match &self.id {
            Some(id) => format!("{}/{}", self.entity_type, id),
            None => format!("{}/(new)", self.entity_type),
        }
    }
}

/// A collection handle the `Repository` interprets: all entities of a type,
/// optionally narrowed to the children of one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub entity_type: String,
    pub parent: Option<EntityRef>,
}

impl Scope {
    pub fn unscoped(entity_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            parent: None,
        }
    }

    pub fn scoped(entity_type: &str, parent: EntityRef) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            parent: Some(parent),
        }
    }
}

/// Authorization verb. The set is closed except for `Other`, which carries
/// custom action names verbatim (action `rotate` checks verb `rotate`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Verb {
    Read,
    Create,
    Update,
    Delete,
    Other(String),
}

impl Verb {
    /// The action-to-verb map: show→read, new/create→create, edit/update→update,
    /// destroy→delete. Any other action name is its own verb.
    pub fn for_action(action: &str) -> Verb {
        match action {
            "show" => Verb::Read,
            "new" | "create" => Verb::Create,
            "edit" | "update" => Verb::Update,
            "destroy" => Verb::Delete,
            other => Verb::Other(other.to_string()),
        }
    }

    /// Parse a verb name as written in declaration files.
    pub fn from_name(name: &str) -> Verb {
        match name {
            "read" => Verb::Read,
            "create" => Verb::Create,
            "update" => Verb::Update,
            "delete" => Verb::Delete,
            other => Verb::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verb::Read => f.write_str("read"),
            Verb::Create => f.write_str("create"),
            Verb::Update => f.write_str("update"),
            Verb::Delete => f.write_str("delete"),
            Verb::Other(name) => f.write_str(name),
        }
    }
}

/// The per-request input to the pipeline: the action being dispatched, the
/// route/query parameter bag, and the sanitized attribute mapping the
/// controller supplies for `create`.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub action: String,
    pub params: HashMap<String, String>,
    pub attributes: Map<String, Value>,
}

impl Request {
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            ..Default::default()
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|s| s.as_str())
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref_parse() {
        let r = EntityRef::parse("group/g-1").unwrap();
        assert_eq!(r.entity_type, "group");
        assert_eq!(r.id, "g-1");
        assert_eq!(r.to_string(), "group/g-1");

        assert!(EntityRef::parse("noslash").is_none());
        assert!(EntityRef::parse("/id").is_none());
        assert!(EntityRef::parse("type/").is_none());
    }

    #[test]
    fn test_entity_describe() {
        let e = Entity::with_id("note", "n-1");
        assert_eq!(e.describe(), "note/n-1");
        assert!(e.persisted());

        let fresh = Entity::new("note");
        assert_eq!(fresh.describe(), "note/(new)");
        assert!(!fresh.persisted());
        assert!(fresh.entity_ref().is_none());
    }

    #[test]
    fn test_verb_for_action() {
        assert_eq!(Verb::for_action("show"), Verb::Read);
        assert_eq!(Verb::for_action("new"), Verb::Create);
        assert_eq!(Verb::for_action("create"), Verb::Create);
        assert_eq!(Verb::for_action("edit"), Verb::Update);
        assert_eq!(Verb::for_action("update"), Verb::Update);
        assert_eq!(Verb::for_action("destroy"), Verb::Delete);
        assert_eq!(Verb::for_action("rotate"), Verb::Other("rotate".into()));
    }

    #[test]
    fn test_verb_display_round_trip() {
        for v in [
            Verb::Read,
            Verb::Create,
            Verb::Update,
            Verb::Delete,
            Verb::Other("rotate".into()),
        ] {
            assert_eq!(Verb::from_name(&v.to_string()), v);
        }
    }

    #[test]
    fn test_request_params() {
        let req = Request::new("show").with_param("id", "n-1");
        assert_eq!(req.action, "show");
        assert_eq!(req.param("id"), Some("n-1"));
        assert_eq!(req.param("group_id"), None);
    }
}
