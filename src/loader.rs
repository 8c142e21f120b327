//! File-driven declarations: `controller` nodes in KDL files declare the
//! same rules the `ControllerConfig` builder declares in code. Loaded once
//! at startup into an immutable registry.
//!
//! ```kdl
//! controller "notes" {
//!     load-and-authorize-parent permit="read" {
//!         candidates {
//!             - "person"
//!             - "group"
//!         }
//!     }
//!     load-and-authorize-resource
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use kdl::KdlDocument;

use crate::errors::GuardError;
use crate::registry::{
    ActionFilter, ControllerConfig, ParentAuthOptions, ParentOptions, ResourceAuthOptions,
    ResourceOptions,
};
use crate::types::Verb;

/// Load every `.kdl` file in the directory (sorted order) and compile the
/// `controller` declarations into one registry. A controller may appear in
/// several files; its rules accumulate in file order.
pub fn load_declarations(dir: &Path) -> Result<HashMap<String, ControllerConfig>, GuardError> {
    if !dir.is_dir() {
        return Err(GuardError::InvalidDeclaration(format!(
            "declarations directory `{}` does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut registry = HashMap::new();
    let mut file_count = 0;

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "kdl")
                .unwrap_or(false)
        })
        .collect();
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        let contents =
            std::fs::read_to_string(&path).map_err(|source| GuardError::DeclarationLoad {
                path: path.display().to_string(),
                source,
            })?;
        parse_into(&contents, &mut registry)?;
        file_count += 1;
    }

    tracing::info!(
        files = file_count,
        controllers = registry.len(),
        "Loaded controller declarations"
    );

    Ok(registry)
}

/// Parse a single KDL document into a fresh registry.
pub fn parse_declarations(source: &str) -> Result<HashMap<String, ControllerConfig>, GuardError> {
    let mut registry = HashMap::new();
    parse_into(source, &mut registry)?;
    Ok(registry)
}

fn parse_into(
    source: &str,
    registry: &mut HashMap<String, ControllerConfig>,
) -> Result<(), GuardError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| GuardError::KdlParse(e.to_string()))?;

    for node in doc.nodes() {
        match node.name().value() {
            "controller" => {
                let name = first_string_arg(node).ok_or_else(|| {
                    GuardError::InvalidDeclaration(
                        "controller node requires a string argument (e.g. controller \"notes\")"
                            .into(),
                    )
                })?;

                let config = registry.entry(name.clone()).or_insert_with(|| {
                    match (string_prop(node, "singular"), string_prop(node, "plural")) {
                        (Some(s), Some(p)) => ControllerConfig::with_names(&name, &s, &p),
                        _ => ControllerConfig::new(&name),
                    }
                });

                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        apply_rule_node(child, config, &name)?;
                    }
                }
            }
            other => {
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(())
}

fn apply_rule_node(
    node: &kdl::KdlNode,
    config: &mut ControllerConfig,
    controller: &str,
) -> Result<(), GuardError> {
    match node.name().value() {
        "load-parent" => {
            let candidates = candidates_of(node, controller)?;
            let refs: Vec<&str> = candidates.iter().map(|c| c.as_str()).collect();
            config.load_parent(&refs, parent_options(node))?;
        }
        "authorize-parent" => {
            let candidates = dash_list_child(node, "candidates");
            let refs: Vec<&str> = candidates.iter().map(|c| c.as_str()).collect();
            config.authorize_parent(
                if refs.is_empty() { None } else { Some(&refs) },
                ParentAuthOptions {
                    required: bool_prop(node, "required"),
                    permit: verb_prop(node),
                    filter: filter_of(node).unwrap_or_default(),
                },
            );
        }
        "load-and-authorize-parent" => {
            let candidates = candidates_of(node, controller)?;
            let refs: Vec<&str> = candidates.iter().map(|c| c.as_str()).collect();
            config.load_and_authorize_parent(&refs, parent_options(node))?;
        }
        "load-resource" => {
            config.load_resource(ResourceOptions {
                filter: filter_of(node),
            });
        }
        "authorize-resource" => {
            config.authorize_resource(ResourceAuthOptions {
                permit: verb_prop(node),
                slot: string_prop(node, "slot"),
                filter: filter_of(node),
            });
        }
        "load-and-authorize-resource" => {
            config.load_and_authorize_resource(ResourceOptions {
                filter: filter_of(node),
            });
        }
        other => {
            return Err(GuardError::InvalidDeclaration(format!(
                "unexpected node `{other}` in controller `{controller}` (expected a load/authorize declaration)"
            )));
        }
    }
    Ok(())
}

fn parent_options(node: &kdl::KdlNode) -> ParentOptions {
    ParentOptions {
        required: bool_prop(node, "required"),
        shallow: bool_prop(node, "shallow").unwrap_or(false),
        optional: bool_prop(node, "optional").unwrap_or(false),
        permit: verb_prop(node),
        accessor: string_prop(node, "accessor"),
        filter: filter_of(node).unwrap_or_default(),
    }
}

fn candidates_of(node: &kdl::KdlNode, controller: &str) -> Result<Vec<String>, GuardError> {
    let candidates = dash_list_child(node, "candidates");
    if candidates.is_empty() {
        return Err(GuardError::InvalidDeclaration(format!(
            "`{}` in controller `{controller}` declares no candidates",
            node.name().value()
        )));
    }
    Ok(candidates)
}

/// only/except dash-lists on a rule node; None when neither is declared, so
/// the registry applies its default.
fn filter_of(node: &kdl::KdlNode) -> Option<ActionFilter> {
    let only = dash_list_child(node, "only");
    let except = dash_list_child(node, "except");
    let has_only = node
        .children()
        .map(|c| c.nodes().iter().any(|n| n.name().value() == "only"))
        .unwrap_or(false);
    if !has_only && except.is_empty() {
        return None;
    }
    Some(ActionFilter {
        only: has_only.then_some(only),
        except,
    })
}

fn verb_prop(node: &kdl::KdlNode) -> Option<Verb> {
    string_prop(node, "permit").map(|v| Verb::from_name(&v))
}

fn string_prop(node: &kdl::KdlNode, key: &str) -> Option<String> {
    node.get(key)
        .map(|e| e.value())
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn bool_prop(node: &kdl::KdlNode, key: &str) -> Option<bool> {
    node.get(key).map(|e| e.value()).and_then(|v| v.as_bool())
}

/// Extract the first string argument from a KDL node.
fn first_string_arg(node: &kdl::KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Dash-list child: a child node of the given name whose children are nodes
/// named "-" with one string argument each.
fn dash_list_child(node: &kdl::KdlNode, name: &str) -> Vec<String> {
    let Some(children) = node.children() else {
        return Vec::new();
    };
    let Some(list) = children.nodes().iter().find(|n| n.name().value() == name) else {
        return Vec::new();
    };
    let Some(items) = list.children() else {
        return Vec::new();
    };
    items
        .nodes()
        .iter()
        .filter(|n| n.name().value() == "-")
        .filter_map(first_string_arg)
        .collect()
}
