use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GuardError {
    /// A required parent rule matched none of its candidate id parameters.
    #[error("must supply one of {}", .candidates.join(", "))]
    #[diagnostic(
        code(roche::missing_parameter),
        help("The route must carry an id parameter for one of the declared parent candidates")
    )]
    MissingParameter { candidates: Vec<String> },

    /// Parent authorization was required but no parent slot is populated.
    #[error("parent resource not found")]
    #[diagnostic(
        code(roche::missing_parent),
        help("Declare the parent rule as shallow/optional if the route may omit the parent id")
    )]
    MissingParent,

    #[error("{actor} is not permitted to {verb} {resource}")]
    #[diagnostic(code(roche::access_denied))]
    AccessDenied {
        actor: String,
        verb: String,
        resource: String,
    },

    /// Raised by the `Repository` contract; the pipeline propagates it untouched.
    #[error("no {entity_type} with id `{id}`")]
    #[diagnostic(code(roche::not_found))]
    NotFound { entity_type: String, id: String },

    /// Definition-time wiring mistake (e.g. a parent rule with zero candidates).
    #[error("invalid rule: {0}")]
    #[diagnostic(code(roche::invalid_rule))]
    InvalidRule(String),

    /// The authorize-resource stage could not determine a resource or verb.
    #[error("cannot authorize: {0}")]
    #[diagnostic(
        code(roche::unresolved_authorization),
        help("authorize-resource needs a loaded resource slot and a verb; check the action filter and declaration order")
    )]
    UnresolvedAuthorization(String),

    #[error("failed to load declaration file `{path}`")]
    #[diagnostic(
        code(roche::declaration_load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    DeclarationLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid declaration: {0}")]
    #[diagnostic(
        code(roche::invalid_declaration),
        help("Each declaration file must contain `controller` nodes with load/authorize child nodes")
    )]
    InvalidDeclaration(String),

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(roche::kdl_parse),
        help("Check your KDL file syntax — see https://kdl.dev for the specification")
    )]
    KdlParse(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(roche::io))]
    Io(#[from] std::io::Error),
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GuardError::MissingParameter { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            GuardError::MissingParent | GuardError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            GuardError::AccessDenied { .. } => (StatusCode::FORBIDDEN, self.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };
        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_message_enumerates_candidates() {
        let err = GuardError::MissingParameter {
            candidates: vec![":person_id".into(), ":group_id".into()],
        };
        assert_eq!(err.to_string(), "must supply one of :person_id, :group_id");
    }

    #[test]
    fn test_access_denied_carries_identities() {
        let err = GuardError::AccessDenied {
            actor: "user/alice".into(),
            verb: "delete".into(),
            resource: "note/n-1".into(),
        };
        assert_eq!(
            err.to_string(),
            "user/alice is not permitted to delete note/n-1"
        );
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                GuardError::MissingParameter { candidates: vec![] },
                StatusCode::BAD_REQUEST,
            ),
            (GuardError::MissingParent, StatusCode::NOT_FOUND),
            (
                GuardError::NotFound {
                    entity_type: "note".into(),
                    id: "n-1".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                GuardError::AccessDenied {
                    actor: "user/alice".into(),
                    verb: "read".into(),
                    resource: "note/n-1".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                GuardError::InvalidRule("bad".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
