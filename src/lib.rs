//! roche - declarative resource loading and authorization for web controllers
//!
//! Controllers declare, once, which parent and primary resources to load and
//! which permission checks must pass before an action body runs. A
//! per-request pipeline executes the declarations in order and aborts with a
//! typed error on the first violation.

pub mod errors;
pub mod inflect;
pub mod loader;
pub mod memory;
pub mod pipeline;
pub mod registry;
pub mod repository;
pub mod scope;
pub mod types;
pub mod web;

pub use errors::GuardError;
pub use pipeline::{run, RequestContext};
pub use registry::{
    ActionFilter, ControllerConfig, ParentAuthOptions, ParentOptions, ResourceAuthOptions,
    ResourceOptions,
};
pub use repository::{ActorProvider, Oracle, Repository};
pub use types::{Entity, EntityRef, Request, Scope, Verb};
pub use web::GuardState;
