//! Hierarchical role resolution.
//!
//! Every guarded operation funnels through [`RoleResolver::authorize`]: the
//! caller names the resource (by id or slug), the roles the operation
//! requires, and the authenticated [`Principal`], and the resolver walks
//! the hierarchy from the top down. An organization owner or admin is
//! implicitly authorized on every workspace and project beneath the
//! organization, with no membership row at the lower levels.

mod principal;
mod resolver;

pub use principal::Principal;
pub use resolver::{Resource, ResourceRef, RoleResolver};
