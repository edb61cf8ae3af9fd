//! # warden-acl
//!
//! Access control lists for resources, actions and roles.
//!
//! Applications declare resources with their actions and roles with the
//! access they bundle. Every resource action and every role gets a numeric
//! identifier, and access requirements and grants are compiled into
//! [`Acl`]s: disjunctions of identifier sets that can be combined, filtered
//! and checked against each other cheaply at request time.
//!
//! ## Modules
//!
//! - [`mask`] - Identifier sets
//! - [`acl`] - The ACL algebra, optimization and rendering
//! - [`registry`] - Namespace, identifier allocation and role compilation
//! - [`declaration`] - Declarative definitions, deserializable with serde
//! - [`builder`] - The token state machine behind expressions
//! - [`expression`] - Textual expressions
//! - [`adapter`] - Guards for host frameworks
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```
//! use warden_acl::{Declaration, Registry, RenderOptions};
//!
//! let mut registry = Registry::new();
//! registry.define_all(&[
//!     Declaration::resource("Book", "read,write"),
//!     Declaration::resource("Song", "listen"),
//!     Declaration::role_with("Reader", "Book.read"),
//!     Declaration::role_with("Editor", "Reader.Book.write"),
//! ])?;
//! let registry = registry.into_shared();
//!
//! let required = registry.parse("Book.write.or.Song.listen")?;
//! let granted = registry.parse("Editor")?;
//! assert!(required.is_granted_to(&granted));
//!
//! assert_eq!(
//!     granted.render(&registry, RenderOptions::export().without_permissions()),
//!     "[Reader,Editor]"
//! );
//! # Ok::<(), warden_acl::AccessError>(())
//! ```

pub mod acl;
pub mod adapter;
pub mod builder;
pub mod declaration;
pub mod error;
pub mod expression;
pub mod mask;
pub mod registry;

#[cfg(test)]
mod proptests;

pub use acl::{Acl, AclDisplay, RenderOptions};
pub use adapter::{AccessAdapter, DEFAULT_ERROR_STATUS, DenyAll, WithErrorStatus};
pub use builder::ExpressionBuilder;
pub use declaration::{Declaration, NameList, RoleAccess, Selector, WILDCARD};
pub use error::{AccessError, AccessResult, ErrorCategory};
pub use mask::{AccessId, AccessMask};
pub use registry::{AccessName, RESERVED_NAMES, Registry};

/// Prelude module for convenient imports.
///
/// ```
/// use warden_acl::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acl::{Acl, RenderOptions};
    pub use crate::adapter::{AccessAdapter, DenyAll, WithErrorStatus};
    pub use crate::declaration::{Declaration, RoleAccess};
    pub use crate::error::{AccessError, AccessResult};
    pub use crate::mask::{AccessId, AccessMask};
    pub use crate::registry::Registry;
}
