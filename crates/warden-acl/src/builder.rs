//! The expression builder.
//!
//! An [`ExpressionBuilder`] turns a sequence of tokens into an [`Acl`]. Tokens
//! select resources, actions and roles, and two keywords structure them:
//! `or` starts a new alternative and `except` subtracts what follows from the
//! roles selected before it.
//!
//! Selected resources and actions accumulate until a token of another kind
//! arrives; then every resource is combined with every action into one
//! permission set. Roles are pushed as separate entries and AND-ed when the
//! group closes. Whenever a permission set or a role is followed by a token
//! of a different kind, the rest of the group is handed to a nested builder
//! whose result is added to (or, after `except`, removed from) everything
//! collected so far.
//!
//! ```
//! use warden_acl::Registry;
//!
//! let mut registry = Registry::new();
//! registry.define_resource("Book", "read,write").unwrap();
//! registry.define_resource("Song", "listen").unwrap();
//!
//! let mut builder = registry.chain();
//! builder
//!     .select_resource("Book")?
//!     .select_action("read")?
//!     .or_group()?
//!     .select_resource("Song")?
//!     .select_action("listen")?;
//! let acl = builder.finish()?;
//! assert_eq!(acl.display(&registry).to_string(), "[Book.read] || [Song.listen]");
//! # Ok::<(), warden_acl::AccessError>(())
//! ```

use crate::acl::Acl;
use crate::error::{AccessError, AccessResult};
use crate::mask::AccessMask;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Resource,
    Action,
    Role,
    Except,
}

/// Builds one ACL from a chain of selections. Each chain needs its own
/// builder.
#[derive(Debug)]
pub struct ExpressionBuilder<'r> {
    registry: &'r Registry,
    /// Alternatives completed by earlier `or` groups.
    acl: Acl,
    resources: Vec<String>,
    actions: Vec<String>,
    stack: Vec<Acl>,
    nested: Option<Box<ExpressionBuilder<'r>>>,
    last: Option<Token>,
    additive: bool,
}

impl Registry {
    /// Starts a new expression against this registry.
    #[must_use]
    pub fn chain(&self) -> ExpressionBuilder<'_> {
        ExpressionBuilder::new(self)
    }
}

impl<'r> ExpressionBuilder<'r> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            acl: Acl::empty(),
            resources: Vec::new(),
            actions: Vec::new(),
            stack: Vec::new(),
            nested: None,
            last: None,
            additive: true,
        }
    }

    /// The registry names are resolved against.
    #[must_use]
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Selects a resource. Must be followed by at least one action.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Sequence`] after a resource without actions.
    pub fn select_resource(&mut self, name: &str) -> AccessResult<&mut Self> {
        self.advance(Some(Token::Resource))?;
        match self.nested.as_deref_mut() {
            Some(nested) => {
                nested.select_resource(name)?;
            }
            None => self.resources.push(name.to_owned()),
        }
        Ok(self)
    }

    /// Selects an action on the pending resources.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Sequence`] if no resource precedes the action.
    pub fn select_action(&mut self, name: &str) -> AccessResult<&mut Self> {
        self.advance(Some(Token::Action))?;
        match self.nested.as_deref_mut() {
            Some(nested) => {
                nested.select_action(name)?;
            }
            None => self.actions.push(name.to_owned()),
        }
        Ok(self)
    }

    /// Selects a role: its identifier plus the access compiled for it.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UndefinedRole`] for unknown roles and
    /// [`AccessError::Sequence`] after a resource without actions.
    pub fn select_role(&mut self, name: &str) -> AccessResult<&mut Self> {
        self.advance(Some(Token::Role))?;
        match self.nested.as_deref_mut() {
            Some(nested) => {
                nested.select_role(name)?;
            }
            None => self.stack.push(Acl::from_role(self.registry, name)?),
        }
        Ok(self)
    }

    /// Selects a literal set of identifiers. Behaves like a role without
    /// expanding anything.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Sequence`] after a resource without actions.
    pub fn select_ids(&mut self, ids: AccessMask) -> AccessResult<&mut Self> {
        self.advance(Some(Token::Role))?;
        match self.nested.as_deref_mut() {
            Some(nested) => {
                nested.select_ids(ids)?;
            }
            None => self.stack.push(Acl::from_mask(ids)),
        }
        Ok(self)
    }

    /// Subtracts everything selected after this point from the roles
    /// selected before it.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Sequence`] unless the previous token was a role.
    pub fn except_clause(&mut self) -> AccessResult<&mut Self> {
        match self.nested.as_deref_mut() {
            Some(nested) => {
                nested.except_clause()?;
            }
            None => {
                self.advance(Some(Token::Except))?;
                self.additive = false;
            }
        }
        Ok(self)
    }

    /// Does nothing; selections are AND-ed by default.
    pub fn and(&mut self) -> &mut Self {
        self
    }

    /// Closes the current group and starts a new alternative. An `except`
    /// does not carry over into the new alternative.
    ///
    /// # Errors
    ///
    /// Returns any error raised while closing the group.
    pub fn or_group(&mut self) -> AccessResult<&mut Self> {
        self.collapse()?;
        self.last = None;
        self.additive = true;
        Ok(self)
    }

    /// Closes the chain and returns the ACL.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Sequence`] if the chain ends on a resource, and
    /// undefined-name errors for permissions that do not exist.
    pub fn finish(mut self) -> AccessResult<Acl> {
        self.collapse()?;
        tracing::trace!(alternatives = self.acl.alternatives().len(), "built acl");
        Ok(self.acl)
    }

    /// Applies the transition for `next`; `None` closes the group.
    fn advance(&mut self, next: Option<Token>) -> AccessResult<()> {
        if self.nested.is_some() || self.last == next {
            return Ok(());
        }
        if next == Some(Token::Except) && self.last != Some(Token::Role) {
            return Err(AccessError::sequence("'except' applies to roles only"));
        }
        let delegate = match self.last {
            Some(Token::Resource) => {
                if next != Some(Token::Action) {
                    return Err(AccessError::sequence(
                        "resource(s) specified without action(s)",
                    ));
                }
                false
            }
            Some(Token::Action) => {
                let permissions = self.pending_permissions()?;
                match self.stack.first_mut() {
                    Some(first) => {
                        first.add(&permissions);
                    }
                    None => self.stack.push(permissions),
                }
                self.resources.clear();
                self.actions.clear();
                next != Some(Token::Resource)
            }
            Some(Token::Role) | Some(Token::Except) | None => {
                if next == Some(Token::Action) {
                    return Err(AccessError::sequence("action(s) specified without resource"));
                }
                !self.stack.is_empty()
            }
        };
        if delegate && next.is_some() {
            self.nested = Some(Box::new(Self::new(self.registry)));
        }
        self.last = if delegate { None } else { next };
        Ok(())
    }

    fn pending_permissions(&self) -> AccessResult<Acl> {
        let mut acl = Acl::empty();
        for resource in &self.resources {
            acl.add(&Acl::from_permissions(self.registry, resource, &self.actions)?);
        }
        Ok(acl)
    }

    /// Folds the nested result into the stack, reduces the stack with `add`
    /// and combines the result into the alternatives built so far.
    fn collapse(&mut self) -> AccessResult<()> {
        self.advance(None)?;
        if let Some(nested) = self.nested.take() {
            let right = nested.finish()?;
            for left in &mut self.stack {
                if self.additive {
                    left.add(&right);
                } else {
                    left.remove(&right);
                }
            }
        }
        let mut stack = std::mem::take(&mut self.stack).into_iter();
        if let Some(mut group) = stack.next() {
            for entry in stack {
                group.add(&entry);
            }
            self.acl.combine(&group);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::RoleAccess;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.define_resource("Book", "read,write").unwrap();
        registry.define_resource("Song", "listen,compose").unwrap();
        registry
            .define_role("Reader", Some(RoleAccess::from("Book.read")))
            .unwrap();
        registry
            .define_role("Composer", Some(RoleAccess::from("Song.compose")))
            .unwrap();
        registry
    }

    fn render(acl: &Acl, registry: &Registry) -> String {
        acl.display(registry).to_string()
    }

    #[test]
    fn test_resources_times_actions() {
        let registry = registry();
        let mut builder = registry.chain();
        builder
            .select_resource("Book")
            .unwrap()
            .select_resource("Song")
            .unwrap()
            .select_action("listen")
            .unwrap();
        let err = builder.finish().unwrap_err();
        assert_eq!(err, AccessError::undefined_action("Book", "listen"));

        let mut builder = registry.chain();
        builder
            .select_resource("Book")
            .unwrap()
            .select_action("read")
            .unwrap()
            .select_action("write")
            .unwrap();
        let acl = builder.finish().unwrap();
        assert_eq!(render(&acl, &registry), "[Book.read,Book.write]");
    }

    #[test]
    fn test_consecutive_permissions_are_anded() {
        let registry = registry();
        let mut builder = registry.chain();
        builder
            .select_resource("Book")
            .unwrap()
            .select_action("write")
            .unwrap()
            .select_resource("Song")
            .unwrap()
            .select_action("compose")
            .unwrap();
        let acl = builder.finish().unwrap();
        assert_eq!(render(&acl, &registry), "[Book.write,Song.compose]");
    }

    #[test]
    fn test_roles_with_permissions() {
        let registry = registry();
        let mut builder = registry.chain();
        builder
            .select_role("Reader")
            .unwrap()
            .select_resource("Song")
            .unwrap()
            .select_action("listen")
            .unwrap();
        let acl = builder.finish().unwrap();
        assert_eq!(render(&acl, &registry), "[Book.read,Song.listen,Reader]");
    }

    #[test]
    fn test_or_groups() {
        let registry = registry();
        let mut builder = registry.chain();
        builder
            .select_role("Reader")
            .unwrap()
            .or_group()
            .unwrap()
            .select_role("Composer")
            .unwrap();
        let acl = builder.finish().unwrap();
        assert_eq!(
            render(&acl, &registry),
            "[Book.read,Reader] || [Song.compose,Composer]"
        );
    }

    #[test]
    fn test_except_removes_from_roles() {
        let registry = registry();
        let mut builder = registry.chain();
        builder
            .select_role("Reader")
            .unwrap()
            .except_clause()
            .unwrap()
            .select_resource("Book")
            .unwrap()
            .select_action("read")
            .unwrap();
        let acl = builder.finish().unwrap();
        assert_eq!(render(&acl, &registry), "[Reader]");
    }

    #[test]
    fn test_or_group_resets_except() {
        let registry = registry();
        let mut builder = registry.chain();
        builder
            .select_role("Reader")
            .unwrap()
            .except_clause()
            .unwrap()
            .select_resource("Book")
            .unwrap()
            .select_action("read")
            .unwrap()
            .or_group()
            .unwrap()
            .select_role("Composer")
            .unwrap()
            .select_resource("Book")
            .unwrap()
            .select_action("read")
            .unwrap();
        let acl = builder.finish().unwrap();
        assert_eq!(
            render(&acl, &registry),
            "[Reader] || [Book.read,Song.compose,Composer]"
        );
    }

    // -------------------------------------------------------------------------
    // Sequence Error Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_action_without_resource() {
        let registry = registry();
        let mut builder = registry.chain();
        let err = builder.select_action("read").unwrap_err();
        assert!(matches!(err, AccessError::Sequence { .. }));
        assert!(err.to_string().contains("without resource"));
    }

    #[test]
    fn test_resource_without_action() {
        let registry = registry();
        let mut builder = registry.chain();
        builder.select_resource("Book").unwrap();
        let err = builder.select_role("Reader").unwrap_err();
        assert!(err.to_string().contains("without action(s)"));

        let mut builder = registry.chain();
        builder.select_resource("Book").unwrap();
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_except_requires_role() {
        let registry = registry();
        let mut builder = registry.chain();
        builder
            .select_resource("Book")
            .unwrap()
            .select_action("read")
            .unwrap();
        let err = builder.except_clause().unwrap_err();
        assert_eq!(err, AccessError::sequence("'except' applies to roles only"));

        let mut builder = registry.chain();
        assert!(builder.except_clause().is_err());
    }

    #[test]
    fn test_undefined_role() {
        let registry = registry();
        let mut builder = registry.chain();
        let err = builder.select_role("Ghost").unwrap_err();
        assert_eq!(err, AccessError::undefined_role("Ghost"));
    }

    #[test]
    fn test_empty_chain() {
        let registry = registry();
        assert!(registry.chain().finish().unwrap().is_empty());
    }
}
