//! Textual access expressions.
//!
//! Two forms are accepted:
//!
//! - the dot form, `Reader.Book.edit.or.Listener.except.Music.listen`, where
//!   every token is a resource, action, role or one of the keywords `and`,
//!   `or` and `except`;
//! - the bracketed form produced by [`Acl::display`], `[Book.read,Reader] ||
//!   [Song.listen]`, where each bracket lists identifiers literally. Roles in
//!   brackets are not expanded.

use crate::acl::Acl;
use crate::builder::ExpressionBuilder;
use crate::error::{AccessError, AccessResult};
use crate::mask::AccessMask;
use crate::registry::Registry;

const ALTERNATIVE_SEPARATOR: &str = "||";

impl Registry {
    /// Parses an expression into an ACL.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UnknownToken`] for names that are not defined
    /// and [`AccessError::Sequence`] for tokens in an invalid order.
    pub fn parse(&self, text: &str) -> AccessResult<Acl> {
        let mut builder = self.chain();
        builder.eval(text)?;
        builder.finish()
    }

    /// Roles a dot-form expression names; these become references of a role
    /// defined with the expression.
    pub(crate) fn referenced_roles(&self, text: &str) -> Vec<String> {
        if text.trim_start().starts_with('[') {
            return Vec::new();
        }
        let mut roles: Vec<String> = Vec::new();
        for token in text.split('.').map(str::trim) {
            if self.is_role(token) && !roles.iter().any(|role| role == token) {
                roles.push(token.to_owned());
            }
        }
        roles
    }
}

impl ExpressionBuilder<'_> {
    /// Feeds the tokens of `text` into the builder.
    ///
    /// # Errors
    ///
    /// See [`Registry::parse`].
    pub fn eval(&mut self, text: &str) -> AccessResult<&mut Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(self);
        }
        if text.starts_with('[') {
            self.eval_bracketed(text)?;
        } else {
            for token in text.split('.') {
                self.eval_token(token.trim())?;
            }
        }
        Ok(self)
    }

    fn eval_token(&mut self, token: &str) -> AccessResult<()> {
        let registry = self.registry();
        match token {
            "and" => {
                self.and();
            }
            "or" => {
                self.or_group()?;
            }
            "except" => {
                self.except_clause()?;
            }
            _ if registry.is_resource(token) => {
                self.select_resource(token)?;
            }
            _ if registry.is_role(token) => {
                self.select_role(token)?;
            }
            _ if registry.is_action(token) => {
                self.select_action(token)?;
            }
            _ => return Err(AccessError::unknown_token(token)),
        }
        Ok(())
    }

    fn eval_bracketed(&mut self, text: &str) -> AccessResult<()> {
        let registry = self.registry();
        for (index, item) in text.split(ALTERNATIVE_SEPARATOR).enumerate() {
            let item = item.trim();
            let inner = item
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .ok_or_else(|| AccessError::unknown_token(item))?;
            let mut ids = AccessMask::new();
            for name in inner.split(',').map(str::trim).filter(|name| !name.is_empty()) {
                let id = registry
                    .resolve_name(name)
                    .ok_or_else(|| AccessError::unknown_token(name))?;
                ids.set(id);
            }
            if index > 0 {
                self.or_group()?;
            }
            self.select_ids(ids)?;
        }
        Ok(())
    }
}
