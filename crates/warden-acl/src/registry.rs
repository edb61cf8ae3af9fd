//! The definition registry.
//!
//! A [`Registry`] owns the namespace of resources, actions and roles and
//! allocates one [`AccessId`] per resource action and per role, starting at 1.
//! Identifiers are never reused or renumbered.
//!
//! Definitions are transactional: a call that fails leaves the registry as it
//! was before the call. Roles declared with a wildcard keep their declaration
//! and are recompiled after every successful definition call, so they always
//! reflect the namespace as it currently is. [`Registry::lock`] ends the
//! definition phase; the locked registry is read-only and can be shared
//! across threads.
//!
//! # Examples
//!
//! ```
//! use warden_acl::{Acl, Declaration, Registry};
//!
//! let mut registry = Registry::new();
//! registry.define_resource("Book", "read,write").unwrap();
//! registry
//!     .define(&Declaration::role_with("Reader", "Book.read"))
//!     .unwrap();
//! let registry = registry.into_shared();
//!
//! let required = registry.parse("Book.read").unwrap();
//! let granted = Acl::from_role(&registry, "Reader").unwrap();
//! assert!(required.is_granted_to(&granted));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::acl::Acl;
use crate::declaration::{Declaration, NameList, RoleAccess, Selector};
use crate::error::{AccessError, AccessResult};
use crate::mask::AccessId;

/// Names used by the expression syntax and the public surface. They cannot
/// name resources, actions or roles.
pub const RESERVED_NAMES: &[&str] = &[
    "and",
    "or",
    "except",
    "required",
    "requiredFor",
    "required_for",
    "grantTo",
    "grant_to",
    "isGrantedTo",
    "is_granted_to",
    "getAcl",
    "eval",
    "define",
    "lock",
    "denied",
    "error",
    "options",
    "isResource",
    "isRole",
];

const SEPARATORS: &[char] = &['.', ',', '[', ']', '|', '*'];

// ============================================================================
// Names
// ============================================================================

/// The name behind an access identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessName {
    /// An action on a resource, rendered `Resource.action`.
    Permission {
        /// Resource name.
        resource: String,
        /// Action name.
        action: String,
    },
    /// A role, rendered as its bare name.
    Role(String),
}

impl AccessName {
    /// Returns `true` for role names.
    #[must_use]
    pub fn is_role(&self) -> bool {
        matches!(self, Self::Role(_))
    }
}

impl fmt::Display for AccessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permission { resource, action } => write!(f, "{resource}.{action}"),
            Self::Role(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone)]
enum Definition {
    Resource(ResourceDefinition),
    Role(RoleDefinition),
}

#[derive(Debug, Clone, Default)]
struct ResourceDefinition {
    actions: IndexMap<String, AccessId>,
}

#[derive(Debug, Clone)]
struct RoleDefinition {
    id: AccessId,
    acl: Option<Acl>,
    /// Retained while unlocked for roles whose access uses a wildcard.
    wildcard: Option<RoleAccess>,
    /// Roles named explicitly by this role's access.
    references: Vec<String>,
}

/// The namespace of resources, actions and roles.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    definitions: IndexMap<String, Definition>,
    /// Reverse lookup; identifier `n` lives at index `n - 1`.
    names: Vec<AccessName>,
    actions: IndexSet<String>,
    wildcard_roles: Vec<String>,
    locked: bool,
}

// ============================================================================
// Definition
// ============================================================================

impl Registry {
    /// Creates an empty, unlocked registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a declaration, recursing into groups.
    ///
    /// # Errors
    ///
    /// Returns a [`AccessError::Definition`] for invalid declarations,
    /// [`AccessError::DefinitionLocked`] after [`Registry::lock`], and any
    /// error raised while compiling role access. The registry is unchanged
    /// on error.
    pub fn define(&mut self, declaration: &Declaration) -> AccessResult<()> {
        self.transaction(|registry| registry.define_batch(declaration).map(|_| ()))
    }

    /// Applies declarations in order as one transaction.
    ///
    /// # Errors
    ///
    /// See [`Registry::define`].
    pub fn define_all<'d, I>(&mut self, declarations: I) -> AccessResult<()>
    where
        I: IntoIterator<Item = &'d Declaration>,
    {
        self.transaction(|registry| {
            for declaration in declarations {
                registry.define_batch(declaration)?;
            }
            Ok(())
        })
    }

    /// Defines a resource or adds actions to an existing one.
    ///
    /// # Errors
    ///
    /// Fails if a name is invalid or reserved, collides with a name of another
    /// kind, or if a new resource is given no actions.
    pub fn define_resource(&mut self, name: &str, actions: impl Into<NameList>) -> AccessResult<()> {
        let actions = actions.into();
        self.transaction(|registry| registry.define_resource_entry(name, Some(&actions)))
    }

    /// Defines a role, replacing its access when `access` is given.
    ///
    /// # Errors
    ///
    /// Fails if the name is invalid or reserved, collides with a resource or
    /// action, or if the access does not compile.
    pub fn define_role(&mut self, name: &str, access: Option<RoleAccess>) -> AccessResult<()> {
        self.transaction(|registry| registry.define_role_entry(name, access.as_ref()))
    }

    /// Ends the definition phase. Wildcard declarations are dropped and every
    /// later definition fails with [`AccessError::DefinitionLocked`].
    pub fn lock(&mut self) {
        for definition in self.definitions.values_mut() {
            if let Definition::Role(role) = definition {
                role.wildcard = None;
            }
        }
        self.wildcard_roles.clear();
        self.locked = true;
        tracing::info!(
            ids = self.names.len(),
            definitions = self.definitions.len(),
            "access definitions locked"
        );
    }

    /// Locks the registry and returns it ready for sharing.
    #[must_use]
    pub fn into_shared(mut self) -> Arc<Self> {
        if !self.locked {
            self.lock();
        }
        Arc::new(self)
    }

    /// Returns `true` once [`Registry::lock`] was called.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn transaction<T, F>(&mut self, apply: F) -> AccessResult<T>
    where
        F: FnOnce(&mut Self) -> AccessResult<T>,
    {
        if self.locked {
            return Err(AccessError::DefinitionLocked);
        }
        let snapshot = self.clone();
        let result = apply(self).and_then(|value| self.recompile_wildcards().map(|()| value));
        if let Err(err) = &result {
            tracing::debug!(error = %err, "definition rolled back");
            *self = snapshot;
        }
        result
    }

    /// Defines everything in `declaration`. Returns `true` if a wildcard
    /// declaration was seen; those only select, they never define. Omitted
    /// actions select every action of an existing resource and count as a
    /// wildcard.
    fn define_batch(&mut self, declaration: &Declaration) -> AccessResult<bool> {
        match declaration {
            Declaration::Group(items) => {
                let mut wildcard = false;
                for item in items {
                    wildcard |= self.define_batch(item)?;
                }
                Ok(wildcard)
            }
            Declaration::Resource { resources, actions } => {
                let Selector::Names(names) = resources else {
                    return Ok(true);
                };
                match actions {
                    Some(Selector::All) => Ok(true),
                    Some(Selector::Names(actions)) => {
                        for name in names.iter() {
                            self.define_resource_entry(name, Some(actions))?;
                        }
                        Ok(false)
                    }
                    None => {
                        for name in names.iter() {
                            self.define_resource_entry(name, None)?;
                        }
                        Ok(true)
                    }
                }
            }
            Declaration::Role { roles, access } => {
                let Selector::Names(names) = roles else {
                    return Ok(true);
                };
                for name in names.iter() {
                    self.define_role_entry(name, access.as_ref())?;
                }
                Ok(false)
            }
        }
    }

    fn define_resource_entry(&mut self, name: &str, actions: Option<&NameList>) -> AccessResult<()> {
        validate_name(name, "resource")?;
        match self.definitions.get(name) {
            Some(Definition::Role(_)) => {
                return Err(AccessError::definition(format!(
                    "'{name}' already defined as role"
                )));
            }
            None if self.actions.contains(name) => {
                return Err(AccessError::definition(format!(
                    "'{name}' already defined as action"
                )));
            }
            None if actions.is_none_or(NameList::is_empty) => {
                return Err(AccessError::definition(format!(
                    "resource '{name}' specified without any actions"
                )));
            }
            _ => {}
        }

        let mut resource = match self.definitions.get(name) {
            Some(Definition::Resource(resource)) => resource.clone(),
            _ => ResourceDefinition::default(),
        };
        for action in actions.into_iter().flat_map(NameList::iter) {
            validate_name(action, "action")?;
            if self.definitions.contains_key(action) || action == name {
                return Err(AccessError::definition(format!(
                    "'{action}' already defined as resource or role"
                )));
            }
            if !resource.actions.contains_key(action) {
                let id = self.allocate(AccessName::Permission {
                    resource: name.to_owned(),
                    action: action.to_owned(),
                });
                resource.actions.insert(action.to_owned(), id);
                self.actions.insert(action.to_owned());
                tracing::debug!(resource = name, action, id = id.get(), "defined permission");
            }
        }
        self.definitions
            .insert(name.to_owned(), Definition::Resource(resource));
        Ok(())
    }

    fn define_role_entry(&mut self, name: &str, access: Option<&RoleAccess>) -> AccessResult<()> {
        validate_name(name, "role")?;
        match self.definitions.get(name) {
            Some(Definition::Resource(_)) => {
                return Err(AccessError::definition(format!(
                    "'{name}' already defined as resource"
                )));
            }
            None if self.actions.contains(name) => {
                return Err(AccessError::definition(format!(
                    "'{name}' already defined as action"
                )));
            }
            None => {
                let id = self.allocate(AccessName::Role(name.to_owned()));
                self.definitions.insert(
                    name.to_owned(),
                    Definition::Role(RoleDefinition {
                        id,
                        acl: None,
                        wildcard: None,
                        references: Vec::new(),
                    }),
                );
                tracing::debug!(role = name, id = id.get(), "defined role");
            }
            Some(Definition::Role(_)) => {}
        }

        let Some(access) = access else {
            return Ok(());
        };
        let wildcard = match access {
            RoleAccess::Everything => true,
            RoleAccess::Expression(_) => false,
            RoleAccess::Declarations(declarations) => {
                let mut wildcard = false;
                for declaration in declarations {
                    wildcard |= self.define_batch(declaration)?;
                }
                wildcard
            }
        };
        let (acl, references) = self.compile_access(access)?;
        self.check_cycles(name, &references)?;

        if wildcard {
            if !self.wildcard_roles.iter().any(|role| role == name) {
                self.wildcard_roles.push(name.to_owned());
            }
        } else {
            self.wildcard_roles.retain(|role| role != name);
        }
        if let Some(Definition::Role(role)) = self.definitions.get_mut(name) {
            role.acl = Some(acl);
            role.references = references;
            role.wildcard = wildcard.then(|| access.clone());
        }
        Ok(())
    }

    fn allocate(&mut self, name: AccessName) -> AccessId {
        self.names.push(name);
        AccessId::new(self.names.len() as u32)
    }

    /// Recompiles every wildcard role against the current namespace, in the
    /// order the roles were declared.
    fn recompile_wildcards(&mut self) -> AccessResult<()> {
        for name in self.wildcard_roles.clone() {
            let Some(Definition::Role(RoleDefinition {
                wildcard: Some(access),
                ..
            })) = self.definitions.get(&name)
            else {
                continue;
            };
            let (acl, _) = self.compile_access(access)?;
            if let Some(Definition::Role(role)) = self.definitions.get_mut(&name) {
                role.acl = Some(acl);
            }
        }
        if !self.wildcard_roles.is_empty() {
            tracing::debug!(
                roles = self.wildcard_roles.len(),
                last_id = self.names.len(),
                "recompiled wildcard roles"
            );
        }
        Ok(())
    }

    fn check_cycles(&self, role: &str, references: &[String]) -> AccessResult<()> {
        for reference in references {
            let mut path = vec![role.to_owned()];
            if self.reaches(reference, role, &mut path, &mut HashSet::new()) {
                return Err(AccessError::cyclic_role(role, path.join(" -> ")));
            }
        }
        Ok(())
    }

    /// Depth-first search over explicit role references. On success `path`
    /// holds the chain from the starting role to `target`.
    fn reaches<'a>(
        &'a self,
        from: &'a str,
        target: &str,
        path: &mut Vec<String>,
        visited: &mut HashSet<&'a str>,
    ) -> bool {
        path.push(from.to_owned());
        if from == target {
            return true;
        }
        if visited.insert(from)
            && let Some(Definition::Role(role)) = self.definitions.get(from)
        {
            for next in &role.references {
                if self.reaches(next, target, path, visited) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }
}

// ============================================================================
// Compilation
// ============================================================================

impl Registry {
    /// Compiles role access into an ACL. Also returns the roles the access
    /// names explicitly; roles reached through a wildcard are not included.
    fn compile_access(&self, access: &RoleAccess) -> AccessResult<(Acl, Vec<String>)> {
        match access {
            RoleAccess::Everything => Ok((
                Acl::range(AccessId::new(1), self.last_id()),
                Vec::new(),
            )),
            RoleAccess::Expression(text) => {
                let acl = self.parse(text)?;
                Ok((acl, self.referenced_roles(text)))
            }
            RoleAccess::Declarations(declarations) => self.compile_declarations(declarations),
        }
    }

    /// A list holding groups is a list of alternatives; any other list is one
    /// conjunction.
    fn compile_declarations(&self, declarations: &[Declaration]) -> AccessResult<(Acl, Vec<String>)> {
        let mut references = Vec::new();
        if declarations
            .iter()
            .any(|declaration| matches!(declaration, Declaration::Group(_)))
        {
            let mut acl = Acl::empty();
            for declaration in declarations {
                let (alternative, names) = match declaration {
                    Declaration::Group(items) => self.compile_declarations(items)?,
                    single => self.compile_declarations(std::slice::from_ref(single))?,
                };
                acl.combine(&alternative);
                references.extend(names);
            }
            return Ok((acl, references));
        }

        let mut builder = self.chain();
        for declaration in declarations {
            match declaration {
                Declaration::Resource { resources, actions } => {
                    for resource in self.select_resources(resources) {
                        let definition = self
                            .resource_definition(&resource)
                            .ok_or_else(|| AccessError::undefined_resource(resource.as_str()))?;
                        let selected: Vec<&str> = match actions {
                            Some(Selector::Names(names)) => names
                                .iter()
                                .filter(|action| definition.actions.contains_key(*action))
                                .collect(),
                            None | Some(Selector::All) => {
                                definition.actions.keys().map(String::as_str).collect()
                            }
                        };
                        for action in selected {
                            builder.select_resource(&resource)?.select_action(action)?;
                        }
                    }
                }
                Declaration::Role { roles, .. } => {
                    let names: Vec<String> = match roles {
                        Selector::All => self.roles().map(str::to_owned).collect(),
                        Selector::Names(names) => {
                            references.extend(names.iter().map(str::to_owned));
                            names.iter().map(str::to_owned).collect()
                        }
                    };
                    for role in &names {
                        builder.select_role(role)?;
                    }
                }
                Declaration::Group(_) => {}
            }
        }
        Ok((builder.finish()?, references))
    }

    fn select_resources(&self, resources: &Selector) -> Vec<String> {
        match resources {
            Selector::All => self.resources().map(str::to_owned).collect(),
            Selector::Names(names) => names.iter().map(str::to_owned).collect(),
        }
    }
}

// ============================================================================
// Lookups
// ============================================================================

impl Registry {
    /// Returns `true` if `name` is a resource.
    #[must_use]
    pub fn is_resource(&self, name: &str) -> bool {
        matches!(self.definitions.get(name), Some(Definition::Resource(_)))
    }

    /// Returns `true` if `name` is a role.
    #[must_use]
    pub fn is_role(&self, name: &str) -> bool {
        matches!(self.definitions.get(name), Some(Definition::Role(_)))
    }

    /// Returns `true` if any resource defines the action `name`.
    #[must_use]
    pub fn is_action(&self, name: &str) -> bool {
        self.actions.contains(name)
    }

    /// Returns the identifier of a role, or of `action` on a resource.
    #[must_use]
    pub fn access_id_of(&self, name: &str, action: Option<&str>) -> Option<AccessId> {
        match (self.definitions.get(name)?, action) {
            (Definition::Role(role), _) => Some(role.id),
            (Definition::Resource(resource), Some(action)) => resource.actions.get(action).copied(),
            (Definition::Resource(_), None) => None,
        }
    }

    /// Returns the identifier of `action` on `resource`.
    #[must_use]
    pub fn permission_id(&self, resource: &str, action: &str) -> Option<AccessId> {
        self.resource_definition(resource)?
            .actions
            .get(action)
            .copied()
    }

    /// Returns the identifier of a role.
    #[must_use]
    pub fn role_id(&self, name: &str) -> Option<AccessId> {
        match self.definitions.get(name)? {
            Definition::Role(role) => Some(role.id),
            Definition::Resource(_) => None,
        }
    }

    /// Returns the ACL compiled for a role, if it was given access.
    #[must_use]
    pub fn role_acl(&self, name: &str) -> Option<&Acl> {
        match self.definitions.get(name)? {
            Definition::Role(role) => role.acl.as_ref(),
            Definition::Resource(_) => None,
        }
    }

    /// Reverse lookup of an identifier.
    #[must_use]
    pub fn name_of(&self, id: AccessId) -> Option<&AccessName> {
        let index = (id.get() as usize).checked_sub(1)?;
        self.names.get(index)
    }

    /// Returns `true` if `id` names a role.
    #[must_use]
    pub fn is_role_id(&self, id: AccessId) -> bool {
        self.name_of(id).is_some_and(AccessName::is_role)
    }

    /// Resolves a rendered name, `Resource.action` or a role name.
    #[must_use]
    pub fn resolve_name(&self, name: &str) -> Option<AccessId> {
        match name.split_once('.') {
            Some((resource, action)) => self.permission_id(resource, action),
            None => self.role_id(name),
        }
    }

    /// Resources in definition order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().filter_map(|(name, definition)| {
            matches!(definition, Definition::Resource(_)).then_some(name.as_str())
        })
    }

    /// Roles in definition order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().filter_map(|(name, definition)| {
            matches!(definition, Definition::Role(_)).then_some(name.as_str())
        })
    }

    /// Actions of `resource` in definition order. Empty for unknown names.
    pub fn actions_of(&self, resource: &str) -> impl Iterator<Item = &str> {
        self.resource_definition(resource)
            .into_iter()
            .flat_map(|definition| definition.actions.keys().map(String::as_str))
    }

    /// Roles whose access is recompiled after each definition.
    pub fn wildcard_roles(&self) -> impl Iterator<Item = &str> {
        self.wildcard_roles.iter().map(String::as_str)
    }

    /// The most recently allocated identifier, or `#0` when none exists.
    #[must_use]
    pub fn last_id(&self) -> AccessId {
        AccessId::new(self.names.len() as u32)
    }

    fn resource_definition(&self, name: &str) -> Option<&ResourceDefinition> {
        match self.definitions.get(name)? {
            Definition::Resource(resource) => Some(resource),
            Definition::Role(_) => None,
        }
    }
}

fn validate_name(name: &str, kind: &str) -> AccessResult<()> {
    if name.is_empty() {
        return Err(AccessError::definition(format!("no {kind} name specified")));
    }
    if name.starts_with('_') || RESERVED_NAMES.contains(&name) {
        return Err(AccessError::definition(format!("'{name}' is a reserved word")));
    }
    if name.contains(SEPARATORS) || name.chars().any(char::is_whitespace) {
        return Err(AccessError::definition(format!(
            "'{name}' is not a valid {kind} name"
        )));
    }
    Ok(())
}
