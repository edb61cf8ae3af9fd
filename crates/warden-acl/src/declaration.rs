//! Resource and role declarations.
//!
//! Declarations are what a policy is written in. Each one either defines a
//! resource with some actions, defines roles with optional access, or groups
//! further declarations. The `"*"` wildcard is decided once, when a
//! declaration is built or deserialized, and is carried as
//! [`Selector::All`] or [`RoleAccess::Everything`] from then on.
//!
//! The serde form mirrors how policies are usually written by hand:
//!
//! ```
//! use warden_acl::{Declaration, RoleAccess, Selector};
//!
//! let json = r#"[
//!     { "resource": "Book", "action": "read,write" },
//!     { "role": "Reader", "access": { "resource": "Book", "action": "read" } },
//!     { "role": "AllBook", "access": { "resource": "Book", "action": "*" } }
//! ]"#;
//! let declaration: Declaration = serde_json::from_str(json).unwrap();
//!
//! let Declaration::Group(items) = &declaration else { panic!("expected a group") };
//! assert_eq!(items.len(), 3);
//! assert!(matches!(
//!     &items[2],
//!     Declaration::Role { access: Some(RoleAccess::Declarations(_)), .. }
//! ));
//! assert_eq!(items[0], Declaration::resource("Book", "read,write"));
//! assert!(matches!(
//!     &items[1],
//!     Declaration::Role { roles: Selector::Names(_), .. }
//! ));
//! ```

use serde::Deserialize;

/// The wildcard marker accepted wherever names are expected.
pub const WILDCARD: &str = "*";

// ============================================================================
// Names
// ============================================================================

/// An ordered list of names.
///
/// Built from a single name, a comma-separated list or a collection of names.
/// Surrounding whitespace is trimmed; empty entries are kept so that
/// validation can reject them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameList(Vec<String>);

impl NameList {
    /// Returns the names as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterates the names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for NameList {
    fn from(text: &str) -> Self {
        Self(text.split(',').map(|name| name.trim().to_owned()).collect())
    }
}

impl From<String> for NameList {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<Vec<String>> for NameList {
    fn from(names: Vec<String>) -> Self {
        Self(names.into_iter().map(|name| name.trim().to_owned()).collect())
    }
}

impl From<&[&str]> for NameList {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|name| name.trim().to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for NameList {
    fn from(names: [&str; N]) -> Self {
        Self::from(&names[..])
    }
}

/// Either every name of a kind known at compile time, or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Expands, when compiled, to every name currently defined.
    All,
    /// Explicit names.
    Names(NameList),
}

impl Selector {
    /// Returns `true` for [`Selector::All`].
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl From<&str> for Selector {
    fn from(text: &str) -> Self {
        if text.trim() == WILDCARD {
            Self::All
        } else {
            Self::Names(NameList::from(text))
        }
    }
}

impl From<String> for Selector {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<NameList> for Selector {
    fn from(names: NameList) -> Self {
        Self::Names(names)
    }
}

impl<const N: usize> From<[&str; N]> for Selector {
    fn from(names: [&str; N]) -> Self {
        Self::Names(NameList::from(names))
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// What a role grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleAccess {
    /// Every identifier allocated when the role is compiled.
    Everything,
    /// A dot expression such as `Reader.Book.edit.or.Author`.
    Expression(String),
    /// Nested declarations. They are defined first, then compiled into the
    /// role's ACL. A list containing groups compiles into alternatives.
    Declarations(Vec<Declaration>),
}

impl From<&str> for RoleAccess {
    fn from(text: &str) -> Self {
        if text.trim() == WILDCARD {
            Self::Everything
        } else {
            Self::Expression(text.to_owned())
        }
    }
}

impl From<String> for RoleAccess {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<Declaration> for RoleAccess {
    fn from(declaration: Declaration) -> Self {
        Self::Declarations(vec![declaration])
    }
}

impl From<Vec<Declaration>> for RoleAccess {
    fn from(declarations: Vec<Declaration>) -> Self {
        Self::Declarations(declarations)
    }
}

/// A single policy declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDeclaration")]
pub enum Declaration {
    /// Defines resources and their actions. Inside role access a missing
    /// action list means every action of the resource.
    Resource {
        /// Resources declared or selected.
        resources: Selector,
        /// Actions declared or selected.
        actions: Option<Selector>,
    },
    /// Defines roles, optionally with the access they grant.
    Role {
        /// Roles declared or selected.
        roles: Selector,
        /// Access granted by the roles.
        access: Option<RoleAccess>,
    },
    /// A nested list of declarations.
    Group(Vec<Declaration>),
}

impl Declaration {
    /// Declares `actions` on `resources`.
    #[must_use]
    pub fn resource(resources: impl Into<Selector>, actions: impl Into<Selector>) -> Self {
        Self::Resource {
            resources: resources.into(),
            actions: Some(actions.into()),
        }
    }

    /// Selects every action of `resources`. Only meaningful inside role access.
    #[must_use]
    pub fn resource_all_actions(resources: impl Into<Selector>) -> Self {
        Self::Resource {
            resources: resources.into(),
            actions: None,
        }
    }

    /// Declares `roles` without access.
    #[must_use]
    pub fn role(roles: impl Into<Selector>) -> Self {
        Self::Role {
            roles: roles.into(),
            access: None,
        }
    }

    /// Declares `roles` granting `access`.
    #[must_use]
    pub fn role_with(roles: impl Into<Selector>, access: impl Into<RoleAccess>) -> Self {
        Self::Role {
            roles: roles.into(),
            access: Some(access.into()),
        }
    }

    /// Groups declarations.
    #[must_use]
    pub fn group(items: impl IntoIterator<Item = Declaration>) -> Self {
        Self::Group(items.into_iter().collect())
    }

    /// Returns `true` if the declaration itself selects with a wildcard,
    /// explicitly or by omitting actions.
    ///
    /// Nested role access is not inspected: a role granting `"*"` is a
    /// regular declaration of that role.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        match self {
            Self::Resource { resources, actions } => {
                resources.is_all() || actions.as_ref().is_none_or(Selector::is_all)
            }
            Self::Role { roles, .. } => roles.is_all(),
            Self::Group(_) => false,
        }
    }
}

impl From<Vec<Declaration>> for Declaration {
    fn from(items: Vec<Declaration>) -> Self {
        Self::Group(items)
    }
}

// ============================================================================
// Serde shapes
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDeclaration {
    Group(Vec<RawDeclaration>),
    Record(Box<RawRecord>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRecord {
    resource: Option<RawNames>,
    action: Option<RawNames>,
    role: Option<RawNames>,
    access: Option<RawAccess>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNames {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAccess {
    Text(String),
    Declaration(RawDeclaration),
}

impl From<RawNames> for Selector {
    fn from(raw: RawNames) -> Self {
        match raw {
            RawNames::One(text) => Selector::from(text),
            RawNames::Many(names) if names.len() == 1 && names[0].trim() == WILDCARD => {
                Selector::All
            }
            RawNames::Many(names) => Selector::Names(NameList::from(names)),
        }
    }
}

impl TryFrom<RawAccess> for RoleAccess {
    type Error = String;

    fn try_from(raw: RawAccess) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawAccess::Text(text) => RoleAccess::from(text),
            RawAccess::Declaration(RawDeclaration::Group(items)) => RoleAccess::Declarations(
                items
                    .into_iter()
                    .map(Declaration::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            RawAccess::Declaration(record) => {
                RoleAccess::Declarations(vec![Declaration::try_from(record)?])
            }
        })
    }
}

impl TryFrom<RawDeclaration> for Declaration {
    type Error = String;

    fn try_from(raw: RawDeclaration) -> Result<Self, Self::Error> {
        let record = match raw {
            RawDeclaration::Group(items) => {
                return items
                    .into_iter()
                    .map(Declaration::try_from)
                    .collect::<Result<_, _>>()
                    .map(Declaration::Group);
            }
            RawDeclaration::Record(record) => *record,
        };
        match record {
            RawRecord {
                resource: Some(resources),
                role: None,
                access: None,
                action,
            } => Ok(Declaration::Resource {
                resources: resources.into(),
                actions: action.map(Selector::from),
            }),
            RawRecord {
                role: Some(roles),
                resource: None,
                action: None,
                access,
            } => Ok(Declaration::Role {
                roles: roles.into(),
                access: access.map(RoleAccess::try_from).transpose()?,
            }),
            RawRecord {
                resource: Some(_),
                role: Some(_),
                ..
            } => Err("declaration names both a resource and a role".to_owned()),
            RawRecord {
                resource: Some(_), ..
            } => Err("resource declarations do not take 'access'".to_owned()),
            RawRecord { role: Some(_), .. } => {
                Err("role declarations do not take 'action'".to_owned())
            }
            RawRecord { .. } => Err("declaration needs a 'resource' or a 'role'".to_owned()),
        }
    }
}
