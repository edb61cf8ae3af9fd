//! The ACL algebra.
//!
//! An [`Acl`] is a disjunction of conjunctions of access identifiers: either
//! empty, a single [`AccessMask`] whose members must all be present, or a list
//! of such masks of which any one suffices. Operations mutate in place and
//! renormalize afterwards:
//!
//! - empty alternatives are dropped and duplicates collapse to the first
//!   occurrence,
//! - a list of one alternative becomes a single mask, a list of none becomes
//!   empty,
//! - an empty mask is the empty ACL.
//!
//! A list never nests. Any operation that would produce a disjunction inside a
//! disjunction splices the inner alternatives into the outer list, which keeps
//! every alternative visible to [`Acl::minimize`] and [`Acl::maximize`].
//!
//! # Examples
//!
//! ```
//! use warden_acl::{AccessId, Acl};
//!
//! let read = Acl::from_id(AccessId::new(1));
//! let write = Acl::from_id(AccessId::new(2));
//!
//! let mut required = read.clone();
//! required.combine(&write);
//!
//! let mut granted = read.clone();
//! granted.add(&Acl::from_id(AccessId::new(3)));
//!
//! assert!(required.is_granted_to(&granted));
//! assert!(!write.is_granted_to(&granted));
//! ```

use std::fmt;

use crate::error::{AccessError, AccessResult};
use crate::mask::{AccessId, AccessMask};
use crate::registry::Registry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Node {
    #[default]
    Empty,
    Mask(AccessMask),
    Alternatives(Vec<AccessMask>),
}

/// Which optimization pass an ACL has been committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Optimization {
    Minimized,
    Maximized,
}

/// An access control list.
///
/// Equality is structural: two ACLs are equal when they hold equal masks, or
/// equal lists of masks in the same order. Optimization tags are ignored.
#[derive(Debug, Clone, Default)]
pub struct Acl {
    node: Node,
    optimized: Option<Optimization>,
}

impl PartialEq for Acl {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for Acl {}

// ============================================================================
// Construction
// ============================================================================

impl Acl {
    /// Creates the empty ACL. As a requirement it is always satisfied; as a
    /// grant it satisfies only the empty requirement.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a single-alternative ACL from a mask.
    #[must_use]
    pub fn from_mask(mask: AccessMask) -> Self {
        Self::from_node(Node::Mask(mask))
    }

    /// Creates a single-alternative ACL holding one identifier.
    #[must_use]
    pub fn from_id(id: AccessId) -> Self {
        Self::from_mask(AccessMask::singleton(id))
    }

    /// Creates an ACL holding every identifier from `first` to `last`.
    #[must_use]
    pub fn range(first: AccessId, last: AccessId) -> Self {
        Self::from_mask(AccessMask::range(first, last))
    }

    /// Creates an ACL from alternatives. Empty and duplicate masks are dropped.
    #[must_use]
    pub fn from_alternatives<I>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = AccessMask>,
    {
        Self::from_node(Node::Alternatives(alternatives.into_iter().collect()))
    }

    /// Creates an ACL requiring `actions` on `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UndefinedResource`] if `resource` is not a
    /// resource and [`AccessError::UndefinedAction`] if one of the actions is
    /// not defined for it.
    pub fn from_permissions<I, S>(registry: &Registry, resource: &str, actions: I) -> AccessResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !registry.is_resource(resource) {
            return Err(AccessError::undefined_resource(resource));
        }
        let mut mask = AccessMask::new();
        for action in actions {
            let action = action.as_ref();
            let id = registry
                .permission_id(resource, action)
                .ok_or_else(|| AccessError::undefined_action(resource, action))?;
            mask.set(id);
        }
        Ok(Self::from_mask(mask))
    }

    /// Creates an ACL for a role: the role's own identifier merged with the
    /// ACL compiled for it, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UndefinedRole`] if `name` is not a role.
    pub fn from_role(registry: &Registry, name: &str) -> AccessResult<Self> {
        let id = registry
            .role_id(name)
            .ok_or_else(|| AccessError::undefined_role(name))?;
        let mut acl = Self::from_id(id);
        if let Some(granted) = registry.role_acl(name) {
            acl.add(granted);
        }
        Ok(acl)
    }

    fn from_node(node: Node) -> Self {
        let mut acl = Self {
            node,
            optimized: None,
        };
        acl.normalize();
        acl
    }
}

// ============================================================================
// Algebra
// ============================================================================

impl Acl {
    /// Conjunctive merge (AND).
    ///
    /// A mask is unioned into every alternative of the other side; two lists
    /// produce their cross product.
    pub fn add(&mut self, other: &Acl) -> &mut Self {
        self.merge(other, AccessMask::set_all)
    }

    /// Conjunctive subtraction. Structurally the same as [`Acl::add`] with
    /// set difference at the leaves; used for `except` clauses.
    pub fn remove(&mut self, other: &Acl) -> &mut Self {
        if matches!(self.node, Node::Empty) {
            return self;
        }
        self.merge(other, AccessMask::reset_all)
    }

    fn merge(&mut self, other: &Acl, op: fn(&mut AccessMask, &AccessMask)) -> &mut Self {
        let node = match (std::mem::take(&mut self.node), &other.node) {
            (node, Node::Empty) => node,
            (Node::Empty, right) => right.clone(),
            (Node::Mask(mut left), Node::Mask(right)) => {
                op(&mut left, right);
                Node::Mask(left)
            }
            (Node::Mask(left), Node::Alternatives(rights)) => Node::Alternatives(
                rights
                    .iter()
                    .map(|right| {
                        let mut alt = left.clone();
                        op(&mut alt, right);
                        alt
                    })
                    .collect(),
            ),
            (Node::Alternatives(mut lefts), Node::Mask(right)) => {
                for left in &mut lefts {
                    op(left, right);
                }
                Node::Alternatives(lefts)
            }
            (Node::Alternatives(lefts), Node::Alternatives(rights)) => {
                let mut product = Vec::with_capacity(lefts.len() * rights.len());
                for left in &lefts {
                    for right in rights {
                        let mut alt = left.clone();
                        op(&mut alt, right);
                        product.push(alt);
                    }
                }
                Node::Alternatives(product)
            }
        };
        self.node = node;
        self.normalize();
        self
    }

    /// Disjunctive union (OR): appends the alternatives of `other`.
    pub fn combine(&mut self, other: &Acl) -> &mut Self {
        let node = match (std::mem::take(&mut self.node), &other.node) {
            (node, Node::Empty) => node,
            (Node::Empty, right) => right.clone(),
            (left, right) => {
                let mut alternatives = into_alternatives(left);
                alternatives.extend(alternatives_of(right).iter().cloned());
                Node::Alternatives(alternatives)
            }
        };
        self.node = node;
        self.normalize();
        self
    }

    /// Restricts this ACL to the part covered by `allowed`, then maximizes it.
    ///
    /// Each alternative is intersected with each alternative of `allowed`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvariantViolation`] if this ACL is already
    /// minimized.
    pub fn filter(&mut self, allowed: &Acl) -> AccessResult<&mut Self> {
        self.filter_with(allowed, |_| true)
    }

    /// Like [`Acl::filter`], but keeps only role identifiers, answering which
    /// of the requested roles are actually granted.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvariantViolation`] if this ACL is already
    /// minimized.
    pub fn filter_roles(&mut self, allowed: &Acl, registry: &Registry) -> AccessResult<&mut Self> {
        self.filter_with(allowed, |id| registry.is_role_id(id))
    }

    fn filter_with<F>(&mut self, allowed: &Acl, keep: F) -> AccessResult<&mut Self>
    where
        F: Fn(AccessId) -> bool,
    {
        let mut filtered = Vec::new();
        for alt in alternatives_of(&self.node) {
            for with in alternatives_of(&allowed.node) {
                let mut alt = alt.clone();
                alt.filter_against(with);
                alt.retain(&keep);
                filtered.push(alt);
            }
        }
        self.node = Node::Alternatives(filtered);
        self.normalize();
        self.maximize()?;
        Ok(self)
    }

    fn normalize(&mut self) {
        let node = match std::mem::take(&mut self.node) {
            Node::Empty => Node::Empty,
            Node::Mask(mask) if mask.is_empty() => Node::Empty,
            Node::Mask(mask) => Node::Mask(mask),
            Node::Alternatives(alternatives) => {
                let mut unique: Vec<AccessMask> = Vec::with_capacity(alternatives.len());
                for alt in alternatives {
                    if !alt.is_empty() && !unique.contains(&alt) {
                        unique.push(alt);
                    }
                }
                match unique.len() {
                    0 => Node::Empty,
                    1 => Node::Mask(unique.remove(0)),
                    _ => Node::Alternatives(unique),
                }
            }
        };
        self.node = node;
    }
}

fn alternatives_of(node: &Node) -> &[AccessMask] {
    match node {
        Node::Empty => &[],
        Node::Mask(mask) => std::slice::from_ref(mask),
        Node::Alternatives(alternatives) => alternatives,
    }
}

fn into_alternatives(node: Node) -> Vec<AccessMask> {
    match node {
        Node::Empty => Vec::new(),
        Node::Mask(mask) => vec![mask],
        Node::Alternatives(alternatives) => alternatives,
    }
}

// ============================================================================
// Optimization
// ============================================================================

impl Acl {
    /// Prepares this ACL for use as a required ACL by dropping every
    /// alternative that is a superset of another one.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvariantViolation`] if the ACL was maximized.
    pub fn minimize(&mut self) -> AccessResult<&mut Self> {
        self.optimize(Optimization::Minimized)
    }

    /// Prepares this ACL for use as a granted ACL by dropping every
    /// alternative that is a subset of another one.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvariantViolation`] if the ACL was minimized.
    pub fn maximize(&mut self) -> AccessResult<&mut Self> {
        self.optimize(Optimization::Maximized)
    }

    fn optimize(&mut self, pass: Optimization) -> AccessResult<&mut Self> {
        let Node::Alternatives(alternatives) = &mut self.node else {
            return Ok(self);
        };
        if self.optimized.is_some_and(|tag| tag != pass) {
            return Err(AccessError::invariant_violation(
                "acl is either required or granted but not both",
            ));
        }
        let mut redundant = vec![false; alternatives.len()];
        for (i, keep) in alternatives.iter().enumerate() {
            if redundant[i] {
                continue;
            }
            for (j, other) in alternatives.iter().enumerate() {
                if i == j || redundant[j] {
                    continue;
                }
                redundant[j] = match pass {
                    Optimization::Minimized => other.contains_all(keep),
                    Optimization::Maximized => keep.contains_all(other),
                };
            }
        }
        let mut flags = redundant.into_iter();
        alternatives.retain(|_| !flags.next().unwrap_or(false));
        for alt in alternatives.iter_mut() {
            alt.compact();
        }
        self.optimized = Some(pass);
        self.normalize();
        Ok(self)
    }

    /// Returns `true` once the ACL has been minimized for use as a requirement.
    #[must_use]
    pub fn is_minimized(&self) -> bool {
        self.optimized == Some(Optimization::Minimized)
    }

    /// Returns `true` once the ACL has been maximized for use as a grant.
    #[must_use]
    pub fn is_maximized(&self) -> bool {
        self.optimized == Some(Optimization::Maximized)
    }
}

// ============================================================================
// Evaluation and inspection
// ============================================================================

impl Acl {
    /// Returns `true` if `granted` satisfies this ACL as a requirement.
    ///
    /// A requirement is met when any of its alternatives is contained in any
    /// alternative of the grant. The empty requirement is always met.
    #[must_use]
    pub fn is_granted_to(&self, granted: &Acl) -> bool {
        let allowed = match &self.node {
            Node::Empty => true,
            node => alternatives_of(node)
                .iter()
                .any(|required| alternative_allowed(required, &granted.node)),
        };
        tracing::trace!(allowed, "evaluated access requirement");
        allowed
    }

    /// Returns `true` if the ACL has no identifiers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.node, Node::Empty)
    }

    /// Returns the alternatives in order. A single mask is one alternative;
    /// the empty ACL has none.
    #[must_use]
    pub fn alternatives(&self) -> &[AccessMask] {
        alternatives_of(&self.node)
    }

    /// Returns the mask if this ACL has exactly one alternative.
    #[must_use]
    pub fn as_mask(&self) -> Option<&AccessMask> {
        match &self.node {
            Node::Mask(mask) => Some(mask),
            _ => None,
        }
    }

    /// Returns the ACL keeping only the identifiers selected by `options`, as
    /// rendering it with those options and parsing the text back would.
    #[must_use]
    pub fn facet(&self, registry: &Registry, options: RenderOptions) -> Acl {
        Self::from_alternatives(self.alternatives().iter().map(|alt| {
            let mut alt = alt.clone();
            alt.retain(|id| options.includes(registry.is_role_id(id)));
            alt
        }))
    }

    /// Renders the ACL with resolved names.
    #[must_use]
    pub fn render(&self, registry: &Registry, options: RenderOptions) -> String {
        self.display(registry).with_options(options).to_string()
    }

    /// Returns a displayable view using default options.
    #[must_use]
    pub fn display<'a>(&'a self, registry: &'a Registry) -> AclDisplay<'a> {
        AclDisplay {
            acl: self,
            registry,
            options: RenderOptions::default(),
        }
    }
}

fn alternative_allowed(required: &AccessMask, granted: &Node) -> bool {
    match granted {
        Node::Empty => required.is_empty(),
        node => alternatives_of(node)
            .iter()
            .any(|alt| alt.contains_all(required)),
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Controls which identifiers are rendered and how alternatives are wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Include role names.
    pub roles: bool,
    /// Include `Resource.action` permissions.
    pub permissions: bool,
    /// Wrap each alternative in `[` and `]`.
    pub brackets: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::export()
    }
}

impl RenderOptions {
    /// Options whose output parses back into an equal ACL.
    #[must_use]
    pub const fn export() -> Self {
        Self {
            roles: true,
            permissions: true,
            brackets: true,
        }
    }

    /// Omits role names.
    #[must_use]
    pub const fn without_roles(mut self) -> Self {
        self.roles = false;
        self
    }

    /// Omits permissions.
    #[must_use]
    pub const fn without_permissions(mut self) -> Self {
        self.permissions = false;
        self
    }

    /// Renders bare comma-separated lists. The result is not parseable.
    #[must_use]
    pub const fn without_brackets(mut self) -> Self {
        self.brackets = false;
        self
    }

    fn includes(&self, is_role: bool) -> bool {
        if is_role { self.roles } else { self.permissions }
    }
}

/// Display adapter resolving identifiers through a [`Registry`].
#[derive(Debug, Clone, Copy)]
pub struct AclDisplay<'a> {
    acl: &'a Acl,
    registry: &'a Registry,
    options: RenderOptions,
}

impl AclDisplay<'_> {
    /// Replaces the render options.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Display for AclDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, alt) in self.acl.alternatives().iter().enumerate() {
            if index > 0 {
                f.write_str(" || ")?;
            }
            if self.options.brackets {
                f.write_str("[")?;
            }
            let mut first = true;
            for id in alt {
                let Some(name) = self.registry.name_of(id) else {
                    continue;
                };
                if !self.options.includes(name.is_role()) {
                    continue;
                }
                if !first {
                    f.write_str(",")?;
                }
                first = false;
                write!(f, "{name}")?;
            }
            if self.options.brackets {
                f.write_str("]")?;
            }
        }
        Ok(())
    }
}
