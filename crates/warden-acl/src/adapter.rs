//! Integration with a host framework.
//!
//! The host describes its request context through an [`AccessAdapter`]: where
//! the granted ACL of a request lives and what happens when a check passes or
//! fails. [`Acl`] then offers the guard operations on top of it.
//!
//! ```
//! use warden_acl::{AccessAdapter, Acl, Registry};
//!
//! #[derive(Default)]
//! struct Request {
//!     acl: Option<Acl>,
//!     status: Option<u16>,
//! }
//!
//! struct Adapter;
//!
//! impl AccessAdapter<Request> for Adapter {
//!     fn granted_acl<'c>(&self, ctx: &'c Request) -> Option<&'c Acl> {
//!         ctx.acl.as_ref()
//!     }
//!
//!     fn store_granted(&self, acl: Acl, ctx: &mut Request) {
//!         ctx.acl = Some(acl);
//!     }
//!
//!     fn reject(&self, _required: &Acl, ctx: &mut Request) {
//!         ctx.status = Some(self.error_status());
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.define_resource("Book", "read,write").unwrap();
//!
//! let mut request = Request::default();
//! registry.parse("Book.read")?.grant_to(&Adapter, &mut request)?;
//!
//! let handler = registry
//!     .parse("Book.write")?
//!     .required_for(Adapter, |_: &mut Request| "written")?;
//! assert_eq!(handler(&mut request), None);
//! assert_eq!(request.status, Some(403));
//! # Ok::<(), warden_acl::AccessError>(())
//! ```

use crate::acl::Acl;
use crate::error::{AccessError, AccessResult};

/// Default HTTP status reported when access is denied.
pub const DEFAULT_ERROR_STATUS: u16 = 403;

/// Host framework hooks. Every method has a default, so an adapter only
/// overrides what its framework needs.
pub trait AccessAdapter<C: ?Sized> {
    /// Returns the ACL granted to the context. `None` is treated as the empty
    /// grant.
    fn granted_acl<'c>(&self, _ctx: &'c C) -> Option<&'c Acl> {
        None
    }

    /// Attaches a granted ACL to the context.
    fn store_granted(&self, _acl: Acl, _ctx: &mut C) {}

    /// Called by a [`Acl::required`] guard when access is granted.
    fn cont(&self, _required: &Acl, _ctx: &mut C) {}

    /// Called by a [`Acl::required`] guard when access is denied.
    fn halt(&self, _required: &Acl, _ctx: &mut C) {}

    /// Called before a [`Acl::required_for`] target runs.
    fn accept(&self, _required: &Acl, _ctx: &mut C) {}

    /// Called instead of a [`Acl::required_for`] target when access is denied.
    fn reject(&self, _required: &Acl, _ctx: &mut C) {}

    /// Status reported for denied requests.
    fn error_status(&self) -> u16 {
        DEFAULT_ERROR_STATUS
    }
}

impl<C, A> AccessAdapter<C> for &A
where
    C: ?Sized,
    A: AccessAdapter<C> + ?Sized,
{
    fn granted_acl<'c>(&self, ctx: &'c C) -> Option<&'c Acl> {
        (**self).granted_acl(ctx)
    }

    fn store_granted(&self, acl: Acl, ctx: &mut C) {
        (**self).store_granted(acl, ctx);
    }

    fn cont(&self, required: &Acl, ctx: &mut C) {
        (**self).cont(required, ctx);
    }

    fn halt(&self, required: &Acl, ctx: &mut C) {
        (**self).halt(required, ctx);
    }

    fn accept(&self, required: &Acl, ctx: &mut C) {
        (**self).accept(required, ctx);
    }

    fn reject(&self, required: &Acl, ctx: &mut C) {
        (**self).reject(required, ctx);
    }

    fn error_status(&self) -> u16 {
        (**self).error_status()
    }
}

/// An adapter that never finds a grant and ignores every hook. Only empty
/// requirements pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenyAll {
    status: u16,
}

impl DenyAll {
    /// Denies with the given status instead of [`DEFAULT_ERROR_STATUS`].
    #[must_use]
    pub const fn with_status(status: u16) -> Self {
        Self { status }
    }
}

impl Default for DenyAll {
    fn default() -> Self {
        Self::with_status(DEFAULT_ERROR_STATUS)
    }
}

impl<C: ?Sized> AccessAdapter<C> for DenyAll {
    fn error_status(&self) -> u16 {
        self.status
    }
}

/// Wraps an adapter and replaces the status it reports for denials. Every
/// other hook goes to the wrapped adapter.
#[derive(Debug, Clone, Copy)]
pub struct WithErrorStatus<A> {
    adapter: A,
    status: u16,
}

impl<A> WithErrorStatus<A> {
    #[must_use]
    pub const fn new(adapter: A, status: u16) -> Self {
        Self { adapter, status }
    }

    pub fn inner(&self) -> &A {
        &self.adapter
    }
}

impl<C, A> AccessAdapter<C> for WithErrorStatus<A>
where
    C: ?Sized,
    A: AccessAdapter<C>,
{
    fn granted_acl<'c>(&self, ctx: &'c C) -> Option<&'c Acl> {
        self.adapter.granted_acl(ctx)
    }

    fn store_granted(&self, acl: Acl, ctx: &mut C) {
        self.adapter.store_granted(acl, ctx);
    }

    fn cont(&self, required: &Acl, ctx: &mut C) {
        self.adapter.cont(required, ctx);
    }

    fn halt(&self, required: &Acl, ctx: &mut C) {
        self.adapter.halt(required, ctx);
    }

    fn accept(&self, required: &Acl, ctx: &mut C) {
        self.adapter.accept(required, ctx);
    }

    fn reject(&self, required: &Acl, ctx: &mut C) {
        self.adapter.reject(required, ctx);
    }

    fn error_status(&self) -> u16 {
        self.status
    }
}

impl Acl {
    /// Checks this requirement against the grant the adapter finds in `ctx`.
    pub fn is_granted_in<C, A>(&self, adapter: &A, ctx: &C) -> bool
    where
        C: ?Sized,
        A: AccessAdapter<C> + ?Sized,
    {
        match adapter.granted_acl(ctx) {
            Some(granted) => self.is_granted_to(granted),
            None => self.is_granted_to(&Acl::empty()),
        }
    }

    /// Maximizes this ACL and stores it in `ctx` as the granted ACL.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvariantViolation`] if the ACL was minimized.
    pub fn grant_to<C, A>(mut self, adapter: &A, ctx: &mut C) -> AccessResult<()>
    where
        C: ?Sized,
        A: AccessAdapter<C> + ?Sized,
    {
        self.maximize()?;
        adapter.store_granted(self, ctx);
        Ok(())
    }

    /// Minimizes this ACL, checks it against `ctx` right away and calls
    /// `accept` or `reject`. Returns whether access was granted.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvariantViolation`] if the ACL was maximized.
    pub fn check_required<C, A>(&mut self, adapter: &A, ctx: &mut C) -> AccessResult<bool>
    where
        C: ?Sized,
        A: AccessAdapter<C> + ?Sized,
    {
        self.minimize()?;
        let allowed = self.is_granted_in(adapter, ctx);
        if allowed {
            adapter.accept(self, ctx);
        } else {
            adapter.reject(self, ctx);
        }
        Ok(allowed)
    }

    /// Like [`Acl::is_granted_in`], but reports a denial as an error carrying
    /// the adapter's status.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::AccessDenied`] when access is not granted.
    pub fn ensure_granted_in<C, A>(&self, adapter: &A, ctx: &C) -> AccessResult<()>
    where
        C: ?Sized,
        A: AccessAdapter<C> + ?Sized,
    {
        if self.is_granted_in(adapter, ctx) {
            Ok(())
        } else {
            Err(AccessError::denied(adapter.error_status()))
        }
    }

    /// Minimizes this ACL and wraps `target` in a guard. The guard runs
    /// `accept` and then `target` when access is granted, and `reject`
    /// otherwise; it returns the target's result only in the first case.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvariantViolation`] if the ACL was maximized.
    pub fn required_for<C, A, F, R>(
        mut self,
        adapter: A,
        target: F,
    ) -> AccessResult<impl Fn(&mut C) -> Option<R>>
    where
        C: ?Sized,
        A: AccessAdapter<C>,
        F: Fn(&mut C) -> R,
    {
        self.minimize()?;
        Ok(move |ctx: &mut C| {
            if self.is_granted_in(&adapter, ctx) {
                adapter.accept(&self, ctx);
                Some(target(ctx))
            } else {
                tracing::debug!(status = adapter.error_status(), "access rejected");
                adapter.reject(&self, ctx);
                None
            }
        })
    }

    /// Minimizes this ACL and returns a middleware-shaped check that calls
    /// `cont` or `halt` and reports whether access was granted.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvariantViolation`] if the ACL was maximized.
    pub fn required<C, A>(mut self, adapter: A) -> AccessResult<impl Fn(&mut C) -> bool>
    where
        C: ?Sized,
        A: AccessAdapter<C>,
    {
        self.minimize()?;
        Ok(move |ctx: &mut C| {
            let allowed = self.is_granted_in(&adapter, ctx);
            if allowed {
                adapter.cont(&self, ctx);
            } else {
                tracing::debug!(status = adapter.error_status(), "access halted");
                adapter.halt(&self, ctx);
            }
            allowed
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::declaration::RoleAccess;
    use crate::registry::Registry;

    #[derive(Debug, Default)]
    struct Request {
        user: Option<String>,
        acl: Option<Acl>,
        status: Option<u16>,
        calls: Vec<&'static str>,
    }

    struct Express {
        status: u16,
        accepted: Cell<usize>,
    }

    impl Express {
        fn new(status: u16) -> Self {
            Self {
                status,
                accepted: Cell::new(0),
            }
        }

        fn denied(&self, ctx: &mut Request) {
            ctx.status = Some(if ctx.user.is_none() { 401 } else { self.status });
        }
    }

    impl AccessAdapter<Request> for Express {
        fn granted_acl<'c>(&self, ctx: &'c Request) -> Option<&'c Acl> {
            ctx.acl.as_ref()
        }

        fn store_granted(&self, acl: Acl, ctx: &mut Request) {
            ctx.acl = Some(acl);
        }

        fn cont(&self, _required: &Acl, ctx: &mut Request) {
            ctx.calls.push("next");
        }

        fn halt(&self, _required: &Acl, ctx: &mut Request) {
            self.denied(ctx);
        }

        fn accept(&self, _required: &Acl, _ctx: &mut Request) {
            self.accepted.set(self.accepted.get() + 1);
        }

        fn reject(&self, _required: &Acl, ctx: &mut Request) {
            self.denied(ctx);
        }

        fn error_status(&self) -> u16 {
            self.status
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.define_resource("Book", "read,write").unwrap();
        registry
            .define_role("Reader", Some(RoleAccess::from("Book.read")))
            .unwrap();
        registry
    }

    fn signed_in(registry: &Registry, adapter: &Express, grant: &str) -> Request {
        let mut request = Request {
            user: Some("alex".to_owned()),
            ..Request::default()
        };
        registry
            .parse(grant)
            .unwrap()
            .grant_to(adapter, &mut request)
            .unwrap();
        request
    }

    #[test]
    fn test_grant_to_maximizes() {
        let registry = registry();
        let adapter = Express::new(403);
        let request = signed_in(&registry, &adapter, "Book.read.or.Book.read.write");
        let granted = request.acl.unwrap();
        assert_eq!(granted.display(&registry).to_string(), "[Book.read,Book.write]");
    }

    #[test]
    fn test_required_for_runs_target() {
        let registry = registry();
        let adapter = Express::new(403);
        let mut request = signed_in(&registry, &adapter, "Reader");

        let handler = registry
            .parse("Book.read")
            .unwrap()
            .required_for(&adapter, |req: &mut Request| {
                req.calls.push("handler");
                200
            })
            .unwrap();
        assert_eq!(handler(&mut request), Some(200));
        assert_eq!(request.calls, vec!["handler"]);
        assert_eq!(request.status, None);
        assert_eq!(adapter.accepted.get(), 1);
    }

    #[test]
    fn test_required_for_rejects() {
        let registry = registry();
        let adapter = Express::new(404);
        let mut request = signed_in(&registry, &adapter, "Reader");

        let handler = registry
            .parse("Book.write")
            .unwrap()
            .required_for(&adapter, |req: &mut Request| req.calls.push("handler"))
            .unwrap();
        assert_eq!(handler(&mut request), None);
        assert!(request.calls.is_empty());
        assert_eq!(request.status, Some(404));

        let mut anonymous = Request::default();
        assert_eq!(handler(&mut anonymous), None);
        assert_eq!(anonymous.status, Some(401));
    }

    #[test]
    fn test_required_middleware() {
        let registry = registry();
        let adapter = Express::new(403);
        let guard = registry
            .parse("Book.read")
            .unwrap()
            .required::<Request, _>(&adapter)
            .unwrap();

        let mut request = signed_in(&registry, &adapter, "Book.read.write");
        assert!(guard(&mut request));
        assert_eq!(request.calls, vec!["next"]);

        let mut request = signed_in(&registry, &adapter, "Book.write");
        assert!(!guard(&mut request));
        assert!(request.calls.is_empty());
        assert_eq!(request.status, Some(403));
    }

    #[test]
    fn test_check_required() {
        let registry = registry();
        let adapter = Express::new(403);
        let mut request = signed_in(&registry, &adapter, "Reader");

        let mut required = registry.parse("Book.write.or.Reader").unwrap();
        assert!(required.check_required(&adapter, &mut request).unwrap());
        assert!(required.is_minimized());
        assert_eq!(adapter.accepted.get(), 1);

        let mut required = registry.parse("Book.write").unwrap();
        assert!(!required.check_required(&adapter, &mut request).unwrap());
        assert_eq!(request.status, Some(403));
    }

    #[test]
    fn test_missing_grant_is_empty() {
        let registry = registry();
        let request = Request::default();
        let adapter = Express::new(403);
        assert!(!registry.parse("Book.read").unwrap().is_granted_in(&adapter, &request));
        assert!(Acl::empty().is_granted_in(&adapter, &request));
        assert!(
            !registry
                .parse("Reader")
                .unwrap()
                .is_granted_in(&DenyAll::default(), &request)
        );
    }

    #[test]
    fn test_ensure_granted_in() {
        let registry = registry();
        let adapter = Express::new(404);
        let request = signed_in(&registry, &adapter, "Reader");

        assert!(registry.parse("Book.read").unwrap().ensure_granted_in(&adapter, &request).is_ok());
        let err = registry
            .parse("Book.write")
            .unwrap()
            .ensure_granted_in(&adapter, &request)
            .unwrap_err();
        assert_eq!(err, AccessError::denied(404));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_optimized_acl_cannot_switch_roles() {
        let registry = registry();
        let adapter = Express::new(403);
        let mut request = Request::default();

        let mut acl = registry.parse("Book.read.or.Book.write").unwrap();
        acl.maximize().unwrap();
        assert!(acl.clone().required::<Request, _>(&adapter).is_err());
        assert!(acl.grant_to(&adapter, &mut request).is_ok());
    }

    // ------------------------------------------------------------------------
    // Denial status
    // ------------------------------------------------------------------------

    #[test]
    fn test_deny_all_status() {
        let registry = registry();
        let required = registry.parse("Book.read").unwrap();

        let err = required.ensure_granted_in(&DenyAll::default(), &()).unwrap_err();
        assert_eq!(err.status_code(), DEFAULT_ERROR_STATUS);

        let err = required
            .ensure_granted_in(&DenyAll::with_status(404), &())
            .unwrap_err();
        assert_eq!(err, AccessError::denied(404));
    }

    #[test]
    fn test_with_error_status_overrides_only_status() {
        let registry = registry();
        let express = Express::new(403);
        let adapter = WithErrorStatus::new(&express, 404);
        let mut request = signed_in(&registry, &express, "Reader");

        assert!(
            registry
                .parse("Book.read")
                .unwrap()
                .ensure_granted_in(&adapter, &request)
                .is_ok()
        );
        let err = registry
            .parse("Book.write")
            .unwrap()
            .ensure_granted_in(&adapter, &request)
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        let handler = registry
            .parse("Book.read")
            .unwrap()
            .required_for(adapter, |_: &mut Request| "read")
            .unwrap();
        assert_eq!(handler(&mut request), Some("read"));
        assert_eq!(express.accepted.get(), 1);
    }
}
