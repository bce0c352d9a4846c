use std::mem;
use std::ops::{Deref, DerefMut};

use crate::adapter::{Adapter, Connection};
use crate::types::Result;

use super::Scope;

/// Explicit query context handed to [`ScopeHelper`]s: the adapter plus the
/// scope currently installed for the call.
pub struct QueryContext<'a, C: Connection> {
    adapter: &'a mut Adapter<C>,
    current: Option<Scope>,
}

impl<'a, C: Connection> QueryContext<'a, C> {
    /// Context with no scope installed.
    pub fn new(adapter: &'a mut Adapter<C>) -> Self {
        Self {
            adapter,
            current: None,
        }
    }

    /// Scope installed by the innermost [`QueryContext::scoping`] call.
    pub fn current_scope(&self) -> Option<&Scope> {
        self.current.as_ref()
    }

    /// Adapter to run queries with.
    pub fn adapter(&mut self) -> &mut Adapter<C> {
        self.adapter
    }

    /// Installs `scope` for the duration of `f`. The previous scope is put
    /// back on every exit path, unwinding included.
    pub fn scoping<T, F>(&mut self, scope: Scope, f: F) -> T
    where
        F: FnOnce(&mut QueryContext<'a, C>) -> T,
    {
        let previous = mem::replace(&mut self.current, Some(scope));
        let mut guard = ScopingGuard {
            ctx: self,
            previous: Some(previous),
        };
        f(&mut *guard)
    }
}

struct ScopingGuard<'g, 'a, C: Connection> {
    ctx: &'g mut QueryContext<'a, C>,
    previous: Option<Option<Scope>>,
}

impl<'a, C: Connection> Deref for ScopingGuard<'_, 'a, C> {
    type Target = QueryContext<'a, C>;

    fn deref(&self) -> &QueryContext<'a, C> {
        self.ctx
    }
}

impl<'a, C: Connection> DerefMut for ScopingGuard<'_, 'a, C> {
    fn deref_mut(&mut self) -> &mut QueryContext<'a, C> {
        self.ctx
    }
}

impl<C: Connection> Drop for ScopingGuard<'_, '_, C> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.ctx.current = previous;
        }
    }
}

/// Entity-specific query helper run against the current scope.
///
/// Record types expose their own query helpers by implementing this trait
/// instead of relying on dynamic dispatch on the scope.
pub trait ScopeHelper<C: Connection> {
    /// Helper result.
    type Output;

    /// Runs the helper; `ctx.current_scope()` is the scope it was forwarded from.
    fn call(&self, ctx: &mut QueryContext<'_, C>) -> Result<Self::Output>;
}
