//! Internal calls: the capability boundary between scripts and the host
//!
//! The host registers itself for the current thread with [`install_host`].
//! [`Entity`](crate::Entity) methods then forward to it. Everything runs on
//! the thread that drives the simulation, so the slot is thread-local.

use crate::error::ScriptError;
use crate::script::ScriptInstance;
use paper_core::{ComponentId, Uuid};
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

/// Host-provided entry points.
pub trait InternalCalls {
    /// `Entity_HasComponent`: whether `uuid` currently has `component`.
    ///
    /// Returns [`ScriptError::StaleHandle`] if `uuid` is not a live entity.
    fn entity_has_component(&self, uuid: Uuid, component: ComponentId)
        -> Result<bool, ScriptError>;

    /// `Entity_GetEntityByName`: [`Uuid::NIL`] when no live entity matches.
    fn entity_get_entity_by_name(&self, name: &str) -> Uuid;

    /// `Entity_GetScriptInstance`: the script bound to `uuid`, if any.
    fn entity_get_script_instance(&self, uuid: Uuid) -> Option<ScriptInstance>;
}

thread_local! {
    // Installed hosts, innermost last. Each entry is tagged with its guard.
    static HOSTS: RefCell<Vec<(u64, Rc<dyn InternalCalls>)>> = const { RefCell::new(Vec::new()) };
    static NEXT_GUARD: Cell<u64> = const { Cell::new(0) };
}

/// Uninstalls its host when dropped.
#[must_use = "the host is uninstalled as soon as the guard is dropped"]
pub struct HostGuard {
    id: u64,
    // Guards belong to the thread that installed them.
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for HostGuard {
    fn drop(&mut self) {
        let id = self.id;
        HOSTS.with(|hosts| {
            let mut hosts = hosts.borrow_mut();
            if let Some(index) = hosts.iter().rposition(|(guard, _)| *guard == id) {
                hosts.remove(index);
            }
        });
    }
}

/// Install `host` for the current thread until the guard is dropped.
///
/// Guards nest. Dropping a guard removes only its own host, so guards may be
/// dropped in any order: the current host is always the most recently
/// installed one still alive.
pub fn install_host(host: Rc<dyn InternalCalls>) -> HostGuard {
    let id = NEXT_GUARD.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    HOSTS.with(|hosts| hosts.borrow_mut().push((id, host)));
    HostGuard {
        id,
        _not_send: PhantomData,
    }
}

/// The host installed on this thread, if any.
pub fn current_host() -> Option<Rc<dyn InternalCalls>> {
    HOSTS.with(|hosts| hosts.borrow().last().map(|(_, host)| Rc::clone(host)))
}

/// Run `f` against the installed host.
///
/// The slot is not borrowed while `f` runs, so `f` may install hosts or
/// re-enter the scripting layer.
pub(crate) fn with_host<R>(f: impl FnOnce(&dyn InternalCalls) -> R) -> Result<R, ScriptError> {
    let host = current_host().ok_or(ScriptError::NoHost)?;
    Ok(f(&*host))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedHost(Uuid);

    impl InternalCalls for NamedHost {
        fn entity_has_component(&self, _: Uuid, _: ComponentId) -> Result<bool, ScriptError> {
            Ok(false)
        }

        fn entity_get_entity_by_name(&self, _: &str) -> Uuid {
            self.0
        }

        fn entity_get_script_instance(&self, _: Uuid) -> Option<ScriptInstance> {
            None
        }
    }

    fn resolved() -> Option<Uuid> {
        with_host(|host| host.entity_get_entity_by_name("any")).ok()
    }

    #[test]
    fn no_host_by_default() {
        assert!(current_host().is_none());
        assert!(matches!(with_host(|_| ()), Err(ScriptError::NoHost)));
    }

    #[test]
    fn guard_uninstalls_on_drop() {
        {
            let _guard = install_host(Rc::new(NamedHost(Uuid::from_raw(1))));
            assert_eq!(resolved(), Some(Uuid::from_raw(1)));
        }
        assert!(current_host().is_none());
    }

    #[test]
    fn guards_nest() {
        let _outer = install_host(Rc::new(NamedHost(Uuid::from_raw(1))));
        {
            let _inner = install_host(Rc::new(NamedHost(Uuid::from_raw(2))));
            assert_eq!(resolved(), Some(Uuid::from_raw(2)));
        }
        assert_eq!(resolved(), Some(Uuid::from_raw(1)));
    }

    #[test]
    fn guards_drop_out_of_order() {
        let first = install_host(Rc::new(NamedHost(Uuid::from_raw(1))));
        let second = install_host(Rc::new(NamedHost(Uuid::from_raw(2))));

        drop(first);
        assert_eq!(resolved(), Some(Uuid::from_raw(2)));

        drop(second);
        assert!(current_host().is_none());
    }

    #[test]
    fn same_host_installed_twice() {
        let host: Rc<dyn InternalCalls> = Rc::new(NamedHost(Uuid::from_raw(3)));
        let outer = install_host(Rc::clone(&host));
        let inner = install_host(Rc::clone(&host));
        drop(outer);
        assert_eq!(resolved(), Some(Uuid::from_raw(3)));
        drop(inner);
        assert!(current_host().is_none());
    }
}
