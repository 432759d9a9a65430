//! Devirtualization of virtual calls.
//!
//! A reaching-class analysis run before emission may record, per call site,
//! the set of classes the receiver can have at run time. When every class
//! in that set resolves the called virtual function to the same
//! implementation, the call is emitted as a direct call.
//!
//! ## Algorithm
//!
//! For each reaching class, walk its base chain nearest first. At each
//! class take the called function itself if that class declares it, else
//! the member of the function's override set declared there. The first hit
//! is the implementation the class dispatches to.

use ember_core::{FunctionEntry, TypeHash};
use ember_registry::SymbolRegistry;
use rustc_hash::FxHashMap;

use crate::bound::CallSiteId;

/// Receiver classes reaching each call site of one function.
pub type ReachingClassMap = FxHashMap<CallSiteId, Vec<TypeHash>>;

/// The single implementation `function` dispatches to at `site`, if the
/// reaching classes agree on one.
pub fn try_devirtualize<'r>(
    registry: &'r SymbolRegistry,
    function: TypeHash,
    site: CallSiteId,
    reaching: &ReachingClassMap,
) -> Option<&'r FunctionEntry> {
    let classes = reaching.get(&site)?;
    let called = registry.get_function(function)?;

    let mut chosen: Option<&FunctionEntry> = None;
    for &class in classes {
        let target = dispatch_target(registry, called, class)?;
        match chosen {
            Some(previous) if previous.hash != target.hash => return None,
            _ => chosen = Some(target),
        }
    }
    chosen
}

/// The implementation of `called` a receiver of dynamic class `class` runs.
fn dispatch_target<'r>(
    registry: &'r SymbolRegistry,
    called: &'r FunctionEntry,
    class: TypeHash,
) -> Option<&'r FunctionEntry> {
    let overrides = registry.override_set(called.hash);
    registry.base_class_chain(class).into_iter().find_map(|entry| {
        if called.owner == Some(entry.hash) {
            return Some(called);
        }
        overrides
            .iter()
            .filter_map(|&h| registry.get_function(h))
            .find(|f| f.owner == Some(entry.hash))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{ClassEntry, DataType, FunctionTraits};

    struct Hierarchy {
        registry: SymbolRegistry,
        a: TypeHash,
        b: TypeHash,
        c: TypeHash,
        d: TypeHash,
        a_f: TypeHash,
        b_f: TypeHash,
        d_f: TypeHash,
    }

    /// A declares virtual f; B : A and D : A override it; C : B does not.
    fn hierarchy() -> Hierarchy {
        let mut registry = SymbolRegistry::with_basic_types();
        let a = registry.register_class(ClassEntry::new("A")).unwrap();
        let b = registry.register_class(ClassEntry::new("B").with_base(a)).unwrap();
        let c = registry.register_class(ClassEntry::new("C").with_base(b)).unwrap();
        let d = registry.register_class(ClassEntry::new("D").with_base(a)).unwrap();

        let method = |owner| FunctionEntry::method(owner, "f", Vec::new(), DataType::void());
        let a_f = registry
            .register_function(method(a).with_traits(FunctionTraits::VIRTUAL))
            .unwrap();
        let b_f = registry.register_function(method(b)).unwrap();
        let d_f = registry.register_function(method(d)).unwrap();
        Hierarchy {
            registry,
            a,
            b,
            c,
            d,
            a_f,
            b_f,
            d_f,
        }
    }

    fn reaching(classes: &[TypeHash]) -> ReachingClassMap {
        let mut map = ReachingClassMap::default();
        map.insert(CallSiteId(0), classes.to_vec());
        map
    }

    fn target(h: &Hierarchy, classes: &[TypeHash]) -> Option<TypeHash> {
        try_devirtualize(&h.registry, h.a_f, CallSiteId(0), &reaching(classes)).map(|f| f.hash)
    }

    #[test]
    fn single_class_with_override() {
        let h = hierarchy();
        assert_eq!(target(&h, &[h.d]), Some(h.d_f));
    }

    #[test]
    fn inherited_override_is_found_through_base_chain() {
        let h = hierarchy();
        assert_eq!(target(&h, &[h.c]), Some(h.b_f));
        assert_eq!(target(&h, &[h.b, h.c]), Some(h.b_f));
    }

    #[test]
    fn declaring_class_uses_the_function_itself() {
        let h = hierarchy();
        assert_eq!(target(&h, &[h.a]), Some(h.a_f));
    }

    #[test]
    fn disagreeing_classes_stay_virtual() {
        let h = hierarchy();
        assert_eq!(target(&h, &[h.b, h.d]), None);
        // Deterministic regardless of order.
        assert_eq!(target(&h, &[h.d, h.b]), None);
    }

    #[test]
    fn unknown_site_or_empty_set_stays_virtual() {
        let h = hierarchy();
        assert_eq!(target(&h, &[]), None);
        let map = reaching(&[h.b]);
        assert!(try_devirtualize(&h.registry, h.a_f, CallSiteId(9), &map).is_none());
    }
}
