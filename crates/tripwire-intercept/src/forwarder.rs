//! The call forwarder (trampoline)
//!
//! `make_trampoline` builds the implementation the registry installs in
//! place of an intercepted method. Per call it must be indistinguishable
//! from the call never having been intercepted: the captured original runs
//! with the unmodified frame and its return value and errors propagate
//! untouched. For observed receivers the trampoline marshals the arguments
//! on entry — object arguments are retained before the original runs, so an
//! original that releases its argument cannot invalidate the event — and
//! publishes only once the original completes. Unobserved instances of an
//! intercepted class pay no marshalling cost.
//!
//! The original is invoked directly through its captured handle, not via
//! `Runtime::send`, so it executes unshadowed. An original that recursively
//! sends its own selector re-enters the trampoline one level per send, each
//! level forwarding directly again — recursion depth stays that of the
//! original program. The trampoline never touches the installation path.

use std::sync::Arc;

use tripwire_object::{DispatchError, Imp, Runtime};

use crate::marshal::unpack;
use crate::registry::InterceptionRegistry;
use crate::state::StateTable;

/// Build the forwarding implementation shared by every installation this
/// engine performs.
pub fn make_trampoline(
    registry: Arc<InterceptionRegistry>,
    states: Arc<StateTable>,
) -> Imp {
    Arc::new(move |runtime: &Runtime, frame| {
        let receiver = frame.receiver();
        let selector = frame.selector();
        let class = runtime
            .objects()
            .class_of(receiver)
            .ok_or(DispatchError::DeadObject(receiver))?;

        // Snapshot the chain and drop the class lock before taking the
        // registry lock; the install path acquires them in the opposite
        // nesting and relies on this path never holding both.
        let (chain, class_name) = {
            let classes = runtime.classes().read();
            (
                classes.chain(class),
                classes.name_of(class).unwrap_or("?").to_string(),
            )
        };
        let record = registry
            .record_for(&chain, selector)
            .unwrap_or_else(|| {
                panic!(
                    "forwarding record missing for `{}` on `{}`",
                    selector, class_name
                )
            });

        // Marshal before running the original: argument values reflect the
        // invocation, and object arguments stay retained even if the
        // original releases them. A dangling reference makes the call
        // unobservable, nothing more.
        let pending = states
            .get(receiver, selector)
            .map(|state| (state, unpack(runtime, frame, &record.descriptor)));

        let outcome = match &record.original {
            Some(original) => original(runtime, frame),
            None => Err(DispatchError::UnrecognizedSelector {
                class: class_name,
                selector: selector.name(),
            }),
        };

        // Emit only for calls that completed.
        if outcome.is_ok() {
            if let Some((state, Some(event))) = pending {
                state.publish(event);
            }
        }
        outcome
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tripwire_object::{
        Argument, ReturnValue, Selector, Signature, TypeEncoding,
    };

    struct Fixture {
        rt: Runtime,
        registry: Arc<InterceptionRegistry>,
        states: Arc<StateTable>,
        class: tripwire_object::ClassId,
        sel: Selector,
        hits: Arc<AtomicUsize>,
    }

    fn fixture(selector_name: &str) -> Fixture {
        let rt = Runtime::new();
        let sel = Selector::intern(selector_name);
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        let class = {
            let mut classes = rt.classes().write();
            let class = classes.define("Forwarded", None);
            classes.add_method(
                class,
                sel,
                Signature::method(TypeEncoding::Int32, vec![TypeEncoding::Int32]),
                Arc::new(move |_, frame| {
                    hits2.fetch_add(1, Ordering::SeqCst);
                    let doubled = frame.arg_i32(0)? * 2;
                    frame.set_return(ReturnValue::I32(doubled))?;
                    Ok(())
                }),
            );
            class
        };
        let registry = Arc::new(InterceptionRegistry::new());
        let states = Arc::new(StateTable::new());
        let trampoline = make_trampoline(registry.clone(), states.clone());
        registry
            .ensure_installed(&rt, class, sel, &trampoline)
            .unwrap();
        Fixture {
            rt,
            registry,
            states,
            class,
            sel,
            hits,
        }
    }

    #[test]
    fn test_forwarding_preserves_behavior() {
        let f = fixture("fwd_behavior");
        let obj = f.rt.alloc(f.class);
        let ret = f.rt.send(obj, f.sel, &[Argument::I32(21)]).unwrap();
        assert_eq!(ret, ReturnValue::I32(42));
        assert_eq!(f.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unobserved_receiver_skips_marshalling() {
        let f = fixture("fwd_unobserved");
        let obj = f.rt.alloc(f.class);
        f.rt.send(obj, f.sel, &[Argument::I32(1)]).unwrap();
        // No state was ever created for the pair.
        assert!(f.states.is_empty());
        assert_eq!(f.registry.len(), 1);
    }

    #[test]
    fn test_observed_receiver_emits_arguments() {
        let f = fixture("fwd_observed");
        let obj = f.rt.alloc(f.class);
        let (state, _) = f.states.get_or_create(obj, f.sel);
        let stream = state.subscribe();

        f.rt.send(obj, f.sel, &[Argument::I32(9)]).unwrap();
        let event = stream.try_recv().unwrap();
        assert_eq!(event.len(), 1);
        assert_eq!(event[0].as_i32(), Some(9));
    }

    #[test]
    fn test_missing_original_reports_unrecognized() {
        let rt = Runtime::new();
        let sel = Selector::intern("fwd_abstract");
        let class = {
            let mut classes = rt.classes().write();
            let class = classes.define("ForwardedAbstract", None);
            classes.declare(class, sel, Signature::method(TypeEncoding::Void, vec![]));
            class
        };
        let registry = Arc::new(InterceptionRegistry::new());
        let states = Arc::new(StateTable::new());
        let trampoline = make_trampoline(registry.clone(), states.clone());
        registry.ensure_installed(&rt, class, sel, &trampoline).unwrap();

        let obj = rt.alloc(class);
        let (state, _) = states.get_or_create(obj, sel);
        let stream = state.subscribe();
        let err = rt.send(obj, sel, &[]).unwrap_err();
        assert!(matches!(err, DispatchError::UnrecognizedSelector { .. }));
        // A call that never completed emits nothing.
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_original_releasing_its_argument_still_emits() {
        let rt = Runtime::new();
        let sel = Selector::intern("fwd_consume");
        let class = {
            let mut classes = rt.classes().write();
            let class = classes.define("ForwardedConsumer", None);
            classes.add_method(
                class,
                sel,
                Signature::method(TypeEncoding::Void, vec![TypeEncoding::Object]),
                Arc::new(|rt, frame| {
                    // The method owns the passed reference and drops it.
                    rt.objects().release(frame.arg_object(0)?);
                    frame.set_return(ReturnValue::Void)?;
                    Ok(())
                }),
            );
            class
        };
        let registry = Arc::new(InterceptionRegistry::new());
        let states = Arc::new(StateTable::new());
        let trampoline = make_trampoline(registry.clone(), states.clone());
        registry.ensure_installed(&rt, class, sel, &trampoline).unwrap();

        let obj = rt.alloc(class);
        let victim = rt.alloc(class);
        let (state, _) = states.get_or_create(obj, sel);
        let stream = state.subscribe();

        rt.send(obj, sel, &[Argument::Object(victim)]).unwrap();

        // Marshalling retained the argument on entry, so the emission holds
        // it alive past the original's release.
        let event = stream.try_recv().unwrap();
        assert_eq!(event[0].as_object(), Some(victim));
        assert!(rt.objects().is_live(victim));
        drop(event);
        assert!(!rt.objects().is_live(victim));
    }
}
