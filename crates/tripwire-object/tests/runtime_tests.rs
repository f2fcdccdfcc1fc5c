//! End-to-end host-model tests: class hierarchies, dispatch, implementation
//! replacement, and object lifetime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tripwire_object::{
    Argument, ClassId, ReturnValue, Runtime, Selector, Signature, TypeEncoding,
};

fn define_greeter(rt: &Runtime) -> (ClassId, Selector) {
    let sel = Selector::intern("greeting_len");
    let mut classes = rt.classes().write();
    let class = classes.define("Greeter", None);
    classes.add_method(
        class,
        sel,
        Signature::method(TypeEncoding::Int64, vec![TypeEncoding::Int64]),
        Arc::new(|_, frame| {
            let n = frame.arg_i64(0)?;
            frame.set_return(ReturnValue::I64(n + 6))?;
            Ok(())
        }),
    );
    (class, sel)
}

#[test]
fn replacing_an_implementation_preserves_signature() {
    let rt = Runtime::new();
    let (class, sel) = define_greeter(&rt);
    let obj = rt.alloc(class);

    assert_eq!(
        rt.send(obj, sel, &[Argument::I64(1)]).unwrap(),
        ReturnValue::I64(7)
    );

    // Swap in a counting wrapper around a fixed result.
    let hits = Arc::new(AtomicUsize::new(0));
    let hits2 = hits.clone();
    rt.classes()
        .write()
        .install_implementation(
            class,
            sel,
            Arc::new(move |_, frame| {
                hits2.fetch_add(1, Ordering::SeqCst);
                frame.set_return(ReturnValue::I64(-1))?;
                Ok(())
            }),
        )
        .unwrap();

    assert_eq!(
        rt.send(obj, sel, &[Argument::I64(1)]).unwrap(),
        ReturnValue::I64(-1)
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn subclass_instances_use_replaced_parent_implementation() {
    let rt = Runtime::new();
    let (base, sel) = define_greeter(&rt);
    let sub = rt.classes().write().define("SubGreeter", Some(base));
    let obj = rt.alloc(sub);

    assert_eq!(
        rt.send(obj, sel, &[Argument::I64(10)]).unwrap(),
        ReturnValue::I64(16)
    );

    rt.classes()
        .write()
        .install_implementation(base, sel, Arc::new(|_, frame| {
            frame.set_return(ReturnValue::I64(0))?;
            Ok(())
        }))
        .unwrap();

    assert_eq!(
        rt.send(obj, sel, &[Argument::I64(10)]).unwrap(),
        ReturnValue::I64(0)
    );
}

#[test]
fn override_on_subclass_leaves_parent_untouched() {
    let rt = Runtime::new();
    let (base, sel) = define_greeter(&rt);
    let sub = rt.classes().write().define("SubGreeter", Some(base));

    rt.classes()
        .write()
        .install_implementation(sub, sel, Arc::new(|_, frame| {
            frame.set_return(ReturnValue::I64(99))?;
            Ok(())
        }))
        .unwrap();

    let base_obj = rt.alloc(base);
    let sub_obj = rt.alloc(sub);
    assert_eq!(
        rt.send(base_obj, sel, &[Argument::I64(0)]).unwrap(),
        ReturnValue::I64(6)
    );
    assert_eq!(
        rt.send(sub_obj, sel, &[Argument::I64(0)]).unwrap(),
        ReturnValue::I64(99)
    );
}

#[test]
fn finalizers_fire_when_the_last_reference_drops() {
    let rt = Runtime::new();
    let (class, _) = define_greeter(&rt);
    let obj = rt.alloc(class);

    let dropped = Arc::new(AtomicUsize::new(0));
    let dropped2 = dropped.clone();
    assert!(rt.objects().add_finalizer(
        obj,
        Box::new(move || {
            dropped2.fetch_add(1, Ordering::SeqCst);
        })
    ));

    let guard = rt.objects().retain_guard(obj).unwrap();
    rt.objects().release(obj);
    assert_eq!(dropped.load(Ordering::SeqCst), 0);
    drop(guard);
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
    assert!(!rt.objects().is_live(obj));
}
