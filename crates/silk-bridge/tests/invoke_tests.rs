//! The invocation protocol: calling script functions from host code, error
//! absorption, stack balance, and the host-function delegation path.

use silk_bridge::{FunctionDesc, PropertyDesc, PropertyKind, Variant};
use silk_engine::{Engine, ScriptError};

fn function_variant(
    e: &mut Engine,
    f: impl Fn(&mut Engine, usize) -> Result<usize, ScriptError> + 'static,
) -> Variant {
    e.push_function(f);
    let v = Variant::from_stack(e, -1);
    e.pop(1);
    v
}

#[test]
fn invoke_returns_result_count_above_call_base() {
    let mut e = Engine::new();
    let add = function_variant(&mut e, |eng, _| {
        let a = eng.int_at(-2);
        let b = eng.int_at(-1);
        eng.push_int(a + b);
        Ok(1)
    });

    e.push_int(30);
    e.push_int(12);
    let n = add.invoke(&mut e, 2);
    assert_eq!(n, 1);
    assert_eq!(e.int_at(-1), 42);
    e.pop(1);
    assert_eq!(e.top(), 0);
}

#[test]
fn invoke_captures_multiple_results_as_tuple() {
    let mut e = Engine::new();
    let spread = function_variant(&mut e, |eng, _| {
        eng.push_int(1);
        eng.push_int(2);
        eng.push_int(3);
        Ok(3)
    });

    let base = e.top() + 1;
    let n = spread.invoke(&mut e, 0);
    assert_eq!(n, 3);
    let results = Variant::from_stack_tuple(&mut e, base);
    e.pop(n);

    assert_eq!(results.len(&mut e), 3);
    assert_eq!(results.get_at(&mut e, 2).as_int(), 2);
}

#[test]
fn invoke_absorbs_script_errors_and_balances_the_stack() {
    let mut e = Engine::new();
    let failing = function_variant(&mut e, |_, _| {
        Err(ScriptError::Runtime("script exploded".into()))
    });

    e.push_str("sentinel below the call");
    let depth_before = e.top();

    e.push_int(1);
    e.push_int(2);
    let n = failing.invoke(&mut e, 2);

    // The failure is swallowed: zero results, no error value, and the
    // stack is exactly as deep as before the arguments were pushed.
    assert_eq!(n, 0);
    assert_eq!(e.top(), depth_before);
    assert_eq!(&*e.str_at(-1), "sentinel below the call");
    e.pop(1);
}

#[test]
fn invoke_with_no_arguments() {
    let mut e = Engine::new();
    let f = function_variant(&mut e, |eng, nargs| {
        assert_eq!(nargs, 0);
        eng.push_bool(true);
        Ok(1)
    });
    let n = f.invoke(&mut e, 0);
    assert_eq!(n, 1);
    assert!(e.bool_at(-1));
    e.pop(1);
}

#[test]
#[should_panic(expected = "invoke requires a function variant")]
fn invoke_on_non_function_panics() {
    let mut e = Engine::new();
    Variant::from_int(3).invoke(&mut e, 0);
}

#[test]
fn host_function_call_pushes_inputs_in_declaration_order() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut e = Engine::new();
    let seen: Rc<RefCell<Vec<(i64, bool, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let callee = function_variant(&mut e, move |eng, nargs| {
        assert_eq!(nargs, 3);
        sink.borrow_mut().push((
            eng.int_at(-3),
            eng.bool_at(-2),
            eng.str_at(-1).to_string(),
        ));
        Ok(0)
    });

    let func = FunctionDesc::new("on_hit")
        .param(PropertyDesc::scalar("amount", PropertyKind::Int32, 0))
        .param(PropertyDesc::scalar("crit", PropertyKind::Bool, 4))
        .param(PropertyDesc::new("source", PropertyKind::Str, 5, 16))
        .return_param(PropertyDesc::scalar("handled", PropertyKind::Bool, 21));

    let mut block = vec![0u8; func.block_size()];
    silk_bridge::reflect::raw::write_i32(&mut block, 0, 250);
    silk_bridge::reflect::raw::write_bool(&mut block, 4, true);
    silk_bridge::reflect::raw::write_str(&mut block, 5, 16, "arrow").unwrap();

    callee.call_through_host_function(&mut e, &func, &block).unwrap();
    assert_eq!(e.top(), 0);

    let calls = seen.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (250, true, "arrow".to_string()));
}

#[test]
fn host_function_call_skips_return_parameters() {
    let mut e = Engine::new();
    let callee = function_variant(&mut e, |_, nargs| {
        assert_eq!(nargs, 1);
        Ok(0)
    });

    let func = FunctionDesc::new("probe")
        .param(PropertyDesc::scalar("input", PropertyKind::Int64, 0))
        .return_param(PropertyDesc::scalar("output", PropertyKind::Int64, 8))
        .return_param(PropertyDesc::scalar("status", PropertyKind::Bool, 16));

    let block = vec![0u8; func.block_size()];
    callee.call_through_host_function(&mut e, &func, &block).unwrap();
    assert_eq!(e.top(), 0);
}

#[test]
fn host_function_call_discards_script_results() {
    let mut e = Engine::new();
    let callee = function_variant(&mut e, |eng, _| {
        eng.push_int(1);
        eng.push_int(2);
        Ok(2)
    });

    let func = FunctionDesc::new("noisy");
    let discarded = callee
        .call_through_host_function(&mut e, &func, &[])
        .unwrap();
    assert_eq!(discarded, 2);
    assert_eq!(e.top(), 0);
}

#[test]
fn host_function_call_survives_script_error() {
    let mut e = Engine::new();
    let callee = function_variant(&mut e, |_, _| {
        Err(ScriptError::Runtime("override failed".into()))
    });

    let func =
        FunctionDesc::new("on_tick").param(PropertyDesc::scalar("dt", PropertyKind::Double, 0));
    let mut block = vec![0u8; 8];
    silk_bridge::reflect::raw::write_f64(&mut block, 0, 0.016);

    let discarded = callee
        .call_through_host_function(&mut e, &func, &block)
        .unwrap();
    assert_eq!(discarded, 0);
    assert_eq!(e.top(), 0);
}
