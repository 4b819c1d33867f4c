use anyhow::{Result, bail};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use wasmbridge::*;

#[test]
fn host_add() -> Result<()> {
    let mut store = super::new_store(());
    let ty = FuncType::new([ValType::I32, ValType::I64], [ValType::I32]);
    let add = Func::new(&mut store, ty, |_, args| {
        let x = args[0].unwrap_i32();
        let y = args[1].unwrap_i64();
        Ok(vec![Val::I32(x + y as i32)])
    });

    let results = add.call(&mut store, &[Val::I32(1), Val::I64(2)])?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].i32(), Some(3));
    Ok(())
}

#[test]
fn host_add_through_guest() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (import "" "add" (func $add (param i32 i64) (result i32)))
                (func (export "run") (param i32 i64) (result i32)
                    local.get 0
                    local.get 1
                    call $add))
        "#,
    )?;
    let ty = FuncType::new([ValType::I32, ValType::I64], [ValType::I32]);
    let add = Func::new(&mut store, ty, |_, args| {
        Ok(vec![Val::I32(args[0].unwrap_i32() + args[1].unwrap_i64() as i32)])
    });
    let instance = Instance::new(&mut store, &module, &[add.into()])?;
    let run = instance.get_func(&mut store, "run").unwrap();
    let results = run.call(&mut store, &[Val::I32(40), Val::I64(2)])?;
    assert_eq!(results[0].unwrap_i32(), 42);
    Ok(())
}

#[test]
fn wrong_argument_count_for_every_arity() -> Result<()> {
    let mut store = super::new_store(());
    for arity in 0..=6 {
        let ty = FuncType::new(vec![ValType::I32; arity], []);
        let f = Func::new(&mut store, ty, |_, _| Ok(vec![]));

        let exact = vec![Val::I32(0); arity];
        assert!(f.call(&mut store, &exact)?.is_empty());

        let too_many = vec![Val::I32(0); arity + 1];
        let err = f.call(&mut store, &too_many).unwrap_err();
        assert_eq!(
            err.as_usage(),
            Some(&UsageError::ArityMismatch {
                expected: arity,
                actual: arity + 1,
            })
        );

        if arity > 0 {
            let too_few = vec![Val::I32(0); arity - 1];
            let err = f.call(&mut store, &too_few).unwrap_err();
            assert!(matches!(
                err.as_usage(),
                Some(UsageError::ArityMismatch { .. })
            ));
        }
    }
    Ok(())
}

#[test]
fn wrong_argument_type() -> Result<()> {
    let mut store = super::new_store(());
    let ty = FuncType::new([ValType::I32], []);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let f = Func::new(&mut store, ty, move |_, _| {
        seen.fetch_add(1, SeqCst);
        Ok(vec![])
    });
    let err = f.call(&mut store, &[Val::I64(1)]).unwrap_err();
    assert_eq!(
        err.as_usage(),
        Some(&UsageError::TypeMismatch {
            expected: ValType::I32,
            actual: ValType::I64,
        })
    );
    assert_eq!(calls.load(SeqCst), 0);
    Ok(())
}

#[test]
fn results_keep_order_and_kind() -> Result<()> {
    let mut store = super::new_store(());
    let ty = FuncType::new(
        [],
        [ValType::I32, ValType::I64, ValType::F32, ValType::F64, ValType::V128],
    );
    let f = Func::new(&mut store, ty, |_, _| {
        Ok(vec![
            Val::I32(1),
            Val::I64(-2),
            3.5f32.into(),
            (-4.25f64).into(),
            Val::V128(0x0102_0304_0506_0708_090a_0b0c_0d0e_0f10),
        ])
    });
    let results = f.call(&mut store, &[])?;
    assert_eq!(results.len(), 5);
    assert_eq!(results[0].unwrap_i32(), 1);
    assert_eq!(results[1].unwrap_i64(), -2);
    assert_eq!(results[2].unwrap_f32(), 3.5);
    assert_eq!(results[3].unwrap_f64(), -4.25);
    assert_eq!(
        results[4].unwrap_v128(),
        0x0102_0304_0506_0708_090a_0b0c_0d0e_0f10
    );
    Ok(())
}

#[test]
fn multi_value_through_guest() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (import "" "pair" (func $pair (result i32 i64)))
                (func (export "swap") (result i64 i32)
                    (local i32)
                    call $pair
                    ;; stack: i32 i64
                    (local.set 0 (i32.wrap_i64))
                    i64.extend_i32_s
                    local.get 0))
        "#,
    )?;
    let pair = Func::new(
        &mut store,
        FuncType::new([], [ValType::I32, ValType::I64]),
        |_, _| Ok(vec![Val::I32(7), Val::I64(9)]),
    );
    let instance = Instance::new(&mut store, &module, &[pair.into()])?;
    let swap = instance.get_func(&mut store, "swap").unwrap();
    let results = swap.call(&mut store, &[])?;
    assert_eq!(results[0].unwrap_i64(), 7);
    assert_eq!(results[1].unwrap_i32(), 9);
    Ok(())
}

#[test]
fn wrong_result_count_traps() -> Result<()> {
    let mut store = super::new_store(());
    let ty = FuncType::new([], [ValType::I32]);
    let f = Func::new(&mut store, ty, |_, _| Ok(vec![Val::I32(1), Val::I32(2)]));
    let err = f.call(&mut store, &[]).unwrap_err();
    let trap = err.as_trap().expect("expected a trap");
    assert_eq!(trap.message(), "host function returned 2 results, expected 1");
    assert_eq!(trap.code(), None);
    Ok(())
}

#[test]
fn wrong_result_type_traps() -> Result<()> {
    let mut store = super::new_store(());
    let ty = FuncType::new([], [ValType::F64]);
    let f = Func::new(&mut store, ty, |_, _| Ok(vec![Val::I32(1)]));
    let err = f.call(&mut store, &[]).unwrap_err();
    let trap = err.as_trap().expect("expected a trap");
    assert!(trap.message().contains("type mismatch"), "{}", trap.message());
    Ok(())
}

#[test]
fn panics_become_traps() -> Result<()> {
    let mut store = super::new_store(());
    let f = Func::new(&mut store, FuncType::new([], []), |_, _| {
        panic!("this is a panic");
    });
    let err = f.call(&mut store, &[]).unwrap_err();
    assert_eq!(err.as_trap().unwrap().message(), "this is a panic");

    // The store is still usable afterwards.
    let g = Func::new(&mut store, FuncType::new([], [ValType::I32]), |_, _| {
        Ok(vec![Val::I32(5)])
    });
    assert_eq!(g.call(&mut store, &[])?[0].unwrap_i32(), 5);
    Ok(())
}

#[test]
fn func_type_round_trips() -> Result<()> {
    let mut store = super::new_store(());
    let ty = FuncType::new(
        [ValType::I32, ValType::F64, ValType::ExternRef],
        [ValType::FuncRef],
    );
    let f = Func::new(&mut store, ty.clone(), |_, _| Ok(vec![Val::null_func_ref()]));
    assert_eq!(f.ty(&store)?, ty);
    assert_eq!(f.param_arity(&store)?, 3);
    assert_eq!(f.result_arity(&store)?, 1);
    assert_eq!(
        ty.to_string(),
        "(func (param i32 f64 externref) (result funcref))"
    );
    Ok(())
}

#[test]
fn caller_reaches_store_data() -> Result<()> {
    let mut store = super::new_store(0u32);
    let bump = Func::new(&mut store, FuncType::new([], [ValType::I32]), |mut caller, _| {
        *caller.data_mut() += 1;
        Ok(vec![Val::I32(*caller.data() as i32)])
    });
    assert_eq!(bump.call(&mut store, &[])?[0].unwrap_i32(), 1);
    assert_eq!(bump.call(&mut store, &[])?[0].unwrap_i32(), 2);
    assert_eq!(*store.data(), 2);
    Ok(())
}

#[test]
fn reentrant_call_through_caller() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (import "" "host" (func $host (param i32) (result i32)))
                (func (export "double") (param i32) (result i32)
                    local.get 0
                    local.get 0
                    i32.add)
                (func (export "run") (param i32) (result i32)
                    local.get 0
                    call $host))
        "#,
    )?;
    let host = Func::new(
        &mut store,
        FuncType::new([ValType::I32], [ValType::I32]),
        |mut caller, args| {
            let double = match caller.get_export("double") {
                Some(Extern::Func(f)) => f,
                _ => bail!("missing `double` export"),
            };
            let doubled = double.call(&mut caller, &[args[0].clone()])?;
            Ok(vec![Val::I32(doubled[0].unwrap_i32() + 1)])
        },
    );
    let instance = Instance::new(&mut store, &module, &[host.into()])?;
    let run = instance.get_func(&mut store, "run").unwrap();
    assert_eq!(run.call(&mut store, &[Val::I32(10)])?[0].unwrap_i32(), 21);
    Ok(())
}

#[test]
fn caller_without_instance_has_no_exports() -> Result<()> {
    let mut store = super::new_store(());
    let f = Func::new(&mut store, FuncType::new([], [ValType::I32]), |mut caller, _| {
        Ok(vec![Val::I32(caller.get_export("anything").is_some() as i32)])
    });
    assert_eq!(f.call(&mut store, &[])?[0].unwrap_i32(), 0);
    Ok(())
}

#[test]
fn closure_dropped_with_store() -> Result<()> {
    struct Guard(Arc<AtomicUsize>);
    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.fetch_add(1, SeqCst);
        }
    }

    let drops = Arc::new(AtomicUsize::new(0));
    let mut store = super::new_store(());
    let guard = Guard(drops.clone());
    let f = Func::new(&mut store, FuncType::new([], []), move |_, _| {
        let _ = &guard;
        Ok(vec![])
    });
    f.call(&mut store, &[])?;
    assert_eq!(drops.load(SeqCst), 0);
    store.close();
    assert_eq!(drops.load(SeqCst), 1);
    Ok(())
}

#[test]
fn funcref_arguments() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (type $t (func (result i32)))
                (table 1 funcref)
                (func (export "call") (param funcref) (result i32)
                    (table.set (i32.const 0) (local.get 0))
                    (call_indirect (type $t) (i32.const 0))))
        "#,
    )?;
    let instance = Instance::new(&mut store, &module, &[])?;
    let call = instance.get_func(&mut store, "call").unwrap();
    let seven = Func::new(&mut store, FuncType::new([], [ValType::I32]), |_, _| {
        Ok(vec![Val::I32(7)])
    });
    let results = call.call(&mut store, &[seven.into()])?;
    assert_eq!(results[0].unwrap_i32(), 7);

    let err = call.call(&mut store, &[Val::null_func_ref()]).unwrap_err();
    assert_eq!(
        err.as_trap().and_then(|t| t.code()),
        Some(TrapCode::IndirectCallToNull)
    );
    Ok(())
}
