use anyhow::{Result, anyhow, bail};
use wasmbridge::*;

fn checked_double(store: &mut Store<()>) -> Func {
    let ty = FuncType::new([ValType::I32], [ValType::I32]);
    Func::new(store, ty, |_, args| {
        let x = args[0].unwrap_i32();
        if x < 0 {
            bail!("negative argument not allowed");
        }
        Ok(vec![Val::I32(x * 2)])
    })
}

#[test]
fn host_error_is_a_trap_with_its_message() -> Result<()> {
    let mut store = super::new_store(());
    let f = checked_double(&mut store);

    let err = f.call(&mut store, &[Val::I32(-1)]).unwrap_err();
    let trap = err.as_trap().expect("expected a trap");
    assert!(trap.message().contains("negative argument not allowed"));
    assert_eq!(trap.code(), None);

    let results = f.call(&mut store, &[Val::I32(1)])?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].unwrap_i32(), 2);
    Ok(())
}

#[test]
fn host_error_unwinds_through_guest() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module $m
                (import "" "checked" (func $checked (param i32) (result i32)))
                (func $run (export "run") (param i32) (result i32)
                    local.get 0
                    call $checked
                    i32.const 1
                    i32.add))
        "#,
    )?;
    let checked = checked_double(&mut store);
    let instance = Instance::new(&mut store, &module, &[checked.into()])?;
    let run = instance.get_func(&mut store, "run").unwrap();

    let err = run.call(&mut store, &[Val::I32(-5)]).unwrap_err();
    let trap = match err {
        Error::Trap(trap) => trap,
        other => panic!("expected a trap, got {other:?}"),
    };
    assert_eq!(trap.message(), "negative argument not allowed");
    assert!(!trap.trace().is_empty());
    assert_eq!(trap.trace()[0].module_name(), Some("m"));
    assert_eq!(trap.trace()[0].func_name(), Some("run"));

    assert_eq!(run.call(&mut store, &[Val::I32(5)])?[0].unwrap_i32(), 11);
    Ok(())
}

#[test]
fn anyhow_context_is_kept_in_message() -> Result<()> {
    let mut store = super::new_store(());
    let f = Func::new(&mut store, FuncType::new([], []), |_, _| {
        Err(anyhow!("inner").context("outer"))
    });
    let err = f.call(&mut store, &[]).unwrap_err();
    assert_eq!(err.as_trap().unwrap().message(), "outer");
    Ok(())
}

#[test]
fn instruction_trap_codes() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module $codes
                (memory 1)
                (func (export "unreachable") unreachable)
                (func (export "div") (param i32) (result i32)
                    i32.const 1
                    local.get 0
                    i32.div_u)
                (func (export "load") (result i32)
                    i32.const 0x20000
                    i32.load)
                (func $recurse (export "recurse") call $recurse))
        "#,
    )?;
    let instance = Instance::new(&mut store, &module, &[])?;

    let cases = [
        ("unreachable", vec![], TrapCode::UnreachableCodeReached),
        ("div", vec![Val::I32(0)], TrapCode::IntegerDivisionByZero),
        ("load", vec![], TrapCode::MemoryOutOfBounds),
        ("recurse", vec![], TrapCode::StackOverflow),
    ];
    for (name, args, code) in cases {
        let func = instance.get_func(&mut store, name).unwrap();
        let err = func.call(&mut store, &args).unwrap_err();
        let trap = err.as_trap().unwrap_or_else(|| panic!("{name}: {err:?}"));
        assert_eq!(trap.code(), Some(code), "{name}");
        assert_eq!(trap.message(), code.to_string(), "{name}");
    }
    Ok(())
}

#[test]
fn trap_display_includes_backtrace() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module $m
                (func $inner unreachable)
                (func $outer (export "outer") call $inner))
        "#,
    )?;
    let instance = Instance::new(&mut store, &module, &[])?;
    let outer = instance.get_func(&mut store, "outer").unwrap();
    let err = outer.call(&mut store, &[]).unwrap_err();
    let trap = err.as_trap().unwrap();

    let names = trap
        .trace()
        .iter()
        .map(|f| f.func_name())
        .collect::<Vec<_>>();
    assert_eq!(names, [Some("inner"), Some("outer")]);

    let display = trap.to_string();
    assert!(display.starts_with("wasm trap: wasm `unreachable` instruction executed"));
    assert!(display.contains("m!inner"), "{display}");
    Ok(())
}

#[test]
fn exit_request_carries_status() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (import "" "exit" (func $exit (param i32)))
                (func (export "run")
                    i32.const 42
                    call $exit
                    unreachable))
        "#,
    )?;
    let exit = Func::new(&mut store, FuncType::new([ValType::I32], []), |_, args| {
        Err(I32Exit(args[0].unwrap_i32()).into())
    });
    let instance = Instance::new(&mut store, &module, &[exit.into()])?;
    let run = instance.get_func(&mut store, "run").unwrap();

    let err = run.call(&mut store, &[]).unwrap_err();
    assert!(err.as_trap().is_none());
    assert_eq!(err.exit_status(), Some(42));
    Ok(())
}

#[test]
fn start_function_trap() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (func $start unreachable)
                (start $start))
        "#,
    )?;
    let err = Instance::new(&mut store, &module, &[]).unwrap_err();
    assert_eq!(
        err.as_trap().and_then(|t| t.code()),
        Some(TrapCode::UnreachableCodeReached)
    );
    Ok(())
}
