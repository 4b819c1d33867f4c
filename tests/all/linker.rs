use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use wasmbridge::*;

const IMPORTS_ADD: &str = r#"
    (module
        (import "host" "add" (func $add (param i32 i32) (result i32)))
        (func (export "run") (result i32)
            (call $add (i32.const 20) (i32.const 22))))
"#;

fn add_type() -> FuncType {
    FuncType::new([ValType::I32, ValType::I32], [ValType::I32])
}

#[test]
fn func_new_and_instantiate() -> Result<()> {
    let mut store = super::new_store(0u32);
    let mut linker = Linker::new(store.engine());
    linker.func_new("host", "add", add_type(), |mut caller, args| {
        *caller.data_mut() += 1;
        Ok(vec![Val::I32(args[0].unwrap_i32() + args[1].unwrap_i32())])
    })?;

    let module = Module::new(store.engine(), IMPORTS_ADD)?;
    let instance = linker.instantiate(&mut store, &module)?;
    let run = instance.get_func(&mut store, "run").unwrap();
    assert_eq!(run.call(&mut store, &[])?[0].unwrap_i32(), 42);
    assert_eq!(*store.data(), 1);

    // The same linker serves other stores too.
    let mut other = Store::new(store.engine(), 10u32);
    let instance = linker.instantiate(&mut other, &module)?;
    let run = instance.get_func(&mut other, "run").unwrap();
    run.call(&mut other, &[])?;
    assert_eq!(*other.data(), 11);
    Ok(())
}

#[test]
fn missing_import_is_a_native_error() -> Result<()> {
    let mut store = super::new_store(());
    let linker = Linker::new(store.engine());
    let module = Module::new(store.engine(), IMPORTS_ADD)?;
    let err = linker.instantiate(&mut store, &module).unwrap_err();
    match &err {
        Error::Native { message, .. } => assert!(message.contains("host"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn shadowing() -> Result<()> {
    let mut store = super::new_store(());
    let mut linker = Linker::new(store.engine());
    linker.func_new("host", "add", add_type(), |_, _| Ok(vec![Val::I32(1)]))?;
    assert!(
        linker
            .func_new("host", "add", add_type(), |_, _| Ok(vec![Val::I32(2)]))
            .is_err()
    );

    linker.allow_shadowing(true);
    linker.func_new("host", "add", add_type(), |_, _| Ok(vec![Val::I32(3)]))?;

    let module = Module::new(store.engine(), IMPORTS_ADD)?;
    let instance = linker.instantiate(&mut store, &module)?;
    let run = instance.get_func(&mut store, "run").unwrap();
    assert_eq!(run.call(&mut store, &[])?[0].unwrap_i32(), 3);
    Ok(())
}

#[test]
fn define_store_items() -> Result<()> {
    let mut store = super::new_store(());
    let mut linker = Linker::new(store.engine());
    let memory = Memory::new(&mut store, MemoryType::new(1, None))?;
    let global = Global::new(
        &mut store,
        GlobalType::new(ValType::I32, Mutability::Const),
        Val::I32(7),
    )?;
    linker
        .define(&store, "env", "memory", memory)?
        .define(&store, "env", "seven", global)?;

    let module = Module::new(
        store.engine(),
        r#"
            (module
                (import "env" "memory" (memory 1))
                (import "env" "seven" (global $seven i32))
                (func (export "run")
                    (i32.store (i32.const 0) (global.get $seven))))
        "#,
    )?;
    let instance = linker.instantiate(&mut store, &module)?;
    instance.get_func(&mut store, "run").unwrap().call(&mut store, &[])?;
    assert_eq!(memory.data(&store)?[0], 7);

    assert!(matches!(
        linker.get(&mut store, "env", "memory"),
        Some(Extern::Memory(_))
    ));
    assert!(linker.get(&mut store, "env", "missing").is_none());
    Ok(())
}

#[test]
fn define_rejects_other_stores_items() -> Result<()> {
    let store = super::new_store(());
    let mut other = Store::new(store.engine(), ());
    let mut linker = Linker::new(store.engine());
    let memory = Memory::new(&mut other, MemoryType::new(1, None))?;
    let err = linker.define(&store, "env", "memory", memory).unwrap_err();
    assert_eq!(err.as_usage(), Some(&UsageError::CrossStore));
    Ok(())
}

#[test]
fn linker_and_store_engines_must_match() -> Result<()> {
    let mut store = super::new_store(());
    let linker = Linker::<()>::new(&Engine::default());
    let module = Module::new(store.engine(), "(module)")?;
    let err = linker.instantiate(&mut store, &module).unwrap_err();
    assert_eq!(err.as_usage(), Some(&UsageError::CrossEngine));
    Ok(())
}

#[test]
fn instances_and_modules_by_name() -> Result<()> {
    let mut store = super::new_store(());
    let mut linker = Linker::new(store.engine());

    let provider = Module::new(
        store.engine(),
        r#"
            (module
                (func (export "add") (param i32 i32) (result i32)
                    (i32.add (local.get 0) (local.get 1))))
        "#,
    )?;
    let instance = Instance::new(&mut store, &provider, &[])?;
    linker.instance(&mut store, "host", instance)?;

    let consumer = Module::new(store.engine(), IMPORTS_ADD)?;
    let run = linker
        .instantiate(&mut store, &consumer)?
        .get_func(&mut store, "run")
        .unwrap();
    assert_eq!(run.call(&mut store, &[])?[0].unwrap_i32(), 42);

    linker.module(&mut store, "consumer", &consumer)?;
    let run = linker.get(&mut store, "consumer", "run").unwrap();
    let run = run.as_func()?;
    assert_eq!(run.call(&mut store, &[])?[0].unwrap_i32(), 42);
    Ok(())
}

#[test]
fn closure_released_with_linker_and_stores() -> Result<()> {
    struct Guard(Arc<AtomicUsize>);
    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.fetch_add(1, SeqCst);
        }
    }

    let drops = Arc::new(AtomicUsize::new(0));
    let mut store = super::new_store(());
    let mut linker = Linker::new(store.engine());
    let guard = Guard(drops.clone());
    linker.func_new("host", "add", add_type(), move |_, _| {
        let _ = &guard;
        Ok(vec![Val::I32(0)])
    })?;
    let module = Module::new(store.engine(), IMPORTS_ADD)?;
    linker.instantiate(&mut store, &module)?;

    linker.close();
    assert_eq!(drops.load(SeqCst), 0);
    store.close();
    assert_eq!(drops.load(SeqCst), 1);
    Ok(())
}
