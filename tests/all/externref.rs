use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use wasmbridge::*;

struct SetFlagOnDrop(Arc<AtomicUsize>);

impl Drop for SetFlagOnDrop {
    fn drop(&mut self) {
        self.0.fetch_add(1, SeqCst);
    }
}

#[test]
fn data_round_trips() -> Result<()> {
    let mut store = super::new_store(());
    let r = ExternRef::new(&mut store, "hello".to_string())?;
    assert_eq!(
        r.data::<String, _>(&store)?.map(|s| s.as_str()),
        Some("hello")
    );

    let clone = r.clone();
    drop(r);
    assert_eq!(
        clone.data::<String, _>(&store)?.map(|s| s.as_str()),
        Some("hello")
    );

    // The wrong type is not an error, just absent.
    assert!(clone.data::<u32, _>(&store)?.is_none());
    Ok(())
}

#[test]
fn passes_through_guest() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (func (export "id") (param externref) (result externref)
                    local.get 0)
                (func (export "is_null") (param externref) (result i32)
                    local.get 0
                    ref.is_null))
        "#,
    )?;
    let instance = Instance::new(&mut store, &module, &[])?;
    let id = instance.get_func(&mut store, "id").unwrap();
    let is_null = instance.get_func(&mut store, "is_null").unwrap();

    let r = ExternRef::new(&mut store, 42u64)?;
    let results = id.call(&mut store, &[r.into()])?;
    let back = results[0].extern_ref().flatten().expect("non-null externref");
    assert_eq!(back.data::<u64, _>(&store)?, Some(&42));

    let results = is_null.call(&mut store, &[Val::null_extern_ref()])?;
    assert_eq!(results[0].unwrap_i32(), 1);
    Ok(())
}

#[test]
fn host_function_receives_externref() -> Result<()> {
    let mut store = super::new_store(());
    let ty = FuncType::new([ValType::ExternRef], [ValType::I32]);
    let len = Func::new(&mut store, ty, |caller, args| {
        let r = args[0].extern_ref().flatten().expect("non-null externref");
        let s = r.data::<String, _>(&caller)?.expect("string data");
        Ok(vec![Val::I32(s.len() as i32)])
    });
    let r = ExternRef::new(&mut store, "four".to_string())?;
    assert_eq!(len.call(&mut store, &[r.into()])?[0].unwrap_i32(), 4);
    Ok(())
}

#[test]
fn host_data_dropped_once() -> Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut store = super::new_store(());
    let r = ExternRef::new(&mut store, SetFlagOnDrop(drops.clone()))?;
    let clone = r.clone();
    drop(r);
    store.gc();
    assert_eq!(drops.load(SeqCst), 0, "a clone is still alive");

    drop(clone);
    store.gc();
    assert_eq!(drops.load(SeqCst), 1);

    store.close();
    assert_eq!(drops.load(SeqCst), 1);
    Ok(())
}

#[test]
fn results_are_collected_after_drop() -> Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (func (export "id") (param externref) (result externref)
                    local.get 0))
        "#,
    )?;
    let instance = Instance::new(&mut store, &module, &[])?;
    let id = instance.get_func(&mut store, "id").unwrap();

    for _ in 0..3 {
        let r = ExternRef::new(&mut store, SetFlagOnDrop(drops.clone()))?;
        let results = id.call(&mut store, &[r.into()])?;
        assert!(results[0].extern_ref().flatten().is_some());
    }
    store.gc();
    assert_eq!(drops.load(SeqCst), 3);
    Ok(())
}

#[test]
fn host_function_arguments_are_collected() -> Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut store = super::new_store(());
    let ty = FuncType::new([ValType::ExternRef], []);
    let sink = Func::new(&mut store, ty, |caller, args| {
        let r = args[0].extern_ref().flatten().expect("non-null externref");
        assert!(r.data::<SetFlagOnDrop, _>(&caller)?.is_some());
        Ok(vec![])
    });
    let r = ExternRef::new(&mut store, SetFlagOnDrop(drops.clone()))?;
    sink.call(&mut store, &[r.into()])?;
    store.gc();
    assert_eq!(drops.load(SeqCst), 1);
    Ok(())
}

#[test]
fn referenced_from_a_global_survives_gc() -> Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut store = super::new_store(());
    let ty = GlobalType::new(ValType::ExternRef, Mutability::Var);
    let r = ExternRef::new(&mut store, SetFlagOnDrop(drops.clone()))?;
    let global = Global::new(&mut store, ty, r.into())?;
    store.gc();
    assert_eq!(drops.load(SeqCst), 0);

    let held = global.get(&mut store)?;
    assert!(held.extern_ref().flatten().is_some());
    drop(held);

    global.set(&mut store, Val::null_extern_ref())?;
    store.gc();
    assert_eq!(drops.load(SeqCst), 1);
    Ok(())
}

#[test]
fn wrong_store_is_rejected() -> Result<()> {
    let mut a = super::new_store(());
    let b = super::new_store(());
    let r = ExternRef::new(&mut a, 1u8)?;
    let err = r.data::<u8, _>(&b).unwrap_err();
    assert_eq!(err.as_usage(), Some(&UsageError::CrossStore));
    Ok(())
}
