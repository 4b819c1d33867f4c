use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use wasmbridge::*;

struct Counted(Arc<AtomicUsize>, u32);

impl Drop for Counted {
    fn drop(&mut self) {
        self.0.fetch_add(1, SeqCst);
    }
}

#[test]
fn set_data_releases_previous_value_once() -> Result<()> {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut store = super::new_store(Counted(drops.clone(), 1));
    assert_eq!(store.data().1, 1);

    store.set_data(Counted(drops.clone(), 2));
    assert_eq!(drops.load(SeqCst), 1);
    assert_eq!(store.data().1, 2);

    store.data_mut().1 = 3;
    assert_eq!(store.data().1, 3);

    store.close();
    assert_eq!(drops.load(SeqCst), 2);
    Ok(())
}

#[test]
fn set_data_from_host_function() -> Result<()> {
    let mut store = super::new_store(String::from("before"));
    let f = Func::new(&mut store, FuncType::new([], []), |mut caller, _| {
        caller.as_context_mut().set_data("after".to_string());
        Ok(vec![])
    });
    f.call(&mut store, &[])?;
    assert_eq!(store.data(), "after");
    Ok(())
}

#[test]
fn handles_from_closed_store_are_rejected() -> Result<()> {
    let engine = Engine::default();
    let mut first = Store::new(&engine, ());
    let f = Func::new(&mut first, FuncType::new([], []), |_, _| Ok(vec![]));
    let memory = Memory::new(&mut first, MemoryType::new(1, None))?;
    first.close();

    let mut second = Store::new(&engine, ());
    let err = f.call(&mut second, &[]).unwrap_err();
    assert_eq!(err.as_usage(), Some(&UsageError::CrossStore));
    let err = memory.size(&second).unwrap_err();
    assert_eq!(err.as_usage(), Some(&UsageError::CrossStore));
    Ok(())
}

#[test]
fn cross_store_arguments_are_rejected() -> Result<()> {
    let mut a = super::new_store(());
    let mut b = super::new_store(());
    let ty = FuncType::new([ValType::FuncRef], []);
    let takes_func = Func::new(&mut a, ty, |_, _| Ok(vec![]));
    let foreign = Func::new(&mut b, FuncType::new([], []), |_, _| Ok(vec![]));
    let err = takes_func.call(&mut a, &[foreign.into()]).unwrap_err();
    assert_eq!(err.as_usage(), Some(&UsageError::CrossStore));
    Ok(())
}

#[test]
fn engine_outlives_its_handles() -> Result<()> {
    let mut store = {
        let engine = Engine::default();
        Store::new(&engine, 5)
    };
    let module = Module::new(store.engine(), "(module)")?;
    Instance::new(&mut store, &module, &[])?;
    assert_eq!(*store.data(), 5);
    assert!(Engine::same(store.engine(), module.engine()));
    Ok(())
}

#[test]
fn store_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Store<u32>>();
    assert_send::<Engine>();
    assert_send::<Module>();
}
