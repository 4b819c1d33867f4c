use anyhow::Result;
use std::thread;
use std::time::Duration;
use wasmbridge::*;

const SPIN: &str = r#"
    (module
        (func (export "spin")
            (loop $l br $l)))
"#;

fn epoch_store() -> Result<Store<()>> {
    let _ = env_logger::try_init();
    let mut config = Config::new();
    config.epoch_interruption(true);
    let engine = Engine::new(&config)?;
    Ok(Store::new(&engine, ()))
}

#[test]
fn deadline_already_reached() -> Result<()> {
    let mut store = epoch_store()?;
    let module = Module::new(store.engine(), SPIN)?;
    let instance = Instance::new(&mut store, &module, &[])?;
    let spin = instance.get_func(&mut store, "spin").unwrap();

    store.set_epoch_deadline(1);
    store.engine().increment_epoch();
    let err = spin.call(&mut store, &[]).unwrap_err();
    assert_eq!(
        err.as_trap().and_then(|t| t.code()),
        Some(TrapCode::Interrupt)
    );
    Ok(())
}

#[test]
fn interrupted_from_another_thread() -> Result<()> {
    let mut store = epoch_store()?;
    let module = Module::new(store.engine(), SPIN)?;
    let instance = Instance::new(&mut store, &module, &[])?;
    let spin = instance.get_func(&mut store, "spin").unwrap();

    store.set_epoch_deadline(1);
    let engine = store.engine().clone();
    let ticker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        engine.increment_epoch();
    });
    let err = spin.call(&mut store, &[]).unwrap_err();
    ticker.join().unwrap();
    assert_eq!(err.as_trap().unwrap().code(), Some(TrapCode::Interrupt));
    Ok(())
}
