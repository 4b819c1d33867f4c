mod epoch;
mod externref;
mod func;
mod linker;
mod memory;
mod module_serialize;
mod store;
mod table;
mod traps;

/// A store over a default engine, with logging set up for the test.
pub(crate) fn new_store<T: 'static>(data: T) -> wasmbridge::Store<T> {
    let _ = env_logger::try_init();
    wasmbridge::Store::new(&wasmbridge::Engine::default(), data)
}
