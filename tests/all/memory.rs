use anyhow::Result;
use wasmbridge::*;

#[test]
fn grow_respects_maximum() -> Result<()> {
    let mut store = super::new_store(());
    let memory = Memory::new(&mut store, MemoryType::new(1, Some(2)))?;
    assert_eq!(memory.size(&store)?, 1);

    let err = memory.grow(&mut store, 2).unwrap_err();
    assert!(matches!(err, Error::Native { .. }), "{err:?}");
    assert_eq!(memory.size(&store)?, 1);

    assert_eq!(memory.grow(&mut store, 1)?, 1);
    assert_eq!(memory.size(&store)?, 2);
    assert_eq!(memory.data_size(&store)?, 2 * WASM_PAGE_SIZE);

    assert!(memory.grow(&mut store, 1).is_err());
    assert_eq!(memory.size(&store)?, 2);
    Ok(())
}

#[test]
fn memory_type() -> Result<()> {
    let mut store = super::new_store(());
    let memory = Memory::new(&mut store, MemoryType::new(3, None))?;
    let ty = memory.ty(&store)?;
    assert_eq!(ty.minimum(), 3);
    assert_eq!(ty.maximum(), None);
    Ok(())
}

#[test]
fn read_and_write() -> Result<()> {
    let mut store = super::new_store(());
    let memory = Memory::new(&mut store, MemoryType::new(1, None))?;

    memory.write(&mut store, 100, b"hello")?;
    let mut buf = [0; 5];
    memory.read(&store, 100, &mut buf)?;
    assert_eq!(&buf, b"hello");
    assert_eq!(&memory.data(&store)?[100..105], b"hello");

    memory.data_mut(&mut store)?[0] = 7;
    assert_eq!(memory.data(&store)?[0], 7);

    let err = memory
        .write(&mut store, WASM_PAGE_SIZE - 2, b"abc")
        .unwrap_err();
    assert_eq!(
        err.as_usage(),
        Some(&UsageError::OutOfBounds {
            offset: WASM_PAGE_SIZE - 2,
            len: 3,
            size: WASM_PAGE_SIZE,
        })
    );
    let err = memory.read(&store, usize::MAX, &mut buf).unwrap_err();
    assert!(matches!(
        err.as_usage(),
        Some(UsageError::OutOfBounds { .. })
    ));
    Ok(())
}

#[test]
fn guest_sees_host_writes() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (memory (export "memory") 1 2)
                (func (export "load") (param i32) (result i32)
                    local.get 0
                    i32.load8_u)
                (func (export "store") (param i32 i32)
                    local.get 0
                    local.get 1
                    i32.store8)
                (func (export "grow") (param i32) (result i32)
                    local.get 0
                    memory.grow))
        "#,
    )?;
    let instance = Instance::new(&mut store, &module, &[])?;
    let memory = instance.get_memory(&mut store, "memory").unwrap();
    let load = instance.get_func(&mut store, "load").unwrap();
    let store_fn = instance.get_func(&mut store, "store").unwrap();
    let grow = instance.get_func(&mut store, "grow").unwrap();

    memory.write(&mut store, 10, &[42])?;
    assert_eq!(load.call(&mut store, &[Val::I32(10)])?[0].unwrap_i32(), 42);

    store_fn.call(&mut store, &[Val::I32(11), Val::I32(9)])?;
    assert_eq!(memory.data(&store)?[11], 9);

    // The guest's `memory.grow` reports failure in-band.
    assert_eq!(grow.call(&mut store, &[Val::I32(5)])?[0].unwrap_i32(), -1);
    assert_eq!(grow.call(&mut store, &[Val::I32(1)])?[0].unwrap_i32(), 1);
    assert_eq!(memory.size(&store)?, 2);
    Ok(())
}

#[test]
fn memory_import() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (import "" "mem" (memory 1))
                (func (export "size") (result i32) memory.size))
        "#,
    )?;
    let memory = Memory::new(&mut store, MemoryType::new(3, None))?;
    let instance = Instance::new(&mut store, &module, &[memory.into()])?;
    let size = instance.get_func(&mut store, "size").unwrap();
    assert_eq!(size.call(&mut store, &[])?[0].unwrap_i32(), 3);
    Ok(())
}
