use anyhow::Result;
use wasmbridge::*;

#[test]
fn grow_respects_maximum() -> Result<()> {
    let mut store = super::new_store(());
    let ty = TableType::new(ValType::FuncRef, 1, Some(2));
    let table = Table::new(&mut store, ty, Val::null_func_ref())?;
    assert_eq!(table.size(&store)?, 1);

    assert!(matches!(
        table.grow(&mut store, 2, Val::null_func_ref()),
        Err(Error::Native { .. })
    ));
    assert_eq!(table.size(&store)?, 1);

    assert_eq!(table.grow(&mut store, 1, Val::null_func_ref())?, 1);
    assert_eq!(table.size(&store)?, 2);
    Ok(())
}

#[test]
fn get_and_set() -> Result<()> {
    let mut store = super::new_store(());
    let ty = TableType::new(ValType::FuncRef, 2, None);
    let table = Table::new(&mut store, ty, Val::null_func_ref())?;

    let f = Func::new(&mut store, FuncType::new([], [ValType::I32]), |_, _| {
        Ok(vec![Val::I32(3)])
    });
    table.set(&mut store, 1, f.into())?;

    match table.get(&mut store, 0)? {
        Some(Val::FuncRef(None)) => {}
        other => panic!("unexpected element: {other:?}"),
    }
    let elem = table.get(&mut store, 1)?.expect("in bounds");
    let g = *elem.func_ref().flatten().expect("non-null funcref");
    assert_eq!(g.call(&mut store, &[])?[0].unwrap_i32(), 3);

    assert!(table.get(&mut store, 2)?.is_none());
    assert!(table.set(&mut store, 2, Val::null_func_ref()).is_err());
    Ok(())
}

#[test]
fn element_type_is_checked() -> Result<()> {
    let mut store = super::new_store(());
    let ty = TableType::new(ValType::FuncRef, 1, None);
    let table = Table::new(&mut store, ty, Val::null_func_ref())?;

    let err = table.set(&mut store, 0, Val::I32(1)).unwrap_err();
    assert_eq!(
        err.as_usage(),
        Some(&UsageError::TypeMismatch {
            expected: ValType::FuncRef,
            actual: ValType::I32,
        })
    );

    let err = Table::new(
        &mut store,
        TableType::new(ValType::ExternRef, 1, None),
        Val::null_func_ref(),
    )
    .unwrap_err();
    assert!(err.as_usage().is_some());
    Ok(())
}

#[test]
fn exported_table() -> Result<()> {
    let mut store = super::new_store(());
    let module = Module::new(
        store.engine(),
        r#"
            (module
                (table (export "t") 1 5 externref)
                (func (export "size") (result i32) table.size))
        "#,
    )?;
    let instance = Instance::new(&mut store, &module, &[])?;
    let table = instance.get_table(&mut store, "t").unwrap();
    let ty = table.ty(&store)?;
    assert_eq!(ty.element(), ValType::ExternRef);
    assert_eq!(ty.minimum(), 1);
    assert_eq!(ty.maximum(), Some(5));

    table.grow(&mut store, 2, Val::null_extern_ref())?;
    let size = instance.get_func(&mut store, "size").unwrap();
    assert_eq!(size.call(&mut store, &[])?[0].unwrap_i32(), 3);
    Ok(())
}
