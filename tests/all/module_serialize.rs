use anyhow::Result;
use wasmbridge::*;

const ADDER: &str = r#"
    (module
        (func (export "run") (param i32) (result i32)
            local.get 0
            i32.const 1
            i32.add))
"#;

#[test]
fn serialize_then_run() -> Result<()> {
    let mut store = super::new_store(());
    let bytes = Module::new(store.engine(), ADDER)?.serialize()?;
    let module = unsafe { Module::deserialize(store.engine(), &bytes)? };
    let instance = Instance::new(&mut store, &module, &[])?;
    let run = instance.get_func(&mut store, "run").unwrap();
    assert_eq!(run.call(&mut store, &[Val::I32(41)])?[0].unwrap_i32(), 42);
    Ok(())
}

#[test]
fn deserialize_garbage_fails() {
    let engine = Engine::default();
    let err = unsafe { Module::deserialize(&engine, b"definitely not a module") }.unwrap_err();
    assert!(matches!(err, Error::Native { .. }));
}

#[test]
fn invalid_module_reports_engine_message() {
    let engine = Engine::default();
    let err = Module::new(&engine, "(module (func (result i32)))").unwrap_err();
    match err {
        Error::Native { message, .. } => assert!(!message.is_empty()),
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(Module::validate(&engine, b"\0asm\x01\0\0\0").is_ok());
    assert!(Module::validate(&engine, b"\0asm").is_err());
}

#[test]
fn imports_and_exports() -> Result<()> {
    let engine = Engine::default();
    let module = Module::new(
        &engine,
        r#"
            (module
                (import "env" "f" (func))
                (import "env" "m" (memory 1))
                (import "other" "g" (global i32))
                (table (export "t") 1 funcref)
                (global (export "answer") i32 (i32.const 42))
                (func (export "run")))
        "#,
    )?;

    let imports = module
        .imports()
        .iter()
        .map(|i| (i.module().to_string(), i.name().to_string(), i.kind()))
        .collect::<Vec<_>>();
    assert_eq!(
        imports,
        [
            ("env".to_string(), "f".to_string(), ExternKind::Func),
            ("env".to_string(), "m".to_string(), ExternKind::Memory),
            ("other".to_string(), "g".to_string(), ExternKind::Global),
        ]
    );

    let exports = module
        .exports()
        .iter()
        .map(|e| (e.name().to_string(), e.kind()))
        .collect::<Vec<_>>();
    assert_eq!(
        exports,
        [
            ("t".to_string(), ExternKind::Table),
            ("answer".to_string(), ExternKind::Global),
            ("run".to_string(), ExternKind::Func),
        ]
    );

    let clone = module.clone();
    module.close();
    assert_eq!(clone.exports().len(), 3);
    Ok(())
}
