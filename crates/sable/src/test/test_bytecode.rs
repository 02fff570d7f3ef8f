// Tests for persisting compiled programs
use std::any::Any;
use std::sync::Arc;

use super::*;
use crate::ast::builder::*;
use crate::sable_value::{HostDecoder, ScopeCell, ScriptFunction};

fn sample_program() -> Vec<AstNode> {
    vec![
        let_("total", num(0.0)),
        let_(
            "add_to",
            function(&["n"], vec![set("total", add(ident("total"), ident("n")))]),
        ),
        loop_(num(3.0), vec![call(ident("add_to"), vec![num(2.5)])]),
        let_("parts", array(vec![string("a"), num(1.0), nil()])),
        ret(Some(add(ident("total"), length(ident("parts"))))),
    ]
}

#[test]
fn test_dump_load_dump_is_identical() {
    let harness = Harness::new();
    let function = harness.compile(sample_program()).unwrap();
    let bytes = harness.context.dump_bytecode(&function).unwrap();
    let loaded = harness.context.load_bytecode(&bytes).unwrap();
    assert_eq!(harness.context.dump_bytecode(&loaded).unwrap(), bytes);
}

#[test]
fn test_loaded_program_behaves_the_same() {
    let harness = Harness::new();
    let function = harness
        .compile_with(
            sample_program(),
            &CompileOption::new("persisted.sbl").with_max_unroll_bytes(0),
        )
        .unwrap();
    let expected = harness.context.execute(&function).unwrap();

    let bytes = harness.context.dump_bytecode(&function).unwrap();
    let loaded = harness.context.load_bytecode(&bytes).unwrap();
    let actual = harness.context.execute(&loaded).unwrap();

    assert_eq!(expected.as_number(), Some(10.5));
    assert_eq!(actual.as_number(), expected.as_number());
    assert_eq!(loaded.as_script().unwrap().source_name, "persisted.sbl");
}

#[test]
fn test_corrupt_header_is_rejected() {
    let harness = Harness::new();
    let function = harness.compile(vec![ret(Some(num(1.0)))]).unwrap();
    let mut bytes = harness.context.dump_bytecode(&function).unwrap();
    bytes[0] = 99;
    let err = harness.context.load_bytecode(&bytes).unwrap_err();
    assert!(matches!(
        err,
        SableError::Bytecode(BytecodeError::UnsupportedVersion { major: 99, .. })
    ));
}

#[test]
fn test_program_holding_native_cannot_be_dumped() {
    let harness = Harness::new();
    let native = Function::native("host_fn", 0, |_, _, _| Ok(Value::Nil));
    let err = harness.context.dump_bytecode(&native).unwrap_err();
    assert!(matches!(
        err,
        SableError::Bytecode(BytecodeError::NotSerializable(_))
    ));
}

#[derive(Debug)]
struct Color(u8, u8, u8);

impl HostObject for Color {
    fn type_name(&self) -> &str {
        "Color"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn encode(&self) -> Option<(u16, Vec<u8>)> {
        Some((7, vec![self.0, self.1, self.2]))
    }
}

#[test]
fn test_host_constant_round_trips_through_decoder() {
    let harness = Harness::new();
    let decoder: HostDecoder = Arc::new(|bytes: &[u8]| match bytes {
        [r, g, b] => Ok(Value::host(Color(*r, *g, *b))),
        _ => Err(format!("expected 3 bytes, got {}", bytes.len())),
    });
    harness.context.register_host_type("Color", Some((7, decoder)));

    let location = SourceLocation::new("script", 1, 1);
    let function = Function::script(
        "main",
        ScriptFunction {
            source_name: "script".into(),
            instructions: vec![
                Instruction::with_operand(
                    OpCode::PushConst,
                    Value::host(Color(10, 20, 30)),
                    location.clone(),
                ),
                Instruction::new(OpCode::Return, location),
            ],
            params: Vec::new(),
            locals: Vec::new(),
            scope: ScopeCell::new(),
            enclosing: Vec::new(),
        },
    );

    let bytes = harness.context.dump_bytecode(&function).unwrap();
    let loaded = harness.context.load_bytecode(&bytes).unwrap();
    let value = harness.context.execute(&loaded).unwrap();
    let color = value.as_host::<Color>().unwrap();
    assert_eq!((color.0, color.1, color.2), (10, 20, 30));

    // Without the decoder the type id is unknown
    let fresh = Context::new(VmOption::default());
    assert!(matches!(
        fresh.load_bytecode(&bytes),
        Err(SableError::Bytecode(BytecodeError::UnknownHostType(7)))
    ));
}
