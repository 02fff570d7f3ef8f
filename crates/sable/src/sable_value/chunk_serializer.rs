// Function serializer/deserializer for persisted bytecode
// Little-endian binary format:
//   header:   u32 major, u32 minor, u32 build
//   function: str source, str name, u32 n + n*str params, u32 n + n*str locals,
//             u32 n + n*instruction
//   instruction: u16 opcode, value, u32 line, u32 column
//   value:    u16 tag + payload
// Strings are u32 length + utf-8 bytes.

use std::io::{Cursor, Read};
use std::sync::Arc;

use smol_str::SmolStr;

use super::{Function, ScopeCell, ScriptFunction, Value};
use crate::sable_vm::opcode::{Instruction, OpCode, SourceLocation};
use crate::sable_vm::sable_error::BytecodeError;
use crate::sable_vm::sable_limits::BYTECODE_VERSION;

const TAG_NIL: u16 = 0;
const TAG_NUMBER: u16 = 1;
const TAG_STRING: u16 = 2;
const TAG_ARRAY: u16 = 3;
const TAG_FUNCTION: u16 = 4;
const TAG_HOST: u16 = 5;

/// Resolves persisted host objects back into values.
pub trait HostTypes {
    fn decode_host(&self, type_id: u16, bytes: &[u8]) -> Result<Value, BytecodeError>;
}

/// Lookup used when no host types are registered.
pub struct NoHostTypes;

impl HostTypes for NoHostTypes {
    fn decode_host(&self, type_id: u16, _bytes: &[u8]) -> Result<Value, BytecodeError> {
        Err(BytecodeError::UnknownHostType(type_id))
    }
}

/// Serialize a script function (and every nested function) to bytes.
pub fn serialize_function(function: &Function) -> Result<Vec<u8>, BytecodeError> {
    let mut buf = Vec::new();
    let (major, minor, build) = BYTECODE_VERSION;
    write_u32(&mut buf, major);
    write_u32(&mut buf, minor);
    write_u32(&mut buf, build);
    write_function(&mut buf, function)?;
    Ok(buf)
}

/// Deserialize bytes produced by [`serialize_function`].
pub fn deserialize_function(
    data: &[u8],
    host_types: &dyn HostTypes,
) -> Result<Arc<Function>, BytecodeError> {
    let mut cursor = Cursor::new(data);
    let major = read_u32(&mut cursor)?;
    let minor = read_u32(&mut cursor)?;
    let build = read_u32(&mut cursor)?;
    if major != BYTECODE_VERSION.0 || minor > BYTECODE_VERSION.1 {
        return Err(BytecodeError::UnsupportedVersion {
            major,
            minor,
            build,
        });
    }

    let function = read_function(&mut cursor, &[], host_types)?;
    let remaining = data.len() - cursor.position() as usize;
    if remaining != 0 {
        return Err(BytecodeError::TrailingBytes(remaining));
    }
    Ok(function)
}

/// Encoded size of one instruction. Used as the unrolling cost measure.
pub fn instruction_size(instruction: &Instruction) -> usize {
    2 + value_size(&instruction.operand) + 8
}

fn value_size(value: &Value) -> usize {
    2 + match value {
        Value::Number(_) => 8,
        Value::String(s) => 4 + s.len(),
        Value::Array(items) => 4 + items.read().iter().map(value_size).sum::<usize>(),
        Value::Function(f) => function_size(f),
        Value::HostObject(h) => h.encode().map_or(0, |(_, bytes)| 2 + 4 + bytes.len()),
        _ => 0,
    }
}

fn function_size(function: &Function) -> usize {
    let Some(script) = function.as_script() else {
        return 0;
    };
    let names = |names: &[SmolStr]| 4 + names.iter().map(|n| 4 + n.len()).sum::<usize>();
    4 + script.source_name.len()
        + 4
        + function.name.len()
        + names(&script.params)
        + names(&script.locals)
        + 4
        + script.instructions.iter().map(instruction_size).sum::<usize>()
}

fn write_function(buf: &mut Vec<u8>, function: &Function) -> Result<(), BytecodeError> {
    let script = function.as_script().ok_or_else(|| {
        BytecodeError::NotSerializable(SmolStr::new(format!(
            "native function '{}'",
            function.name
        )))
    })?;

    write_string(buf, &script.source_name);
    write_string(buf, &function.name);
    write_names(buf, &script.params);
    write_names(buf, &script.locals);

    write_u32(buf, script.instructions.len() as u32);
    for instruction in &script.instructions {
        write_u16(buf, instruction.opcode.as_u16());
        write_value(buf, &instruction.operand)?;
        write_u32(buf, instruction.location.line);
        write_u32(buf, instruction.location.column);
    }
    Ok(())
}

fn write_names(buf: &mut Vec<u8>, names: &[SmolStr]) {
    write_u32(buf, names.len() as u32);
    for name in names {
        write_string(buf, name);
    }
}

fn write_value(buf: &mut Vec<u8>, value: &Value) -> Result<(), BytecodeError> {
    match value {
        Value::Nil => write_u16(buf, TAG_NIL),
        Value::Number(n) => {
            write_u16(buf, TAG_NUMBER);
            write_f64(buf, *n);
        }
        Value::String(s) => {
            write_u16(buf, TAG_STRING);
            write_string(buf, s);
        }
        Value::Array(items) => {
            write_u16(buf, TAG_ARRAY);
            let items = items.read();
            write_u32(buf, items.len() as u32);
            for item in items.iter() {
                write_value(buf, item)?;
            }
        }
        Value::Function(f) => {
            write_u16(buf, TAG_FUNCTION);
            write_function(buf, f)?;
        }
        Value::HostObject(h) => {
            let (type_id, bytes) = h.encode().ok_or_else(|| {
                BytecodeError::NotSerializable(SmolStr::new(format!(
                    "host object of type {}",
                    h.type_name()
                )))
            })?;
            write_u16(buf, TAG_HOST);
            write_u16(buf, type_id);
            write_bytes(buf, &bytes);
        }
        Value::Table(_) => return Err(BytecodeError::NotSerializable(SmolStr::new("table"))),
        Value::Coroutine(_) => {
            return Err(BytecodeError::NotSerializable(SmolStr::new("coroutine")));
        }
    }
    Ok(())
}

/// `enclosing` is the scope chain of the function that contains this one,
/// nearest first.
fn read_function(
    cursor: &mut Cursor<&[u8]>,
    enclosing: &[Arc<ScopeCell>],
    host_types: &dyn HostTypes,
) -> Result<Arc<Function>, BytecodeError> {
    let source_name = SmolStr::new(read_string(cursor)?);
    let name = SmolStr::new(read_string(cursor)?);
    let params = read_names(cursor)?;
    let locals = read_names(cursor)?;

    let scope = ScopeCell::new();
    let mut chain = Vec::with_capacity(enclosing.len() + 1);
    chain.push(scope.clone());
    chain.extend(enclosing.iter().cloned());

    let count = read_u32(cursor)? as usize;
    let mut instructions = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        let raw = read_u16(cursor)?;
        let opcode = OpCode::from_u16(raw).ok_or(BytecodeError::UnknownOpcode(raw))?;
        let operand = read_value(cursor, &chain, host_types)?;
        let line = read_u32(cursor)?;
        let column = read_u32(cursor)?;
        instructions.push(Instruction::with_operand(
            opcode,
            operand,
            SourceLocation::new(source_name.clone(), line, column),
        ));
    }

    Ok(Function::script(
        name,
        ScriptFunction {
            source_name,
            instructions,
            params,
            locals,
            scope,
            enclosing: enclosing.to_vec(),
        },
    ))
}

fn read_names(cursor: &mut Cursor<&[u8]>) -> Result<Vec<SmolStr>, BytecodeError> {
    let count = read_u32(cursor)? as usize;
    let mut names = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        names.push(SmolStr::new(read_string(cursor)?));
    }
    Ok(names)
}

fn read_value(
    cursor: &mut Cursor<&[u8]>,
    chain: &[Arc<ScopeCell>],
    host_types: &dyn HostTypes,
) -> Result<Value, BytecodeError> {
    let tag = read_u16(cursor)?;
    match tag {
        TAG_NIL => Ok(Value::Nil),
        TAG_NUMBER => Ok(Value::Number(read_f64(cursor)?)),
        TAG_STRING => Ok(Value::string(read_string(cursor)?)),
        TAG_ARRAY => {
            let count = read_u32(cursor)? as usize;
            let mut items = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                items.push(read_value(cursor, chain, host_types)?);
            }
            Ok(Value::new_array(items))
        }
        TAG_FUNCTION => Ok(Value::Function(read_function(cursor, chain, host_types)?)),
        TAG_HOST => {
            let type_id = read_u16(cursor)?;
            let bytes = read_bytes(cursor)?;
            host_types.decode_host(type_id, &bytes)
        }
        other => Err(BytecodeError::UnknownTag(other)),
    }
}

// ============ Helper functions ============

fn write_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_f64(buf: &mut Vec<u8>, value: f64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_bytes(buf, s.as_bytes());
}

fn read_exact<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N], BytecodeError> {
    let mut bytes = [0u8; N];
    let at = cursor.position() as usize;
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| BytecodeError::UnexpectedEof(at))?;
    Ok(bytes)
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, BytecodeError> {
    Ok(u16::from_le_bytes(read_exact(cursor)?))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, BytecodeError> {
    Ok(u32::from_le_bytes(read_exact(cursor)?))
}

fn read_f64(cursor: &mut Cursor<&[u8]>) -> Result<f64, BytecodeError> {
    Ok(f64::from_le_bytes(read_exact(cursor)?))
}

fn read_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>, BytecodeError> {
    let len = read_u32(cursor)? as usize;
    let at = cursor.position() as usize;
    let available = cursor.get_ref().len().saturating_sub(at);
    if len > available {
        return Err(BytecodeError::UnexpectedEof(at));
    }
    let mut bytes = vec![0u8; len];
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| BytecodeError::UnexpectedEof(at))?;
    Ok(bytes)
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> Result<String, BytecodeError> {
    let at = cursor.position() as usize;
    String::from_utf8(read_bytes(cursor)?).map_err(|_| BytecodeError::InvalidUtf8(at))
}
