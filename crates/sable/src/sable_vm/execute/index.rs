// Indexing: arrays, strings, tables, type objects and host objects
use crate::sable_value::{TypeObject, Value};
use crate::sable_vm::interpreter::Interpreter;
use crate::sable_vm::opcode::SourceLocation;
use crate::sable_vm::sable_error::{RuntimeErrorKind, SableResult};

/// Position `index` in a sequence of `length` elements.
fn element_index(
    target: &Value,
    index: &Value,
    length: usize,
    location: &SourceLocation,
) -> SableResult<usize> {
    let Value::Number(n) = index else {
        return Err(RuntimeErrorKind::WrongIndexType {
            target: target.type_name(),
            index: index.type_name(),
        }
        .at(location));
    };
    if *n < 0.0 || n.fract() != 0.0 || *n >= length as f64 {
        return Err(RuntimeErrorKind::IndexOutOfRange { index: *n, length }.at(location));
    }
    Ok(*n as usize)
}

fn method_name<'v>(index: &'v Value, location: &SourceLocation) -> SableResult<&'v str> {
    index.as_str().ok_or_else(|| {
        RuntimeErrorKind::WrongIndexType {
            target: "Type".into(),
            index: index.type_name(),
        }
        .at(location)
    })
}

impl Interpreter {
    pub(crate) fn index_get(
        &mut self,
        target: &Value,
        index: &Value,
        location: &SourceLocation,
    ) -> SableResult<Value> {
        match target {
            Value::Array(items) => {
                let items = items.read();
                let i = element_index(target, index, items.len(), location)?;
                Ok(items[i].clone())
            }
            Value::String(s) => {
                let length = s.chars().count();
                let i = element_index(target, index, length, location)?;
                Ok(s.chars()
                    .nth(i)
                    .map(|c| Value::string(c.to_string()))
                    .unwrap_or_default())
            }
            Value::Table(table) => Ok(table.read().get_or_nil(index)),
            Value::HostObject(host) => {
                // Type objects expose their type's methods
                if let Some(type_object) = host.as_any().downcast_ref::<TypeObject>() {
                    let name = method_name(index, location)?;
                    return Ok(self
                        .context
                        .get_method(&type_object.key, name)
                        .unwrap_or_default());
                }
                match host.index_get(index) {
                    Some(result) => result.map_err(|kind| kind.at(location)),
                    None => Err(RuntimeErrorKind::NotIndexable {
                        type_name: target.type_name(),
                    }
                    .at(location)),
                }
            }
            _ => Err(RuntimeErrorKind::NotIndexable {
                type_name: target.type_name(),
            }
            .at(location)),
        }
    }

    pub(crate) fn index_set(
        &mut self,
        target: &Value,
        index: Value,
        value: Value,
        location: &SourceLocation,
    ) -> SableResult<()> {
        match target {
            Value::Array(items) => {
                let mut items = items.write();
                let i = element_index(target, &index, items.len(), location)?;
                items[i] = value;
                Ok(())
            }
            Value::Table(table) => {
                table.write().set(index, value);
                Ok(())
            }
            Value::HostObject(host) => {
                // Installing a method on a type object
                if let Some(type_object) = host.as_any().downcast_ref::<TypeObject>() {
                    let name = method_name(&index, location)?;
                    self.context
                        .register_method(type_object.key.clone(), name, value);
                    return Ok(());
                }
                match host.index_set(&index, value) {
                    Some(result) => result.map_err(|kind| kind.at(location)),
                    None => Err(RuntimeErrorKind::NotIndexable {
                        type_name: target.type_name(),
                    }
                    .at(location)),
                }
            }
            _ => Err(RuntimeErrorKind::NotIndexable {
                type_name: target.type_name(),
            }
            .at(location)),
        }
    }
}
