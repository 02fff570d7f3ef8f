// Function and method invocation
use std::sync::Arc;

use super::TmKind;
use crate::sable_value::{Function, FunctionBody, TypeObject, Value};
use crate::sable_vm::interpreter::{Interpreter, Invoked};
use crate::sable_vm::opcode::SourceLocation;
use crate::sable_vm::sable_error::{RuntimeErrorKind, SableResult};

fn prepend(receiver: Value, args: Vec<Value>) -> Vec<Value> {
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push(receiver);
    full.extend(args);
    full
}

impl Interpreter {
    /// Start a call to any value. Non-functions go through their type's
    /// `Call` method with the callee as first argument.
    pub(crate) fn invoke(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> SableResult<Invoked> {
        if let Value::Function(function) = &callee {
            return self.invoke_function(function, args, location);
        }
        match self.find_method(&callee, TmKind::Call) {
            Some(Value::Function(method)) => {
                self.invoke_function(&method, prepend(callee, args), location)
            }
            _ => Err(RuntimeErrorKind::NotCallable {
                type_name: callee.type_name(),
            }
            .at(location)),
        }
    }

    /// Check the argument count against the callee and either run a native
    /// callback or push a script frame.
    pub(crate) fn invoke_function(
        &mut self,
        function: &Arc<Function>,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> SableResult<Invoked> {
        let required = function.required_args();
        if args.len() < required {
            return Err(RuntimeErrorKind::NotEnoughArguments {
                function: function.name.clone(),
                expected: required,
                actual: args.len(),
            }
            .at(location));
        }

        match &function.body {
            FunctionBody::Native(native) => {
                let value = (native.callback)(self, location, &args)?;
                Ok(Invoked::Value(value))
            }
            FunctionBody::Script(script) => {
                self.push_frame(function.clone(), script.clone(), args, location)?;
                Ok(Invoked::Frame)
            }
        }
    }

    /// `receiver.name(args)`: the type's registered method (receiver first),
    /// then a function stored in a table under `name`, then a host object's
    /// own member.
    pub(crate) fn invoke_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> SableResult<Invoked> {
        if let Some(type_object) = receiver.as_host::<TypeObject>() {
            // Methods called on the type object itself take no receiver
            if let Some(method) = self.context.get_method(&type_object.key, name) {
                return self.invoke(method, args, location);
            }
        }

        if let Some(method) = self.context.get_method(&receiver.type_key(), name) {
            return self.invoke(method, prepend(receiver, args), location);
        }

        match &receiver {
            Value::Table(table) => {
                let member = table.read().get_str(name).cloned();
                if let Some(member) = member.filter(|m| !m.is_nil()) {
                    return self.invoke(member, args, location);
                }
            }
            Value::HostObject(host) => {
                if let Some(Ok(member)) = host.index_get(&Value::string(name)) {
                    if !member.is_nil() {
                        return self.invoke(member, prepend(receiver.clone(), args), location);
                    }
                }
            }
            _ => {}
        }

        Err(RuntimeErrorKind::NoMethod {
            type_name: receiver.type_name(),
            method: name.into(),
        }
        .at(location))
    }
}
