//! Dispatch loop for bytecode execution
//!
//! Handles individual opcode execution for one frame.

use bytecode_system::{LocalSlot, Opcode};
use core_types::{ErrorKind, EvalResult, RuntimeError, StackFrame, Value};

use crate::frame::Frame;
use crate::runtime::Runtime;

/// Dispatch handler for executing one frame's bytecode
#[derive(Debug)]
pub(crate) struct Dispatcher<'rt> {
    runtime: &'rt Runtime,
    /// Stack for intermediate values
    stack: Vec<Value>,
}

impl<'rt> Dispatcher<'rt> {
    pub(crate) fn new(runtime: &'rt Runtime) -> Self {
        Self {
            runtime,
            stack: Vec::with_capacity(16),
        }
    }

    /// Run the frame until it returns or raises
    ///
    /// Errors leaving the frame record it in their traceback.
    pub(crate) fn run(mut self, frame: &mut Frame) -> EvalResult {
        let code = frame.code().clone();
        let mut ip = 0;
        loop {
            let Some(inst) = code.instructions().get(ip) else {
                return Ok(Value::None);
            };
            let offset = ip;
            ip += 1;
            match self.step(frame, inst, &mut ip) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(mut error) => {
                    error.push_frame(StackFrame::new(code.name(), offset));
                    return Err(error);
                }
            }
        }
    }

    /// Execute one instruction; `Some` means the frame returned
    fn step(&mut self, frame: &mut Frame, inst: &Opcode, ip: &mut usize) -> EvalResult<Option<Value>> {
        match inst {
            Opcode::LoadConstant(idx) => {
                let value = frame
                    .code()
                    .constants()
                    .get(*idx)
                    .map(Value::from)
                    .ok_or_else(|| RuntimeError::system(format!("constant {} out of range", idx)))?;
                self.stack.push(value);
            }
            Opcode::LoadNone => self.stack.push(Value::None),
            Opcode::LoadLocal(slot) => {
                let slot = slot_in_range(frame, *slot)?;
                let value = frame.local(slot).cloned().ok_or_else(|| unbound(frame, slot))?;
                self.stack.push(value);
            }
            Opcode::StoreLocal(slot) => {
                let value = self.pop()?;
                frame.set_local(slot.0 as usize, Some(value))?;
            }
            Opcode::DeleteLocal(slot) => {
                let slot = slot_in_range(frame, *slot)?;
                if frame.local(slot).is_none() {
                    return Err(unbound(frame, slot));
                }
                frame.set_local(slot, None)?;
            }
            Opcode::LoadGlobal(name) => {
                let value = self.runtime.get_global(name).ok_or_else(|| {
                    RuntimeError::new(ErrorKind::NameError, format!("name '{}' is not defined", name))
                })?;
                self.stack.push(value);
            }
            Opcode::StoreGlobal(name) => {
                let value = self.pop()?;
                self.runtime.set_global(name.clone(), value);
            }
            Opcode::LoadAttr(name) => {
                let target = self.pop()?;
                let value = target
                    .as_object()
                    .and_then(|obj| obj.get_attr(name))
                    .ok_or_else(|| no_attribute(&target, name))?;
                self.stack.push(value);
            }
            Opcode::StoreAttr(name) => {
                let value = self.pop()?;
                let target = self.pop()?;
                match target.as_object() {
                    Some(obj) => obj.set_attr(name.clone(), value),
                    None => return Err(no_attribute(&target, name)),
                }
            }
            Opcode::Add => self.binary(add)?,
            Opcode::Sub => self.binary(sub)?,
            Opcode::Mul => self.binary(mul)?,
            Opcode::Not => {
                let value = self.pop()?;
                self.stack.push(Value::Bool(!value.is_truthy()));
            }
            Opcode::Equal => self.binary(|a, b| Ok(Value::Bool(a == b)))?,
            Opcode::LessThan => self.binary(less_than)?,
            Opcode::Jump(target) => *ip = *target,
            Opcode::JumpIfFalse(target) => {
                if !self.pop()?.is_truthy() {
                    *ip = *target;
                }
            }
            Opcode::Return => {
                let value = self.stack.pop().unwrap_or(Value::None);
                return Ok(Some(value));
            }
            Opcode::Call(argc) => {
                let args = self.pop_n(*argc as usize)?;
                let callee = self.pop()?;
                let result = self.runtime.call(&callee, args)?;
                self.stack.push(result);
            }
            Opcode::CallMethod(name, argc) => {
                let mut args = self.pop_n(*argc as usize)?;
                let receiver = self.pop()?;
                let method = receiver
                    .as_object()
                    .and_then(|obj| obj.class().method(name).cloned())
                    .ok_or_else(|| no_attribute(&receiver, name))?;
                args.insert(0, receiver);
                let result = self.runtime.call(&method, args)?;
                self.stack.push(result);
            }
            Opcode::Raise => {
                let value = self.pop()?;
                return Err(RuntimeError::exception(value.to_string()));
            }
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Dup => {
                let top = self
                    .stack
                    .last()
                    .cloned()
                    .ok_or_else(|| RuntimeError::system("stack underflow"))?;
                self.stack.push(top);
            }
        }
        Ok(None)
    }

    fn pop(&mut self) -> EvalResult {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::system("stack underflow"))
    }

    fn pop_n(&mut self, n: usize) -> EvalResult<Vec<Value>> {
        if self.stack.len() < n {
            return Err(RuntimeError::system("stack underflow"));
        }
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }

    fn binary(&mut self, op: impl FnOnce(Value, Value) -> EvalResult) -> EvalResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.stack.push(op(a, b)?);
        Ok(())
    }
}

fn slot_in_range(frame: &Frame, slot: LocalSlot) -> Result<usize, RuntimeError> {
    let slot = slot.0 as usize;
    if slot < frame.locals().len() {
        Ok(slot)
    } else {
        Err(RuntimeError::system(format!("local slot {} out of range", slot)))
    }
}

fn unbound(frame: &Frame, slot: usize) -> RuntimeError {
    let name = frame
        .code()
        .varnames()
        .get(slot)
        .map(String::as_str)
        .unwrap_or("?");
    RuntimeError::new(
        ErrorKind::UnboundLocalError,
        format!("local variable '{}' referenced before assignment", name),
    )
}

fn no_attribute(target: &Value, name: &str) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::AttributeError,
        format!("'{}' object has no attribute '{}'", target.type_name(), name),
    )
}

fn unsupported(op: &str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        a.type_name(),
        b.type_name()
    ))
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        Value::Bool(b) => Some(*b as i64 as f64),
        _ => None,
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

fn arith(
    symbol: &str,
    a: Value,
    b: Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult {
    if let (Some(x), Some(y)) = (as_int(&a), as_int(&b)) {
        if let Some(n) = int_op(x, y) {
            return Ok(Value::Int(n));
        }
        // Overflow falls back to float arithmetic.
        return Ok(Value::Float(float_op(x as f64, y as f64)));
    }
    match (as_float(&a), as_float(&b)) {
        (Some(x), Some(y)) => Ok(Value::Float(float_op(x, y))),
        _ => Err(unsupported(symbol, &a, &b)),
    }
}

fn add(a: Value, b: Value) -> EvalResult {
    if let (Value::Str(x), Value::Str(y)) = (&a, &b) {
        return Ok(Value::str(&format!("{}{}", x, y)));
    }
    arith("+", a, b, i64::checked_add, |x, y| x + y)
}

fn sub(a: Value, b: Value) -> EvalResult {
    arith("-", a, b, i64::checked_sub, |x, y| x - y)
}

fn mul(a: Value, b: Value) -> EvalResult {
    arith("*", a, b, i64::checked_mul, |x, y| x * y)
}

fn less_than(a: Value, b: Value) -> EvalResult {
    if let (Value::Str(x), Value::Str(y)) = (&a, &b) {
        return Ok(Value::Bool(x < y));
    }
    match (as_float(&a), as_float(&b)) {
        (Some(x), Some(y)) => Ok(Value::Bool(x < y)),
        _ => Err(RuntimeError::type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))),
    }
}
