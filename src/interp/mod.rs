//! Reference interpreter for lowered modules.
//!
//! Runs `main` block by block against an in-memory string heap, standing in
//! for the native runtime primitives.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::codegen::{
    BinaryOp, BlockId, Cond, Inst, IrType, Module, Runtime, Terminator, Value, ValueId,
};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("{0} is read before it is defined")]
    UndefinedValue(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

type RunResult<T> = Result<T, RuntimeError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Val {
    Int(i32),
    Bit(bool),
    /// Index into the string heap, `None` for null.
    Ptr(Option<usize>),
}

pub struct Interpreter<'m, R, W> {
    module: &'m Module,
    input: R,
    output: W,
    heap: Vec<String>,
    /// Heap index of each pooled string constant.
    constants: Vec<usize>,
    globals: HashMap<String, Val>,
    values: HashMap<ValueId, Val>,
}

impl<'m, R: BufRead, W: Write> Interpreter<'m, R, W> {
    pub fn new(module: &'m Module, input: R, output: W) -> Self {
        let mut heap = vec![];
        let mut constants = vec![0; module.strings.len()];
        for s in module.strings.iter() {
            constants[s.id.0] = heap.len();
            heap.push(s.content.clone());
        }

        let globals = module
            .globals
            .iter()
            .map(|g| {
                let init = match g.ty {
                    IrType::I1 => Val::Bit(false),
                    IrType::I32 => Val::Int(0),
                    IrType::Ptr => Val::Ptr(None),
                };
                (g.name.clone(), init)
            })
            .collect();

        Self {
            module,
            input,
            output,
            heap,
            constants,
            globals,
            values: HashMap::new(),
        }
    }

    /// Executes `main` and returns its exit code.
    pub fn run(&mut self) -> RunResult<i32> {
        if self.module.blocks.is_empty() {
            return Ok(0);
        }

        let module = self.module;
        let mut current = BlockId(0);
        loop {
            let block = module.block(current);
            for inst in block.insts.iter() {
                self.exec(inst)?;
            }
            current = match &block.terminator {
                Terminator::Jump(target) => *target,
                Terminator::Branch {
                    cond,
                    then_block,
                    else_block,
                } => {
                    if self.bit(cond)? {
                        *then_block
                    } else {
                        *else_block
                    }
                }
                Terminator::Return(code) => {
                    self.output.flush()?;
                    return Ok(*code);
                }
            };
        }
    }

    fn exec(&mut self, inst: &Inst) -> RunResult<()> {
        match inst {
            Inst::Load { dest, slot, .. } => {
                let val = self
                    .globals
                    .get(slot)
                    .copied()
                    .ok_or_else(|| RuntimeError::UndefinedValue(format!("@var.{}", slot)))?;
                self.values.insert(*dest, val);
            }
            Inst::Store { value, slot, .. } => {
                let val = self.eval(value)?;
                self.globals.insert(slot.clone(), val);
            }
            Inst::Binary {
                dest,
                op,
                ty,
                lhs,
                rhs,
            } => {
                let val = match ty {
                    IrType::I1 => {
                        let (l, r) = (self.bit(lhs)?, self.bit(rhs)?);
                        match op {
                            BinaryOp::And => Val::Bit(l && r),
                            BinaryOp::Or => Val::Bit(l || r),
                            _ => return Err(RuntimeError::TypeError(format!("{} on i1", op))),
                        }
                    }
                    IrType::I32 => {
                        let (l, r) = (self.int(lhs)?, self.int(rhs)?);
                        Val::Int(arith(*op, l, r)?)
                    }
                    IrType::Ptr => {
                        return Err(RuntimeError::TypeError(format!("{} on ptr", op)));
                    }
                };
                self.values.insert(*dest, val);
            }
            Inst::Icmp {
                dest,
                cond,
                lhs,
                rhs,
            } => {
                let (l, r) = (self.int(lhs)?, self.int(rhs)?);
                let b = match cond {
                    Cond::Eq => l == r,
                    Cond::Ne => l != r,
                    Cond::Slt => l < r,
                    Cond::Sle => l <= r,
                    Cond::Sgt => l > r,
                    Cond::Sge => l >= r,
                };
                self.values.insert(*dest, Val::Bit(b));
            }
            Inst::Zext { dest, value } => {
                let b = self.bit(value)?;
                self.values.insert(*dest, Val::Int(b as i32));
            }
            Inst::Alloca { dest, .. } => {
                let ptr = self.alloc(String::new());
                self.values.insert(*dest, ptr);
            }
            Inst::Call { dest, callee, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<RunResult<Vec<_>>>()?;
                let ret = self.call(*callee, &args)?;
                if let (Some(dest), Some(ret)) = (dest, ret) {
                    self.values.insert(*dest, ret);
                }
            }
        }
        Ok(())
    }

    fn call(&mut self, callee: Runtime, args: &[Val]) -> RunResult<Option<Val>> {
        if args.len() != callee.params().len() {
            return Err(RuntimeError::TypeError(format!(
                "{} takes {} arguments, got {}",
                callee.symbol(),
                callee.params().len(),
                args.len()
            )));
        }

        match callee {
            Runtime::PrintInt => {
                let n = as_int(args[0])?;
                writeln!(self.output, "{}", n)?;
                Ok(None)
            }
            Runtime::PrintStr => {
                let s = self.string(args[0])?.to_string();
                writeln!(self.output, "{}", s)?;
                Ok(None)
            }
            Runtime::ReadStr => {
                let buffer = match args[0] {
                    Val::Ptr(Some(i)) => i,
                    other => return Err(type_error("buffer", other)),
                };
                let size = as_int(args[1])?.max(1) as usize;

                let mut line = String::new();
                self.input.read_line(&mut line)?;
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                while line.len() > size - 1 {
                    line.pop();
                }
                let slot = self
                    .heap
                    .get_mut(buffer)
                    .ok_or_else(|| RuntimeError::UndefinedValue(format!("heap[{}]", buffer)))?;
                *slot = line;
                Ok(None)
            }
            Runtime::StrCmp => {
                let ord = self.string(args[0])?.cmp(self.string(args[1])?);
                let n = match ord {
                    Ordering::Less => -1,
                    Ordering::Equal => 0,
                    Ordering::Greater => 1,
                };
                Ok(Some(Val::Int(n)))
            }
            Runtime::Concat => {
                let s = format!("{}{}", self.string(args[0])?, self.string(args[1])?);
                Ok(Some(self.alloc(s)))
            }
            Runtime::IntToStr => {
                let s = as_int(args[0])?.to_string();
                Ok(Some(self.alloc(s)))
            }
            Runtime::DivByZero => Err(RuntimeError::DivisionByZero),
        }
    }

    fn alloc(&mut self, s: String) -> Val {
        self.heap.push(s);
        Val::Ptr(Some(self.heap.len() - 1))
    }

    fn eval(&self, value: &Value) -> RunResult<Val> {
        match value {
            Value::Const(n) => Ok(Val::Int(*n)),
            Value::Reg(id) => self
                .values
                .get(id)
                .copied()
                .ok_or_else(|| RuntimeError::UndefinedValue(value.to_string())),
            Value::Str(id) => self
                .constants
                .get(id.0)
                .map(|i| Val::Ptr(Some(*i)))
                .ok_or_else(|| RuntimeError::UndefinedValue(value.to_string())),
            Value::Null => Ok(Val::Ptr(None)),
        }
    }

    fn int(&self, value: &Value) -> RunResult<i32> {
        as_int(self.eval(value)?)
    }

    fn bit(&self, value: &Value) -> RunResult<bool> {
        match self.eval(value)? {
            Val::Bit(b) => Ok(b),
            other => Err(type_error("i1", other)),
        }
    }

    /// Null reads as the empty string.
    fn string(&self, val: Val) -> RunResult<&str> {
        match val {
            Val::Ptr(None) => Ok(""),
            Val::Ptr(Some(i)) => self
                .heap
                .get(i)
                .map(|s| s.as_str())
                .ok_or_else(|| RuntimeError::UndefinedValue(format!("heap[{}]", i))),
            other => Err(type_error("ptr", other)),
        }
    }
}

fn as_int(val: Val) -> RunResult<i32> {
    match val {
        Val::Int(n) => Ok(n),
        other => Err(type_error("i32", other)),
    }
}

fn type_error(expected: &str, found: Val) -> RuntimeError {
    RuntimeError::TypeError(format!("expected {}, found {:?}", expected, found))
}

fn arith(op: BinaryOp, l: i32, r: i32) -> RunResult<i32> {
    match op {
        BinaryOp::Add => Ok(l.wrapping_add(r)),
        BinaryOp::Sub => Ok(l.wrapping_sub(r)),
        BinaryOp::Mul => Ok(l.wrapping_mul(r)),
        BinaryOp::SDiv => {
            if r == 0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(l.wrapping_div(r))
            }
        }
        BinaryOp::And => Ok(l & r),
        BinaryOp::Or => Ok(l | r),
    }
}

/// Runs `module` with the given stdin and stdout, returning its exit code.
pub fn run<R: BufRead, W: Write>(module: &Module, input: R, output: W) -> RunResult<i32> {
    Interpreter::new(module, input, output).run()
}
