use std::collections::HashMap;

use crate::analyzer::{SymbolTable, Ty};
use crate::tac::{Instruction, Opcode, Operand};

use super::{
    BinaryOp, Block, BlockId, Cond, GlobalSlot, Inst, IrType, LoweringError, Module, Runtime,
    StringConstant, StringId, Terminator, Value, ValueId,
};

/// Size of the buffer `READ` hands to the runtime.
pub const READ_BUFFER_SIZE: usize = 256;

type LowerResult<T> = Result<T, LoweringError>;

/// Block under construction. It is only sealed into a `Block` once the
/// whole instruction list has been lowered.
struct BlockBuilder {
    label: String,
    insts: Vec<Inst>,
    terminator: Option<Terminator>,
}

impl BlockBuilder {
    fn new(label: String) -> Self {
        Self {
            label,
            insts: vec![],
            terminator: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Typed {
    value: Value,
    ty: IrType,
}

impl Typed {
    fn int(value: Value) -> Self {
        Self {
            value,
            ty: IrType::I32,
        }
    }

    fn ptr(value: Value) -> Self {
        Self {
            value,
            ty: IrType::Ptr,
        }
    }
}

pub fn ir_type(ty: Ty) -> Option<IrType> {
    match ty {
        Ty::Int => Some(IrType::I32),
        Ty::String => Some(IrType::Ptr),
        Ty::Error => None,
    }
}

/// Turns a TAC listing into a `Module`.
///
/// A pre-scan creates one block per `LABEL` and one slot per symbol; the
/// emission pass then appends to the current block, switching blocks on
/// `LABEL` and opening a fallthrough block whenever an instruction follows a
/// terminator.
pub struct Lowering<'a> {
    symbol_table: &'a SymbolTable,
    strings: Vec<StringConstant>,
    string_ids: HashMap<String, StringId>,
    globals: Vec<GlobalSlot>,
    slots: HashMap<String, IrType>,
    blocks: Vec<BlockBuilder>,
    /// Output order of the blocks.
    layout: Vec<BlockId>,
    labels: HashMap<usize, BlockId>,
    current: BlockId,
    temporaries: HashMap<usize, Typed>,
    value_index: usize,
    block_index: usize,
}

impl<'a> Lowering<'a> {
    pub fn new(symbol_table: &'a SymbolTable) -> Self {
        Self {
            symbol_table,
            strings: vec![],
            string_ids: HashMap::new(),
            globals: vec![],
            slots: HashMap::new(),
            blocks: vec![BlockBuilder::new("entry".to_string())],
            layout: vec![BlockId(0)],
            labels: HashMap::new(),
            current: BlockId(0),
            temporaries: HashMap::new(),
            value_index: 0,
            block_index: 0,
        }
    }

    pub fn lower(mut self, instructions: Vec<Instruction>) -> LowerResult<Module> {
        self.allocate_globals()?;
        self.create_label_blocks(&instructions)?;

        for instr in instructions.iter() {
            if instr.opcode == Opcode::Label {
                self.switch_to_label(instr)?;
                continue;
            }
            if self.is_terminated() {
                let label = self.fresh_label("fallthrough");
                let block = self.create_block(label);
                self.current = block;
            }
            self.lower_instruction(instr)?;
        }

        if !self.is_terminated() {
            self.terminate(Terminator::Return(0));
        }
        Ok(self.finish())
    }

    fn allocate_globals(&mut self) -> LowerResult<()> {
        for symbol in self.symbol_table.symbols() {
            let ty = ir_type(symbol.ty).ok_or_else(|| LoweringError::UnknownType {
                name: symbol.name.clone(),
                ty: symbol.ty,
            })?;
            self.globals.push(GlobalSlot {
                name: symbol.slot.clone(),
                ty,
            });
            self.slots.insert(symbol.slot.clone(), ty);
        }
        Ok(())
    }

    fn create_label_blocks(&mut self, instructions: &[Instruction]) -> LowerResult<()> {
        for instr in instructions.iter().filter(|i| i.opcode == Opcode::Label) {
            let n = match &instr.dest {
                Some(Operand::Label(n)) => *n,
                _ => return Err(unsupported(instr, "expected a label operand")),
            };
            if self.labels.contains_key(&n) {
                return Err(LoweringError::DuplicateLabel(n));
            }
            let id = BlockId(self.blocks.len());
            self.blocks.push(BlockBuilder::new(format!("L{}", n)));
            self.layout.push(id);
            self.labels.insert(n, id);
        }
        Ok(())
    }

    fn switch_to_label(&mut self, instr: &Instruction) -> LowerResult<()> {
        let target = self.label_block(instr, instr.dest.as_ref())?;
        if !self.is_terminated() {
            self.terminate(Terminator::Jump(target));
        }
        self.current = target;
        Ok(())
    }

    fn fresh_label(&mut self, prefix: &str) -> String {
        let label = format!("{}.{}", prefix, self.block_index);
        self.block_index += 1;
        label
    }

    /// Creates a block placed right after the current one in the layout.
    fn create_block(&mut self, label: String) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BlockBuilder::new(label));
        let at = self
            .layout
            .iter()
            .position(|b| *b == self.current)
            .map_or(self.layout.len(), |i| i + 1);
        self.layout.insert(at, id);
        id
    }

    fn is_terminated(&self) -> bool {
        self.blocks[self.current.0].terminator.is_some()
    }

    fn terminate(&mut self, terminator: Terminator) {
        self.blocks[self.current.0].terminator = Some(terminator);
    }

    fn push(&mut self, inst: Inst) {
        self.blocks[self.current.0].insts.push(inst);
    }

    fn new_value(&mut self) -> ValueId {
        let v = ValueId(self.value_index);
        self.value_index += 1;
        v
    }

    fn intern_string(&mut self, content: &str) -> StringId {
        if let Some(id) = self.string_ids.get(content) {
            return *id;
        }
        let id = StringId(self.strings.len());
        self.strings.push(StringConstant {
            id,
            content: content.to_string(),
        });
        self.string_ids.insert(content.to_string(), id);
        id
    }

    fn label_block(&self, instr: &Instruction, operand: Option<&Operand>) -> LowerResult<BlockId> {
        match operand {
            Some(Operand::Label(n)) => self
                .labels
                .get(n)
                .copied()
                .ok_or(LoweringError::UnboundLabel(*n)),
            _ => Err(unsupported(instr, "expected a label operand")),
        }
    }

    fn slot_type(&self, name: &str) -> LowerResult<IrType> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| LoweringError::UnboundVariable(name.to_string()))
    }

    fn operand(&mut self, instr: &Instruction, operand: Option<&Operand>) -> LowerResult<Typed> {
        match operand {
            Some(Operand::Immediate(n)) => Ok(Typed::int(Value::Const(*n))),
            Some(Operand::ImmediateString(s)) => {
                let id = self.intern_string(s);
                Ok(Typed::ptr(Value::Str(id)))
            }
            Some(Operand::VariableRef(name)) => {
                let ty = self.slot_type(name)?;
                let dest = self.new_value();
                self.push(Inst::Load {
                    dest,
                    ty,
                    slot: name.clone(),
                });
                Ok(Typed {
                    value: Value::Reg(dest),
                    ty,
                })
            }
            Some(Operand::Temporary(n)) => self
                .temporaries
                .get(n)
                .copied()
                .ok_or(LoweringError::UnboundTemporary(*n)),
            Some(Operand::Label(_)) => Err(unsupported(instr, "label used as a value")),
            None => Err(unsupported(instr, "missing operand")),
        }
    }

    fn define_temporary(&mut self, instr: &Instruction, value: Typed) -> LowerResult<()> {
        match &instr.dest {
            Some(Operand::Temporary(n)) => {
                if self.temporaries.insert(*n, value).is_some() {
                    return Err(unsupported(instr, "temporary defined twice"));
                }
                Ok(())
            }
            _ => Err(unsupported(instr, "result must be a temporary")),
        }
    }

    fn lower_instruction(&mut self, instr: &Instruction) -> LowerResult<()> {
        match instr.opcode {
            Opcode::Label => self.switch_to_label(instr),
            Opcode::Goto => {
                let target = self.label_block(instr, instr.dest.as_ref())?;
                self.terminate(Terminator::Jump(target));
                Ok(())
            }
            Opcode::IfTrue => {
                let cond = self.operand(instr, instr.dest.as_ref())?;
                let then_block = self.label_block(instr, instr.src1.as_ref())?;
                let cond = self.truthy(cond);
                let label = self.fresh_label("else");
                let else_block = self.create_block(label);
                self.terminate(Terminator::Branch {
                    cond,
                    then_block,
                    else_block,
                });
                self.current = else_block;
                Ok(())
            }
            Opcode::Assign => self.lower_assign(instr),
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::And
            | Opcode::Or
            | Opcode::Eq
            | Opcode::Neq
            | Opcode::Lt
            | Opcode::Lte
            | Opcode::Gt
            | Opcode::Gte => {
                let lhs = self.operand(instr, instr.src1.as_ref())?;
                let rhs = self.operand(instr, instr.src2.as_ref())?;
                let result = self.lower_binary(instr, lhs, rhs)?;
                self.define_temporary(instr, result)
            }
            Opcode::Not => {
                let operand = self.operand(instr, instr.src1.as_ref())?;
                if operand.ty != IrType::I32 {
                    return Err(unsupported(instr, "operand is not an integer"));
                }
                let is_zero = self.icmp(Cond::Eq, operand.value, Value::Const(0));
                let result = self.widen(is_zero);
                self.define_temporary(instr, result)
            }
            Opcode::Print => {
                let value = self.operand(instr, instr.dest.as_ref())?;
                let callee = match value.ty {
                    IrType::Ptr => Runtime::PrintStr,
                    IrType::I32 | IrType::I1 => Runtime::PrintInt,
                };
                let arg = match value.ty {
                    IrType::I1 => self.widen(value.value).value,
                    _ => value.value,
                };
                self.call(callee, vec![arg]);
                Ok(())
            }
            Opcode::Read => {
                let slot = match &instr.dest {
                    Some(Operand::VariableRef(name)) => name.clone(),
                    _ => return Err(unsupported(instr, "target must be a variable")),
                };
                if self.slot_type(&slot)? != IrType::Ptr {
                    return Err(unsupported(instr, "target is not a string"));
                }
                let buffer = self.new_value();
                self.push(Inst::Alloca {
                    dest: buffer,
                    size: READ_BUFFER_SIZE,
                });
                self.call(
                    Runtime::ReadStr,
                    vec![Value::Reg(buffer), Value::Const(READ_BUFFER_SIZE as i32)],
                );
                self.push(Inst::Store {
                    ty: IrType::Ptr,
                    value: Value::Reg(buffer),
                    slot,
                });
                Ok(())
            }
            Opcode::Nop => Ok(()),
            Opcode::Exit => {
                self.terminate(Terminator::Return(0));
                Ok(())
            }
        }
    }

    fn lower_assign(&mut self, instr: &Instruction) -> LowerResult<()> {
        let value = self.operand(instr, instr.src1.as_ref())?;
        match &instr.dest {
            Some(Operand::VariableRef(name)) => {
                let ty = self.slot_type(name)?;
                if ty != value.ty {
                    return Err(unsupported(
                        instr,
                        &format!("cannot store {} into {} slot", value.ty, ty),
                    ));
                }
                self.push(Inst::Store {
                    ty,
                    value: value.value,
                    slot: name.clone(),
                });
                Ok(())
            }
            Some(Operand::Temporary(_)) => self.define_temporary(instr, value),
            _ => Err(unsupported(instr, "target must be a variable or temporary")),
        }
    }

    fn lower_binary(&mut self, instr: &Instruction, lhs: Typed, rhs: Typed) -> LowerResult<Typed> {
        use IrType::*;

        let result = match (instr.opcode, lhs.ty, rhs.ty) {
            (Opcode::Add, I32, I32) => self.arith(BinaryOp::Add, lhs.value, rhs.value),
            (Opcode::Add, Ptr, _) | (Opcode::Add, _, Ptr) => {
                let lhs = self.to_string(lhs);
                let rhs = self.to_string(rhs);
                let dest = self.call(Runtime::Concat, vec![lhs, rhs]);
                Typed::ptr(dest)
            }
            (Opcode::Sub, I32, I32) => self.arith(BinaryOp::Sub, lhs.value, rhs.value),
            (Opcode::Mul, I32, I32) => self.arith(BinaryOp::Mul, lhs.value, rhs.value),
            (Opcode::Div, I32, I32) => self.lower_div(lhs.value, rhs.value),
            (Opcode::And, I32, I32) | (Opcode::Or, I32, I32) => {
                let op = if instr.opcode == Opcode::And {
                    BinaryOp::And
                } else {
                    BinaryOp::Or
                };
                let l = self.truthy(lhs);
                let r = self.truthy(rhs);
                let dest = self.new_value();
                self.push(Inst::Binary {
                    dest,
                    op,
                    ty: I1,
                    lhs: l,
                    rhs: r,
                });
                self.widen(Value::Reg(dest))
            }
            (Opcode::Eq | Opcode::Neq, Ptr, Ptr) => {
                let cmp = self.call(Runtime::StrCmp, vec![lhs.value, rhs.value]);
                let cond = if instr.opcode == Opcode::Eq {
                    Cond::Eq
                } else {
                    Cond::Ne
                };
                let bit = self.icmp(cond, cmp, Value::Const(0));
                self.widen(bit)
            }
            (opcode, I32, I32) => {
                let cond = match opcode {
                    Opcode::Eq => Cond::Eq,
                    Opcode::Neq => Cond::Ne,
                    Opcode::Lt => Cond::Slt,
                    Opcode::Lte => Cond::Sle,
                    Opcode::Gt => Cond::Sgt,
                    Opcode::Gte => Cond::Sge,
                    _ => unreachable!(),
                };
                let bit = self.icmp(cond, lhs.value, rhs.value);
                self.widen(bit)
            }
            (_, l, r) => {
                return Err(unsupported(
                    instr,
                    &format!("operands of type {} and {}", l, r),
                ))
            }
        };
        Ok(result)
    }

    /// `sdiv` behind a zero test of the divisor, unless the divisor is a
    /// non-zero constant. `i32::MIN / -1` wraps to `i32::MIN`: the divisor is
    /// rewritten to 1 for that pair.
    fn lower_div(&mut self, lhs: Value, rhs: Value) -> Typed {
        if !matches!(rhs, Value::Const(n) if n != 0) {
            self.guard_zero_divisor(rhs);
        }

        let may_overflow = !matches!(rhs, Value::Const(n) if n != -1)
            && !matches!(lhs, Value::Const(n) if n != i32::MIN);
        if !may_overflow {
            return self.arith(BinaryOp::SDiv, lhs, rhs);
        }

        let lhs_min = self.icmp(Cond::Eq, lhs, Value::Const(i32::MIN));
        let rhs_minus_one = self.icmp(Cond::Eq, rhs, Value::Const(-1));
        let overflow = self.new_value();
        self.push(Inst::Binary {
            dest: overflow,
            op: BinaryOp::And,
            ty: IrType::I1,
            lhs: lhs_min,
            rhs: rhs_minus_one,
        });
        let bump = self.widen(Value::Reg(overflow));
        let bump = self.arith(BinaryOp::Mul, bump.value, Value::Const(2));
        let divisor = self.arith(BinaryOp::Add, rhs, bump.value);
        self.arith(BinaryOp::SDiv, lhs, divisor.value)
    }

    /// Leaves the current block on a zero `divisor` through a trap block and
    /// continues in a fresh block otherwise.
    fn guard_zero_divisor(&mut self, divisor: Value) {
        let is_zero = self.icmp(Cond::Eq, divisor, Value::Const(0));
        let ok_label = self.fresh_label("div.ok");
        let ok_block = self.create_block(ok_label);
        let trap_label = self.fresh_label("div.trap");
        let trap_block = self.create_block(trap_label);
        self.terminate(Terminator::Branch {
            cond: is_zero,
            then_block: trap_block,
            else_block: ok_block,
        });

        self.current = trap_block;
        self.call(Runtime::DivByZero, vec![]);
        self.terminate(Terminator::Return(1));

        self.current = ok_block;
    }

    fn arith(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Typed {
        let dest = self.new_value();
        self.push(Inst::Binary {
            dest,
            op,
            ty: IrType::I32,
            lhs,
            rhs,
        });
        Typed::int(Value::Reg(dest))
    }

    fn icmp(&mut self, cond: Cond, lhs: Value, rhs: Value) -> Value {
        let dest = self.new_value();
        self.push(Inst::Icmp {
            dest,
            cond,
            lhs,
            rhs,
        });
        Value::Reg(dest)
    }

    /// `i1` view of an integer boolean.
    fn truthy(&mut self, value: Typed) -> Value {
        match value.ty {
            IrType::I1 => value.value,
            IrType::I32 | IrType::Ptr => self.icmp(Cond::Ne, value.value, Value::Const(0)),
        }
    }

    fn widen(&mut self, bit: Value) -> Typed {
        let dest = self.new_value();
        self.push(Inst::Zext { dest, value: bit });
        Typed::int(Value::Reg(dest))
    }

    fn to_string(&mut self, value: Typed) -> Value {
        match value.ty {
            IrType::Ptr => value.value,
            IrType::I32 | IrType::I1 => self.call(Runtime::IntToStr, vec![value.value]),
        }
    }

    /// Emits a runtime call; returns its result, or `Null` for void callees.
    fn call(&mut self, callee: Runtime, args: Vec<Value>) -> Value {
        let dest = callee.ret().map(|_| self.new_value());
        self.push(Inst::Call { dest, callee, args });
        dest.map_or(Value::Null, Value::Reg)
    }

    fn finish(self) -> Module {
        let mut index = vec![0; self.blocks.len()];
        for (pos, id) in self.layout.iter().enumerate() {
            index[id.0] = pos;
        }
        let remap = |id: BlockId| BlockId(index[id.0]);

        let mut builders: Vec<Option<BlockBuilder>> = self.blocks.into_iter().map(Some).collect();
        let blocks = self
            .layout
            .iter()
            .filter_map(|id| builders[id.0].take())
            .map(|b| {
                let terminator = match b.terminator {
                    Some(Terminator::Jump(t)) => Terminator::Jump(remap(t)),
                    Some(Terminator::Branch {
                        cond,
                        then_block,
                        else_block,
                    }) => Terminator::Branch {
                        cond,
                        then_block: remap(then_block),
                        else_block: remap(else_block),
                    },
                    Some(Terminator::Return(code)) => Terminator::Return(code),
                    None => Terminator::Return(0),
                };
                Block {
                    label: b.label,
                    insts: b.insts,
                    terminator,
                }
            })
            .collect();

        Module {
            strings: self.strings,
            globals: self.globals,
            blocks,
        }
    }
}

fn unsupported(instr: &Instruction, reason: &str) -> LoweringError {
    LoweringError::UnsupportedOpcode {
        instruction: instr.to_string(),
        reason: reason.to_string(),
    }
}

/// Lowers a TAC listing against the bindings of a checked program.
pub fn lower(instructions: Vec<Instruction>, symbol_table: &SymbolTable) -> LowerResult<Module> {
    Lowering::new(symbol_table).lower(instructions)
}
