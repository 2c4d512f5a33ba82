use std::fmt;

use super::Runtime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IrType {
    I1,
    I32,
    Ptr,
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IrType::I1 => "i1",
            IrType::I32 => "i32",
            IrType::Ptr => "ptr",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    Const(i32),
    Reg(ValueId),
    /// Address of a pooled string constant.
    Str(StringId),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(n) => write!(f, "{}", n),
            Value::Reg(ValueId(n)) => write!(f, "%{}", n),
            Value::Str(StringId(n)) => write!(f, "@.str.{}", n),
            Value::Null => f.write_str("null"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        f.write_str(s)
    }
}

/// Signed integer comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Slt => "slt",
            Cond::Sle => "sle",
            Cond::Sgt => "sgt",
            Cond::Sge => "sge",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inst {
    Load {
        dest: ValueId,
        ty: IrType,
        slot: String,
    },
    Store {
        ty: IrType,
        value: Value,
        slot: String,
    },
    Binary {
        dest: ValueId,
        op: BinaryOp,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    Icmp {
        dest: ValueId,
        cond: Cond,
        lhs: Value,
        rhs: Value,
    },
    /// Widens an `i1` to `i32`.
    Zext { dest: ValueId, value: Value },
    /// Byte buffer of `size` bytes.
    Alloca { dest: ValueId, size: usize },
    Call {
        dest: Option<ValueId>,
        callee: Runtime,
        args: Vec<Value>,
    },
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Load { dest, ty, slot } => {
                write!(f, "{} = load {}, ptr @var.{}", Value::Reg(*dest), ty, slot)
            }
            Inst::Store { ty, value, slot } => {
                write!(f, "store {} {}, ptr @var.{}", ty, value, slot)
            }
            Inst::Binary {
                dest,
                op,
                ty,
                lhs,
                rhs,
            } => write!(f, "{} = {} {} {}, {}", Value::Reg(*dest), op, ty, lhs, rhs),
            Inst::Icmp {
                dest,
                cond,
                lhs,
                rhs,
            } => write!(
                f,
                "{} = icmp {} i32 {}, {}",
                Value::Reg(*dest),
                cond,
                lhs,
                rhs
            ),
            Inst::Zext { dest, value } => {
                write!(f, "{} = zext i1 {} to i32", Value::Reg(*dest), value)
            }
            Inst::Alloca { dest, size } => {
                write!(f, "{} = alloca [{} x i8]", Value::Reg(*dest), size)
            }
            Inst::Call { dest, callee, args } => {
                if let Some(dest) = dest {
                    write!(f, "{} = ", Value::Reg(*dest))?;
                }
                let ret = callee
                    .ret()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "void".to_string());
                let args = callee
                    .params()
                    .iter()
                    .zip(args)
                    .map(|(ty, arg)| format!("{} {}", ty, arg))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "call {} @{}({})", ret, callee.symbol(), args)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminator {
    Jump(BlockId),
    /// `cond` is an `i1`.
    Branch {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    /// Leaves the program with an exit code.
    Return(i32),
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Jump(target) => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Terminator::Return(_) => vec![],
        }
    }
}

/// Straight-line code with one entry label and exactly one terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub label: String,
    pub insts: Vec<Inst>,
    pub terminator: Terminator,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalSlot {
    pub name: String,
    pub ty: IrType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringConstant {
    pub id: StringId,
    pub content: String,
}

/// Lowered program: pooled strings, one slot per variable, and the blocks
/// of `main`, entry block first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    pub strings: Vec<StringConstant>,
    pub globals: Vec<GlobalSlot>,
    pub blocks: Vec<Block>,
}

impl Module {
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn find_block(&self, label: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|b| b.label == label)
            .map(BlockId)
    }

    pub fn insts(&self) -> impl Iterator<Item = &Inst> {
        self.blocks.iter().flat_map(|b| b.insts.iter())
    }

    fn fmt_terminator(&self, f: &mut fmt::Formatter<'_>, terminator: &Terminator) -> fmt::Result {
        match terminator {
            Terminator::Jump(target) => write!(f, "  br label %{}", self.block(*target).label),
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => write!(
                f,
                "  br i1 {}, label %{}, label %{}",
                cond,
                self.block(*then_block).label,
                self.block(*else_block).label
            ),
            Terminator::Return(code) => write!(f, "  ret i32 {}", code),
        }
    }
}

fn escape_bytes(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        if (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\{:02X}", b));
        }
    }
    out
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = 'pog'")?;

        if !self.strings.is_empty() {
            writeln!(f)?;
        }
        for s in self.strings.iter() {
            writeln!(
                f,
                "{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
                Value::Str(s.id),
                s.content.len() + 1,
                escape_bytes(&s.content)
            )?;
        }

        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        for g in self.globals.iter() {
            let init = match g.ty {
                IrType::Ptr => "null",
                IrType::I1 | IrType::I32 => "0",
            };
            writeln!(f, "@var.{} = global {} {}", g.name, g.ty, init)?;
        }

        writeln!(f)?;
        for r in Runtime::ALL.iter() {
            writeln!(f, "{}", r.declaration())?;
        }

        writeln!(f)?;
        writeln!(f, "define i32 @main() {{")?;
        for block in self.blocks.iter() {
            writeln!(f, "{}:", block.label)?;
            for inst in block.insts.iter() {
                writeln!(f, "  {}", inst)?;
            }
            self.fmt_terminator(f, &block.terminator)?;
            writeln!(f)?;
        }
        writeln!(f, "}}")
    }
}
