use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    Label,
    Goto,
    IfTrue,
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Not,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Print,
    Read,
    Nop,
    Exit,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Opcode::Label => "LABEL",
            Opcode::Goto => "GOTO",
            Opcode::IfTrue => "IF_TRUE",
            Opcode::Assign => "ASSIGN",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Eq => "EQ",
            Opcode::Neq => "NEQ",
            Opcode::Lt => "LT",
            Opcode::Lte => "LTE",
            Opcode::Gt => "GT",
            Opcode::Gte => "GTE",
            Opcode::Print => "PRINT",
            Opcode::Read => "READ",
            Opcode::Nop => "NOP",
            Opcode::Exit => "EXIT",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Immediate(i32),
    /// String literal contents, without the quotes.
    ImmediateString(String),
    VariableRef(String),
    Temporary(usize),
    Label(usize),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(n) => write!(f, "{}", n),
            Operand::ImmediateString(s) => write!(f, "\"{}\"", s),
            Operand::VariableRef(name) => write!(f, "{}", name),
            Operand::Temporary(n) => write!(f, "@{}", n),
            Operand::Label(n) => write!(f, "${}", n),
        }
    }
}

/// One three-address instruction. Which operand slots are filled depends on
/// the opcode:
///
/// | opcode          | dest      | src1      | src2    |
/// |-----------------|-----------|-----------|---------|
/// | `LABEL`/`GOTO`  | label     |           |         |
/// | `IF_TRUE`       | condition | label     |         |
/// | `ASSIGN`        | target    | value     |         |
/// | binary ops      | temporary | lhs       | rhs     |
/// | `NOT`           | temporary | operand   |         |
/// | `PRINT`/`READ`  | operand   |           |         |
/// | `NOP`/`EXIT`    |           |           |         |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest: Option<Operand>,
    pub src1: Option<Operand>,
    pub src2: Option<Operand>,
}

impl Instruction {
    pub fn new(
        opcode: Opcode,
        dest: Option<Operand>,
        src1: Option<Operand>,
        src2: Option<Operand>,
    ) -> Self {
        Self {
            opcode,
            dest,
            src1,
            src2,
        }
    }

    pub fn op0(opcode: Opcode) -> Self {
        Self::new(opcode, None, None, None)
    }

    pub fn op1(opcode: Opcode, dest: Operand) -> Self {
        Self::new(opcode, Some(dest), None, None)
    }

    pub fn op2(opcode: Opcode, dest: Operand, src1: Operand) -> Self {
        Self::new(opcode, Some(dest), Some(src1), None)
    }

    pub fn op3(opcode: Opcode, dest: Operand, src1: Operand, src2: Operand) -> Self {
        Self::new(opcode, Some(dest), Some(src1), Some(src2))
    }

    /// Label this instruction jumps to, if it is a branch.
    pub fn branch_target(&self) -> Option<usize> {
        let target = match self.opcode {
            Opcode::Goto => self.dest.as_ref(),
            Opcode::IfTrue => self.src1.as_ref(),
            _ => None,
        };
        match target {
            Some(Operand::Label(n)) => Some(*n),
            _ => None,
        }
    }

    /// Temporary defined by this instruction.
    pub fn defined_temporary(&self) -> Option<usize> {
        match (self.opcode, &self.dest) {
            (Opcode::IfTrue | Opcode::Print, _) => None,
            (_, Some(Operand::Temporary(n))) => Some(*n),
            _ => None,
        }
    }

    /// Temporaries read by this instruction.
    pub fn used_temporaries(&self) -> Vec<usize> {
        let mut used = vec![];
        if matches!(self.opcode, Opcode::IfTrue | Opcode::Print) {
            if let Some(Operand::Temporary(n)) = &self.dest {
                used.push(*n);
            }
        }
        for src in [&self.src1, &self.src2].into_iter().flatten() {
            if let Operand::Temporary(n) = src {
                used.push(*n);
            }
        }
        used
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for operand in [&self.dest, &self.src1, &self.src2].into_iter().flatten() {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}

/// Renders a TAC listing, one instruction per line.
pub fn to_text(instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .map(|i| format!("{}\n", i))
        .collect()
}
