use super::IrType;

/// External primitives the lowered program calls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Runtime {
    PrintInt,
    PrintStr,
    ReadStr,
    StrCmp,
    Concat,
    IntToStr,
    DivByZero,
}

impl Runtime {
    pub const ALL: [Runtime; 7] = [
        Runtime::PrintInt,
        Runtime::PrintStr,
        Runtime::ReadStr,
        Runtime::StrCmp,
        Runtime::Concat,
        Runtime::IntToStr,
        Runtime::DivByZero,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Runtime::PrintInt => "pog_print_int",
            Runtime::PrintStr => "pog_print_str",
            Runtime::ReadStr => "pog_read_str",
            Runtime::StrCmp => "pog_strcmp",
            Runtime::Concat => "pog_concat",
            Runtime::IntToStr => "pog_int_to_str",
            Runtime::DivByZero => "pog_div_by_zero",
        }
    }

    pub fn params(&self) -> &'static [IrType] {
        match self {
            Runtime::PrintInt => &[IrType::I32],
            Runtime::PrintStr => &[IrType::Ptr],
            Runtime::ReadStr => &[IrType::Ptr, IrType::I32],
            Runtime::StrCmp => &[IrType::Ptr, IrType::Ptr],
            Runtime::Concat => &[IrType::Ptr, IrType::Ptr],
            Runtime::IntToStr => &[IrType::I32],
            Runtime::DivByZero => &[],
        }
    }

    pub fn ret(&self) -> Option<IrType> {
        match self {
            Runtime::StrCmp => Some(IrType::I32),
            Runtime::Concat | Runtime::IntToStr => Some(IrType::Ptr),
            Runtime::PrintInt | Runtime::PrintStr | Runtime::ReadStr | Runtime::DivByZero => None,
        }
    }

    /// `declare` line for the module text.
    pub fn declaration(&self) -> String {
        let ret = self
            .ret()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "void".to_string());
        let params = self
            .params()
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("declare {} @{}({})", ret, self.symbol(), params)
    }
}
