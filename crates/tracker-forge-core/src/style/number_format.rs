//! Number format types

/// Number format for cell display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,

    /// Built-in format by ID
    BuiltIn(u32),

    /// Custom format string
    Custom(String),
}

impl NumberFormat {
    /// 9 - 0%
    pub const ID_PERCENT_INT: u32 = 9;
    /// 14 - mm-dd-yy
    pub const ID_DATE_SHORT: u32 = 14;

    /// The format code as Excel would show it, if known
    pub fn format_code(&self) -> Option<&str> {
        match self {
            NumberFormat::General => Some("General"),
            NumberFormat::BuiltIn(Self::ID_PERCENT_INT) => Some("0%"),
            NumberFormat::BuiltIn(Self::ID_DATE_SHORT) => Some("mm-dd-yy"),
            NumberFormat::BuiltIn(_) => None,
            NumberFormat::Custom(code) => Some(code),
        }
    }
}
