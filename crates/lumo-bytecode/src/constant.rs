//! Constant pool for bytecode programs

use std::fmt;

use serde::{Deserialize, Serialize};

/// A literal value in the constant pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    /// Boolean literal
    Boolean(bool),
    /// Numeric literal (Lua numbers are doubles here)
    Number(f64),
    /// String literal or variable/field name
    String(String),
}

impl Constant {
    /// Create a number constant
    #[inline]
    pub fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// Create a string constant
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Create a boolean constant
    #[inline]
    pub fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// Pool identity. Numbers compare by bit pattern, so NaN matches itself
    /// and `0.0` / `-0.0` stay distinct.
    pub fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    /// Check if the constant has a JSON representation (JSON has no
    /// infinities or NaN)
    #[inline]
    pub fn is_encodable(&self) -> bool {
        match self {
            Self::Number(n) => n.is_finite(),
            _ => true,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Constant pool with deduplication
///
/// Indices are handed out in first-insertion order and never change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstantPool {
    constants: Vec<Constant>,
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        Self {
            constants: Vec::new(),
        }
    }

    /// Add a constant to the pool, returns its index
    ///
    /// Returns the existing index when an equal constant is already present.
    pub fn add(&mut self, constant: Constant) -> u32 {
        if let Some(idx) = self.find(&constant) {
            return idx;
        }

        let idx = self.constants.len() as u32;
        self.constants.push(constant);
        idx
    }

    /// Index of an equal constant, if present
    pub fn find(&self, constant: &Constant) -> Option<u32> {
        self.constants
            .iter()
            .position(|existing| existing.same_value(constant))
            .map(|idx| idx as u32)
    }

    /// Add a number constant
    #[inline]
    pub fn add_number(&mut self, n: f64) -> u32 {
        self.add(Constant::number(n))
    }

    /// Add a string constant
    #[inline]
    pub fn add_string(&mut self, s: &str) -> u32 {
        self.add(Constant::string(s))
    }

    /// Add a boolean constant
    #[inline]
    pub fn add_boolean(&mut self, b: bool) -> u32 {
        self.add(Constant::boolean(b))
    }

    /// Get a constant by index
    #[inline]
    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    /// Number of constants in the pool
    #[inline]
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Check if the pool is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate over constants
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.constants.iter()
    }
}

impl From<Vec<Constant>> for ConstantPool {
    fn from(constants: Vec<Constant>) -> Self {
        Self { constants }
    }
}
