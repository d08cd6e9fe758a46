use std::fmt;

use serde::{Deserialize, Serialize};

// DType - element types of raw and preprocessed records
//
//   U8  - raw pixel bytes
//   I64 - fine and coarse class labels
//   F32 - preprocessed (standardized) pixels

/// Enum of the element data types that appear in record schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    U8,
    I64,
    F32,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::U8 => 1,
            DType::I64 => 8,
            DType::F32 => 4,
        }
    }

    /// Whether this dtype is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::U8 => "u8",
            DType::I64 => "i64",
            DType::F32 => "f32",
        };
        write!(f, "{}", s)
    }
}

/// Connects a Rust element type to its [`DType`].
pub trait WithDType: Copy + Send + Sync + 'static {
    /// The corresponding DType enum variant.
    const DTYPE: DType;

    /// Lossy conversion to `f32`, used when casting raw pixels.
    fn to_f32(self) -> f32;
}

impl WithDType for u8 {
    const DTYPE: DType = DType::U8;
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl WithDType for i64 {
    const DTYPE: DType = DType::I64;
    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl WithDType for f32 {
    const DTYPE: DType = DType::F32;
    fn to_f32(self) -> f32 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_size() {
        assert_eq!(DType::U8.size_in_bytes(), 1);
        assert_eq!(DType::I64.size_in_bytes(), 8);
        assert_eq!(DType::F32.size_in_bytes(), 4);
    }

    #[test]
    fn test_with_dtype_mapping() {
        assert_eq!(u8::DTYPE, DType::U8);
        assert_eq!(i64::DTYPE, DType::I64);
        assert_eq!(f32::DTYPE, DType::F32);
        assert!(f32::DTYPE.is_float());
        assert!(!u8::DTYPE.is_float());
    }

    #[test]
    fn test_display() {
        assert_eq!(DType::U8.to_string(), "u8");
        assert_eq!(DType::I64.to_string(), "i64");
    }
}
