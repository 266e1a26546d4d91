use num_traits::ToPrimitive;

/// Numeric kinds a stored or serialized scalar can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl DataType {
    pub const ALL: [DataType; 8] = [
        DataType::Int8,
        DataType::Uint8,
        DataType::Int16,
        DataType::Uint16,
        DataType::Int32,
        DataType::Uint32,
        DataType::Float32,
        DataType::Float64,
    ];

    pub fn byte_length(&self) -> usize {
        match self {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    pub fn is_integral(&self) -> bool {
        !matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Converts `value` to the closest value representable by this type.
    ///
    /// Integral types truncate toward zero. Returns `None` when the value is
    /// out of range (or not finite) for an integral type.
    pub fn narrow<T: ToPrimitive>(&self, value: T) -> Option<f64> {
        match self {
            DataType::Int8 => value.to_i8().map(f64::from),
            DataType::Uint8 => value.to_u8().map(f64::from),
            DataType::Int16 => value.to_i16().map(f64::from),
            DataType::Uint16 => value.to_u16().map(f64::from),
            DataType::Int32 => value.to_i32().map(f64::from),
            DataType::Uint32 => value.to_u32().map(f64::from),
            DataType::Float32 => value.to_f32().map(f64::from),
            DataType::Float64 => value.to_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_lengths() {
        let lengths: Vec<usize> = DataType::ALL.iter().map(|t| t.byte_length()).collect();
        assert_eq!(lengths, vec![1, 1, 2, 2, 4, 4, 4, 8]);
    }

    #[test]
    fn test_narrow_truncates_and_rejects() {
        assert_eq!(DataType::Uint8.narrow(200.7f64), Some(200.0));
        assert_eq!(DataType::Uint8.narrow(256), None);
        assert_eq!(DataType::Int8.narrow(-3.9f32), Some(-3.0));
        assert_eq!(DataType::Uint32.narrow(-1), None);
        assert_eq!(DataType::Float32.narrow(0.5f64), Some(0.5));
    }
}
