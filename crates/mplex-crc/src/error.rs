/// Errors that can occur when configuring a CRC engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CrcError {
    /// The requested width has no table-driven implementation.
    #[error("unsupported CRC width {width} (supported {min}..={max})")]
    UnsupportedWidth { width: u32, min: u32, max: u32 },

    /// The generator polynomial is zero or wider than `width + 1` bits.
    #[error("invalid CRC-{width} polynomial {poly:#x}")]
    InvalidPolynomial { width: u32, poly: u64 },
}

pub type Result<T> = std::result::Result<T, CrcError>;
