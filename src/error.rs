// ============================================================================
// ERRORS: failures raised by buffer access and filter validation
// ============================================================================

/// Error type for buffer access and filter invocation.
///
/// Every failure is local and synchronous: a filter either returns a complete
/// buffer or fails before writing any output.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Coordinate access outside the buffer extent.
    OutOfBounds { x: i64, y: i64, width: u32, height: u32 },
    /// Zero width/height, or pixel data whose length does not match.
    InvalidDimensions { width: u32, height: u32 },
    /// A filter parameter outside its documented range.
    InvalidParameter { name: &'static str, reason: String },
}

impl FilterError {
    pub(crate) fn param(name: &'static str, reason: impl Into<String>) -> Self {
        FilterError::InvalidParameter { name, reason: reason.into() }
    }
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::OutOfBounds { x, y, width, height } => write!(
                f,
                "pixel ({}, {}) is outside the {}x{} buffer",
                x, y, width, height
            ),
            FilterError::InvalidDimensions { width, height } => {
                write!(f, "invalid buffer dimensions {}x{}", width, height)
            }
            FilterError::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for FilterError {}

pub type FilterResult<T> = Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_value() {
        let e = FilterError::OutOfBounds { x: -1, y: 3, width: 4, height: 4 };
        assert_eq!(e.to_string(), "pixel (-1, 3) is outside the 4x4 buffer");

        let e = FilterError::param("dot_radius", "must be positive, got 0");
        assert_eq!(e.to_string(), "invalid parameter 'dot_radius': must be positive, got 0");
    }
}
