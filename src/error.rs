use std::fmt::Display;

/// Container level errors.
/// Every operation that can return one leaves the container unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContigError {
    /// Index is outside of the live range.
    OutOfBounds { index: usize, len: usize },
    /// Requested capacity can't be represented or exceeds what the
    /// allocator is willing to hand out.
    CapacityOverflow { requested: usize },
    /// Allocator failed to provide a block.
    AllocFailed { bytes: usize },
}

impl ContigError {
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::OutOfBounds { index, len }
    }

    pub fn capacity_overflow(requested: usize) -> Self {
        Self::CapacityOverflow { requested }
    }

    pub fn alloc_failed(bytes: usize) -> Self {
        Self::AllocFailed { bytes }
    }

    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}

impl Display for ContigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfBounds { index, len } => {
                write!(f, "Index {} is out of bounds for length {}.", index, len)
            }
            Self::CapacityOverflow { requested } => write!(
                f,
                "Requested capacity of {} elements exceeds the addressable range.",
                requested
            ),
            Self::AllocFailed { bytes } => {
                write!(f, "Allocator failed to provide a block of {} bytes.", bytes)
            }
        }
    }
}

impl std::error::Error for ContigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ContigError::out_of_bounds(3, 2).is_out_of_bounds());
        assert!(!ContigError::alloc_failed(64).is_out_of_bounds());
        assert!(!ContigError::capacity_overflow(usize::MAX).is_out_of_bounds());
    }

    #[test]
    fn display() {
        assert_eq!(
            ContigError::out_of_bounds(4, 4).to_string(),
            "Index 4 is out of bounds for length 4."
        );
        assert_eq!(
            ContigError::alloc_failed(128).to_string(),
            "Allocator failed to provide a block of 128 bytes."
        );
    }
}
