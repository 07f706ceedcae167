//! Identifier generation seam.

use crate::types::id::MenuId;

/// Produces fresh identifiers for new menu records.
///
/// Implementations must return a globally unique value on every call.
pub trait IdGenerator: Send + Sync + std::fmt::Debug + 'static {
    /// Generate a new identifier.
    fn generate(&self) -> MenuId;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> MenuId {
        MenuId::new()
    }
}
