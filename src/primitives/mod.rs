//! Low-level primitives for building the storage layer.

/// I/O abstractions and utilities.
///
/// Positioned block reads and writes against files opened per access.
pub mod io;
