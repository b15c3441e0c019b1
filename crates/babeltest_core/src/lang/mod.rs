//! BabelTest vocabulary registries.
//!
//! Every string that crosses the wire with a fixed meaning (error kinds, expectation kinds,
//! lifecycle modes and events, type hints) is declared once here. Callers work with stable IDs
//! and look spellings up through the registry tables instead of matching strings ad hoc.
//!
//! ## Examples
//! ```rust
//! use babeltest_core::lang::hints::{self, TypeHint};
//!
//! assert_eq!(hints::from_str("uuid"), Some(TypeHint::Uuid));
//! assert_eq!(hints::from_str("guid"), Some(TypeHint::Uuid));
//! assert_eq!(hints::as_str(TypeHint::Uuid), "uuid");
//! ```

pub mod conventions;
pub mod errors;
pub mod expectations;
pub mod hints;
pub mod lifecycle;
pub mod registry;
