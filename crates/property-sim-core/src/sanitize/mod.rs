//! Input sanitisation: turns an untrusted JSON mapping into a closed,
//! range-checked [`PropertyInput`].

pub mod fields;
pub mod numeric;
pub mod text;

pub use fields::{sanitize_input, LoanType, PropertyInput, SanitizedInput};
pub use text::{sanitize_text, Charset};
