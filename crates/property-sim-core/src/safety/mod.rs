//! Pre-computation rejection of hostile parameter regions and the runtime
//! budget that supervises the computation itself.

pub mod gate;
pub mod guard;

pub use gate::check_input;
pub use guard::{GuardContext, ResourceGuard};
