mod lock;
mod reservation;
mod scopes;
mod stats;
#[cfg(test)]
mod tests;

pub use lock::*;
pub(crate) use reservation::*;
pub(crate) use scopes::*;
pub use stats::*;
