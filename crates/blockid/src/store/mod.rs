#[cfg(feature = "futures")]
mod asynchronous;
mod interface;
mod memory;

#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
#[cfg(feature = "futures")]
pub use asynchronous::*;
pub use interface::*;
pub use memory::*;
