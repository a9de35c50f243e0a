//! Concrete `MessageSource` implementations selected by
//! `--context-generation-method`.

mod random;
mod replay;

pub use random::RandomMessageSource;
pub use replay::ReplayMessageSource;
