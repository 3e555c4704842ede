//! Template injectors. Buffer injection runs first, name injection last.

mod buffer;
mod name;

pub use buffer::{BufferInjector, InjectValue};
pub use name::{KernelNameInjector, KernelNames};
