mod interrupt;
mod skip;

pub mod prelude {
    pub use crate::interrupt::{InterruptHandle, InterruptListener};
    pub use crate::skip::SkipElementError;
}
