pub mod console;
pub mod operation;
pub mod refresh;
pub mod validation;

pub use console::{Console, ConsoleState};
pub use operation::{Completion, Operation};
pub use refresh::{effects_after, reloads_after, Effect};
