pub mod cond;
pub mod mode;
pub mod op;
pub mod reg;

pub use cond::{Distance, Flag, Modifier, StatusFlag};
pub use mode::Mode;
pub use op::Opcode;
pub use reg::Register;
