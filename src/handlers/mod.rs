pub mod history;
pub mod transcribe;

pub use history::*;
pub use transcribe::*;
