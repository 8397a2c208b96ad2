pub mod lesson;
pub mod time;

pub use lesson::*;
pub use time::*;
