pub mod daily;
pub mod help;
pub mod info;
pub mod owner;

pub use daily::*;
pub use help::*;
pub use info::*;
pub use owner::*;
