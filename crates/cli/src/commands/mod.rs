pub mod compose;
pub mod config;
pub mod publish;
pub mod sections;
pub mod util;

pub use compose::*;
pub use config::*;
pub use publish::*;
pub use sections::*;
pub use util::*;
