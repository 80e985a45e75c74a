pub mod builtin;
pub mod external;

pub use builtin::BuiltinMerger;
pub use external::ExternalMerger;
