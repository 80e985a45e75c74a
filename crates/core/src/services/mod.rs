//! The packaging pipeline, one module per component:
//! locator -> validator -> composer -> publisher.

pub mod backends;
pub mod composer;
pub mod locator;
pub mod pipeline;
pub mod publisher;
pub mod validator;
