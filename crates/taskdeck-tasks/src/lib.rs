pub mod service;
pub mod validation;

pub use service::TaskService;
pub use validation::{InputValidator, MAX_DESCRIPTION_CHARS, MAX_PRIORITY};
