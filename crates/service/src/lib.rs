pub mod error;
pub mod forms;
pub mod media;
pub mod parser;
pub mod password;
pub mod store;

pub use error::ServiceError;
pub use store::Store;
