pub mod error;
pub mod pass;
pub mod registry;
pub mod runner;

pub use error::{PassFailure, RegistryError};
pub use pass::{model_handle, ModelHandle, Pass};
pub use registry::{PassRegistry, RegistryBuilder};
pub use runner::{ParallelRunner, SequentialRunner};
