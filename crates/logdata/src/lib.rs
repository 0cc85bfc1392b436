pub mod error;
pub mod instance;
pub mod iter;
pub mod vocab;

pub use error::DataError;
pub use instance::{read_jsonl, write_instance, Instance, Label};
pub use iter::{batch_count, data_iter};
pub use vocab::Vocab;
