// Mappers module
// Turn inbound payloads into what each upstream expects

pub mod completion;
pub mod speech;

pub use speech::{adapt, AdapterMode};
