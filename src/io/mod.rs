// Getting data out of the database in portable formats.

pub mod export;

pub use export::*;
