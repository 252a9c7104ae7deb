pub mod completion;
pub mod gmail;
pub mod logging;
pub mod smtp;
pub mod token;
