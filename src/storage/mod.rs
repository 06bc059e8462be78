pub mod layout;
pub mod session;
pub mod session_writer;
pub mod session_reader;
pub mod registry;
pub mod reaper;
