pub mod blocker;
pub mod config;
pub mod decision;
pub mod error;
pub mod gate;
pub mod hooks;
pub mod io;
pub mod paths;
pub mod record;
pub mod store;
pub mod track;
pub mod types;

pub use error::{PdlcError, Result};
