pub mod approval;
pub mod artifact;
pub mod blockers;
pub mod config;
pub mod decide;
pub mod dep;
pub mod feature;
pub mod gate;
pub mod hooks;
pub mod init;
pub mod risk;
pub mod signal;
pub mod track;
