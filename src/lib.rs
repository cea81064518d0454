pub mod cli;
pub mod deploy;
pub mod driver;
pub mod error;
pub mod evm;
pub mod fork;
pub mod funding;
pub mod model;
pub mod oracle;
pub mod protocols;
pub mod report;
pub mod run;
pub mod schema;
pub mod verify;
