pub mod database;
pub mod faulty;
pub mod fixtures;
pub mod server;

pub use database::SharedDatabase;
pub use faulty::{Fault, FaultyStorage, FaultyWork};
pub use fixtures::OperationPayload;
pub use server::TestServer;
