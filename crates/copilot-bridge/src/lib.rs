pub mod aggregator;
pub mod assembler;
pub mod backend;
pub mod bridge;
pub mod errors;
pub mod models;
pub mod operation;
pub mod sse;
pub mod translator;

pub use bridge::CopilotBridge;
pub use errors::{BridgeError, BridgeResult};
pub use operation::{classify, Operation, Route};
