//! Agent 层：统一的 Agent trait 与各领域实现（memory / finance / weather / general）

pub mod finance;
pub mod general;
pub mod memory;
pub mod traits;
pub mod weather;

pub use finance::FinanceAgent;
pub use general::GeneralAgent;
pub use memory::MemoryAgent;
pub use traits::{Agent, AgentKind, Payload};
pub use weather::WeatherAgent;
