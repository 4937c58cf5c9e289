pub mod echo;
pub mod mock;
pub mod registry;
pub mod storage;
pub mod weather;

pub use echo::EchoTool;
pub use mock::MockTool;
pub use registry::{Tool, ToolAccess, ToolManager};
pub use storage::StorageTool;
pub use weather::WeatherTool;
