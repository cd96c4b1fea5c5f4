//! The standard set of pipeline stages.
pub mod backend;
pub mod dispatch;
pub mod history;
pub mod limit;
pub mod system;

pub use backend::BackendStage;
pub use dispatch::DispatchStage;
pub use history::HistoryStage;
pub use limit::LimitStage;
pub use system::SystemStage;
