//! 记忆层：对话历史钩子

pub mod history;

pub use history::{FileHistory, HistoryHook, NoopHistory};
