//! 记忆层：提示词用的滚动对话窗口、面试记录持久化

pub mod conversation;
pub mod persistence;

pub use conversation::{ConversationMemory, Message, Role};
pub use persistence::TranscriptStore;
