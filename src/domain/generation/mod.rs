//! Generation Context - 流式写作
//!
//! 与传输无关的流水线事件和按阶段累积的输出。

mod events;
mod transcript;

pub use events::{AgentEvent, StatusUpdate, StreamOutcome};
pub use transcript::{StageBuffer, StageTranscript};
