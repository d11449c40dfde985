//! 按阶段累积的流水线输出
//!
//! 每个阶段单独成为一个消息气泡：`chunk` 追加，`stage_output` 替换。

use super::AgentEvent;

/// 单个阶段的累积文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageBuffer {
    pub stage: String,
    pub text: String,
}

/// 以阶段名为键、保留首次出现顺序的缓冲集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTranscript {
    stages: Vec<StageBuffer>,
}

impl StageTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, stage: &str) -> &mut StageBuffer {
        let index = match self.stages.iter().position(|b| b.stage == stage) {
            Some(index) => index,
            None => {
                self.stages.push(StageBuffer {
                    stage: stage.to_string(),
                    text: String::new(),
                });
                self.stages.len() - 1
            }
        };
        &mut self.stages[index]
    }

    pub fn append(&mut self, stage: &str, text: &str) {
        self.slot(stage).text.push_str(text);
    }

    pub fn replace(&mut self, stage: &str, text: &str) {
        let slot = self.slot(stage);
        slot.text.clear();
        slot.text.push_str(text);
    }

    /// 折叠一个事件；只有 `chunk` 和 `stage_output` 会改动缓冲
    pub fn apply(&mut self, event: &AgentEvent) {
        match event {
            AgentEvent::Chunk { stage, text } => self.append(stage, text),
            AgentEvent::StageOutput { stage, text } => self.replace(stage, text),
            _ => {}
        }
    }

    pub fn text(&self, stage: &str) -> Option<&str> {
        self.stages
            .iter()
            .find(|b| b.stage == stage)
            .map(|b| b.text.as_str())
    }

    pub fn stages(&self) -> &[StageBuffer] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
