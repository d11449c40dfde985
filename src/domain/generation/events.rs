//! 多阶段写作流水线的事件词汇表
//!
//! 事件名由服务端定义，客户端不能协商。

/// 流水线事件
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// 阶段/尝试/重试进度，或「已保存」
    Status(StatusUpdate),
    /// 某阶段的增量文本，追加到该阶段缓冲
    Chunk { stage: String, text: String },
    /// 某阶段的完整文本，替换该阶段缓冲
    StageOutput { stage: String, text: String },
    /// 成功结束
    Done { score: Option<f64> },
    /// 失败结束
    Error { message: String },
    /// 用户主动停止
    Cancelled,
    /// 未识别的事件，原样保留
    Other { event: String, data: String },
}

impl AgentEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentEvent::Done { .. } | AgentEvent::Error { .. } | AgentEvent::Cancelled
        )
    }
}

/// `status` 事件
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Progress {
        stage: Option<String>,
        attempt: Option<u32>,
        max_attempts: Option<u32>,
        retrying: bool,
        message: Option<String>,
    },
    /// 章节已持久化
    Saved { chapter_id: String },
}

/// 一次流式写作的结局
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Done { score: Option<f64> },
    Failed { message: String },
    Cancelled,
    /// 流结束但服务端没有发送终止事件
    Ended,
}

impl StreamOutcome {
    pub fn from_terminal(event: &AgentEvent) -> Option<Self> {
        match event {
            AgentEvent::Done { score } => Some(StreamOutcome::Done { score: *score }),
            AgentEvent::Error { message } => Some(StreamOutcome::Failed {
                message: message.clone(),
            }),
            AgentEvent::Cancelled => Some(StreamOutcome::Cancelled),
            _ => None,
        }
    }
}
