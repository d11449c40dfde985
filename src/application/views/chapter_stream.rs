//! Chapter Stream Session - 流式写作一章
//!
//! 把流水线事件折叠进按阶段的缓冲，并记录最近的状态和已保存的章节。
//! 取消令牌触发或会话被丢弃时连接随之关闭。

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::application::error::ApplicationError;
use crate::application::ports::AgentEventStream;
use crate::domain::generation::{AgentEvent, StageTranscript, StatusUpdate, StreamOutcome};

pub struct ChapterStreamSession {
    chapter_id: String,
    events: AgentEventStream,
    transcript: StageTranscript,
    last_status: Option<StatusUpdate>,
    saved_chapter_id: Option<String>,
    outcome: Option<StreamOutcome>,
}

/// 一次流式写作的结果
#[derive(Debug, Clone, PartialEq)]
pub struct StreamReport {
    pub chapter_id: String,
    pub outcome: StreamOutcome,
    pub transcript: StageTranscript,
    pub saved_chapter_id: Option<String>,
}

impl StreamReport {
    /// 服务端已经写入正文
    pub fn persisted(&self) -> bool {
        self.saved_chapter_id.is_some() || matches!(self.outcome, StreamOutcome::Done { .. })
    }
}

impl ChapterStreamSession {
    pub fn new(chapter_id: impl Into<String>, events: AgentEventStream) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            events,
            transcript: StageTranscript::new(),
            last_status: None,
            saved_chapter_id: None,
            outcome: None,
        }
    }

    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    pub fn transcript(&self) -> &StageTranscript {
        &self.transcript
    }

    pub fn last_status(&self) -> Option<&StatusUpdate> {
        self.last_status.as_ref()
    }

    pub fn saved_chapter_id(&self) -> Option<&str> {
        self.saved_chapter_id.as_deref()
    }

    pub fn outcome(&self) -> Option<&StreamOutcome> {
        self.outcome.as_ref()
    }

    /// 下一个事件，已折叠进会话状态；终止事件之后返回 None
    pub async fn next_event(&mut self) -> Option<Result<AgentEvent, ApplicationError>> {
        if self.outcome.is_some() {
            return None;
        }

        match self.events.next().await {
            Some(Ok(event)) => {
                self.fold(&event);
                Some(Ok(event))
            }
            Some(Err(e)) => Some(Err(e.into())),
            None => {
                self.outcome = Some(StreamOutcome::Ended);
                None
            }
        }
    }

    fn fold(&mut self, event: &AgentEvent) {
        self.transcript.apply(event);
        match event {
            AgentEvent::Status(StatusUpdate::Saved { chapter_id }) => {
                tracing::debug!(chapter_id = %chapter_id, "Chapter saved by pipeline");
                self.saved_chapter_id = Some(chapter_id.clone());
            }
            AgentEvent::Status(update) => self.last_status = Some(update.clone()),
            AgentEvent::Other { event, .. } => {
                tracing::debug!(event = %event, "Unrecognized pipeline event");
            }
            _ => {}
        }
        if let Some(outcome) = StreamOutcome::from_terminal(event) {
            self.outcome = Some(outcome);
        }
    }

    /// 消费到终止事件、流结束或取消
    pub async fn run(
        mut self,
        cancel: &CancellationToken,
        mut on_event: impl FnMut(&AgentEvent, &StageTranscript),
    ) -> Result<StreamReport, ApplicationError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(chapter_id = %self.chapter_id, "Chapter stream stopped by user");
                    self.outcome = Some(StreamOutcome::Cancelled);
                    break;
                }
                next = self.next_event() => next,
            };
            match next {
                Some(Ok(event)) => on_event(&event, &self.transcript),
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        Ok(StreamReport {
            chapter_id: self.chapter_id,
            outcome: self.outcome.unwrap_or(StreamOutcome::Ended),
            transcript: self.transcript,
            saved_chapter_id: self.saved_chapter_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{ApiError, TransportError};
    use futures_util::stream;

    fn session(events: Vec<Result<AgentEvent, ApiError>>) -> ChapterStreamSession {
        ChapterStreamSession::new("c1", Box::pin(stream::iter(events)))
    }

    fn chunk(stage: &str, text: &str) -> Result<AgentEvent, ApiError> {
        Ok(AgentEvent::Chunk {
            stage: stage.to_string(),
            text: text.to_string(),
        })
    }

    #[tokio::test]
    async fn test_run_folds_events_until_done() {
        let events = vec![
            Ok(AgentEvent::Status(StatusUpdate::Progress {
                stage: Some("draft".to_string()),
                attempt: Some(1),
                max_attempts: Some(3),
                retrying: false,
                message: None,
            })),
            chunk("draft", "Hello "),
            chunk("draft", "world"),
            Ok(AgentEvent::StageOutput {
                stage: "review".to_string(),
                text: "Looks fine".to_string(),
            }),
            Ok(AgentEvent::Status(StatusUpdate::Saved {
                chapter_id: "c1".to_string(),
            })),
            Ok(AgentEvent::Done { score: Some(8.5) }),
            chunk("draft", " ignored"),
        ];
        let mut seen = 0;

        let report = session(events)
            .run(&CancellationToken::new(), |_, _| seen += 1)
            .await
            .unwrap();

        assert_eq!(seen, 6);
        assert_eq!(report.outcome, StreamOutcome::Done { score: Some(8.5) });
        assert_eq!(report.transcript.text("draft"), Some("Hello world"));
        assert_eq!(report.transcript.text("review"), Some("Looks fine"));
        assert_eq!(report.saved_chapter_id.as_deref(), Some("c1"));
        assert!(report.persisted());
    }

    #[tokio::test]
    async fn test_stream_without_terminal_event_ends() {
        let report = session(vec![chunk("draft", "partial")])
            .run(&CancellationToken::new(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.outcome, StreamOutcome::Ended);
        assert!(!report.persisted());
    }

    #[tokio::test]
    async fn test_transport_error_is_returned() {
        let err = session(vec![
            chunk("draft", "par"),
            Err(ApiError::Transport(TransportError::Network("reset".to_string()))),
        ])
        .run(&CancellationToken::new(), |_, _| {})
        .await
        .unwrap_err();

        assert!(matches!(err, ApplicationError::Network(_)));
    }

    #[tokio::test]
    async fn test_cancel_stops_consuming() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = session(vec![chunk("draft", "never")])
            .run(&cancel, |_, _| {})
            .await
            .unwrap();

        assert_eq!(report.outcome, StreamOutcome::Cancelled);
        assert!(report.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_error_event_is_failed_outcome() {
        let mut session = session(vec![Ok(AgentEvent::Error {
            message: "model refused".to_string(),
        })]);

        assert!(session.next_event().await.is_some());
        assert!(session.next_event().await.is_none());
        assert_eq!(
            session.outcome(),
            Some(&StreamOutcome::Failed {
                message: "model refused".to_string()
            })
        );
    }
}
