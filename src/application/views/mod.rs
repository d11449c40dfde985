//! Views - 作品库与作品工作区
//!
//! 各视图共享 `NovelWorkspace` 中的同一份聚合，修改遵循乐观更新：
//! 本地先改，后端失败时不回滚。

mod chapter_stream;
mod editor;
mod entity_view;
mod generation;
mod library;
mod outline;
mod workspace;

pub use chapter_stream::{ChapterStreamSession, StreamReport};
pub use editor::EditorView;
pub use entity_view::EntityView;
pub use library::Library;
pub use outline::OutlineView;
pub use workspace::NovelWorkspace;
