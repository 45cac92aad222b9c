pub mod attachment;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defs;
pub mod drag;
pub mod error;
pub mod event;
pub mod extend;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod surface;
pub mod text_metrics;
pub mod theme;
pub mod timer;
pub mod topic;
pub mod tree;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{MindError, MindResult};
pub use event::{DomEvent, DomEventKind, EventCtx, HookResult, MindEvent, MindEventKind, Stamp};
pub use extend::{Component, Extensions};
pub use ir::{Direction, ImageData, TopicData, parse_mindmap};
pub use render::{RenderOptions, render_svg, render_with_options};
pub use surface::{Container, FixedContainer, MindMap};
pub use theme::Theme;
pub use tree::TopicId;
