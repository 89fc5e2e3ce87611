//! Composition root and terminal interface for the OptiSecure assistant

mod assistant;
mod config;
mod ui;


pub use assistant::{Answer, Assistant};
pub use config::{AppConfig, EmbedderKind};
pub use ui::{
    display_banner, format_sources, format_statistics, handle_input_with_history, parse_helpful,
    print_answer, print_help, print_statistics, prompt_feedback, read_piped_line,
};

// Re-export core types
pub use optisecure_core::{Error, Result};
