pub mod anthropic;
pub mod config;
pub mod content;
pub mod error;
pub mod frontmatter;
pub mod i18n;
pub mod locale_path;
pub mod pipeline;
pub mod retry;
pub mod translation;
