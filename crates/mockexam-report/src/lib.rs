//! mockexam-report: Render a graded session as HTML or Markdown.

pub mod html;
pub mod markdown;

#[cfg(test)]
mod fixtures;

pub use html::{generate_html, write_html_report};
pub use markdown::{generate_markdown, write_markdown_report};
