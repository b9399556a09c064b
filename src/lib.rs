pub mod ast;
pub mod convert;
pub mod error;
pub mod format;
pub mod logger;
pub mod metadata;
pub mod reader;
pub mod template;
pub mod writer;

pub use convert::{run, Converter, Job, MarkdownConverter, Options};
pub use error::{Error, Result};
pub use format::{InputFormat, MetadataFormat, OutputFormat};
