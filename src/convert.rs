use crate::error::{Error, Result};
use crate::format::{InputFormat, OutputFormat};
use crate::metadata::{self, Metadata};
use crate::{reader, template, writer};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SOURCE: &str = "index.md";
pub const DEFAULT_OUTPUT: &str = "README.rst";
/// Path standing for stdin as a source and stdout as an output.
pub const STDIO: &str = "-";

/// Turns the document at a path into text of another format.
pub trait Converter {
    fn convert_file(&self, source: &Path, to: OutputFormat) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Input format; inferred from the source extension when unset.
    pub from: Option<InputFormat>,
    pub standalone: bool,
    /// Template source used for standalone output instead of the built-in one.
    pub template: Option<String>,
    /// Metadata defaults; front matter keys take precedence.
    pub metadata: Value,
    pub variables: Vec<(String, String)>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            from: None,
            standalone: false,
            template: None,
            metadata: Value::Object(Map::new()),
            variables: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    options: Options,
}

impl MarkdownConverter {
    pub fn new(options: Options) -> Self {
        MarkdownConverter { options }
    }

    /// Converts in-memory Markdown, defaulting to the `markdown` dialect.
    pub fn convert_text(&self, text: &str, to: OutputFormat) -> Result<String> {
        self.convert(text, self.options.from.unwrap_or(InputFormat::Markdown), to)
    }

    fn input_format(&self, source: &Path) -> Result<InputFormat> {
        if let Some(from) = self.options.from {
            return Ok(from);
        }
        if source == Path::new(STDIO) {
            return Ok(InputFormat::Markdown);
        }
        let from = InputFormat::from_path(source)?;
        debug!(source = %source.display(), ?from, "inferred input format");
        Ok(from)
    }

    fn convert(&self, text: &str, from: InputFormat, to: OutputFormat) -> Result<String> {
        let doc = reader::read(text, from)?;
        let mut meta = self.options.metadata.clone();
        if let Some(front_matter) = &doc.front_matter {
            meta = metadata::merge(meta, metadata::from_front_matter(front_matter)?);
        }
        let body = match to {
            OutputFormat::Rst => writer::rst::write(&doc),
            OutputFormat::Html => writer::html::write(text, from),
        };
        if !self.options.standalone && self.options.template.is_none() {
            return Ok(body);
        }
        let meta = Metadata::from_value(meta)?;
        let template = self
            .options
            .template
            .as_deref()
            .unwrap_or_else(|| template::default_template(to));
        debug!(?to, custom = self.options.template.is_some(), "rendering standalone output");
        template::render(template, &body, &meta, to, &self.options.variables)
    }
}

impl Converter for MarkdownConverter {
    fn convert_file(&self, source: &Path, to: OutputFormat) -> Result<String> {
        let from = self.input_format(source)?;
        let text = read_source(source)?;
        self.convert(&text, from, to)
    }
}

/// A single conversion: where to read, what to produce, where to write it.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub source: PathBuf,
    pub to: OutputFormat,
    pub output: PathBuf,
}

impl Default for Job {
    fn default() -> Self {
        Job {
            source: PathBuf::from(DEFAULT_SOURCE),
            to: OutputFormat::Rst,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

/// Converts `job.source` with `converter` and writes the result verbatim to `job.output`.
pub fn run<C: Converter + ?Sized>(converter: &C, job: &Job) -> Result<()> {
    debug!(source = %job.source.display(), to = ?job.to, "converting");
    let converted = converter.convert_file(&job.source, job.to)?;
    write_output(&job.output, &converted)?;
    debug!(output = %job.output.display(), bytes = converted.len(), "wrote output");
    Ok(())
}

pub fn read_source(source: &Path) -> Result<String> {
    if source == Path::new(STDIO) {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| Error::IO(format!("Failed to read stdin: {}", e)))?;
        return Ok(input);
    }
    std::fs::read_to_string(source).map_err(|e| {
        Error::IO(format!(
            "Failed to read source file '{}': {}",
            source.display(),
            e
        ))
    })
}

/// Writes `contents` to `path`, replacing any existing file; `-` writes to stdout.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if path == Path::new(STDIO) {
        let mut stdout = io::stdout().lock();
        return stdout
            .write_all(contents.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| Error::IO(format!("Failed to write stdout: {}", e)));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::IO(format!(
                "Failed to create directories '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }
    let mut file = File::create(path)
        .map_err(|e| Error::IO(format!("Failed to create file '{}': {}", path.display(), e)))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| Error::IO(format!("Failed to write file '{}': {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_job_matches_the_readme_conversion() {
        let job = Job::default();
        assert_eq!(job.source, PathBuf::from("index.md"));
        assert_eq!(job.to, OutputFormat::Rst);
        assert_eq!(job.output, PathBuf::from("README.rst"));
    }

    #[test]
    fn converts_text_to_rst_body_only_by_default() {
        let converter = MarkdownConverter::default();
        let out = converter
            .convert_text("---\ntitle: T\n---\n\n# Intro\n", OutputFormat::Rst)
            .unwrap();
        assert_eq!(out, "Intro\n=====\n");
    }

    #[test]
    fn standalone_uses_front_matter_over_metadata_defaults() {
        let converter = MarkdownConverter::new(Options {
            standalone: true,
            metadata: json!({"title": "Default", "author": "Ada"}),
            ..Options::default()
        });
        let out = converter
            .convert_text("---\ntitle: Doc\n---\n\nBody\n", OutputFormat::Rst)
            .unwrap();
        assert_eq!(out, "===\nDoc\n===\n\n:Author: Ada\n\nBody\n");
    }

    #[test]
    fn numeric_front_matter_title_is_used() {
        let converter = MarkdownConverter::new(Options {
            standalone: true,
            ..Options::default()
        });
        let out = converter
            .convert_text("---\ntitle: 1984\n---\n\nBody\n", OutputFormat::Rst)
            .unwrap();
        assert_eq!(out, "====\n1984\n====\n\nBody\n");
    }

    #[test]
    fn custom_template_implies_standalone() {
        let converter = MarkdownConverter::new(Options {
            template: Some("[{{ body }}]".to_string()),
            ..Options::default()
        });
        assert_eq!(converter.convert_text("x\n", OutputFormat::Rst).unwrap(), "[x\n]");
    }

    #[test]
    fn malformed_front_matter_is_an_error() {
        let converter = MarkdownConverter::default();
        let err = converter
            .convert_text("---\ntitle: [unclosed\n---\n\nBody\n", OutputFormat::Rst)
            .unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn unknown_source_extension_needs_explicit_format() {
        let converter = MarkdownConverter::default();
        let err = converter
            .convert_file(Path::new("notes.docx"), OutputFormat::Rst)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedExt(ext) if ext == "docx"));
    }

    #[test]
    fn missing_source_is_an_io_error() {
        let converter = MarkdownConverter::default();
        let err = converter
            .convert_file(Path::new("does/not/exist.md"), OutputFormat::Rst)
            .unwrap_err();
        assert!(err.to_string().contains("does/not/exist.md"));
        assert!(matches!(err, Error::IO(_)));
    }
}
