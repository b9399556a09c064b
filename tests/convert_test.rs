use mdrst::{run, Converter, Error, Job, MarkdownConverter, Options, OutputFormat};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Converter that records its calls and returns a canned string.
struct Recording {
    calls: RefCell<Vec<(PathBuf, OutputFormat)>>,
    reply: String,
}

impl Converter for Recording {
    fn convert_file(&self, source: &Path, to: OutputFormat) -> mdrst::Result<String> {
        self.calls.borrow_mut().push((source.to_path_buf(), to));
        Ok(self.reply.clone())
    }
}

struct Failing;

impl Converter for Failing {
    fn convert_file(&self, _source: &Path, _to: OutputFormat) -> mdrst::Result<String> {
        Err(Error::Msg("converter exploded".to_string()))
    }
}

#[test]
fn test_run_passes_source_and_format_and_writes_reply_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("README.rst");
    let converter = Recording {
        calls: RefCell::new(Vec::new()),
        reply: "Title\n=====\n\nno trailing newline".to_string(),
    };
    let job = Job {
        source: PathBuf::from("index.md"),
        to: OutputFormat::Rst,
        output: output.clone(),
    };

    run(&converter, &job).unwrap();

    assert_eq!(
        *converter.calls.borrow(),
        vec![(PathBuf::from("index.md"), OutputFormat::Rst)]
    );
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Title\n=====\n\nno trailing newline"
    );
}

#[test]
fn test_run_overwrites_existing_output() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("README.rst");
    fs::write(&output, "old contents that are much longer than the new ones").unwrap();
    let converter = Recording {
        calls: RefCell::new(Vec::new()),
        reply: "new".to_string(),
    };
    let job = Job {
        output: output.clone(),
        ..Job::default()
    };

    run(&converter, &job).unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "new");
}

#[test]
fn test_run_creates_missing_output_directories() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("docs/build/README.rst");
    let converter = Recording {
        calls: RefCell::new(Vec::new()),
        reply: "x\n".to_string(),
    };
    let job = Job {
        output: output.clone(),
        ..Job::default()
    };

    run(&converter, &job).unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "x\n");
}

#[test]
fn test_converter_failure_leaves_no_output() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("README.rst");
    let job = Job {
        output: output.clone(),
        ..Job::default()
    };

    let err = run(&Failing, &job).unwrap_err();

    assert_eq!(err.to_string(), "converter exploded");
    assert!(!output.exists());
}

#[test]
fn test_markdown_file_to_rst_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("index.md");
    let output = temp_dir.path().join("README.rst");
    fs::write(
        &source,
        "# mdrst\n\
         \n\
         Converts *Markdown* to `reStructuredText`.\n\
         \n\
         ## Usage\n\
         \n\
         - install it\n\
         - run it\n\
         \n\
         ```sh\n\
         mdrst index.md\n\
         ```\n",
    )
    .unwrap();
    let job = Job {
        source: source.clone(),
        to: OutputFormat::Rst,
        output: output.clone(),
    };

    run(&MarkdownConverter::default(), &job).unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "mdrst\n\
         =====\n\
         \n\
         Converts *Markdown* to ``reStructuredText``.\n\
         \n\
         Usage\n\
         -----\n\
         \n\
         -  install it\n\
         -  run it\n\
         \n\
         .. code:: sh\n\
         \n   mdrst index.md\n"
    );
}

#[test]
fn test_standalone_with_metadata_file() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("index.md");
    let meta = temp_dir.path().join("meta.toml");
    let output = temp_dir.path().join("README.rst");
    fs::write(&source, "Body text.\n").unwrap();
    fs::write(&meta, "title = \"Handbook\"\nauthor = [\"Ada\", \"Grace\"]\n").unwrap();

    let converter = MarkdownConverter::new(Options {
        standalone: true,
        metadata: mdrst::metadata::read_file(&meta).unwrap(),
        ..Options::default()
    });
    let job = Job {
        source,
        to: OutputFormat::Rst,
        output: output.clone(),
    };
    run(&converter, &job).unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "========\nHandbook\n========\n\n:Author: Ada\n:Author: Grace\n\nBody text.\n"
    );
}

#[test]
fn test_html_output() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("index.md");
    let output = temp_dir.path().join("index.html");
    fs::write(&source, "# Hi\n").unwrap();
    let job = Job {
        source,
        to: OutputFormat::Html,
        output: output.clone(),
    };

    run(&MarkdownConverter::default(), &job).unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), "<h1>Hi</h1>\n");
}
