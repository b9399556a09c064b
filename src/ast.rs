//! Document tree shared by the reader and the writers.

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Raw front matter and the delimiter style it was written in.
    pub front_matter: Option<FrontMatter>,
    pub blocks: Vec<Block>,
    /// Footnote definitions in source order, keyed by their Markdown label.
    pub footnotes: Vec<(String, Vec<Block>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrontMatter {
    Yaml(String),
    Toml(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    /// Inline content of a tight list item.
    Plain(Vec<Inline>),
    Heading {
        level: u8,
        id: Option<String>,
        content: Vec<Inline>,
    },
    CodeBlock {
        lang: Option<String>,
        code: String,
    },
    Quote(Vec<Block>),
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Rule,
    Html(String),
    Table {
        head: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikeout(Vec<Inline>),
    Link { url: String, content: Vec<Inline> },
    Image { url: String, alt: Vec<Inline> },
    FootnoteRef(String),
    SoftBreak,
    HardBreak,
    Html(String),
    Math { display: bool, tex: String },
    TaskMarker(bool),
}

impl Inline {
    /// Concatenated text of `inlines` with all markup removed.
    pub fn plain_text(inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            match inline {
                Inline::Text(s) | Inline::Code(s) => out.push_str(s),
                Inline::Emphasis(c)
                | Inline::Strong(c)
                | Inline::Strikeout(c)
                | Inline::Link { content: c, .. }
                | Inline::Image { alt: c, .. } => out.push_str(&Inline::plain_text(c)),
                Inline::Math { tex, .. } => out.push_str(tex),
                Inline::SoftBreak | Inline::HardBreak => out.push(' '),
                Inline::FootnoteRef(_) | Inline::Html(_) | Inline::TaskMarker(_) => {}
            }
        }
        out
    }
}
