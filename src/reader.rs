use crate::ast::{Block, Document, FrontMatter, Inline};
use crate::error::{Error, Result};
use crate::format::InputFormat;
use pulldown_cmark::{CodeBlockKind, Event, LinkType, MetadataBlockKind, Parser, Tag, TagEnd};
use std::mem;
use tracing::debug;

/// Parses `input` into a [`Document`].
pub fn read(input: &str, format: InputFormat) -> Result<Document> {
    let parser = Parser::new_ext(input, format.parser_options());
    let mut builder = Builder::new();
    let mut events = 0usize;
    for event in parser {
        events += 1;
        builder.event(event)?;
    }
    debug!(events, ?format, "parsed markdown");
    builder.finish()
}

enum Container {
    Root,
    Quote,
    Item,
    Footnote(String),
}

enum Span {
    Paragraph,
    Plain,
    Heading { level: u8, id: Option<String> },
    Emphasis,
    Strong,
    Strikeout,
    Link { url: String },
    Image { url: String },
    Cell,
}

enum Frame {
    Blocks {
        container: Container,
        blocks: Vec<Block>,
    },
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Table {
        head: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
        row: Vec<Vec<Inline>>,
    },
    Inlines {
        span: Span,
        inlines: Vec<Inline>,
    },
    Code {
        lang: Option<String>,
        code: String,
    },
    Html(String),
    Metadata {
        kind: MetadataBlockKind,
        text: String,
    },
}

struct Builder {
    stack: Vec<Frame>,
    front_matter: Option<FrontMatter>,
    footnotes: Vec<(String, Vec<Block>)>,
}

fn unbalanced(what: &str) -> Error {
    Error::Msg(format!("Markdown parser produced an unbalanced {}", what))
}

impl Builder {
    fn new() -> Self {
        Builder {
            stack: vec![Frame::Blocks {
                container: Container::Root,
                blocks: Vec::new(),
            }],
            front_matter: None,
            footnotes: Vec::new(),
        }
    }

    fn finish(mut self) -> Result<Document> {
        self.close_plain();
        match (self.stack.pop(), self.stack.is_empty()) {
            (
                Some(Frame::Blocks {
                    container: Container::Root,
                    blocks,
                }),
                true,
            ) => Ok(Document {
                front_matter: self.front_matter,
                blocks,
                footnotes: self.footnotes,
            }),
            _ => Err(unbalanced("document")),
        }
    }

    fn event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag)?,
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::InlineMath(tex) => self.push_inline(Inline::Math {
                display: false,
                tex: tex.into_string(),
            }),
            Event::DisplayMath(tex) => self.push_inline(Inline::Math {
                display: true,
                tex: tex.into_string(),
            }),
            Event::Html(html) => match self.stack.last_mut() {
                Some(Frame::Html(buf)) => buf.push_str(&html),
                _ => self.push_block(Block::Html(html.into_string())),
            },
            Event::InlineHtml(html) => self.push_inline(Inline::Html(html.into_string())),
            Event::FootnoteReference(label) => {
                self.push_inline(Inline::FootnoteRef(label.into_string()))
            }
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.push_block(Block::Rule),
            Event::TaskListMarker(checked) => self.push_inline(Inline::TaskMarker(checked)),
            #[allow(unreachable_patterns)]
            _ => {}
        }
        Ok(())
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => self.open_block(Frame::Inlines {
                span: Span::Paragraph,
                inlines: Vec::new(),
            }),
            Tag::Heading { level, id, .. } => self.open_block(Frame::Inlines {
                span: Span::Heading {
                    level: level as u8,
                    id: id.map(|id| id.into_string()),
                },
                inlines: Vec::new(),
            }),
            Tag::BlockQuote { .. } => self.open_block(Frame::Blocks {
                container: Container::Quote,
                blocks: Vec::new(),
            }),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|lang| lang.to_string()),
                    CodeBlockKind::Indented => None,
                };
                self.open_block(Frame::Code {
                    lang,
                    code: String::new(),
                })
            }
            Tag::HtmlBlock => self.open_block(Frame::Html(String::new())),
            Tag::List(start) => self.open_block(Frame::List {
                start,
                items: Vec::new(),
            }),
            Tag::Item => self.stack.push(Frame::Blocks {
                container: Container::Item,
                blocks: Vec::new(),
            }),
            Tag::FootnoteDefinition(label) => self.open_block(Frame::Blocks {
                container: Container::Footnote(label.into_string()),
                blocks: Vec::new(),
            }),
            Tag::Table(_) => self.open_block(Frame::Table {
                head: Vec::new(),
                rows: Vec::new(),
                row: Vec::new(),
            }),
            Tag::TableCell => self.stack.push(Frame::Inlines {
                span: Span::Cell,
                inlines: Vec::new(),
            }),
            Tag::Emphasis => self.open_span(Span::Emphasis),
            Tag::Strong => self.open_span(Span::Strong),
            Tag::Strikethrough => self.open_span(Span::Strikeout),
            Tag::Link {
                link_type: LinkType::Email,
                dest_url,
                ..
            } => self.open_span(Span::Link {
                url: format!("mailto:{}", dest_url),
            }),
            Tag::Link { dest_url, .. } => self.open_span(Span::Link {
                url: dest_url.into_string(),
            }),
            Tag::Image { dest_url, .. } => self.open_span(Span::Image {
                url: dest_url.into_string(),
            }),
            Tag::MetadataBlock(kind) => self.open_block(Frame::Metadata {
                kind,
                text: String::new(),
            }),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) -> Result<()> {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => match self.stack.pop() {
                Some(Frame::Inlines {
                    span: Span::Paragraph,
                    inlines,
                }) => self.push_block(Block::Paragraph(inlines)),
                Some(Frame::Inlines {
                    span: Span::Heading { level, id },
                    inlines,
                }) => self.push_block(Block::Heading {
                    level,
                    id,
                    content: inlines,
                }),
                _ => return Err(unbalanced("paragraph or heading")),
            },
            TagEnd::BlockQuote { .. } => {
                self.close_plain();
                match self.stack.pop() {
                    Some(Frame::Blocks {
                        container: Container::Quote,
                        blocks,
                    }) => self.push_block(Block::Quote(blocks)),
                    _ => return Err(unbalanced("block quote")),
                }
            }
            TagEnd::CodeBlock => match self.stack.pop() {
                Some(Frame::Code { lang, code }) => self.push_block(Block::CodeBlock { lang, code }),
                _ => return Err(unbalanced("code block")),
            },
            TagEnd::HtmlBlock => match self.stack.pop() {
                Some(Frame::Html(html)) => self.push_block(Block::Html(html)),
                _ => return Err(unbalanced("HTML block")),
            },
            TagEnd::List(_) => match self.stack.pop() {
                Some(Frame::List { start, items }) => self.push_block(Block::List { start, items }),
                _ => return Err(unbalanced("list")),
            },
            TagEnd::Item => {
                self.close_plain();
                let blocks = match self.stack.pop() {
                    Some(Frame::Blocks {
                        container: Container::Item,
                        blocks,
                    }) => blocks,
                    _ => return Err(unbalanced("list item")),
                };
                match self.stack.last_mut() {
                    Some(Frame::List { items, .. }) => items.push(blocks),
                    _ => return Err(unbalanced("list item")),
                }
            }
            TagEnd::FootnoteDefinition => {
                self.close_plain();
                match self.stack.pop() {
                    Some(Frame::Blocks {
                        container: Container::Footnote(label),
                        blocks,
                    }) => self.footnotes.push((label, blocks)),
                    _ => return Err(unbalanced("footnote definition")),
                }
            }
            TagEnd::Table => match self.stack.pop() {
                Some(Frame::Table { head, rows, .. }) => self.push_block(Block::Table { head, rows }),
                _ => return Err(unbalanced("table")),
            },
            TagEnd::TableHead => {
                if let Some(Frame::Table { head, row, .. }) = self.stack.last_mut() {
                    *head = mem::take(row);
                }
            }
            TagEnd::TableRow => {
                if let Some(Frame::Table { rows, row, .. }) = self.stack.last_mut() {
                    rows.push(mem::take(row));
                }
            }
            TagEnd::TableCell => {
                let cell = match self.stack.pop() {
                    Some(Frame::Inlines {
                        span: Span::Cell,
                        inlines,
                    }) => inlines,
                    _ => return Err(unbalanced("table cell")),
                };
                match self.stack.last_mut() {
                    Some(Frame::Table { row, .. }) => row.push(cell),
                    _ => return Err(unbalanced("table cell")),
                }
            }
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image => {
                let inline = match self.stack.pop() {
                    Some(Frame::Inlines { span, inlines }) => match span {
                        Span::Emphasis => Inline::Emphasis(inlines),
                        Span::Strong => Inline::Strong(inlines),
                        Span::Strikeout => Inline::Strikeout(inlines),
                        Span::Link { url } => Inline::Link {
                            url,
                            content: inlines,
                        },
                        Span::Image { url } => Inline::Image { url, alt: inlines },
                        _ => return Err(unbalanced("inline span")),
                    },
                    _ => return Err(unbalanced("inline span")),
                };
                self.push_inline(inline);
            }
            TagEnd::MetadataBlock(_) => match self.stack.pop() {
                Some(Frame::Metadata { kind, text }) => {
                    self.front_matter = Some(match kind {
                        MetadataBlockKind::YamlStyle => FrontMatter::Yaml(text),
                        MetadataBlockKind::PlusesStyle => FrontMatter::Toml(text),
                    });
                }
                _ => return Err(unbalanced("metadata block")),
            },
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(Frame::Code { code, .. }) => code.push_str(text),
            Some(Frame::Html(html)) => html.push_str(text),
            Some(Frame::Metadata { text: buf, .. }) => buf.push_str(text),
            _ => self.push_inline(Inline::Text(text.to_string())),
        }
    }

    /// Opens a block-level frame, ending any pending tight-item text first.
    fn open_block(&mut self, frame: Frame) {
        self.close_plain();
        self.stack.push(frame);
    }

    fn open_span(&mut self, span: Span) {
        self.ensure_inline_target();
        self.stack.push(Frame::Inlines {
            span,
            inlines: Vec::new(),
        });
    }

    /// Tight list items carry inline content without a paragraph around it.
    fn ensure_inline_target(&mut self) {
        if let Some(Frame::Blocks { .. }) = self.stack.last() {
            self.stack.push(Frame::Inlines {
                span: Span::Plain,
                inlines: Vec::new(),
            });
        }
    }

    fn close_plain(&mut self) {
        if let Some(Frame::Inlines {
            span: Span::Plain, ..
        }) = self.stack.last()
        {
            if let Some(Frame::Inlines { inlines, .. }) = self.stack.pop() {
                self.push_block(Block::Plain(inlines));
            }
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        self.ensure_inline_target();
        if let Some(Frame::Inlines { inlines, .. }) = self.stack.last_mut() {
            // Adjacent text events are split at entity and escape boundaries.
            if let (Inline::Text(new), Some(Inline::Text(prev))) = (&inline, inlines.last_mut()) {
                prev.push_str(new);
                return;
            }
            inlines.push(inline);
        }
    }

    fn push_block(&mut self, block: Block) {
        self.close_plain();
        if let Some(Frame::Blocks { blocks, .. }) = self.stack.last_mut() {
            blocks.push(block);
        }
    }
}
