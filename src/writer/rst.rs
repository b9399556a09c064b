use crate::ast::{Block, Document, Inline};
use tracing::warn;
use unicode_width::UnicodeWidthStr;

const HEADING_CHARS: [char; 6] = ['=', '-', '~', '^', '\'', '`'];
const INDENT: &str = "   ";
const TRANSITION: &str = "--------------";
const RAW_HTML_ROLE: &str = ".. role:: raw-html(raw)\n   :format: html";

/// Renders `doc` as reStructuredText.
pub fn write(doc: &Document) -> String {
    let mut writer = RstWriter::new(doc);
    let body = writer.flow(&doc.blocks, true);
    let notes = writer.footnotes(doc);
    let mut parts = Vec::new();
    if writer.raw_html_role {
        parts.push(RAW_HTML_ROLE.to_string());
    }
    if !body.is_empty() {
        parts.push(body);
    }
    if !notes.is_empty() {
        parts.push(notes);
    }
    if parts.is_empty() {
        return String::new();
    }
    let mut out = parts.join("\n\n");
    out.push('\n');
    out
}

/// Renders a document title with over- and underline, as used by standalone output.
pub fn title_block(title: &str, adornment: char) -> String {
    let text = escape(title.trim());
    let line = adornment.to_string().repeat(text.width());
    format!("{}\n{}\n{}", line, text, line)
}

/// Escapes `text` for use outside inline markup.
pub fn escape(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\\' | '*' | '`' | '|' => {
                out.push('\\');
                out.push(c);
            }
            // `name_` is a reference, `a_b` is not.
            '_' if chars.get(i + 1).map_or(true, |n| !n.is_alphanumeric()) => out.push_str("\\_"),
            _ => out.push(c),
        }
    }
    out
}

/// Shape of a rendered block, as far as merging with its successor is concerned.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Kind {
    Text,
    /// Absorbs a following indented block (quotes, literals, directives).
    Absorbing,
    List,
}

struct RstWriter<'a> {
    defined_notes: Vec<&'a str>,
    note_order: Vec<String>,
    /// Image substitutions by name, with their source and optional link target.
    substitutions: Vec<(String, String, Option<String>)>,
    pending: Vec<String>,
    raw_html_role: bool,
}

impl<'a> RstWriter<'a> {
    fn new(doc: &'a Document) -> Self {
        RstWriter {
            defined_notes: doc.footnotes.iter().map(|(label, _)| label.as_str()).collect(),
            note_order: Vec::new(),
            substitutions: Vec::new(),
            pending: Vec::new(),
            raw_html_role: false,
        }
    }

    fn flow(&mut self, blocks: &[Block], top_level: bool) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut prev: Option<Kind> = None;
        for block in blocks {
            let (text, kind) = self.block(block, top_level);
            if text.is_empty() {
                continue;
            }
            if let Some(prev) = prev {
                let indented = text.starts_with(' ');
                if (prev != Kind::Text && indented) || (prev == Kind::List && kind == Kind::List) {
                    parts.push("..".to_string());
                }
            }
            parts.push(text);
            prev = Some(kind);
            if top_level && !self.pending.is_empty() {
                parts.push(self.pending.drain(..).collect::<Vec<_>>().join("\n"));
                prev = Some(Kind::Absorbing);
            }
        }
        parts.join("\n\n")
    }

    fn block(&mut self, block: &Block, top_level: bool) -> (String, Kind) {
        match block {
            Block::Paragraph(inlines) | Block::Plain(inlines) => self.paragraph(inlines),
            Block::Heading { level, id, content } => {
                let text = self.inlines(content, " ").trim().to_string();
                if text.is_empty() {
                    warn!(heading_level = *level, "dropping empty heading");
                    return (String::new(), Kind::Text);
                }
                let target = match id {
                    Some(id) => format!(".. _{}:\n\n", id),
                    None => String::new(),
                };
                // Sections may only appear at the document level.
                if !top_level {
                    return (format!("{}.. rubric:: {}", target, text), Kind::Absorbing);
                }
                let idx = (*level as usize).clamp(1, HEADING_CHARS.len()) - 1;
                let underline = HEADING_CHARS[idx].to_string().repeat(text.width());
                (format!("{}{}\n{}", target, text, underline), Kind::Text)
            }
            Block::CodeBlock { lang, code } => {
                let code = code.trim_end_matches('\n');
                if code.trim().is_empty() {
                    return (String::new(), Kind::Text);
                }
                let header = match lang {
                    Some(lang) => format!(".. code:: {}", lang),
                    None => "::".to_string(),
                };
                (
                    format!("{}\n\n{}", header, indent(code, INDENT)),
                    Kind::Absorbing,
                )
            }
            Block::Quote(blocks) => {
                let inner = self.flow(blocks, false);
                if inner.is_empty() {
                    return (String::new(), Kind::Text);
                }
                (indent(&inner, INDENT), Kind::Absorbing)
            }
            Block::List { start, items } => (self.list(*start, items), Kind::List),
            Block::Rule => (TRANSITION.to_string(), Kind::Text),
            Block::Html(html) => {
                let html = html.trim_end();
                if html.trim().is_empty() {
                    return (String::new(), Kind::Text);
                }
                (
                    format!(".. raw:: html\n\n{}", indent(html, INDENT)),
                    Kind::Absorbing,
                )
            }
            Block::Table { head, rows } => (self.table(head, rows), Kind::Text),
        }
    }

    fn paragraph(&mut self, inlines: &[Inline]) -> (String, Kind) {
        let content: Vec<&Inline> = inlines
            .iter()
            .filter(|inline| !matches!(inline, Inline::Text(t) if t.trim().is_empty()))
            .collect();
        match content.as_slice() {
            [Inline::Image { url, alt }] => {
                return (image_directive(url, alt, None), Kind::Absorbing);
            }
            [Inline::Link { url: target, content }] => {
                if let Some((url, alt)) = linked_image(content) {
                    return (image_directive(url, alt, Some(target)), Kind::Absorbing);
                }
            }
            [Inline::Math { display: true, tex }] => {
                return (
                    format!(".. math::\n\n{}", indent(tex.trim(), INDENT)),
                    Kind::Absorbing,
                );
            }
            _ => {}
        }

        if inlines.iter().any(|inline| *inline == Inline::HardBreak) {
            let lines: Vec<String> = inlines
                .split(|inline| *inline == Inline::HardBreak)
                .map(|segment| {
                    let line = self.inlines(segment, " ");
                    let line = line.trim();
                    if line.is_empty() {
                        "|".to_string()
                    } else {
                        format!("| {}", line)
                    }
                })
                .collect();
            return (lines.join("\n"), Kind::Text);
        }

        let text = self.inlines(inlines, "\n");
        let mut lines: Vec<String> = text
            .trim()
            .lines()
            .map(|line| guard_line_start(line.trim_start()))
            .collect();
        if let Some(last) = lines.last_mut() {
            // A trailing `::` would turn the next block into a literal block.
            if last.ends_with("::") {
                last.insert(last.len() - 1, '\\');
            }
        }
        (lines.join("\n"), Kind::Text)
    }

    fn list(&mut self, start: Option<u64>, items: &[Vec<Block>]) -> String {
        let markers: Vec<String> = (0..items.len())
            .map(|i| match start {
                Some(start) => format!("{}.", start + i as u64),
                None => "-".to_string(),
            })
            .collect();
        let width = markers.iter().map(|m| m.len() + 1).max().unwrap_or(0).max(3);
        let loose = items.iter().any(|item| {
            item.len() > 1 || item.iter().any(|b| !matches!(b, Block::Plain(_)))
        });
        let rendered: Vec<String> = items
            .iter()
            .zip(markers)
            .map(|(item, marker)| {
                let body = self.flow(item, false);
                if body.is_empty() {
                    return marker;
                }
                let padded = format!("{:<width$}", marker, width = width);
                let rest = indent(&body, &" ".repeat(width));
                format!("{}{}", padded, rest.trim_start())
            })
            .collect();
        rendered.join(if loose { "\n\n" } else { "\n" })
    }

    fn table(&mut self, head: &[Vec<Inline>], rows: &[Vec<Vec<Inline>>]) -> String {
        let mut render_row = |cells: &[Vec<Inline>]| -> Vec<String> {
            cells
                .iter()
                .map(|cell| {
                    let text = self.inlines(cell, " ");
                    text.split_whitespace().collect::<Vec<_>>().join(" ")
                })
                .collect()
        };
        let head = render_row(head);
        let body: Vec<Vec<String>> = rows.iter().map(|row| render_row(row.as_slice())).collect();
        let columns = body
            .iter()
            .map(|row| row.len())
            .chain(std::iter::once(head.len()))
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return String::new();
        }
        let mut widths = vec![1; columns];
        for row in std::iter::once(&head).chain(body.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let border = |fill: char| -> String {
            let segments: Vec<String> = widths
                .iter()
                .map(|w| fill.to_string().repeat(w + 2))
                .collect();
            format!("+{}+", segments.join("+"))
        };
        let line = |row: &[String]| -> String {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    format!(" {}{} ", cell, " ".repeat(w - cell.width()))
                })
                .collect();
            format!("|{}|", cells.join("|"))
        };

        let mut out = vec![border('-')];
        if body.is_empty() {
            out.push(line(head.as_slice()));
            out.push(border('-'));
        } else {
            if head.iter().any(|cell| !cell.is_empty()) {
                out.push(line(head.as_slice()));
                out.push(border('='));
            }
            for row in &body {
                out.push(line(row.as_slice()));
                out.push(border('-'));
            }
        }
        out.join("\n")
    }

    fn footnotes(&mut self, doc: &'a Document) -> String {
        let mut parts = Vec::new();
        let mut i = 0;
        loop {
            if i == self.note_order.len() {
                let unreferenced = doc
                    .footnotes
                    .iter()
                    .find(|(label, _)| !self.note_order.contains(label));
                match unreferenced {
                    Some((label, _)) => self.note_order.push(label.clone()),
                    None => break,
                }
            }
            let label = self.note_order[i].clone();
            i += 1;
            let Some((_, blocks)) = doc.footnotes.iter().find(|(l, _)| *l == label) else {
                continue;
            };
            let body = self.flow(blocks, false);
            let marker = format!(".. [{}]", i);
            if body.is_empty() {
                parts.push(marker);
            } else {
                let rest = indent(&body, INDENT);
                parts.push(format!("{} {}", marker, rest.trim_start()));
            }
            if !self.pending.is_empty() {
                parts.push(self.pending.drain(..).collect::<Vec<_>>().join("\n"));
            }
        }
        parts.join("\n\n")
    }

    fn note_number(&mut self, label: &str) -> Option<usize> {
        if !self.defined_notes.contains(&label) {
            return None;
        }
        if let Some(pos) = self.note_order.iter().position(|l| l == label) {
            return Some(pos + 1);
        }
        self.note_order.push(label.to_string());
        Some(self.note_order.len())
    }

    fn substitution(&mut self, alt: &str, url: &str, target: Option<&str>) -> String {
        let base = alt
            .split(|c: char| c.is_whitespace() || "|*`\\_".contains(c))
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        for n in 0.. {
            let name = match (base.is_empty(), n) {
                (true, n) => format!("image{}", n + 1),
                (false, 0) => base.clone(),
                (false, n) => format!("{}{}", base, n + 1),
            };
            let same_image = self
                .substitutions
                .iter()
                .find(|(existing, _, _)| *existing == name)
                .map(|(_, existing_url, existing_target)| {
                    existing_url == url && existing_target.as_deref() == target
                });
            match same_image {
                Some(true) => return name,
                Some(false) => continue,
                None => {
                    let mut definition = format!(".. |{}| image:: {}", name, url);
                    if let Some(target) = target {
                        definition.push_str(&format!("\n   :target: {}", target));
                    }
                    self.pending.push(definition);
                    self.substitutions
                        .push((name.clone(), url.to_string(), target.map(str::to_string)));
                    return name;
                }
            }
        }
        unreachable!("substitution names are unbounded")
    }

    fn inlines(&mut self, inlines: &[Inline], soft_break: &str) -> String {
        let mut out = Out::default();
        for inline in inlines {
            match inline {
                Inline::Text(text) => out.text(&escape(text)),
                Inline::Code(code) => out.markup(&literal(code)),
                Inline::Emphasis(content) => out.wrapped("*", &Inline::plain_text(content), "*"),
                Inline::Strong(content) => out.wrapped("**", &Inline::plain_text(content), "**"),
                Inline::Strikeout(content) => out.text(&format!(
                    "[STRIKEOUT:{}]",
                    escape(&Inline::plain_text(content))
                )),
                Inline::Link { url, content } => {
                    if let Some((src, alt)) = linked_image(content) {
                        let name = self.substitution(&Inline::plain_text(alt), src, Some(url));
                        out.markup(&format!("|{}|", name));
                        continue;
                    }
                    let text = Inline::plain_text(content);
                    let bare = (text == *url && has_scheme(url))
                        || format!("mailto:{}", text) == *url;
                    if bare {
                        out.text(&escape(&text));
                    } else if text.trim().is_empty() {
                        out.markup(&format!("`<{}>`__", url));
                    } else {
                        out.markup(&format!("`{} <{}>`__", escape_interpreted(text.trim()), url));
                    }
                }
                Inline::Image { url, alt } => {
                    let name = self.substitution(&Inline::plain_text(alt), url, None);
                    out.markup(&format!("|{}|", name));
                }
                Inline::FootnoteRef(label) => match self.note_number(label) {
                    Some(n) => out.markup(&format!("[{}]_", n)),
                    None => out.text(&escape(&format!("[^{}]", label))),
                },
                Inline::SoftBreak | Inline::HardBreak => out.raw(soft_break),
                Inline::Html(html) => {
                    self.raw_html_role = true;
                    out.markup(&format!(":raw-html:`{}`", html));
                }
                Inline::Math { tex, .. } => {
                    out.markup(&format!(":math:`{}`", tex.replace('`', "\\`")))
                }
                Inline::TaskMarker(checked) => out.text(if *checked { "☒ " } else { "☐ " }),
            }
        }
        out.buf
    }
}

/// Inline output buffer that keeps inline markup delimited from adjacent word characters.
#[derive(Default)]
struct Out {
    buf: String,
    after_markup: bool,
}

impl Out {
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.after_markup && text.chars().next().map_or(false, |c| !may_follow_markup(c)) {
            self.buf.push_str("\\ ");
        }
        self.after_markup = false;
        self.buf.push_str(text);
    }

    fn raw(&mut self, text: &str) {
        self.after_markup = false;
        self.buf.push_str(text);
    }

    fn markup(&mut self, markup: &str) {
        let glued = if self.after_markup {
            true
        } else {
            self.buf.chars().last().map_or(false, |c| !may_precede_markup(c))
        };
        if glued {
            self.buf.push_str("\\ ");
        }
        self.buf.push_str(markup);
        self.after_markup = true;
    }

    fn wrapped(&mut self, open: &str, content: &str, close: &str) {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            self.text(content);
            return;
        }
        let leading = &content[..content.len() - content.trim_start().len()];
        let trailing = &content[content.trim_end().len()..];
        if !leading.is_empty() {
            self.raw(leading);
        }
        self.markup(&format!("{}{}{}", open, escape(trimmed), close));
        if !trailing.is_empty() {
            self.raw(trailing);
        }
    }
}

/// The image of a link whose only content is that image.
fn linked_image(content: &[Inline]) -> Option<(&str, &[Inline])> {
    let mut images = content
        .iter()
        .filter(|inline| !matches!(inline, Inline::Text(t) if t.trim().is_empty()));
    match (images.next(), images.next()) {
        (Some(Inline::Image { url, alt }), None) => Some((url.as_str(), alt.as_slice())),
        _ => None,
    }
}

fn image_directive(url: &str, alt: &[Inline], target: Option<&str>) -> String {
    let alt = Inline::plain_text(alt);
    let mut directive = format!(".. image:: {}", url);
    if !alt.trim().is_empty() {
        directive.push_str(&format!("\n   :alt: {}", alt.trim()));
    }
    if let Some(target) = target {
        directive.push_str(&format!("\n   :target: {}", target));
    }
    directive
}

/// Whether `url` starts with a URI scheme such as `https:`.
fn has_scheme(url: &str) -> bool {
    match url.split_once(':') {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        }
        None => false,
    }
}

fn may_precede_markup(c: char) -> bool {
    c.is_whitespace() || "-:/'\"<([{".contains(c)
}

fn may_follow_markup(c: char) -> bool {
    c.is_whitespace() || "-.,:;!?\\/'\")]}>".contains(c)
}

fn literal(code: &str) -> String {
    let awkward = code.trim().is_empty()
        || code.contains("``")
        || code.starts_with(|c: char| c == '`' || c.is_whitespace())
        || code.ends_with(|c: char| c == '`' || c.is_whitespace());
    if awkward {
        format!(":literal:`{}`", escape_interpreted(code))
    } else {
        format!("``{}``", code)
    }
}

fn escape_interpreted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '`' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escapes a paragraph line that would otherwise be read as block structure.
fn guard_line_start(line: &str) -> String {
    if starts_block(line) {
        format!("\\{}", line)
    } else {
        line.to_string()
    }
}

fn starts_block(line: &str) -> bool {
    let bullet = ["- ", "* ", "+ ", "• ", "‣ ", "⁃ "]
        .iter()
        .any(|marker| line.starts_with(marker))
        || matches!(line, "-" | "*" | "+");
    if bullet || line == ".." || line.starts_with(".. ") || line.starts_with(">>>") {
        return true;
    }

    let after_enum = if let Some(rest) = line.strip_prefix('#') {
        Some(rest)
    } else {
        let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
        if rest.len() < line.len() {
            Some(rest)
        } else {
            let mut chars = line.chars();
            match chars.next() {
                Some(c) if c.is_ascii_alphabetic() => Some(chars.as_str()),
                _ => None,
            }
        }
    };
    if let Some(rest) = after_enum {
        if rest.starts_with(". ") || rest.starts_with(") ") || rest == "." || rest == ")" {
            return true;
        }
    }
    if let Some(rest) = line.strip_prefix('(') {
        let inner = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        if inner.len() < rest.len() && (inner.starts_with(") ") || inner == ")") {
            return true;
        }
    }

    if let Some(rest) = line.strip_prefix(':') {
        if let Some(end) = rest.find(':') {
            let after = &rest[end + 1..];
            if end > 0 && (after.is_empty() || after.starts_with(' ')) {
                return true;
            }
        }
    }

    let mut chars = line.chars();
    match chars.next() {
        Some(first) if first.is_ascii_punctuation() => {
            line.chars().count() >= 4 && chars.all(|c| c == first)
        }
        _ => false,
    }
}

/// Prefixes each non-empty line of `text` with `prefix`.
fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
