use crate::error::Result;
use crate::format::OutputFormat;
use crate::metadata::Metadata;
use crate::writer::rst;
use tera::{Context, Tera};

const TEMPLATE_NAME: &str = "standalone";

pub const DEFAULT_RST: &str = "{{ header }}{{ body }}";

pub const DEFAULT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{ title | escape }}</title>
</head>
<body>
{{ header }}{{ body }}</body>
</html>
"#;

pub fn default_template(to: OutputFormat) -> &'static str {
    match to {
        OutputFormat::Rst => DEFAULT_RST,
        OutputFormat::Html => DEFAULT_HTML,
    }
}

/// Title, subtitle, authors and date rendered in the target dialect.
pub fn header(meta: &Metadata, to: OutputFormat) -> String {
    match to {
        OutputFormat::Rst => {
            let mut blocks = Vec::new();
            if let Some(title) = meta.title.as_deref().filter(|t| !t.trim().is_empty()) {
                blocks.push(rst::title_block(title, '='));
            }
            if let Some(subtitle) = meta.subtitle.as_deref().filter(|t| !t.trim().is_empty()) {
                blocks.push(rst::title_block(subtitle, '-'));
            }
            let mut fields: Vec<String> = meta
                .authors
                .iter()
                .map(|author| format!(":Author: {}", rst::escape(author)))
                .collect();
            if let Some(date) = &meta.date {
                fields.push(format!(":Date: {}", rst::escape(date)));
            }
            if !fields.is_empty() {
                blocks.push(fields.join("\n"));
            }
            if blocks.is_empty() {
                String::new()
            } else {
                format!("{}\n\n", blocks.join("\n\n"))
            }
        }
        OutputFormat::Html => {
            let mut out = String::new();
            if let Some(title) = &meta.title {
                out.push_str(&format!("<h1 class=\"title\">{}</h1>\n", tera::escape_html(title)));
            }
            if let Some(subtitle) = &meta.subtitle {
                out.push_str(&format!(
                    "<p class=\"subtitle\">{}</p>\n",
                    tera::escape_html(subtitle)
                ));
            }
            for author in &meta.authors {
                out.push_str(&format!("<p class=\"author\">{}</p>\n", tera::escape_html(author)));
            }
            if let Some(date) = &meta.date {
                out.push_str(&format!("<p class=\"date\">{}</p>\n", tera::escape_html(date)));
            }
            out
        }
    }
}

/// Wraps `body` in `template`, exposing the document metadata and user variables.
pub fn render(
    template: &str,
    body: &str,
    meta: &Metadata,
    to: OutputFormat,
    variables: &[(String, String)],
) -> Result<String> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_template(TEMPLATE_NAME, template)?;

    let mut context = Context::new();
    context.insert("body", body);
    context.insert("header", &header(meta, to));
    context.insert("title", meta.title.as_deref().unwrap_or(""));
    context.insert("subtitle", meta.subtitle.as_deref().unwrap_or(""));
    context.insert("authors", &meta.authors);
    context.insert("date", meta.date.as_deref().unwrap_or(""));
    context.insert("meta", &meta.raw);
    for (key, value) in variables {
        context.insert(key.as_str(), value);
    }
    Ok(tera.render(TEMPLATE_NAME, &context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn guide() -> Metadata {
        Metadata::from_value(json!({
            "title": "Guide",
            "author": "Ada",
            "date": "2024-01-01",
            "project": {"name": "mdrst"}
        }))
        .unwrap()
    }

    #[test]
    fn rst_header_from_metadata() {
        assert_eq!(
            header(&guide(), OutputFormat::Rst),
            "=====\nGuide\n=====\n\n:Author: Ada\n:Date: 2024-01-01\n\n"
        );
        assert_eq!(header(&Metadata::default(), OutputFormat::Rst), "");
    }

    #[test]
    fn default_rst_template_prepends_header() {
        let out = render(DEFAULT_RST, "Body\n", &guide(), OutputFormat::Rst, &[]).unwrap();
        assert_eq!(out, "=====\nGuide\n=====\n\n:Author: Ada\n:Date: 2024-01-01\n\nBody\n");
    }

    #[test]
    fn default_html_template_is_a_document() {
        let out = render(DEFAULT_HTML, "<p>Body</p>\n", &guide(), OutputFormat::Html, &[]).unwrap();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<title>Guide</title>"));
        assert!(out.contains("<h1 class=\"title\">Guide</h1>\n<p class=\"author\">Ada</p>"));
        assert!(out.contains("<p>Body</p>\n</body>"));
    }

    #[test]
    fn custom_templates_see_metadata_and_variables() {
        let template = "{{ meta.project.name }}|{{ version }}|{% for a in authors %}{{ a }}{% endfor %}\n{{ body }}";
        let variables = vec![("version".to_string(), "1.2".to_string())];
        let out = render(template, "text", &guide(), OutputFormat::Rst, &variables).unwrap();
        assert_eq!(out, "mdrst|1.2|Ada\ntext");
    }

    #[test]
    fn undefined_variables_are_template_errors() {
        let err = render("{{ nope }}", "", &Metadata::default(), OutputFormat::Rst, &[]).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }
}
