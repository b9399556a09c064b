use crate::format::InputFormat;
use pulldown_cmark::{html, Parser};

/// Renders Markdown straight to an HTML fragment; front matter is not rendered.
pub fn write(markdown: &str, format: InputFormat) -> String {
    let parser = Parser::new_ext(markdown, format.parser_options());
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fragment() {
        assert_eq!(
            write("# Hi\n\n*there*\n", InputFormat::Markdown),
            "<h1>Hi</h1>\n<p><em>there</em></p>\n"
        );
    }

    #[test]
    fn front_matter_is_not_rendered() {
        let out = write("---\ntitle: Secret\n---\n\nBody\n", InputFormat::Markdown);
        assert!(!out.contains("Secret"));
        assert!(out.contains("<p>Body</p>"));
    }
}
