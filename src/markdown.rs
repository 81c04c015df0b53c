use pulldown_cmark::{html, Options, Parser};

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options
}

pub fn render_markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options());
    let mut html_out = String::new();
    html::push_html(&mut html_out, parser);
    html_out
}

#[cfg(test)]
mod tests {
    use super::render_markdown_to_html;

    #[test]
    fn renders_headings_and_emphasis() {
        let input = "## Matrículas abertas\n\nVagas **limitadas** para o *próximo* ano letivo.";
        let output = render_markdown_to_html(input);
        assert!(output.contains("<h2>"));
        assert!(output.contains("<strong>limitadas</strong>"));
        assert!(output.contains("<em>próximo</em>"));
    }

    #[test]
    fn renders_links_and_tables() {
        let input = "| Turno | Horário |\n|---|---|\n| Manhã | 7h às 12h |\n\n[fale conosco](/contato)";
        let output = render_markdown_to_html(input);
        assert!(output.contains("<table>"));
        assert!(output.contains("<a href=\"/contato\">fale conosco</a>"));
    }
}
