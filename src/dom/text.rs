use scraper::{Html, Node};

/// Elements whose text never renders.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Flattens rendered markup into visible text, one text node per line with
/// whitespace collapsed. Input without markup is returned unchanged.
pub fn flatten(markup: &str) -> String {
    if !looks_like_markup(markup) {
        return markup.to_string();
    }

    let document = Html::parse_document(markup);
    let mut lines = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(element) => SKIPPED_ELEMENTS.contains(&element.name()),
            _ => false,
        });
        if hidden {
            continue;
        }

        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn looks_like_markup(input: &str) -> bool {
    let trimmed = input.trim_start();
    trimmed.starts_with('<') || (input.contains("</") && input.contains('>'))
}
