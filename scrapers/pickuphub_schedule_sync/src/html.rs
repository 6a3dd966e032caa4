use scraper::{Html, Node};

const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Flattens a rendered page into its visible text.
///
/// Every text node is trimmed and the pieces are joined with no separator,
/// so `<b>My Schedule</b> <p>Wed, Jan 15</p>` becomes `My ScheduleWed, Jan 15`.
/// The schedule markers are matched against this exact shape.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 4);

    for node in document.root_element().descendants() {
        let Node::Text(content) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
            Node::Element(element) => SKIPPED_ELEMENTS.contains(&element.name()),
            _ => false,
        });
        if hidden {
            continue;
        }

        let trimmed = content.trim();
        if !trimmed.is_empty() {
            text.push_str(trimmed);
        }
    }

    text
}
