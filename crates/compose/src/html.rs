//! Plain generated text to the small HTML subset segments are shown in.
//!
//! Blank lines separate blocks. A block of `-`, `*` or `•` lines becomes a
//! list; so does any multi-line block when the caller expects a list.
//! Everything else is a paragraph with line breaks kept. `**bold**` is the
//! only inline markup recognised.

const BULLETS: [&str; 3] = ["- ", "* ", "• "];

pub fn render_html(text: &str, as_list: bool) -> String {
    let mut out = String::new();
    for block in blocks(text) {
        let bulleted = block.iter().all(|line| bullet_body(line).is_some());
        if bulleted || (as_list && block.len() > 1) {
            out.push_str("<ul>");
            for line in &block {
                out.push_str("<li>");
                out.push_str(&inline(bullet_body(line).unwrap_or(line)));
                out.push_str("</li>");
            }
            out.push_str("</ul>");
        } else {
            out.push_str("<p>");
            let lines: Vec<String> = block.iter().map(|line| inline(line)).collect();
            out.push_str(&lines.join("<br>"));
            out.push_str("</p>");
        }
    }
    out
}

fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn bullet_body(line: &str) -> Option<&str> {
    BULLETS
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(str::trim_start)
}

fn inline(line: &str) -> String {
    let parts: Vec<&str> = line.split("**").collect();
    // An unmatched `**` is left as text.
    if parts.len() < 3 || parts.len() % 2 == 0 {
        return escape(line);
    }
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i % 2 == 1 {
            out.push_str("<strong>");
            out.push_str(&escape(part));
            out.push_str("</strong>");
        } else {
            out.push_str(&escape(part));
        }
    }
    out
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
