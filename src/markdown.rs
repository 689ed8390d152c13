//! Terminal formatting of markdown replies.
//!
//! Rendered mode waits for the complete reply and formats it here: the text is
//! parsed with `pulldown-cmark` and written back out as plain terminal text,
//! optionally decorated with ANSI styles.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

const BOLD: &str = "\x1b[1m";
const BOLD_UNDERLINE: &str = "\x1b[1;4m";
const ITALIC: &str = "\x1b[3m";
const UNDERLINE: &str = "\x1b[4m";
const STRIKE: &str = "\x1b[9m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const CODE_INDENT: &str = "    ";
const LIST_INDENT: &str = "  ";
const RULE: &str = "────────────────────────────────";

/// Formats `source` as terminal text.
///
/// With `use_color` false the output contains no escape sequences: headings
/// keep their `#` markers and inline code keeps its backticks.
pub fn render_markdown(source: &str, use_color: bool) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut writer = MarkdownWriter::new(use_color);
    for event in Parser::new_ext(source, options) {
        writer.event(event);
    }
    writer.finish()
}

struct MarkdownWriter {
    out: String,
    use_color: bool,
    styles: Vec<&'static str>,
    // One entry per open list: the next ordinal for ordered lists.
    lists: Vec<Option<u64>>,
    links: Vec<String>,
    in_code_block: bool,
}

impl MarkdownWriter {
    fn new(use_color: bool) -> Self {
        Self {
            out: String::new(),
            use_color,
            styles: Vec::new(),
            lists: Vec::new(),
            links: Vec::new(),
            in_code_block: false,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if self.use_color {
                    self.out.push_str(YELLOW);
                    self.out.push_str(&code);
                    self.restore_styles();
                } else {
                    self.out.push('`');
                    self.out.push_str(&code);
                    self.out.push('`');
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => self.out.push_str(&html),
            Event::SoftBreak | Event::HardBreak => {
                self.out.push('\n');
                self.indent_continuation();
            }
            Event::Rule => {
                self.ensure_blank_line();
                self.out.push_str(RULE);
                self.out.push_str("\n\n");
            }
            Event::TaskListMarker(checked) => {
                self.out.push_str(if checked { "[x] " } else { "[ ] " });
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.ensure_blank_line();
                if self.use_color {
                    self.push_style(if level == HeadingLevel::H1 {
                        BOLD_UNDERLINE
                    } else {
                        BOLD
                    });
                } else {
                    self.out.push_str(&"#".repeat(level as usize));
                    self.out.push(' ');
                }
            }
            Tag::CodeBlock(kind) => {
                self.ensure_line_start();
                if let CodeBlockKind::Fenced(lang) = kind
                    && !lang.is_empty()
                    && self.use_color
                {
                    self.out.push_str(DIM);
                    self.out.push_str(&lang);
                    self.out.push_str(RESET);
                    self.out.push('\n');
                }
                self.in_code_block = true;
            }
            Tag::List(start) => {
                self.ensure_line_start();
                self.lists.push(start);
            }
            Tag::Item => {
                self.ensure_line_start();
                let depth = self.lists.len().saturating_sub(1);
                self.out.push_str(&LIST_INDENT.repeat(depth));
                match self.lists.last_mut() {
                    Some(Some(ordinal)) => {
                        self.out.push_str(&format!("{ordinal}. "));
                        *ordinal += 1;
                    }
                    _ => self.out.push_str("• "),
                }
            }
            Tag::Emphasis => self.push_style(ITALIC),
            Tag::Strong => self.push_style(BOLD),
            Tag::Strikethrough => self.push_style(STRIKE),
            Tag::Link { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                self.push_style(UNDERLINE);
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.out.push_str("\n\n");
                } else {
                    self.out.push('\n');
                }
            }
            TagEnd::Heading(_) => {
                self.pop_style();
                self.out.push_str("\n\n");
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.out.push('\n');
            }
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.ensure_blank_line();
                }
            }
            TagEnd::Item => self.ensure_line_start(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.links.pop() {
                    self.out.push_str(" (");
                    if self.use_color {
                        self.out.push_str(CYAN);
                        self.out.push_str(&url);
                        self.out.push_str(RESET);
                        self.restore_styles();
                    } else {
                        self.out.push_str(&url);
                    }
                    self.out.push(')');
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            for line in text.split_inclusive('\n') {
                self.out.push_str(CODE_INDENT);
                self.out.push_str(line);
            }
        } else {
            self.out.push_str(text);
        }
    }

    fn push_style(&mut self, style: &'static str) {
        if self.use_color {
            self.styles.push(style);
            self.out.push_str(style);
        }
    }

    fn pop_style(&mut self) {
        if self.use_color {
            self.styles.pop();
            self.restore_styles();
        }
    }

    fn restore_styles(&mut self) {
        if self.use_color {
            self.out.push_str(RESET);
            for style in &self.styles {
                self.out.push_str(style);
            }
        }
    }

    fn indent_continuation(&mut self) {
        if !self.lists.is_empty() {
            self.out.push_str(&LIST_INDENT.repeat(self.lists.len()));
        }
    }

    fn ensure_line_start(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn ensure_blank_line(&mut self) {
        if self.out.is_empty() || self.out.ends_with("\n\n") {
            return;
        }
        self.ensure_line_start();
        self.out.push('\n');
    }

    fn finish(mut self) -> String {
        if self.use_color && !self.styles.is_empty() {
            self.out.push_str(RESET);
        }
        let trimmed = self.out.trim_end().len();
        self.out.truncate(trimmed);
        self.out
    }
}
