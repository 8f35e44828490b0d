//! Markdown → ratatui `Text` renderer for agent answers.
//!
//! Converts `pulldown_cmark` events into styled `Line`/`Span` values.
//! Handles headings, emphasis, inline code, fenced code blocks (syntect
//! highlighting), lists, blockquotes, tables and links. Citation markers
//! the research graph inserts into answers (`[3]`) are highlighted.

use std::sync::LazyLock;

use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, TextMergeStream,
};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const CODE_THEME: &str = "base16-ocean.dark";
const RULE_WIDTH: usize = 40;

/// Parse markdown into styled `Text` with `base_fg` as the body color.
///
/// Returns owned text (`'static`) so callers aren't constrained by input lifetime.
pub fn render(content: &str, base_fg: Color) -> Text<'static> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_TABLES);

    let mut w = MarkdownWriter::new(base_fg);
    // Merged so `[`, `1`, `]` arrive as one run and citations can be spotted
    for event in TextMergeStream::new(Parser::new_ext(content, opts)) {
        w.handle(event);
    }
    w.text
}

fn frame_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn citation_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

struct MarkdownWriter {
    text: Text<'static>,
    base_fg: Color,
    /// Inline style stack; entries compose via `patch` so bold+italic nests.
    styles: Vec<Style>,
    /// Per-line prefix spans (blockquote and code block `│`).
    line_prefixes: Vec<Span<'static>>,
    /// List nesting: None = unordered, Some(n) = ordered at index n.
    list_indices: Vec<Option<u64>>,
    highlighter: Option<HighlightLines<'static>>,
    in_plain_code: bool,
    link_url: Option<String>,
    /// Cells already written on the current table row.
    table_cells: usize,
    needs_blank_line: bool,
}

impl MarkdownWriter {
    fn new(base_fg: Color) -> Self {
        Self {
            text: Text::default(),
            base_fg,
            styles: vec![],
            line_prefixes: vec![],
            list_indices: vec![],
            highlighter: None,
            in_plain_code: false,
            link_url: None,
            table_cells: 0,
            needs_blank_line: false,
        }
    }

    fn style(&self) -> Style {
        self.styles
            .last()
            .copied()
            .unwrap_or_else(|| Style::default().fg(self.base_fg))
    }

    fn push_style(&mut self, overlay: Style) {
        self.styles.push(self.style().patch(overlay));
    }

    fn pop_style(&mut self) {
        self.styles.pop();
    }

    fn push_line(&mut self, line: Line<'static>) {
        let mut out = line;
        for pfx in self.line_prefixes.iter().rev().cloned() {
            out.spans.insert(0, pfx);
        }
        self.text.lines.push(out);
    }

    fn push_span(&mut self, span: Span<'static>) {
        if let Some(line) = self.text.lines.last_mut() {
            line.push_span(span);
        } else {
            self.push_line(Line::from(vec![span]));
        }
    }

    fn start_block(&mut self) {
        if self.needs_blank_line {
            self.push_line(Line::default());
            self.needs_blank_line = false;
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.text(t),
            Event::Code(c) => {
                let style = Style::default().fg(Color::White).bg(Color::DarkGray);
                self.push_span(Span::styled(c.to_string(), style));
            }
            Event::SoftBreak => self.push_span(Span::raw(" ")),
            Event::HardBreak => self.push_line(Line::default()),
            Event::Rule => {
                self.start_block();
                self.push_line(Line::from(Span::styled("─".repeat(RULE_WIDTH), frame_style())));
                self.needs_blank_line = true;
            }
            Event::TaskListMarker(checked) => {
                self.push_span(Span::raw(if checked { "[x] " } else { "[ ] " }));
            }
            _ => {} // HTML, footnotes, math
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.start_block();
                self.push_line(Line::default());
            }
            Tag::Heading { level, .. } => {
                self.start_block();
                let hs = heading_style(self.base_fg, level);
                self.push_line(Line::from(Span::styled(
                    format!("{} ", "#".repeat(level as usize)),
                    hs,
                )));
                self.push_style(hs);
            }
            Tag::BlockQuote(_) => {
                self.start_block();
                self.line_prefixes.push(Span::styled("│ ", frame_style()));
                self.push_style(Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => self.open_code_block(kind),
            Tag::List(start) => {
                if self.list_indices.is_empty() {
                    self.start_block();
                }
                self.list_indices.push(start);
            }
            Tag::Item => {
                self.push_line(Line::default());
                let indent = "  ".repeat(self.list_indices.len().saturating_sub(1));
                let marker = match self.list_indices.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{indent}{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => format!("{indent}- "),
                };
                self.push_span(Span::styled(marker, frame_style()));
            }
            Tag::Table(_) => self.start_block(),
            Tag::TableHead => {
                self.push_line(Line::default());
                self.table_cells = 0;
                self.push_style(Style::default().add_modifier(Modifier::BOLD));
            }
            Tag::TableRow => {
                self.push_line(Line::default());
                self.table_cells = 0;
            }
            Tag::TableCell => {
                if self.table_cells > 0 {
                    self.push_span(Span::styled(" │ ", frame_style()));
                }
                self.table_cells += 1;
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link_url = Some(dest_url.to_string());
                self.push_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {} // Images, definitions
        }
    }

    fn open_code_block(&mut self, kind: CodeBlockKind<'_>) {
        self.start_block();
        let lang = match &kind {
            CodeBlockKind::Fenced(l) => l.as_ref(),
            CodeBlockKind::Indented => "",
        };

        let top = if lang.is_empty() {
            Line::from(Span::styled("╭──", frame_style()))
        } else {
            Line::from(vec![
                Span::styled("╭── ", frame_style()),
                Span::styled(lang.to_owned(), frame_style().add_modifier(Modifier::BOLD)),
                Span::styled(" ──", frame_style()),
            ])
        };
        self.push_line(top);
        self.line_prefixes.push(Span::styled("│ ", frame_style()));

        if let Some(syn) = (!lang.is_empty())
            .then(|| SYNTAX_SET.find_syntax_by_token(lang))
            .flatten()
        {
            self.highlighter = Some(HighlightLines::new(syn, &THEME_SET.themes[CODE_THEME]));
        } else {
            self.in_plain_code = true;
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.needs_blank_line = true,
            TagEnd::Heading(_) => {
                self.pop_style();
                self.needs_blank_line = true;
            }
            TagEnd::BlockQuote(_) => {
                self.line_prefixes.pop();
                self.pop_style();
                self.needs_blank_line = true;
            }
            TagEnd::CodeBlock => {
                self.highlighter = None;
                self.in_plain_code = false;
                self.line_prefixes.pop();
                self.push_line(Line::from(Span::styled("╰──", frame_style())));
                self.needs_blank_line = true;
            }
            TagEnd::List(_) => {
                self.list_indices.pop();
                self.needs_blank_line = true;
            }
            TagEnd::TableHead => self.pop_style(),
            TagEnd::Table => self.needs_blank_line = true,
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link_url.take() {
                    self.push_span(Span::styled(format!(" ({url})"), frame_style()));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, cow: CowStr<'_>) {
        // ratatui renders \t as zero-width
        let text = cow.replace('\t', "    ");

        if let Some(mut hl) = self.highlighter.take() {
            for line in LinesWithEndings::from(text.as_str()) {
                let Ok(ranges) = hl.highlight_line(line, &SYNTAX_SET) else {
                    continue;
                };
                let spans: Vec<Span<'static>> = ranges
                    .into_iter()
                    .filter_map(|(hl_style, frag)| {
                        let content = frag.trim_end_matches('\n');
                        if content.is_empty() {
                            return None;
                        }
                        let fg = Color::Rgb(
                            hl_style.foreground.r,
                            hl_style.foreground.g,
                            hl_style.foreground.b,
                        );
                        Some(Span::styled(content.to_owned(), Style::default().fg(fg)))
                    })
                    .collect();
                self.push_line(Line::from(spans));
            }
            self.highlighter = Some(hl);
            return;
        }

        if self.in_plain_code {
            for line in text.lines() {
                self.push_line(Line::from(Span::styled(
                    line.to_owned(),
                    Style::default().fg(Color::White),
                )));
            }
            return;
        }

        let style = self.style();
        for (fragment, is_citation) in split_citations(&text) {
            let span_style = if is_citation {
                style.patch(citation_style())
            } else {
                style
            };
            self.push_span(Span::styled(fragment.to_owned(), span_style));
        }
    }
}

/// Split text into runs, flagging `[N]` citation markers.
fn split_citations(text: &str) -> Vec<(&str, bool)> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after.as_bytes().get(digits) == Some(&b']') {
            if open > 0 {
                out.push((&rest[..open], false));
            }
            let end = open + digits + 2;
            out.push((&rest[open..end], true));
            rest = &rest[end..];
        } else {
            out.push((&rest[..=open], false));
            rest = &rest[open + 1..];
        }
    }
    if !rest.is_empty() {
        out.push((rest, false));
    }
    out
}

fn heading_style(base_fg: Color, level: HeadingLevel) -> Style {
    let modifier = match level {
        HeadingLevel::H1 => Modifier::BOLD | Modifier::UNDERLINED,
        HeadingLevel::H2 => Modifier::BOLD,
        _ => Modifier::BOLD | Modifier::ITALIC,
    };
    Style::default().fg(base_fg).add_modifier(modifier)
}
