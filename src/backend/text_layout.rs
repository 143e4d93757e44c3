//! 纯文本 / Markdown 的简易 SVG 排版。
//!
//! 按显示宽度（unicode-width，CJK 计 2 列）折行；一列约等于半个字号的像素宽度。

use std::fmt::Write;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use unicode_width::UnicodeWidthChar;

const PADDING: f64 = 32.0;
const BODY_SIZE: f64 = 16.0;
const LINE_HEIGHT: f64 = 1.5;
const BACKGROUND: &str = "#ffffff";
const TEXT_COLOR: &str = "#222222";
const MUTED_COLOR: &str = "#666666";
const CODE_BG: &str = "#f3f3f3";

/// 排版参数
#[derive(Debug, Clone)]
pub(crate) struct TextStyle {
    pub width: u32,
    pub font_family: String,
}

impl TextStyle {
    pub fn new(width: u32, font_family: &str) -> Self {
        Self {
            width,
            font_family: font_family.to_string(),
        }
    }

    /// 给定字号下一行可容纳的显示列数
    fn columns(&self, font_size: f64) -> usize {
        let usable = (self.width as f64 - PADDING * 2.0).max(font_size);
        ((usable / (font_size / 2.0)).floor() as usize).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Heading(u8),
    Body,
    Quote,
    Code,
    Rule,
    Gap,
}

impl LineKind {
    fn font_size(&self) -> f64 {
        match self {
            LineKind::Heading(1) => 28.0,
            LineKind::Heading(2) => 24.0,
            LineKind::Heading(3) => 20.0,
            LineKind::Heading(_) => 18.0,
            LineKind::Code => 14.0,
            _ => BODY_SIZE,
        }
    }

    fn height(&self) -> f64 {
        match self {
            LineKind::Gap => BODY_SIZE * 0.6,
            LineKind::Rule => BODY_SIZE,
            other => other.font_size() * LINE_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    kind: LineKind,
    text: String,
}

/// 按显示宽度折行，保留原有换行
fn wrap_by_display_width(text: &str, max_width: usize) -> Vec<String> {
    let mut out = Vec::<String>::new();
    for raw in text.split('\n') {
        let mut current = String::new();
        let mut current_w = 0usize;
        for ch in raw.chars() {
            if ch == '\r' {
                continue;
            }
            let ch_w = UnicodeWidthChar::width(ch).unwrap_or(0).max(1);
            if current_w + ch_w > max_width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_w = 0;
            }
            current.push(ch);
            current_w += ch_w;
        }
        out.push(current);
    }
    out
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn push_wrapped(lines: &mut Vec<Line>, kind: LineKind, text: &str, style: &TextStyle) {
    for piece in wrap_by_display_width(text, style.columns(kind.font_size())) {
        lines.push(Line { kind, text: piece });
    }
}

fn plain_text_lines(text: &str, style: &TextStyle) -> Vec<Line> {
    let mut lines = Vec::new();
    push_wrapped(&mut lines, LineKind::Body, text, style);
    lines
}

fn heading_rank(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Markdown → 行序列：标题、段落、列表项、引用、代码块、分隔线
fn markdown_lines(markdown: &str, style: &TextStyle) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut buf = String::new();
    let mut kind = LineKind::Body;
    // 每层列表的下一个序号（None 为无序列表）
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut in_quote = false;

    let flush = |lines: &mut Vec<Line>, buf: &mut String, kind: LineKind| {
        if !buf.trim().is_empty() {
            let text = std::mem::take(buf);
            push_wrapped(lines, kind, text.trim_end(), style);
            lines.push(Line {
                kind: LineKind::Gap,
                text: String::new(),
            });
        }
        buf.clear();
    };

    for event in Parser::new_ext(markdown, Options::empty()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush(&mut lines, &mut buf, kind);
                kind = LineKind::Heading(heading_rank(level));
            }
            Event::End(TagEnd::Heading(_)) => {
                flush(&mut lines, &mut buf, kind);
                kind = LineKind::Body;
            }
            Event::Start(Tag::Paragraph) => {
                if lists.is_empty() {
                    kind = if in_quote { LineKind::Quote } else { LineKind::Body };
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if lists.is_empty() {
                    flush(&mut lines, &mut buf, kind);
                }
            }
            Event::Start(Tag::BlockQuote(_)) => in_quote = true,
            Event::End(TagEnd::BlockQuote(_)) => in_quote = false,
            Event::Start(Tag::List(start)) => {
                flush(&mut lines, &mut buf, kind);
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                flush(&mut lines, &mut buf, kind);
                kind = LineKind::Body;
                let indent = "  ".repeat(lists.len().saturating_sub(1));
                let marker = match lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{n}. ");
                        *n += 1;
                        m
                    }
                    _ => "• ".to_string(),
                };
                buf.push_str(&indent);
                buf.push_str(&marker);
            }
            Event::End(TagEnd::Item) => flush(&mut lines, &mut buf, kind),
            Event::Start(Tag::CodeBlock(_)) => {
                flush(&mut lines, &mut buf, kind);
                kind = LineKind::Code;
            }
            Event::End(TagEnd::CodeBlock) => {
                flush(&mut lines, &mut buf, kind);
                kind = LineKind::Body;
            }
            Event::Text(text) | Event::Code(text) => buf.push_str(&text),
            Event::SoftBreak => buf.push(' '),
            Event::HardBreak => buf.push('\n'),
            Event::Rule => {
                flush(&mut lines, &mut buf, kind);
                lines.push(Line {
                    kind: LineKind::Rule,
                    text: String::new(),
                });
            }
            _ => {}
        }
    }
    flush(&mut lines, &mut buf, kind);

    while lines.last().is_some_and(|l| l.kind == LineKind::Gap) {
        lines.pop();
    }
    lines
}

fn lines_to_svg(lines: &[Line], style: &TextStyle) -> String {
    let width = style.width as f64;
    let content_h: f64 = lines.iter().map(|l| l.kind.height()).sum();
    let height = (content_h + PADDING * 2.0).ceil();
    let family = escape_xml(&style.font_family);

    let mut svg = String::with_capacity(256 + lines.len() * 96);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><rect width="100%" height="100%" fill="{BACKGROUND}"/>"#
    );

    let mut y = PADDING;
    for line in lines {
        let h = line.kind.height();
        match line.kind {
            LineKind::Gap => {}
            LineKind::Rule => {
                let mid = y + h / 2.0;
                let _ = write!(
                    svg,
                    r#"<line x1="{PADDING}" y1="{mid}" x2="{x2}" y2="{mid}" stroke="{MUTED_COLOR}" stroke-width="1"/>"#,
                    x2 = width - PADDING
                );
            }
            kind => {
                let size = kind.font_size();
                let baseline = y + size * 1.15;
                let (fill, weight, font) = match kind {
                    LineKind::Heading(_) => (TEXT_COLOR, "bold", family.as_str()),
                    LineKind::Quote => (MUTED_COLOR, "normal", family.as_str()),
                    LineKind::Code => (TEXT_COLOR, "normal", "monospace"),
                    _ => (TEXT_COLOR, "normal", family.as_str()),
                };
                if kind == LineKind::Code {
                    let _ = write!(
                        svg,
                        r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{CODE_BG}"/>"#,
                        x = PADDING - 6.0,
                        w = width - PADDING * 2.0 + 12.0
                    );
                }
                let _ = write!(
                    svg,
                    r#"<text x="{PADDING}" y="{baseline}" font-family="{font}" font-size="{size}" font-weight="{weight}" fill="{fill}" xml:space="preserve">{}</text>"#,
                    escape_xml(&line.text)
                );
            }
        }
        y += h;
    }
    svg.push_str("</svg>");
    svg
}

pub(crate) fn plain_text_to_svg(text: &str, style: &TextStyle) -> String {
    lines_to_svg(&plain_text_lines(text, style), style)
}

pub(crate) fn markdown_to_svg(markdown: &str, style: &TextStyle) -> String {
    lines_to_svg(&markdown_lines(markdown, style), style)
}
