// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text-run index over a WordprocessingML part.
//
// Word splits visible text into `<w:t>` elements wherever formatting, spell
// check or revision marks change, so `{{name}}` can arrive as `{{na` + `me}}`.
// `RunIndex` flattens every `<w:t>` into one string and remembers which byte
// range of that string belongs to which element, so token matches found in
// the flattened text can be mapped back onto the runs that own them.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// `<w:t>`, `<w:t xml:space="preserve">` and self-closing `<w:t/>`.
/// `<w:tab/>`, `<w:tbl>` and friends do not match.
static TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*?)?(?:/>|>([^<]*)</w:t>)").expect("text element pattern is valid")
});

/// Paragraph openings: `<w:p>`, `<w:p w:rsidR=..>`, `<w:p/>`; not `<w:pPr>`.
static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:p[\s>/]").expect("paragraph pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    /// Byte range of the whole `<w:t ...>...</w:t>` element in the part.
    pub element: Range<usize>,
    /// Unescaped visible text.
    pub text: String,
    /// Index of the enclosing paragraph, in document order.
    pub paragraph: usize,
    /// Start of this run's text in [`RunIndex::text`].
    pub offset: usize,
}

impl TextRun {
    fn covers(&self, pos: usize) -> bool {
        pos >= self.offset && pos < self.offset + self.text.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunIndex {
    pub runs: Vec<TextRun>,
    /// Concatenation of every run's text.
    pub text: String,
}

impl RunIndex {
    pub fn build(xml: &str) -> Self {
        let paragraph_starts: Vec<usize> = PARAGRAPH_RE.find_iter(xml).map(|m| m.start()).collect();

        let mut index = RunIndex::default();
        for caps in TEXT_RE.captures_iter(xml) {
            let Some(whole) = caps.get(0) else { continue };
            let text = caps.get(1).map(|m| unescape(m.as_str())).unwrap_or_default();
            let paragraph = paragraph_starts.partition_point(|start| *start < whole.start());
            let offset = index.text.len();
            index.text.push_str(&text);
            index.runs.push(TextRun {
                element: whole.range(),
                text,
                paragraph,
                offset,
            });
        }
        index
    }

    /// First and last run owning the non-empty flattened `range`.
    pub fn span(&self, range: &Range<usize>) -> Option<(usize, usize)> {
        if range.is_empty() {
            return None;
        }
        let first = self.runs.iter().position(|r| r.covers(range.start))?;
        let last = self.runs[first..]
            .iter()
            .position(|r| r.covers(range.end - 1))
            .map(|i| first + i)?;
        Some((first, last))
    }

    /// Re-serialise `xml` with the runs in `changed` rewritten from `texts`.
    ///
    /// Elements not listed are copied byte for byte. `render` supplies the
    /// replacement markup for one run.
    pub fn rewrite<F>(&self, xml: &str, changed: &[usize], mut render: F) -> String
    where
        F: FnMut(usize) -> String,
    {
        let mut sorted = changed.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut out = String::with_capacity(xml.len() + 64 * sorted.len());
        let mut cursor = 0;
        for idx in sorted {
            let element = &self.runs[idx].element;
            out.push_str(&xml[cursor..element.start]);
            out.push_str(&render(idx));
            cursor = element.end;
        }
        out.push_str(&xml[cursor..]);
        out
    }
}

/// A `<w:t>` element that keeps leading and trailing spaces.
pub fn text_element(text: &str) -> String {
    format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape(text))
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
