//! Fenced code blocks in tutor answers, and which buffer each one targets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Language;

/// Number of leading characters of the code that go into a block identity.
pub const IDENTITY_EXCERPT_CHARS: usize = 30;

const MIN_FENCE_LEN: usize = 3;
const MAX_FENCE_INDENT: usize = 3;

/// Language of a fenced block after normalizing its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockLanguage {
    #[serde(rename = "html")]
    Markup,
    #[serde(rename = "css")]
    Style,
    #[serde(rename = "javascript")]
    Script,
    #[serde(rename = "unrecognized")]
    Unrecognized,
}

impl BlockLanguage {
    /// Normalization table for fence tags. Matching ignores ASCII case.
    ///
    /// | tag                  | language     |
    /// |----------------------|--------------|
    /// | `html`               | Markup       |
    /// | `css`                | Style        |
    /// | `js`, `javascript`   | Script       |
    /// | anything else, none  | Unrecognized |
    #[must_use]
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return BlockLanguage::Unrecognized;
        };
        match tag.to_ascii_lowercase().as_str() {
            "html" => BlockLanguage::Markup,
            "css" => BlockLanguage::Style,
            "js" | "javascript" => BlockLanguage::Script,
            _ => BlockLanguage::Unrecognized,
        }
    }

    /// The buffer this block can be applied to.
    #[must_use]
    pub fn target(self) -> Option<Language> {
        match self {
            BlockLanguage::Markup => Some(Language::Markup),
            BlockLanguage::Style => Some(Language::Style),
            BlockLanguage::Script => Some(Language::Script),
            BlockLanguage::Unrecognized => None,
        }
    }
}

/// Fingerprint of a block: message id, target and the start of the code.
/// Stable across re-renders of the same message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockIdentity(String);

impl BlockIdentity {
    #[must_use]
    pub fn new(message_id: &str, language: BlockLanguage, tag: Option<&str>, code: &str) -> Self {
        let kind = match language.target() {
            Some(target) => target.as_str(),
            None => tag.unwrap_or("plain"),
        };
        let excerpt: String = code.chars().take(IDENTITY_EXCERPT_CHARS).collect();
        Self(format!("{message_id}-{kind}-{excerpt}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: BlockLanguage,
    /// The tag as written after the opening fence, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tag: Option<String>,
    pub code: String,
    pub identity: BlockIdentity,
}

impl CodeBlock {
    /// Only blocks targeting one of the three buffers get an apply action.
    #[must_use]
    pub fn is_applicable(&self) -> bool {
        self.language.target().is_some()
    }

    #[must_use]
    pub fn target(&self) -> Option<Language> {
        self.language.target()
    }
}

struct Fence {
    indent: usize,
    marker: char,
    len: usize,
    tag: Option<String>,
}

/// Parses a line as an opening fence.
fn opening_fence(line: &str) -> Option<Fence> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > MAX_FENCE_INDENT {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.len() - rest.trim_start_matches(marker).len();
    if len < MIN_FENCE_LEN {
        return None;
    }

    let info = rest[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }

    Some(Fence {
        indent,
        marker,
        len,
        tag: info.split_whitespace().next().map(str::to_string),
    })
}

fn closes(fence: &Fence, line: &str) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > MAX_FENCE_INDENT {
        return false;
    }
    let rest = &line[indent..];
    let len = rest.len() - rest.trim_start_matches(fence.marker).len();
    len >= fence.len && rest[len..].trim().is_empty()
}

fn strip_indent(line: &str, indent: usize) -> &str {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    &line[spaces.min(indent)..]
}

/// Splits a line into its text and whether it was newline-terminated.
/// `\r\n` endings count as `\n`.
fn split_line_ending(raw: &str) -> (&str, bool) {
    match raw.strip_suffix('\n') {
        Some(text) => (text.strip_suffix('\r').unwrap_or(text), true),
        None => (raw, false),
    }
}

fn finish_block(message_id: &str, fence: Fence, mut content: String) -> CodeBlock {
    // Exactly one trailing newline belongs to the fence, not the code.
    if content.ends_with('\n') {
        content.pop();
    }
    let language = BlockLanguage::from_tag(fence.tag.as_deref());
    let identity = BlockIdentity::new(message_id, language, fence.tag.as_deref(), &content);
    CodeBlock {
        language,
        tag: fence.tag,
        code: content,
        identity,
    }
}

/// Extracts every fenced code block of a markdown message, in order.
///
/// Content is taken literally, each line with its line ending, and then
/// exactly one trailing newline is removed. A fence that is never closed
/// runs to the end of the message.
#[must_use]
pub fn extract_code_blocks(message_id: &str, markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(Fence, String)> = None;

    for raw in markdown.split_inclusive('\n') {
        let (line, terminated) = split_line_ending(raw);

        match open.take() {
            None => {
                if let Some(fence) = opening_fence(line) {
                    open = Some((fence, String::new()));
                }
            }
            Some((fence, mut content)) => {
                if closes(&fence, line) {
                    blocks.push(finish_block(message_id, fence, content));
                } else {
                    content.push_str(strip_indent(line, fence.indent));
                    if terminated {
                        content.push('\n');
                    }
                    open = Some((fence, content));
                }
            }
        }
    }

    if let Some((fence, content)) = open {
        blocks.push(finish_block(message_id, fence, content));
    }

    blocks
}
