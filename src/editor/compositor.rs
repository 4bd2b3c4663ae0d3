//! Builds the preview document from the three buffers.
//!
//! The output is a pure function of the input: no timestamps, no random
//! nonces, no caching. Callers recompose on every change.

use crate::types::CodeState;

/// Capabilities granted to the preview: scripts and modal dialogs only.
/// No same-origin access, no top-level navigation, no forms or popups.
pub const SANDBOX_FLAGS: &str = "allow-scripts allow-modals";

/// Headers for serving a composed document on its own. The CSP `sandbox`
/// directive gives the document a unique opaque origin.
pub const SANDBOX_HEADERS: [(&str, &str); 3] = [
    (
        "content-security-policy",
        "sandbox allow-scripts allow-modals",
    ),
    ("referrer-policy", "no-referrer"),
    ("x-content-type-options", "nosniff"),
];

/// Fixed parts of the composed document, in order around the style, the
/// markup and the script. The browser editor rebuilds the same document
/// from these on every keystroke.
pub const DOCUMENT_SHELL: [&str; 4] = [
    "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
     <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n<style>\n",
    "\n</style>\n</head>\n<body>\n",
    "\n<script>\ntry {\n",
    "\n} catch (error) {\n  console.error('JavaScript Error:', error);\n}\n</script>\n</body>\n</html>\n",
];

/// Composes a complete HTML document.
///
/// Style goes into `<style>`, markup is placed verbatim in `<body>`, and the
/// script runs last inside `try`/`catch` so a thrown error is reported to the
/// document's console instead of escaping. A script that fails to parse only
/// loses its own `<script>` element; markup and style are already in place.
#[must_use]
pub fn compose(code: &CodeState) -> String {
    let style = escape_closing_tag(&code.style, "style");
    let script = escape_closing_tag(&code.script, "script");
    let [head, style_end, body_end, tail] = DOCUMENT_SHELL;

    let mut doc = String::with_capacity(code.markup.len() + style.len() + script.len() + 512);
    doc.push_str(head);
    doc.push_str(&style);
    doc.push_str(style_end);
    doc.push_str(&code.markup);
    doc.push_str(body_end);
    doc.push_str(&script);
    doc.push_str(tail);
    doc
}

/// Wraps the composed document in a sandboxed `<iframe srcdoc>` for hosts
/// that embed the preview inline.
#[must_use]
pub fn iframe_srcdoc(code: &CodeState) -> String {
    format!(
        "<iframe sandbox=\"{SANDBOX_FLAGS}\" title=\"Preview\" srcdoc=\"{}\"></iframe>",
        escape_attribute(&compose(code))
    )
}

/// Rewrites `</tag` (any case) to `<\/tag` so user text cannot terminate
/// the raw-text element it is embedded in.
fn escape_closing_tag(text: &str, tag: &str) -> String {
    let needle_len = tag.len() + 2;
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("</") {
        let candidate = &rest[pos..];
        let is_match = candidate.len() >= needle_len
            && candidate.is_char_boundary(needle_len)
            && candidate[2..needle_len].eq_ignore_ascii_case(tag);

        out.push_str(&rest[..pos]);
        if is_match {
            out.push_str("<\\/");
        } else {
            out.push_str("</");
        }
        rest = &rest[pos + 2..];
    }

    out.push_str(rest);
    out
}

fn escape_attribute(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}
