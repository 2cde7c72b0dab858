/// Remove `<think>...</think>` reasoning segments from model output.
///
/// Unclosed `<think>` tags are left alone. A closing tag with no opener
/// (models that receive the opener in their chat template) drops
/// everything before it.
pub fn strip_thinking_tokens(text: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut out = text.to_string();
    while let Some(start) = out.find(OPEN) {
        let Some(end) = out[start..].find(CLOSE).map(|offset| start + offset) else {
            break;
        };
        out.replace_range(start..end + CLOSE.len(), "");
    }

    if let Some(end) = out.find(CLOSE) {
        if !out[..end].contains(OPEN) {
            out.replace_range(..end + CLOSE.len(), "");
        }
    }

    out.trim().to_string()
}
