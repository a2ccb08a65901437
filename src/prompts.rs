//! Prompts for the vision transcription engine.
//!
//! The vision engine is used as a plain OCR engine: it must return the text
//! on the page and nothing else. Field extraction happens afterwards with
//! deterministic patterns, so the prompt deliberately does not ask the model
//! to find names or scores itself.

/// System prompt sent with every page image.
pub const TRANSCRIPTION_PROMPT: &str = r#"You are an OCR engine. Transcribe the text visible in the document image exactly as printed.

Rules:

1. Output ONLY the transcribed text. No commentary, no explanations, no Markdown.
2. Keep the reading order a human would use. Put each printed line on its own line.
3. Keep labels next to their values on the same line (e.g. "CGPA: 8.5/10", "Available Balance: INR 12,500.00").
4. Copy numbers, decimal points, currency symbols and percent signs exactly. Never round or reformat a number.
5. Do not correct spelling, do not translate, do not guess text you cannot read.
6. Ignore logos, stamps, signatures, watermarks and decorative lines.
7. If the image contains no readable text, output nothing."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_forbids_commentary_and_reformatting() {
        assert!(TRANSCRIPTION_PROMPT.contains("ONLY the transcribed text"));
        assert!(TRANSCRIPTION_PROMPT.contains("Never round"));
    }
}
