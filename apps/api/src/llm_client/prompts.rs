// Cross-cutting prompt fragments shared by every pipeline stage.
// Stage-specific prompts live in analysis::prompts.

/// Appended to every stage's system prompt. Stage outputs are fed verbatim
/// into later prompts.
pub const CONTENT_ONLY_INSTRUCTION: &str = "\
    Respond with the requested content only. \
    Do NOT add greetings, preambles, closing remarks or apologies.";

/// Reminds the model that the input came out of a PDF text layer.
pub const EXTRACTED_TEXT_NOTICE: &str = "\
    The input was extracted automatically from PDF documents. \
    It may contain broken line wraps, page headers, page numbers and stray symbols; \
    ignore that noise.";
