// Document intake: PDF text extraction and per-request document assembly.
// Nothing here calls the LLM; intake failures never cost a provider call.

pub mod documents;
pub mod extract;
