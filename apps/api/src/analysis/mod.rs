// Exam analysis: the four-stage prompt pipeline and its HTTP handler.
// All LLM calls go through llm_client; no direct provider calls here.

pub mod handlers;
pub mod pipeline;
pub mod prompts;
