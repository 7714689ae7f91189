// ABOUTME: LLM backend implementations.
// ABOUTME: OpenAI Responses streaming, the SSE decoder it uses, and a scripted mock.

pub mod mock;
pub mod openai;
pub mod sse;
