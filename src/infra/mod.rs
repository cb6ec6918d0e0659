pub mod openai_summarizer;
