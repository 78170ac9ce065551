pub mod chat_completion;

pub use chat_completion::{
    ChatCompletionResponse, ChatMessage, ChatOptions, ChatRequest, Choice, ChoiceMessage,
};
