use clap::Parser;

use crate::client::ChatConfig;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Chat-completions endpoint URL every request is sent to.
    #[arg(long, env = "CHAT_ENDPOINT")]
    pub endpoint: String,

    /// Bearer credential attached to every request, if set.
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub api_key: String,

    /// Model identifier carried in the request payload.
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-3.5-turbo")]
    pub model: String,

    /// Input hint shown before the prompt; has no effect on the protocol.
    #[arg(long, env = "CHAT_PLACEHOLDER", default_value = "Type a message...")]
    pub placeholder: String,

    /// Disable streamed delivery and await each reply as one document.
    #[arg(long, env = "CHAT_NO_STREAM", default_value = "false")]
    pub no_stream: bool,
}

impl Args {
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            endpoint: self.endpoint.clone(),
            credential: Some(self.api_key.clone()).filter(|k| !k.is_empty()),
            model: self.model.clone(),
            placeholder: self.placeholder.clone(),
            streaming_enabled: !self.no_stream,
        }
    }
}
