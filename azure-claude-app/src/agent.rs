use azure_claude::{CancellationToken, ChatClient, ChatMessage, ChatOptions};

/// A named instruction set run against any chat client.
pub struct Agent<'a> {
    name: String,
    instructions: String,
    client: &'a dyn ChatClient,
    options: Option<ChatOptions>,
}

impl<'a> Agent<'a> {
    pub fn new(client: &'a dyn ChatClient, name: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            instructions: instructions.to_string(),
            client,
            options: None,
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = Some(options);
        self
    }

    #[tracing::instrument(level = "info", skip_all, fields(agent = %self.name))]
    pub async fn run(&self, task: &str, cancel: &CancellationToken) -> anyhow::Result<String> {
        let messages = vec![
            ChatMessage::system(self.instructions.clone()),
            ChatMessage::user(task),
        ];
        let completion = self
            .client
            .complete(&messages, self.options.as_ref(), cancel)
            .await?;
        Ok(completion.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use azure_claude::{
        Capability, ChatClientMetadata, ChatCompletion, Role, UpdateStream, UsageDetails,
    };
    use std::sync::Mutex;

    struct EchoClient {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl ChatClient for EchoClient {
        fn metadata(&self) -> ChatClientMetadata {
            ChatClientMetadata {
                provider_name: "echo".to_string(),
                model_id: "echo-1".to_string(),
            }
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            _options: Option<&ChatOptions>,
            _cancel: &CancellationToken,
        ) -> azure_claude::Result<ChatCompletion> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.extend_from_slice(messages);
            }
            let last = messages.last().map(ChatMessage::text).unwrap_or_default();
            Ok(ChatCompletion {
                completion_id: None,
                model_id: None,
                message: ChatMessage::assistant(format!("echo: {last}")),
                finish_reason: None,
                usage: UsageDetails::default(),
            })
        }

        async fn complete_streaming(
            &self,
            _messages: &[ChatMessage],
            _options: Option<&ChatOptions>,
            _cancel: &CancellationToken,
        ) -> azure_claude::Result<UpdateStream> {
            Ok(Box::pin(futures_util::stream::empty()))
        }

        fn get_service(&self, capability: Capability) -> Option<&dyn ChatClient> {
            (capability == Capability::ChatClient).then_some(self as &dyn ChatClient)
        }
    }

    #[tokio::test]
    async fn run_sends_instructions_then_task() {
        let client = EchoClient {
            seen: Mutex::new(Vec::new()),
        };
        let agent = Agent::new(&client, "Writer", "Write engaging stories.");
        let out = agent
            .run("a haunted house", &CancellationToken::new())
            .await
            .expect("run");
        assert_eq!(out, "echo: a haunted house");

        let seen = client.seen.lock().expect("lock").clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, Role::System);
        assert_eq!(seen[0].text(), "Write engaging stories.");
        assert_eq!(seen[1].role, Role::User);
    }
}
