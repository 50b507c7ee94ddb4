//! Scripted conversations that exercise a live deployment.

use crate::agent::Agent;
use azure_claude::{
    CancellationToken, ChatClient, ChatCompletion, ChatMessage, ChatOptions, FinishReason,
};
use futures_util::StreamExt;
use std::io::Write;

pub async fn complete(
    client: &dyn ChatClient,
    prompt: &str,
    system: Option<&str>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut messages = Vec::new();
    if let Some(system) = system {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(prompt));

    let completion = client.complete(&messages, None, cancel).await?;
    println!("{}", completion.text());
    print_usage(&completion);
    Ok(())
}

/// Prints deltas as they arrive; returns the accumulated text.
pub async fn stream(
    client: &dyn ChatClient,
    prompt: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<String> {
    let messages = [ChatMessage::user(prompt)];
    let mut updates = client.complete_streaming(&messages, None, cancel).await?;

    let mut text = String::new();
    let mut finish = None;
    let mut stdout = std::io::stdout();
    while let Some(update) = updates.next().await {
        let update = update?;
        if let Some(delta) = update.text.as_deref() {
            text.push_str(delta);
            write!(stdout, "{delta}")?;
            stdout.flush()?;
        }
        if update.finish_reason.is_some() {
            finish = update.finish_reason;
        }
    }
    println!();
    tracing::debug!(chars = text.len(), finish = ?finish, "stream finished");
    Ok(text)
}

/// Three turns where each answer is fed back as assistant history.
pub async fn multi_turn(client: &dyn ChatClient, cancel: &CancellationToken) -> anyhow::Result<()> {
    let questions = [
        "Name a famous physicist.",
        "What is one discovery they are known for?",
        "Explain that discovery to a ten year old in two sentences.",
    ];
    let options = ChatOptions::default().with_max_output_tokens(256);
    let mut history = vec![ChatMessage::system(
        "You are a concise assistant. Keep answers short.",
    )];

    for question in questions {
        history.push(ChatMessage::user(question));
        let completion = client.complete(&history, Some(&options), cancel).await?;
        let answer = completion.text();
        println!("> {question}\n{answer}\n");
        if completion.finish_reason == Some(FinishReason::Length) {
            tracing::warn!("answer truncated at max_output_tokens");
        }
        history.push(completion.message);
    }
    Ok(())
}

pub async fn agent(
    client: &dyn ChatClient,
    instructions: &str,
    task: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let writer = Agent::new(client, "Writer", instructions)
        .with_options(ChatOptions::default().with_temperature(0.7));
    let out = writer.run(task, cancel).await?;
    println!("{out}");
    Ok(())
}

/// The default run: one of each flow.
pub async fn run_all(client: &dyn ChatClient, cancel: &CancellationToken) -> anyhow::Result<()> {
    println!("== simple completion ==");
    complete(
        client,
        "What is the capital of France?",
        Some("Answer in one sentence."),
        cancel,
    )
    .await?;

    println!("\n== streaming ==");
    stream(client, "Count from one to five in words.", cancel).await?;

    println!("\n== multi-turn ==");
    multi_turn(client, cancel).await?;

    println!("== agent ==");
    agent(
        client,
        "You are a writer. Write short, vivid stories.",
        "Write a three sentence story about a lighthouse keeper.",
        cancel,
    )
    .await
}

fn print_usage(completion: &ChatCompletion) {
    let usage = &completion.usage;
    println!(
        "[tokens: input={} output={} total={}; finish={:?}]",
        usage.input_tokens, usage.output_tokens, usage.total_tokens, completion.finish_reason
    );
}
