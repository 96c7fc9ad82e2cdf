//! Main chat loop orchestration.
//!
//! Wires the engine against the infra adapters, then runs the input loop:
//! session commands, message sends, and streaming render driven by the
//! turn event bus.

use std::io::Write;
use std::sync::Arc;

use console::style;
use rustyline_async::{Readline, ReadlineEvent};
use tracing::{warn, Instrument};
use uuid::Uuid;

use suasion_core::chat::{ChatService, ChatSettings};
use suasion_core::event::EventBus;
use suasion_core::llm::BoxChatProvider;
use suasion_core::retrieval::BoxContextRetriever;
use suasion_core::speech::BoxSpeechSynthesizer;
use suasion_core::store::ConversationStore;
use suasion_infra::llm::OpenAiProvider;
use suasion_infra::retrieval::AssistantContextRetriever;
use suasion_infra::secret::EnvSecretSource;
use suasion_infra::speech::ElevenLabsSpeech;
use suasion_infra::store::InMemoryConversationStore;
use suasion_observe::genai_attrs;
use suasion_types::config::StudyConfig;
use suasion_types::conversation::{ChatMode, Phase};
use suasion_types::event::TurnEvent;
use suasion_types::llm::MessageRole;

use super::banner::print_welcome_banner;
use super::commands::{self, SessionCommand};

type Service = ChatService<InMemoryConversationStore>;

/// Run the interactive chat loop.
pub async fn run(config: StudyConfig) -> anyhow::Result<()> {
    let api_key = EnvSecretSource::get("OPENAI_API_KEY")
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
    let provider = OpenAiProvider::openai(&api_key, &config.model);

    let store = Arc::new(InMemoryConversationStore::new());
    let events = EventBus::new(1024);
    let settings = ChatSettings::from_study(&config);
    let mut service = ChatService::new(
        Arc::clone(&store),
        BoxChatProvider::new(provider),
        settings,
        events,
    );

    let mut retrieval_active = false;
    if config.retrieval.enabled {
        match EnvSecretSource::get("RETRIEVAL_API_KEY") {
            Some(key) => match AssistantContextRetriever::new(&config.retrieval, key) {
                Ok(retriever) => {
                    service = service.with_retriever(BoxContextRetriever::new(retriever));
                    retrieval_active = true;
                }
                Err(e) => warn!(error = %e, "retrieval disabled"),
            },
            None => warn!("RETRIEVAL_API_KEY is not set, retrieval disabled"),
        }
    }

    let mut speech_active = false;
    if config.speech.enabled {
        match EnvSecretSource::get("ELEVENLABS_API_KEY") {
            Some(key) => match ElevenLabsSpeech::new(&config.speech, key) {
                Ok(speech) => {
                    service = service.with_speech(BoxSpeechSynthesizer::new(speech));
                    speech_active = true;
                }
                Err(e) => warn!(error = %e, "speech disabled"),
            },
            None => warn!("ELEVENLABS_API_KEY is not set, speech disabled"),
        }
    }

    let service = Arc::new(service);
    let dialogue = service.state().create_dialogue().await?;
    let mut active = dialogue.id;
    let mut mode = ChatMode::Immediate;

    print_welcome_banner(
        &config.model,
        &active.to_string(),
        retrieval_active,
        speech_active,
    );

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut readline, _writer) = Readline::new(prompt)?;

    loop {
        match readline.readline().await {
            Ok(ReadlineEvent::Eof) | Err(_) => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            Ok(ReadlineEvent::Interrupted) => {
                if service.abort_turn(&active) {
                    println!("\n  {}", style("Turn aborted.").dim());
                } else {
                    println!(
                        "\n  {}",
                        style("Press Ctrl+D to exit, or keep chatting.").dim()
                    );
                }
                continue;
            }
            Ok(ReadlineEvent::Line(line)) => {
                let text = line.trim().to_string();
                if text.is_empty() {
                    continue;
                }

                if let Some(command) = commands::parse(&text) {
                    match command {
                        SessionCommand::Help => commands::print_help(),
                        SessionCommand::Exit => {
                            println!("\n  {}", style("Session ended.").dim());
                            break;
                        }
                        SessionCommand::New => {
                            let dialogue = service.state().create_dialogue().await?;
                            active = dialogue.id;
                            println!(
                                "\n  {} {}\n",
                                style("New dialogue:").bold(),
                                style(&active.to_string()[..8]).dim()
                            );
                        }
                        SessionCommand::Memo => {
                            active = toggle_memo(&service, active).await?;
                        }
                        SessionCommand::Topic {
                            topic,
                            standpoint,
                            strategy,
                        } => {
                            match service
                                .state()
                                .bind_config(&active, Some(topic), &standpoint, &strategy)
                                .await
                            {
                                Ok(config) => {
                                    println!(
                                        "\n  {} {}\n",
                                        style("Topic bound:").bold(),
                                        style(config.topic.as_deref().unwrap_or_default()).dim()
                                    );
                                    print_latest_assistant(&service, &active).await;
                                }
                                Err(e) => {
                                    println!("\n  {} {e}\n", style("!").yellow().bold());
                                }
                            }
                        }
                        SessionCommand::Mode(new_mode) => {
                            mode = new_mode;
                            println!(
                                "\n  {} {}\n",
                                style("Mode:").bold(),
                                style(mode.to_string()).dim()
                            );
                        }
                        SessionCommand::Abort => {
                            let aborted = service.abort_turn(&active);
                            println!(
                                "\n  {}\n",
                                style(if aborted { "Turn aborted." } else { "Nothing in flight." })
                                    .dim()
                            );
                        }
                        SessionCommand::History => {
                            print_history(&service, &active).await;
                        }
                    }
                    continue;
                }

                run_turn(&service, active, mode, &config.model, &text).await?;
            }
        }
    }

    Ok(())
}

/// Send one message and render the streamed response from the event bus.
async fn run_turn(
    service: &Arc<Service>,
    conversation_id: Uuid,
    mode: ChatMode,
    model: &str,
    text: &str,
) -> anyhow::Result<()> {
    let mut rx = service.events().subscribe();

    let span = tracing::info_span!(
        "chat_turn",
        otel.name = %genai_attrs::span_name(genai_attrs::OP_CHAT, model),
        gen_ai.operation.name = genai_attrs::OP_CHAT,
        gen_ai.provider.name = genai_attrs::PROVIDER_OPENAI,
        gen_ai.request.model = %model,
    );
    let svc = Arc::clone(service);
    let message = text.to_string();
    let mut handle = tokio::spawn(
        async move { svc.send_user_message(conversation_id, mode, &message).await }
            .instrument(span),
    );

    let mut streaming_started = false;
    let send_result = loop {
        tokio::select! {
            result = &mut handle => break result,
            event = rx.recv() => match event {
                Ok(event) => render_event(&event, conversation_id, &mut streaming_started),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break (&mut handle).await,
            },
        }
    };

    // Drain events published just before the send resolved.
    while let Ok(event) = rx.try_recv() {
        render_event(&event, conversation_id, &mut streaming_started);
    }

    let outcome = send_result?.map_err(anyhow::Error::from)?;

    if let Some(outcome) = outcome {
        if let Ok(Some(conversation)) = service.store().get_conversation(&conversation_id).await {
            let message = conversation
                .messages
                .iter()
                .find(|m| m.id == outcome.message_id);
            if let Some(suggestions) = message.and_then(|m| m.suggestions.as_ref()) {
                println!("  {}", style("Try asking:").bold());
                for suggestion in suggestions {
                    println!("    {} {}", style("-").dim(), style(suggestion).dim());
                }
                println!();
            }
        }
    }

    Ok(())
}

/// Print one turn event, if it belongs to the active conversation.
fn render_event(event: &TurnEvent, active: Uuid, streaming_started: &mut bool) {
    match event {
        TurnEvent::TextDelta {
            conversation_id,
            text,
            ..
        } if *conversation_id == active => {
            if !*streaming_started {
                print!("\n  {} ", style("Assistant >").cyan().bold());
                *streaming_started = true;
            }
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
        TurnEvent::TurnCompleted { conversation_id, .. } if *conversation_id == active => {
            println!("\n");
        }
        TurnEvent::TurnCancelled { conversation_id, .. } if *conversation_id == active => {
            println!("\n  {}\n", style("(turn cancelled)").dim());
        }
        TurnEvent::TurnFailed {
            conversation_id,
            error,
            ..
        } if *conversation_id == active => {
            println!("\n  {} {error}\n", style("!").red().bold());
        }
        TurnEvent::TitleSet { conversation_id, title } if *conversation_id == active => {
            println!("  {} {}\n", style("Titled:").bold(), style(title).dim());
        }
        _ => {}
    }
}

/// Switch between a dialogue and its paired memo, spawning the memo on the
/// first toggle.
async fn toggle_memo(service: &Arc<Service>, active: Uuid) -> anyhow::Result<Uuid> {
    let conversation = service
        .store()
        .get_conversation(&active)
        .await?
        .ok_or_else(|| anyhow::anyhow!("active conversation vanished"))?;

    match conversation.phase {
        Phase::Memo => {
            let dialogue_id = conversation.paired_dialogue_id.unwrap_or(active);
            println!("\n  {}\n", style("Back to the dialogue.").dim());
            Ok(dialogue_id)
        }
        Phase::Dialogue => match conversation.paired_memo_id {
            Some(memo_id) => {
                println!("\n  {}\n", style("Switched to the opinion memo.").dim());
                Ok(memo_id)
            }
            None => {
                let memo = service.state().spawn_memo(&active).await?;
                println!(
                    "\n  {}\n",
                    style("Opinion memo opened (split view).").dim()
                );
                print_latest_assistant(service, &memo.id).await;
                Ok(memo.id)
            }
        },
    }
}

/// Print the most recent assistant message (e.g., a seeded greeting).
async fn print_latest_assistant(service: &Arc<Service>, conversation_id: &Uuid) {
    if let Ok(Some(conversation)) = service.store().get_conversation(conversation_id).await {
        if let Some(message) = conversation
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
        {
            println!("  {} {}\n", style("Assistant >").cyan().bold(), message.text);
        }
    }
}

/// Print the last messages of the active conversation.
async fn print_history(service: &Arc<Service>, conversation_id: &Uuid) {
    let Ok(Some(conversation)) = service.store().get_conversation(conversation_id).await else {
        return;
    };

    println!();
    let start = conversation.messages.len().saturating_sub(20);
    for message in &conversation.messages[start..] {
        let label = match message.role {
            MessageRole::User => style("You").green(),
            MessageRole::Assistant => style("Assistant").cyan(),
            MessageRole::System => style("System").dim(),
        };
        let preview = if message.text.len() > 100 {
            format!("{}...", &message.text[..97])
        } else {
            message.text.clone()
        };
        println!("  {} {}", style(label).bold(), preview);
    }
    println!();
}
