//! Welcome banner for the study chat session.

use console::style;

/// Print the session banner: model, active conversation, and the features
/// enabled by the loaded configuration.
pub fn print_welcome_banner(
    model: &str,
    conversation_id: &str,
    retrieval: bool,
    speech: bool,
) {
    let features = match (retrieval, speech) {
        (true, true) => "retrieval, first-line speech",
        (true, false) => "retrieval",
        (false, true) => "first-line speech",
        (false, false) => "none",
    };

    println!();
    println!("  {}", style("suasion").cyan().bold());
    println!(
        "  {}",
        style("persuasive-dialogue study client").dim()
    );
    println!();
    println!("  {}  {}", style("Model:").bold(), style(model).dim());
    println!(
        "  {}  {}",
        style("Conversation:").bold(),
        style(&conversation_id[..8.min(conversation_id.len())]).dim()
    );
    println!("  {}  {}", style("Extras:").bold(), style(features).dim());
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
