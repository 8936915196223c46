//! Provider prompt composition.
//!
//! Output order is fixed: persona, property context, prior turns, new message.

use atlas_core::{ChatRole, CompletionRequest, HistoryEntry, PromptMessage, PropertyFocus};

/// Sampling temperature for every chat completion.
pub const TEMPERATURE: f32 = 0.6;

/// Nucleus-sampling value for every chat completion.
pub const TOP_P: f32 = 0.9;

/// Persona and behavioural guidance for the assistant.
pub const PERSONA_PROMPT: &str = "You are Atlas Agent, an elite real estate AI strategist helping \
buyers evaluate San Francisco properties. Blend macro market intelligence with micro-level \
insights like block-by-block desirability, proptech metrics, nearby development pipelines, and \
financing angles. Offer candid guidance, actionable steps, and always end with a proactive \
follow-up suggestion.";

pub const NO_PROPERTY_NOTICE: &str = "No property is currently selected.";

const CONTEXT_HEADER: &str = "Context for current property focus:";

/// Render the property summary embedded in the second system message.
pub fn render_property_context(property: Option<&PropertyFocus>) -> String {
    let Some(property) = property else {
        return NO_PROPERTY_NOTICE.to_string();
    };

    let highlights = property
        .highlights
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{}. {}", i + 1, h))
        .collect::<Vec<_>>()
        .join("\n");

    [
        format!("Active focus: {}", property.title),
        format!("Address: {}", property.address),
        format!("Status: {}", property.status),
        format!("List price: {}", property.price),
        format!(
            "Configuration: {} beds | {} baths | {} sqft",
            property.beds, property.baths, property.area
        ),
        format!("Key highlights:\n{highlights}"),
        "Provide contextual knowledge about nearby transit, school scores, rental comps, \
walkscore, permit climate, and negotiation tactics."
            .to_string(),
    ]
    .join("\n")
}

/// Compose the full provider prompt for one chat turn.
pub fn compose_prompt(
    message: &str,
    history: &[HistoryEntry],
    property: Option<&PropertyFocus>,
) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(PromptMessage::system(PERSONA_PROMPT));
    messages.push(PromptMessage::system(format!(
        "{CONTEXT_HEADER}\n{}",
        render_property_context(property)
    )));
    messages.extend(history.iter().map(|entry| match entry.role {
        ChatRole::User => PromptMessage::user(entry.content.clone()),
        ChatRole::Assistant => PromptMessage::assistant(entry.content.clone()),
    }));
    messages.push(PromptMessage::user(message));
    messages
}

/// Build the streaming completion request with the fixed sampling parameters.
pub fn build_completion_request(
    model: &str,
    message: &str,
    history: &[HistoryEntry],
    property: Option<&PropertyFocus>,
) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        messages: compose_prompt(message, history, property),
        temperature: TEMPERATURE,
        top_p: TOP_P,
    }
}
