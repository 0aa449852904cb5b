//! Agent profiles: a system prompt plus personality tags, turned into the
//! conditioning system message of a conversation.

use serde::{Deserialize, Serialize};

use crate::llm::{ChatMessage, Role};

/// An agent configuration under test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub system_prompt: String,
    /// Personality tags such as `friendly` or `concise`.
    #[serde(default)]
    pub personality: Vec<String>,
}

impl AgentProfile {
    /// Compose the system message, or `None` when the profile is empty.
    pub fn system_message(&self) -> Option<ChatMessage> {
        let mut sections = Vec::new();

        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            sections.push(format!("You are {name}."));
        }

        let prompt = self.system_prompt.trim();
        if !prompt.is_empty() {
            sections.push(prompt.to_string());
        }

        let traits: Vec<&str> = self
            .personality
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if !traits.is_empty() {
            sections.push(format!("Personality traits: {}.", traits.join(", ")));
        }

        if sections.is_empty() {
            return None;
        }
        Some(ChatMessage::system(sections.join("\n\n")))
    }

    /// Build the message list forwarded to a provider.
    ///
    /// The profile's system message replaces any system messages in
    /// `history`; without one, the first system message in `history` is kept.
    /// Either way only the last `window` non-system messages survive.
    pub fn conversation(&self, history: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
        match self.system_message() {
            Some(system) => {
                let turns: Vec<ChatMessage> = history
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .cloned()
                    .collect();
                let mut messages = vec![system];
                messages.extend(trailing_window(&turns, window));
                messages
            }
            None => trailing_window(history, window),
        }
    }
}

/// Keep the first system message and the last `window` other messages.
pub fn trailing_window(messages: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    let system_index = messages.iter().position(|m| m.role == Role::System);

    let rest: Vec<&ChatMessage> = messages
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != system_index)
        .map(|(_, m)| m)
        .collect();
    let skip = rest.len().saturating_sub(window);

    system_index
        .map(|i| &messages[i])
        .into_iter()
        .chain(rest.into_iter().skip(skip))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("u{i}"))
                } else {
                    ChatMessage::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn empty_profile_has_no_system_message() {
        assert!(AgentProfile::default().system_message().is_none());
    }

    #[test]
    fn system_message_combines_prompt_and_traits() {
        let profile = AgentProfile {
            name: Some("Ada".to_string()),
            system_prompt: "  Help users debug Rust code. ".to_string(),
            personality: vec!["friendly".to_string(), " ".to_string(), "concise".to_string()],
        };

        let message = profile.system_message().unwrap();
        assert_eq!(message.role, Role::System);
        assert_eq!(
            message.content,
            "You are Ada.\n\nHelp users debug Rust code.\n\nPersonality traits: friendly, concise."
        );
    }

    #[test]
    fn trailing_window_keeps_first_system_message() {
        let mut messages = vec![ChatMessage::system("rules")];
        messages.extend(turns(5));

        let kept = trailing_window(&messages, 2);
        assert_eq!(
            kept,
            vec![
                ChatMessage::system("rules"),
                ChatMessage::assistant("a3"),
                ChatMessage::user("u4"),
            ]
        );
    }

    #[test]
    fn trailing_window_shorter_history_is_unchanged() {
        let messages = turns(3);
        assert_eq!(trailing_window(&messages, 10), messages);
    }

    #[test]
    fn trailing_window_zero_keeps_only_system() {
        let mut messages = vec![ChatMessage::system("rules")];
        messages.extend(turns(2));
        assert_eq!(trailing_window(&messages, 0), vec![ChatMessage::system("rules")]);
    }

    #[test]
    fn conversation_replaces_history_system_messages() {
        let profile = AgentProfile {
            system_prompt: "Be a pirate.".to_string(),
            ..Default::default()
        };
        let mut history = vec![ChatMessage::system("old rules")];
        history.extend(turns(4));

        let messages = profile.conversation(&history, 3);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], ChatMessage::system("Be a pirate."));
        assert_eq!(messages[1], ChatMessage::assistant("a1"));
        assert_eq!(messages[3], ChatMessage::assistant("a3"));
    }

    #[test]
    fn conversation_without_profile_uses_history_system() {
        let mut history = vec![ChatMessage::system("rules")];
        history.extend(turns(4));

        let messages = AgentProfile::default().conversation(&history, 1);
        assert_eq!(
            messages,
            vec![ChatMessage::system("rules"), ChatMessage::assistant("a3")]
        );
    }
}
