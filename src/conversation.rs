//! Conversation history exchanged with the model backend.
//!
//! A history always opens with one instruction turn and one user turn. After
//! that it grows in rounds: any text the model wrote alongside its requests,
//! then a model turn carrying tool requests followed by exactly one result per
//! request, in request order. [`History::record_round`]
//! is the only way to append tool traffic, so the pairing cannot drift.

use serde::{Deserialize, Serialize};

/// A model-issued request to call a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Correlation id assigned by the backend.
    pub call_id: String,
    /// Registered tool name.
    pub name: String,
    /// Raw JSON argument payload, exactly as the model produced it.
    pub arguments: String,
}

impl std::fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// Content attached to the user turn alongside the question.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    /// Inline transcript text, already prefixed with its label.
    Transcript(String),
    /// Uploaded image, referenced by file id.
    Image { file_id: String },
    /// Uploaded document, referenced by file id.
    Document { file_id: String },
}

/// What the model said in one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    Text(String),
    ToolRequests(Vec<ToolInvocation>),
}

/// One entry of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    Instruction(String),
    User {
        question: String,
        attachment: Option<Attachment>,
    },
    Model(ModelTurn),
    ToolResult { call_id: String, output: String },
}

/// Ordered conversation history for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    /// Start a conversation with the instruction turn and the user turn.
    pub fn new(instructions: &str, question: &str, attachment: Option<Attachment>) -> Self {
        Self {
            turns: vec![
                Turn::Instruction(instructions.to_string()),
                Turn::User {
                    question: question.to_string(),
                    attachment,
                },
            ],
        }
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append freeform model text, such as reasoning emitted next to tool requests.
    ///
    /// Blank text is not recorded.
    pub fn record_model_text(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.turns.push(Turn::Model(ModelTurn::Text(text.to_string())));
        }
    }

    /// Append one round of tool traffic: the model's requests, then each result.
    ///
    /// Results are matched to requests by position.
    pub fn record_round(&mut self, round: Vec<(ToolInvocation, String)>) {
        if round.is_empty() {
            return;
        }

        let (requests, outputs): (Vec<_>, Vec<_>) = round.into_iter().unzip();
        let call_ids: Vec<String> = requests.iter().map(|r| r.call_id.clone()).collect();

        self.turns.push(Turn::Model(ModelTurn::ToolRequests(requests)));
        for (call_id, output) in call_ids.into_iter().zip(outputs) {
            self.turns.push(Turn::ToolResult { call_id, output });
        }
    }

    /// Number of tool requests across all model turns.
    pub fn tool_request_count(&self) -> usize {
        self.turns
            .iter()
            .map(|t| match t {
                Turn::Model(ModelTurn::ToolRequests(reqs)) => reqs.len(),
                _ => 0,
            })
            .sum()
    }

    /// Check that every tool request is followed by its result, in order.
    pub fn is_balanced(&self) -> bool {
        let mut iter = self.turns.iter().peekable();
        while let Some(turn) = iter.next() {
            match turn {
                Turn::Model(ModelTurn::ToolRequests(requests)) => {
                    for request in requests {
                        match iter.next() {
                            Some(Turn::ToolResult { call_id, .. }) if *call_id == request.call_id => {}
                            _ => return false,
                        }
                    }
                }
                Turn::ToolResult { .. } => return false,
                _ => {}
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(id: &str) -> ToolInvocation {
        ToolInvocation {
            call_id: id.to_string(),
            name: "evaluate_expression".to_string(),
            arguments: r#"{"expression": "1+1"}"#.to_string(),
        }
    }

    #[test]
    fn test_new_history_opens_with_instruction_and_user() {
        let history = History::new("be brief", "what is 2+2?", None);
        assert_eq!(history.len(), 2);
        assert!(matches!(history.turns()[0], Turn::Instruction(_)));
        assert!(matches!(history.turns()[1], Turn::User { .. }));
        assert!(history.is_balanced());
    }

    #[test]
    fn test_record_round_keeps_request_order() {
        let mut history = History::new("i", "q", None);
        history.record_round(vec![
            (invocation("call_a"), "2".to_string()),
            (invocation("call_b"), "4".to_string()),
        ]);

        let ids: Vec<&str> = history
            .turns()
            .iter()
            .filter_map(|t| match t {
                Turn::ToolResult { call_id, .. } => Some(call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["call_a", "call_b"]);
        assert_eq!(history.tool_request_count(), 2);
        assert!(history.is_balanced());
    }

    #[test]
    fn test_model_text_precedes_its_round() {
        let mut history = History::new("i", "q", None);
        history.record_model_text("  ");
        assert_eq!(history.len(), 2);

        history.record_model_text("I should add first.\n");
        history.record_round(vec![(invocation("call_a"), "2".to_string())]);

        assert_eq!(
            history.turns()[2],
            Turn::Model(ModelTurn::Text("I should add first.".to_string()))
        );
        assert!(matches!(history.turns()[3], Turn::Model(ModelTurn::ToolRequests(_))));
        assert!(history.is_balanced());
    }

    #[test]
    fn test_empty_round_is_ignored() {
        let mut history = History::new("i", "q", None);
        history.record_round(Vec::new());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_unbalanced_history_is_detected() {
        let mut history = History::new("i", "q", None);
        history.turns.push(Turn::Model(ModelTurn::ToolRequests(vec![invocation("x")])));
        assert!(!history.is_balanced());

        history.turns.push(Turn::ToolResult {
            call_id: "y".to_string(),
            output: "wrong id".to_string(),
        });
        assert!(!history.is_balanced());
    }

    #[test]
    fn test_invocation_display() {
        assert_eq!(
            invocation("c1").to_string(),
            r#"evaluate_expression({"expression": "1+1"})"#
        );
    }
}
