//! Conversation script
//!
//! The script is data: a list of opening bot messages followed by one step per
//! visitor answer. The engine walks it linearly; the content of an answer never
//! selects a branch, only its presence advances the cursor.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Placeholder replaced by the captured visitor name in reply templates
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Errors from loading or validating a script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Script has no opening messages")]
    NoOpening,
    #[error("Script has no steps")]
    NoSteps,
    #[error("Step {0}: choice reply needs at least one non-blank option")]
    EmptyChoices(usize),
    #[error("Step {0}: call-to-action label must not be blank")]
    BlankLabel(usize),
    #[error("Step {0}: only the last step may end in a call to action")]
    EarlyCallToAction(usize),
    #[error("Last step must end in a call to action")]
    MissingCallToAction,
}

/// What the visitor's answer is stored as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capture {
    VisitorName,
}

/// Analytics event fired when a step's reply is delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    NameProvided,
    QuestionAnswered { question: String },
    ConversionCompleted,
}

/// The bot message a step answers with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Choice { options: Vec<String> },
    CallToAction { label: String },
}

/// How the visitor is expected to answer at a given cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    FreeText,
    Choice,
    /// Script finished, nothing left to answer
    None,
}

/// One visitor answer and the bot turn it triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(default)]
    pub capture: Option<Capture>,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
    pub reply_template: String,
    pub reply: Reply,
}

impl ScriptStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self.reply, Reply::CallToAction { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub opening: Vec<String>,
    pub steps: Vec<ScriptStep>,
}

impl Script {
    /// The lead-capture funnel shipped with the app
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            opening: vec![
                "PARABÉNS POR TER CHEGADO ATÉ AQUI! 🎉 Conheça agora PRODUTOS VIRAIS capazes de colocar de R$ 180,00 a R$ 300,00 no seu bolso com I.A!".to_string(),
                "Me diga seu nome?".to_string(),
            ],
            steps: vec![
                ScriptStep {
                    capture: Some(Capture::VisitorName),
                    events: vec![ScriptEvent::NameProvided],
                    reply_template: "{name}, Show! Já ouviu falar de INTELIGÊNCIA ARTIFICIAL?"
                        .to_string(),
                    reply: Reply::Choice {
                        options: vec!["Sim, já ouvi".to_string(), "Ainda não".to_string()],
                    },
                },
                ScriptStep {
                    capture: None,
                    events: vec![ScriptEvent::QuestionAnswered {
                        question: "ai_knowledge".to_string(),
                    }],
                    reply_template: "{name}, faz sentido pra você fazer pelo menos R$ 280,00 REAIS todo dia usando INTELIGÊNCIA ARTIFICIAL pra vender PRODUTOS VIRAIS?".to_string(),
                    reply: Reply::Choice {
                        options: vec!["Sim, claro".to_string(), "Com certeza".to_string()],
                    },
                },
                ScriptStep {
                    capture: None,
                    events: vec![
                        ScriptEvent::QuestionAnswered {
                            question: "income_interest".to_string(),
                        },
                        ScriptEvent::ConversionCompleted,
                    ],
                    reply_template: "Parabéns {name}! Seu acesso foi validado! Clique abaixo para pegar seu acesso no whatsapp...".to_string(),
                    reply: Reply::CallToAction {
                        label: "ACESSAR AGORA".to_string(),
                    },
                },
            ],
        }
    }

    /// Parse and validate a JSON script
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_json::from_str(json)?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check the shape the engine relies on: a non-empty linear script whose
    /// only call to action is the final step.
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.opening.is_empty() {
            return Err(ScriptError::NoOpening);
        }
        let Some(last) = self.steps.len().checked_sub(1) else {
            return Err(ScriptError::NoSteps);
        };

        for (index, step) in self.steps.iter().enumerate() {
            match &step.reply {
                Reply::Choice { options } => {
                    if options.is_empty() || options.iter().any(|o| o.trim().is_empty()) {
                        return Err(ScriptError::EmptyChoices(index));
                    }
                }
                Reply::CallToAction { label } => {
                    if label.trim().is_empty() {
                        return Err(ScriptError::BlankLabel(index));
                    }
                    if index != last {
                        return Err(ScriptError::EarlyCallToAction(index));
                    }
                }
            }
        }

        if self.steps[last].is_terminal() {
            Ok(())
        } else {
            Err(ScriptError::MissingCallToAction)
        }
    }

    /// Cursor value once the script has run to completion
    pub fn terminal_step(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, step: usize) -> Option<&ScriptStep> {
        self.steps.get(step)
    }

    /// Expected answer at cursor `step`: the first answer follows the plain
    /// opening question, later ones follow the previous step's reply.
    pub fn expected_response(&self, step: usize) -> ResponseKind {
        if step >= self.terminal_step() {
            return ResponseKind::None;
        }
        match step.checked_sub(1).and_then(|prev| self.steps.get(prev)) {
            None => ResponseKind::FreeText,
            Some(prev) => match prev.reply {
                Reply::Choice { .. } => ResponseKind::Choice,
                Reply::CallToAction { .. } => ResponseKind::None,
            },
        }
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Fill `{name}` placeholders in a reply template
pub fn interpolate(template: &str, visitor_name: &str) -> String {
    template.replace(NAME_PLACEHOLDER, visitor_name)
}
