/// Instruction sent ahead of the retrieved context.
pub const INSTRUCTION_TEMPLATE: &str = "Answer the question based on the provided context only.\n\
Please provide the most accurate response based on the question.";

/// Renders instruction, context and question into one prompt string for
/// generators that take a single text input.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    instruction: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { instruction: INSTRUCTION_TEMPLATE.to_string() }
    }
}

impl PromptTemplate {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self { instruction: instruction.into() }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn render(&self, context: &[String], question: &str) -> String {
        format!(
            "{}\n<context>\n{}\n<context>\nQuestion: {}",
            self.instruction,
            context.join("\n\n"),
            question
        )
    }
}
