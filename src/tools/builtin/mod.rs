
use chrono::Local;
use std::fmt::Write as _;

use super::{Tool, ToolRegistry};

/// Register every built-in tool.
#[inline]
pub fn register_builtins(registry: &mut ToolRegistry) {
    registry.register(Box::new(DateTool));
    registry.register(Box::new(HelpTool));
    registry.register(Box::new(AskTool));
}

/// Reports the current date and time. Never touches the model.
pub struct DateTool;

impl Tool for DateTool {
    #[inline]
    fn name(&self) -> &'static str {
        "/date"
    }

    #[inline]
    fn description(&self) -> &'static str {
        "Show the current date and time"
    }

    #[inline]
    fn requires_model(&self) -> bool {
        false
    }

    #[inline]
    fn execute(&self, _query: &str, _registry: &ToolRegistry) -> String {
        format!(
            "Current date and time: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Lists every registered tool with its description.
pub struct HelpTool;

impl Tool for HelpTool {
    #[inline]
    fn name(&self) -> &'static str {
        "/help"
    }

    #[inline]
    fn description(&self) -> &'static str {
        "List all available tool commands"
    }

    #[inline]
    fn requires_model(&self) -> bool {
        false
    }

    #[inline]
    fn execute(&self, _query: &str, registry: &ToolRegistry) -> String {
        let mut result = format!("Available tool commands:\n{}\n", "-".repeat(30));
        for descriptor in registry.descriptors() {
            let _ = writeln!(result, "{}: {}", descriptor.name, descriptor.description);
        }
        result
    }
}

/// Forwards its argument straight to the language model.
pub struct AskTool;

impl Tool for AskTool {
    #[inline]
    fn name(&self) -> &'static str {
        "/ask"
    }

    #[inline]
    fn description(&self) -> &'static str {
        "Ask the language model a question directly, e.g. /ask what is RAG?"
    }

    #[inline]
    fn requires_model(&self) -> bool {
        true
    }

    #[inline]
    fn execute(&self, query: &str, _registry: &ToolRegistry) -> String {
        if query.is_empty() {
            return "Please provide a question after /ask, e.g. /ask what is RAG?".to_string();
        }
        query.to_string()
    }
}
