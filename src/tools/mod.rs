// Tool command module
// Slash-prefixed utility commands that bypass (or feed) the language model


pub mod builtin;

use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Character that marks an input as a tool command rather than free text.
pub const COMMAND_PREFIX: char = '/';

/// A pluggable command handler. `name` is the unique `/`-prefixed token used
/// to invoke it; `requires_model` decides whether the handler's output is
/// terminal or must be forwarded to the language model as a new prompt.
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn requires_model(&self) -> bool;

    /// Run the tool with the remainder of the user input (may be empty). The
    /// registry is passed along for introspective tools like help.
    fn execute(&self, query: &str, registry: &ToolRegistry) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub requires_model: bool,
}

/// Outcome of dispatching one user input through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub text: String,
    /// When true the text re-enters the conversation path as a new prompt;
    /// when false it is returned to the user verbatim.
    pub requires_model: bool,
}

/// Explicit static registry mapping command tokens to handlers. Registration
/// is last-wins by name: re-registering a token replaces the earlier handler.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in tools.
    #[inline]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    #[inline]
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!("Replaced existing tool registration for {}", name);
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(Box::as_ref)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors for every registered tool, in deterministic name order.
    #[inline]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                requires_model: tool.requires_model(),
            })
            .collect()
    }

    /// Route a tool command to its handler. Unknown commands come back as a
    /// terminal result carrying the literal command token, so they surface to
    /// the user rather than the model.
    #[inline]
    pub fn dispatch(&self, input: &str) -> ToolResult {
        let (command, query) = parse_command(input.trim());
        debug!("Dispatching tool command: {}", command);

        match self.get(command) {
            Some(tool) => ToolResult {
                text: tool.execute(query, self),
                requires_model: tool.requires_model(),
            },
            None => {
                warn!("No tool registered for command: {}", command);
                ToolResult {
                    text: format!("Tool not found: {}", command),
                    requires_model: false,
                }
            }
        }
    }
}

/// True iff the input should be dispatched as a tool command.
#[inline]
pub fn is_command(input: &str) -> bool {
    input.starts_with(COMMAND_PREFIX)
}

/// Split input on the first whitespace into the command token and its query
/// argument. The argument may be empty.
#[inline]
pub fn parse_command(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((command, remainder)) => (command, remainder.trim_start()),
        None => (input, ""),
    }
}
