//! Object-safe tool interface for agent frameworks.
//!
//! Each wallet operation is exposed as a [`DynTool`]: a name, a description,
//! a JSON-schema parameter definition, and a JSON-in/JSON-out call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// Name, description and parameter schema advertised to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A callable tool with JSON arguments and result.
#[async_trait]
pub trait DynTool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> String;

    /// Full definition including the parameter schema.
    fn definition(&self) -> ToolDefinition;

    /// Invoke the tool.
    async fn call_json(&self, args: Value) -> Result<Value, ToolError>;
}

/// Boxed tool trait object.
pub type BoxedTool = Box<dyn DynTool>;

/// Find a tool by name and call it.
///
/// # Errors
///
/// Returns [`ToolError::NotFound`] for an unknown name, otherwise whatever
/// the tool returns.
pub async fn call_tool(tools: &[BoxedTool], name: &str, args: Value) -> Result<Value, ToolError> {
    let tool = tools
        .iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| ToolError::not_found(name))?;
    tool.call_json(args).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug)]
    struct EchoTool;

    #[async_trait]
    impl DynTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> String {
            "Echo the arguments".into()
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.name(), self.description(), json!({"type": "object"}))
        }

        async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    #[test]
    fn test_call_tool_dispatches_by_name() {
        let tools: Vec<BoxedTool> = vec![Box::new(EchoTool)];
        let result = tokio_test::block_on(call_tool(&tools, "echo", json!({"a": 1}))).unwrap();
        assert_eq!(result, json!({"a": 1}));

        let err = tokio_test::block_on(call_tool(&tools, "missing", json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "Tool not found: missing");
    }

    #[test]
    fn test_definition_serializes() {
        let def = EchoTool.definition();
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["name"], "echo");
        assert_eq!(value["parameters"]["type"], "object");
    }
}
