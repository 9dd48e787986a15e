//! Tool definitions, descriptors and the handler enum.
//!
//! A [`ToolDescriptor`] bundles what the planning runtime sees (the
//! [`ToolDefinition`]) with what the registry needs to run the tool: the
//! [`ParameterSchema`] arguments are checked against and the [`ToolHandler`]
//! that does the work. The handler set is closed; each variant deserializes
//! its own typed argument struct before calling into the tool.

use crate::tools::builtins::{
    CalculateArgs, CalculateTool, FileIoTool, FileOperation, MakeCallArgs, MessagingTool,
    PathArgs, SendMessageArgs, VoiceTool, WriteArgs,
};
use crate::tools::error::ToolError;
use crate::tools::schema::ParameterSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the planning runtime is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Stable name the tool is invoked by
    pub name: String,
    pub description: String,
    /// JSON Schema of the argument object
    pub input_schema: Value,
}

impl ToolDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// The closed set of tool implementations.
#[derive(Debug, Clone)]
pub enum ToolHandler {
    Calculate(CalculateTool),
    WriteFile(FileIoTool),
    AppendFile(FileIoTool),
    ReadFile(FileIoTool),
    DeleteFile(FileIoTool),
    SendMessage(MessagingTool),
    MakeCall(VoiceTool),
}

impl ToolHandler {
    /// Runs the tool against already schema-checked arguments.
    ///
    /// # Errors
    ///
    /// Returns whatever [`ToolError`] the tool raises.
    pub async fn execute(&self, tool_name: &str, args: Value) -> Result<Value, ToolError> {
        match self {
            Self::Calculate(tool) => {
                let args: CalculateArgs = parse_args(tool_name, args)?;
                to_payload(tool_name, tool.execute(args)?)
            }
            Self::WriteFile(tool) => {
                let args: WriteArgs = parse_args(tool_name, args)?;
                to_payload(tool_name, tool.write(&args.path, &args.content).await?)
            }
            Self::AppendFile(tool) => {
                let args: WriteArgs = parse_args(tool_name, args)?;
                to_payload(tool_name, tool.append(&args.path, &args.content).await?)
            }
            Self::ReadFile(tool) => {
                let args: PathArgs = parse_args(tool_name, args)?;
                to_payload(tool_name, tool.read(&args.path).await?)
            }
            Self::DeleteFile(tool) => {
                let args: PathArgs = parse_args(tool_name, args)?;
                to_payload(tool_name, tool.delete(&args.path).await?)
            }
            Self::SendMessage(tool) => {
                let args: SendMessageArgs = parse_args(tool_name, args)?;
                to_payload(tool_name, tool.send(args).await?)
            }
            Self::MakeCall(tool) => {
                let args: MakeCallArgs = parse_args(tool_name, args)?;
                to_payload(tool_name, tool.call(args).await?)
            }
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Calculate(_) => "calculate",
            Self::WriteFile(_) => FileOperation::Write.as_str(),
            Self::AppendFile(_) => FileOperation::Append.as_str(),
            Self::ReadFile(_) => FileOperation::Read.as_str(),
            Self::DeleteFile(_) => FileOperation::Delete.as_str(),
            Self::SendMessage(_) => "send_message",
            Self::MakeCall(_) => "make_call",
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool_name: &str, args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| ToolError::invalid_request(format!("invalid arguments for '{tool_name}': {e}")))
}

fn to_payload<T: Serialize>(tool_name: &str, output: T) -> Result<Value, ToolError> {
    serde_json::to_value(output)
        .map_err(|e| ToolError::execution(tool_name, format!("failed to encode result: {e}")))
}

/// A registrable tool. Immutable once built.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    definition: ToolDefinition,
    schema: ParameterSchema,
    handler: ToolHandler,
}

impl ToolDescriptor {
    #[must_use]
    pub fn new(definition: ToolDefinition, schema: ParameterSchema, handler: ToolHandler) -> Self {
        Self {
            definition,
            schema,
            handler,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    #[must_use]
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    #[must_use]
    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    #[must_use]
    pub fn handler(&self) -> &ToolHandler {
        &self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn calculate_handler_returns_payload() {
        let handler = ToolHandler::Calculate(CalculateTool::new());
        let payload = handler
            .execute("calculate", json!({"expression": "(2+3)*4"}))
            .await
            .unwrap();
        assert_eq!(payload["result"], 20.0);
        assert_eq!(payload["formatted"], "20");
    }

    #[tokio::test]
    async fn malformed_arguments_become_invalid_request() {
        let handler = ToolHandler::Calculate(CalculateTool::new());
        let err = handler
            .execute("calculate", json!({"expression": 5}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }

    #[test]
    fn definition_serializes_with_schema() {
        let definition = ToolDefinition::new("echo", "Echo input", json!({"type": "object"}));
        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(value["name"], "echo");
        assert_eq!(value["input_schema"]["type"], "object");
    }

    #[test]
    fn descriptor_exposes_parts() {
        let descriptor = CalculateTool::new().descriptor();
        assert_eq!(descriptor.name(), "calculate");
        assert_eq!(descriptor.handler().kind(), "calculate");
        assert_eq!(descriptor.schema().params().len(), 1);
    }
}
