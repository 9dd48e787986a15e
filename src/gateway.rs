//! The gateway: configuration plus a populated registry.
//!
//! A [`Gateway`] is built once at startup and handed to whatever hosts the
//! planning loop. There is no global instance; independent gateways (in tests,
//! say) never share state.
//!
//! ```rust,ignore
//! use toolgate::prelude::*;
//!
//! let gateway = Gateway::from_config(config::resolve(None)?)?;
//! let result = gateway
//!     .invoke(ToolInvocationRequest::new("calculate", json!({"expression": "(2+3)*4"})))
//!     .await;
//! ```

use crate::config::{GatewayConfig, ModelBackend};
use crate::error::GatewayError;
use crate::providers::{MessagingProvider, TwilioClient, VoiceProvider};
use crate::tools::builtins::{
    CalculateTool, FileIoTool, MessagingTool, VoiceTool, TELEPHONY_TOOL_NAMES,
};
use crate::tools::{
    MetricsSnapshot, SandboxRoot, ToolDefinition, ToolDescriptor, ToolInvocationRequest,
    ToolInvocationResult, ToolRegistry,
};
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// What the planning runtime needs to set up its agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentManifest {
    pub agent_name: String,
    pub model: String,
    pub backend: ModelBackend,
    pub instruction: String,
    pub tools: Vec<ToolDefinition>,
}

/// Application context: validated configuration and the tool registry.
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct Gateway {
    config: Arc<GatewayConfig>,
    registry: Arc<ToolRegistry>,
}

impl Gateway {
    /// Builds a gateway with the Twilio provider for the telephony tools.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if validation fails or the sandbox
    /// directory cannot be opened.
    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        GatewayBuilder::new(config).build()
    }

    #[must_use]
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Runs one tool invocation. Always returns a result.
    pub async fn invoke(&self, request: ToolInvocationRequest) -> ToolInvocationResult {
        self.registry.invoke(request).await
    }

    /// Runs a batch concurrently, results in request order.
    pub async fn invoke_all(&self, requests: Vec<ToolInvocationRequest>) -> Vec<ToolInvocationResult> {
        self.registry.invoke_all(requests).await
    }

    /// Tool definitions sorted by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.registry.metrics()
    }

    #[must_use]
    pub fn manifest(&self) -> AgentManifest {
        AgentManifest {
            agent_name: self.config.model.agent_name.clone(),
            model: self.config.model.model.clone(),
            backend: self.config.model.backend,
            instruction: self.config.model.instruction.clone(),
            tools: self.definitions(),
        }
    }
}

/// Builds a [`Gateway`], optionally with substitute providers.
#[derive(Debug)]
pub struct GatewayBuilder {
    config: GatewayConfig,
    messaging: Option<Arc<dyn MessagingProvider>>,
    voice: Option<Arc<dyn VoiceProvider>>,
}

impl GatewayBuilder {
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            messaging: None,
            voice: None,
        }
    }

    /// Uses `provider` for `send_message` instead of Twilio.
    #[must_use]
    pub fn with_messaging_provider(mut self, provider: Arc<dyn MessagingProvider>) -> Self {
        self.messaging = Some(provider);
        self
    }

    /// Uses `provider` for `make_call` instead of Twilio.
    #[must_use]
    pub fn with_voice_provider(mut self, provider: Arc<dyn VoiceProvider>) -> Self {
        self.voice = Some(provider);
        self
    }

    /// Validates configuration and registers every enabled tool.
    ///
    /// Twilio credentials are required only for a telephony tool that has no
    /// substitute provider.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings or an unusable
    /// base directory, and a registration error on a name clash.
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let Self {
            config,
            messaging,
            voice,
        } = self;

        let telephony = config.telephony.enabled;
        if telephony && (messaging.is_none() || voice.is_none()) {
            config.validate()?;
        } else if config.files.base_dir.as_os_str().is_empty() {
            return Err(GatewayError::configuration(
                "files.base_dir",
                "base directory must not be empty",
            ));
        }

        for warning in config.model.warnings() {
            tracing::warn!(%warning, "model configuration");
        }

        let sandbox = SandboxRoot::open(&config.files.base_dir, config.files.create_base_dir)?;
        tracing::info!(base_dir = %sandbox.root().display(), "file tools confined");
        let files = FileIoTool::new(sandbox, config.files.append_policy);

        let mut descriptors: Vec<ToolDescriptor> = vec![CalculateTool::new().descriptor()];
        descriptors.extend(files.descriptors());

        if telephony {
            let (messaging, voice): (Arc<dyn MessagingProvider>, Arc<dyn VoiceProvider>) =
                match (messaging, voice) {
                    (Some(messaging), Some(voice)) => (messaging, voice),
                    (messaging, voice) => {
                        let client = Arc::new(TwilioClient::new(&config.telephony)?);
                        let messaging = messaging
                            .unwrap_or_else(|| Arc::clone(&client) as Arc<dyn MessagingProvider>);
                        let voice = voice.unwrap_or_else(|| client as Arc<dyn VoiceProvider>);
                        (messaging, voice)
                    }
                };

            let default_voice_url = Url::parse(&config.telephony.default_voice_url).map_err(|e| {
                GatewayError::configuration(
                    "telephony.default_voice_url",
                    format!("invalid URL: {e}"),
                )
            })?;

            descriptors.push(MessagingTool::new(messaging).descriptor());
            descriptors.push(VoiceTool::new(voice, default_voice_url).descriptor());
        } else {
            tracing::info!(skipped = ?TELEPHONY_TOOL_NAMES, "telephony disabled");
        }

        let mut registry = ToolRegistry::new();
        for descriptor in descriptors {
            registry
                .register(descriptor)
                .map_err(|e| GatewayError::registration(e.to_string()))?;
        }
        tracing::info!(tools = ?registry.names(), "gateway ready");

        Ok(Gateway {
            config: Arc::new(config),
            registry: Arc::new(registry),
        })
    }
}
