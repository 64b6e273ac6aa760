//! The narrow contract with the external text-generation service.

use std::future::Future;

use crate::error::GenerationError;

/// A single prompt for the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
  pub system_instruction: String,
  pub user_prompt:        String,
}

/// Submit a prompt, receive text or an error. Implementations are stateless
/// request/response adapters.
pub trait GenerationGateway: Send + Sync {
  fn generate(
    &self,
    request: GenerationRequest,
  ) -> impl Future<Output = Result<String, GenerationError>> + Send + '_;
}
