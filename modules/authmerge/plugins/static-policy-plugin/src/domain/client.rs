//! Client implementation for the static policy plugin.

use async_trait::async_trait;
use authmerge_sdk::{AuthmergeError, EvaluationRequest, EvaluationResponse, PolicyEvaluatorClient};

use super::service::Service;

#[async_trait]
impl PolicyEvaluatorClient for Service {
    async fn evaluate(
        &self,
        request: EvaluationRequest,
    ) -> Result<EvaluationResponse, AuthmergeError> {
        Ok(self.evaluate(&request))
    }
}
