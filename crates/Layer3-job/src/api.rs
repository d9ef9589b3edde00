//! 컨트롤 플레인 API 클라이언트
//!
//! 에이전트 등록 하나만 다루는 얇은 reqwest 래퍼입니다. job 스트림
//! 수신 같은 나머지 표면은 상위 레이어 소관입니다.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hoist_foundation::{Error, Result};

/// 에이전트 등록 요청 본문
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub os: String,
}

/// 등록 성공 시 응답 본문
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub access_token: String,
}

/// 컨트롤 플레인 엔드포인트 클라이언트
pub struct Api {
    scheme: &'static str,
    endpoint: String,
    token: String,
    client: Client,
}

impl Api {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, no_https: bool) -> Self {
        Self {
            scheme: if no_https { "http" } else { "https" },
            endpoint: endpoint.into(),
            token: token.into(),
            client: Client::new(),
        }
    }

    fn register_path(&self) -> String {
        format!(
            "{}://{}/api/v1/self_hosted_agents/register",
            self.scheme, self.endpoint
        )
    }

    /// 에이전트를 등록하고 이후 호출에 쓸 액세스 토큰을 받음
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let url = self.register_path();
        debug!("Registering agent {} at {}", request.name, url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.token))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Http(format!("register request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!(
                "register returned {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json::<RegisterResponse>()
            .await
            .map_err(|e| Error::Http(format!("register response decode failed: {}", e)))
    }
}
