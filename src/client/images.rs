//! Image generation endpoint.

use super::{ApiClient, ClientError, ImageGenerator};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

impl ImageGenerator for ApiClient {
    fn generate_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ClientError> {
        let mut payload = serde_json::to_value(request)?;
        payload["model"] = self.models.image_model.clone().into();
        payload["n"] = 1.into();

        let response: ImagesResponse = self.post_json("images/generations", &payload)?;
        let image = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Malformed("image response has no data".into()))?;

        match (image.b64_json, image.url) {
            (Some(b64), _) => Ok(STANDARD.decode(b64.trim())?),
            (None, Some(url)) => self.download(&url),
            (None, None) => Err(ClientError::Malformed(
                "image response has neither b64_json nor url".into(),
            )),
        }
    }
}
