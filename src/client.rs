//! Client for a running nose detection service.

use crate::nose::NoseEstimate;
use crate::server::{DetectionResponse, FILE_FIELD};
use anyhow::{Error, Result};
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::debug;

pub struct NoseClient {
    client: Client,
    endpoint: String,
}

impl NoseClient {
    /// `base_url` is the service root, e.g. `http://127.0.0.1:5001`.
    pub fn new(base_url: &str) -> NoseClient {
        NoseClient {
            client: Client::new(),
            endpoint: format!("{}/detect", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Uploads the frame as a JPEG and returns the noses found on it.
    pub async fn detect(&self, frame: &RgbImage) -> Result<Vec<NoseEstimate>> {
        let mut jpeg = Vec::new();
        JpegEncoder::new(&mut jpeg).encode_image(frame)?;
        debug!("Posting {} byte frame to {}", jpeg.len(), self.endpoint);

        let part = Part::bytes(jpeg)
            .file_name("image.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::msg(format!(
                "Nose detector returned {status}: {body}"
            )));
        }

        let parsed: DetectionResponse = response.json().await?;
        Ok(parsed.noses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(
            NoseClient::new("http://127.0.0.1:5001/").endpoint(),
            "http://127.0.0.1:5001/detect"
        );
        assert_eq!(
            NoseClient::new("http://localhost:8000").endpoint(),
            "http://localhost:8000/detect"
        );
    }
}
