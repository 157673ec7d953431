use super::common::ApiError;
use image::RgbaImage;
use log::*;

/// Decoded weather condition image.
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pixels: RgbaImage,
}
impl Icon {
    pub fn decode(bytes: &[u8]) -> Result<Icon, ApiError> {
        let pixels = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Icon { pixels })
    }

    #[cfg(test)]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[cfg(test)]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Mean colour of all pixels that are not fully transparent, `None` for a fully transparent image.
    pub fn average_color(&self) -> Option<[u8; 3]> {
        let (mut sum, mut count) = ([0u64; 3], 0u64);
        for pixel in self.pixels.pixels().filter(|p| p.0[3] > 0) {
            for (channel, value) in sum.iter_mut().zip(pixel.0) {
                *channel += value as u64;
            }
            count += 1;
        }

        if count == 0 {
            return None;
        }
        Some(sum.map(|channel| (channel / count) as u8))
    }
}

pub async fn fetch_icon(client: &reqwest::Client, url: &str) -> Result<Icon, ApiError> {
    debug!("Loading icon {}", url);

    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;

    Icon::decode(&bytes)
}
