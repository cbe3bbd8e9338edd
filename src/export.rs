//! PNG export of the drawing area via the backend screenshot hook.

use egui::{ColorImage, UserData, ViewportCommand};

use crate::App;

impl App {
    /// Ask the backend for a screenshot; the reply arrives as an
    /// [`egui::Event::Screenshot`] on a later frame.
    pub(crate) fn request_png_export(&mut self, ctx: &egui::Context) {
        ctx.send_viewport_cmd(ViewportCommand::Screenshot(UserData::default()));
        self.export_pending = true;
        log::info!("PNG export requested");
    }

    /// Pick up a pending screenshot reply, crop it to the canvas and
    /// hand the encoded PNG to the platform save path.
    pub(crate) fn handle_screenshot_events(&mut self, ctx: &egui::Context) {
        if !self.export_pending {
            return;
        }
        let image = ctx.input(|i| {
            i.events.iter().find_map(|e| match e {
                egui::Event::Screenshot { image, .. } => Some(image.clone()),
                _ => None,
            })
        });
        let Some(image) = image else {
            return;
        };
        self.export_pending = false;

        let pixels_per_point = ctx.pixels_per_point();
        let canvas = image.region(&self.canvas_rect, Some(pixels_per_point));
        match encode_png(&canvas) {
            Ok(bytes) => self.save_png(&bytes),
            Err(e) => {
                log::error!("PNG encoding failed: {e}");
                self.status = Some(format!("Export failed: {e}"));
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn save_png(&mut self, bytes: &[u8]) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name("diagram.png")
            .save_file()
        else {
            return;
        };
        match std::fs::write(&path, bytes) {
            Ok(()) => {
                log::info!("Exported PNG to: {}", path.display());
                self.status = Some(format!("Exported {}", path.display()));
            }
            Err(e) => {
                log::error!("Failed to write PNG: {e}");
                self.status = Some(format!("Export failed: {e}"));
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn save_png(&mut self, bytes: &[u8]) {
        download_bytes(bytes, "diagram.png", "image/png");
        log::info!("PNG exported as download");
    }
}

fn encode_png(image: &ColorImage) -> Result<Vec<u8>, image::ImageError> {
    let [width, height] = image.size;
    let rgba: Vec<u8> = image
        .pixels
        .iter()
        .flat_map(|c| c.to_array())
        .collect();
    let mut bytes = Vec::new();
    let buffer = image::RgbaImage::from_raw(width as u32, height as u32, rgba)
        .ok_or_else(|| {
            image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ))
        })?;
    buffer.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )?;
    Ok(bytes)
}

/// Trigger a browser download of `bytes` via a temporary object URL.
#[cfg(target_arch = "wasm32")]
pub(crate) fn download_bytes(bytes: &[u8], file_name: &str, mime: &str) {
    use wasm_bindgen::JsCast;
    use web_sys::{Blob, BlobPropertyBag, Url, window};

    let Some(window) = window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    let array = js_sys::Uint8Array::from(bytes);
    let blob_parts = js_sys::Array::new();
    blob_parts.push(&array.buffer());

    let blob_property_bag = BlobPropertyBag::new();
    blob_property_bag.set_type(mime);

    let Ok(blob) = Blob::new_with_buffer_source_sequence_and_options(&blob_parts, &blob_property_bag)
    else {
        return;
    };
    let Ok(url) = Url::create_object_url_with_blob(&blob) else {
        return;
    };
    let Ok(element) = document.create_element("a") else {
        return;
    };
    let Ok(html_element) = element.dyn_into::<web_sys::HtmlElement>() else {
        return;
    };

    html_element.set_attribute("href", &url).ok();
    html_element.set_attribute("download", file_name).ok();
    html_element.click();
    Url::revoke_object_url(&url).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Color32;

    #[test]
    fn encode_png_produces_a_png_header() {
        let image = ColorImage::new([4, 4], vec![Color32::WHITE; 16]);
        let bytes = encode_png(&image).expect("encode");
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
