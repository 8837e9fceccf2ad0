//! Modal image containers
//!
//! A container collects images while the sections are rendered and is
//! written out once, at the end of the document, so its close and arrow
//! buttons are not covered by the images. Each image gets a 1-based index
//! that buttons and thumbnails pass to `open_modal_to_index`.

use super::html::escape;
use crate::error::{Error, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// Shows one image at a time, chosen by the opener
    Plain,
    /// Adds previous / next buttons
    Slider,
}

#[derive(Debug)]
pub struct ModalContainer {
    modal_id: String,
    image_class: String,
    kind: Kind,
    images: String,
    count: usize,
    closed: bool,
}

impl ModalContainer {
    pub fn new(modal_id: &str, image_class: &str) -> Self {
        Self::with_kind(modal_id, image_class, Kind::Plain)
    }

    /// A container with previous / next buttons.
    pub fn slider(modal_id: &str, image_class: &str) -> Self {
        Self::with_kind(modal_id, image_class, Kind::Slider)
    }

    fn with_kind(modal_id: &str, image_class: &str, kind: Kind) -> Self {
        Self {
            modal_id: modal_id.to_string(),
            image_class: image_class.to_string(),
            kind,
            images: String::new(),
            count: 0,
            closed: false,
        }
    }

    pub fn modal_id(&self) -> &str {
        &self.modal_id
    }

    pub fn image_class(&self) -> &str {
        &self.image_class
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Add an image; returns its 1-based index.
    pub fn add_image(&mut self, image: &str) -> Result<usize> {
        if self.closed {
            return Err(Error::ClosedContainer(self.modal_id.clone()));
        }

        let name = Path::new(image)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(image);

        self.images.push_str(&format!(
            r#"
                <div class="w3-display-container {class}">
                    <img src="{src}">
                    <div class="w3-display-topleft w3-black"><p>{name}</p></div>
                </div>"#,
            class = escape(&self.image_class),
            src = escape(image),
            name = escape(name),
        ));
        self.count += 1;
        Ok(self.count)
    }

    /// Add every image; returns the index of the last one.
    pub fn add_images<S: AsRef<str>>(&mut self, images: &[S]) -> Result<usize> {
        for image in images {
            self.add_image(image.as_ref())?;
        }
        Ok(self.count)
    }

    /// Inline `onclick` handler showing image `index`.
    pub fn opener(&self, index: usize) -> String {
        format!(
            "open_modal_to_index('{}', '{}', {})",
            escape(&self.modal_id),
            escape(&self.image_class),
            index
        )
    }

    /// A button that opens the container at its first image.
    pub fn button(&self, label: &str) -> String {
        format!(
            r#"<button class="w3-btn w3-teal" onclick="{}">{}</button>"#,
            self.opener(1),
            escape(label)
        )
    }

    /// Close the container and return its HTML. No images can be added
    /// afterwards.
    pub fn close(&mut self) -> String {
        self.closed = true;

        let arrows = match self.kind {
            Kind::Plain => String::new(),
            Kind::Slider => format!(
                r#"
                <button class="w3-button w3-black w3-display-bottomleft w3-xxlarge"
                    onclick="change_in_class('{class}', -1)">&#10094;</button>
                <button class="w3-button w3-black w3-display-bottomright w3-xxlarge"
                    onclick="change_in_class('{class}', 1)">&#10095;</button>"#,
                class = escape(&self.image_class)
            ),
        };

        format!(
            r#"
    <div id="{id}" class="w3-modal">
        <div class="w3-modal-content">
            <div class="w3-content w3-display-container">{images}{arrows}
                <button class="w3-btn w3-red w3-display-topright w3-large"
                    onclick="document.getElementById('{id}').style.display='none'">&times;</button>
            </div>
        </div>
    </div>
"#,
            id = escape(&self.modal_id),
            images = self.images,
            arrows = arrows,
        )
    }

    /// Script showing the first image once the page has loaded.
    pub fn scripts(&self) -> String {
        format!(
            "<script>window.addEventListener('load', function() {{ show_in_class('{}', 1); }});</script>\n",
            escape(&self.image_class)
        )
    }
}
