use base64::Engine;

/// Build a `data:` URL for inline image upload.
pub fn image_data_url(image: &[u8], mime: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);
    format!("data:{mime};base64,{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_data_url_is_base64_encoded() {
        assert_eq!(image_data_url(b"abc", "image/png"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn empty_image() {
        assert_eq!(image_data_url(&[], "image/jpeg"), "data:image/jpeg;base64,");
    }
}
