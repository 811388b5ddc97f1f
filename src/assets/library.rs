use super::RawTexture;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ImageId(pub String);

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct LibraryImage {
    pub id: ImageId,
    pub name: String,
    pub texture: RawTexture,
}

/// Images uploaded by the operator, in upload order.
#[derive(Debug, Default)]
pub struct ImageLibrary {
    images: Vec<LibraryImage>,
    next_id: u64,
}

impl ImageLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, texture: RawTexture) -> ImageId {
        let id = ImageId(format!("logoImg_{}", self.next_id));
        self.next_id += 1;
        self.images.push(LibraryImage {
            id: id.clone(),
            name: name.to_string(),
            texture,
        });
        id
    }

    pub fn remove(&mut self, id: &ImageId) -> Option<LibraryImage> {
        let index = self.images.iter().position(|image| &image.id == id)?;
        Some(self.images.remove(index))
    }

    pub fn get(&self, id: &ImageId) -> Option<&LibraryImage> {
        self.images.iter().find(|image| &image.id == id)
    }

    pub fn images(&self) -> &[LibraryImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::ImageLibrary;
    use crate::assets::RawTexture;

    #[test]
    fn ids_are_never_reused() {
        let mut library = ImageLibrary::new();
        let first = library.add("a.png", RawTexture::solid("a", 1, 1, [0; 4]));
        assert!(library.remove(&first).is_some());
        let second = library.add("b.png", RawTexture::solid("b", 1, 1, [0; 4]));
        assert_ne!(first, second);
        assert_eq!(library.len(), 1);
        assert_eq!(library.images()[0].id, second);
        assert!(library.get(&first).is_none());
        assert_eq!(library.get(&second).map(|image| image.name.as_str()), Some("b.png"));
    }
}
