use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::error::Result;
use crate::raster::parse_image_file_name;

pub const IMAGES_PER_PAGE: usize = 10;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SavedImage {
    pub filename: String,
    pub created_at_ms: i64,
    pub modified_ms: i64,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct GalleryPage {
    pub page: usize,
    pub total_pages: usize,
    pub images: Vec<SavedImage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Rejected,
}

/// Saved drawings, most recently modified first.
pub async fn list_images(dir: &Path) -> Result<Vec<SavedImage>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let filename = entry.file_name().to_string_lossy().into_owned();
        let Some(created_at_ms) = parse_image_file_name(&filename) else {
            continue;
        };
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
            .unwrap_or(created_at_ms);
        images.push(SavedImage {
            filename,
            created_at_ms,
            modified_ms,
        });
    }
    images.sort_by(|a, b| {
        b.modified_ms
            .cmp(&a.modified_ms)
            .then_with(|| b.created_at_ms.cmp(&a.created_at_ms))
    });
    Ok(images)
}

/// 1-based; out of range pages are clamped to the nearest valid one.
pub fn paginate(images: Vec<SavedImage>, page: usize, per_page: usize) -> GalleryPage {
    let per_page = per_page.max(1);
    let total_pages = images.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let images = images
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();
    GalleryPage {
        page,
        total_pages,
        images,
    }
}

pub async fn delete_image(dir: &Path, filename: &str) -> Result<DeleteOutcome> {
    if parse_image_file_name(filename).is_none() {
        return Ok(DeleteOutcome::Rejected);
    }
    match tokio::fs::remove_file(dir.join(filename)).await {
        Ok(()) => Ok(DeleteOutcome::Deleted),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(created_at_ms: i64) -> SavedImage {
        SavedImage {
            filename: format!("{created_at_ms}.png"),
            created_at_ms,
            modified_ms: created_at_ms,
        }
    }

    #[test]
    fn paginates_and_clamps() {
        let images = (0..23).rev().map(image).collect::<Vec<_>>();
        let first = paginate(images.clone(), 1, IMAGES_PER_PAGE);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.images.len(), 10);
        assert_eq!(first.images[0].created_at_ms, 22);

        let last = paginate(images.clone(), 3, IMAGES_PER_PAGE);
        assert_eq!(last.images.len(), 3);

        assert_eq!(paginate(images.clone(), 0, IMAGES_PER_PAGE).page, 1);
        assert_eq!(paginate(images, 99, IMAGES_PER_PAGE).page, 3);
    }

    #[test]
    fn empty_gallery_has_one_empty_page() {
        let page = paginate(Vec::new(), 4, IMAGES_PER_PAGE);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.images.is_empty());
    }

    #[tokio::test]
    async fn lists_only_image_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("100.png"), b"a").unwrap();
        std::fs::write(dir.path().join("200.png"), b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"c").unwrap();
        std::fs::create_dir(dir.path().join("300.png")).unwrap();

        let mut names = list_images(dir.path())
            .await
            .unwrap()
            .into_iter()
            .map(|image| image.created_at_ms)
            .collect::<Vec<_>>();
        names.sort_unstable();
        assert_eq!(names, vec![100, 200]);
    }

    #[tokio::test]
    async fn delete_guards_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("100.png"), b"a").unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"b").unwrap();

        assert_eq!(
            delete_image(dir.path(), "100.png").await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            delete_image(dir.path(), "100.png").await.unwrap(),
            DeleteOutcome::NotFound
        );
        assert_eq!(
            delete_image(dir.path(), "secret.txt").await.unwrap(),
            DeleteOutcome::Rejected
        );
        assert_eq!(
            delete_image(dir.path(), "../100.png").await.unwrap(),
            DeleteOutcome::Rejected
        );
        assert!(dir.path().join("secret.txt").exists());
    }
}
