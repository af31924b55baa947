//! Image operations: template removal and lossless recompression.
//!
//! Compression only ever replaces a file with a strictly smaller encoding
//! of the same pixels, so running it again over its own output changes
//! nothing.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifDecoder, GifEncoder};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{AnimationDecoder, ImageEncoder, ImageFormat};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::copier::remove_path;
use crate::error::BuildError;
use crate::scanner::{find_files_shallow, IMAGES_DIR};

/// Layered source files shipped next to the exported images
const TEMPLATE_EXTENSIONS: &[&str] = &["psd"];

const COMPRESSIBLE_EXTENSIONS: &[&str] = &["png", "gif", "jpg", "jpeg", "svg"];

/// Remove image templates from the images directory
pub fn delete_template_images(dir: &Path) -> Result<usize, BuildError> {
    info!("Deleting image templates");

    let templates = find_files_shallow(&dir.join(IMAGES_DIR), TEMPLATE_EXTENSIONS)?;
    for path in &templates {
        remove_path(path)?;
    }
    Ok(templates.len())
}

/// Outcome of compressing one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStats {
    pub path: PathBuf,
    pub original_size: usize,
    pub final_size: usize,
}

impl ImageStats {
    pub fn replaced(&self) -> bool {
        self.final_size < self.original_size
    }
}

/// Re-encode a PNG with maximum deflate effort and adaptive filtering
pub fn recompress_png(data: &[u8]) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Png).map_err(|e| e.to_string())?;

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color().into())
        .map_err(|e| e.to_string())?;
    Ok(out)
}

/// Re-encode a still GIF. Animations are returned unchanged.
pub fn recompress_gif(data: &[u8]) -> Result<Vec<u8>, String> {
    let decoder = GifDecoder::new(Cursor::new(data)).map_err(|e| e.to_string())?;
    let mut frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| e.to_string())?;

    if frames.len() != 1 {
        return Ok(data.to_vec());
    }

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut out, 1);
        encoder
            .encode_frames(frames.drain(..))
            .map_err(|e| e.to_string())?;
    }
    Ok(out)
}

/// Drop metadata segments from a JPEG without touching the image data.
///
/// Keeps JFIF (APP0), ICC profiles (APP2), Adobe colour info (APP14) and
/// every coding segment; everything from the first scan onwards is copied
/// verbatim.
pub fn strip_jpeg_metadata(data: &[u8]) -> Result<Vec<u8>, String> {
    const SOI: u8 = 0xD8;
    const SOS: u8 = 0xDA;
    const COM: u8 = 0xFE;

    if data.len() < 4 || data[0] != 0xFF || data[1] != SOI {
        return Err("not a JPEG file".to_string());
    }

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..2]);
    let mut pos = 2;

    loop {
        // Markers may be preceded by fill bytes
        while pos < data.len() && data[pos] == 0xFF && data.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if pos + 1 >= data.len() || data[pos] != 0xFF {
            return Err(format!("corrupt JPEG marker at offset {pos}"));
        }

        let marker = data[pos + 1];
        if marker == SOS {
            out.extend_from_slice(&data[pos..]);
            return Ok(out);
        }

        if pos + 3 >= data.len() {
            return Err("truncated JPEG segment".to_string());
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let end = pos + 2 + length;
        if length < 2 || end > data.len() {
            return Err(format!("invalid JPEG segment length at offset {pos}"));
        }

        let is_app = (0xE0..=0xEF).contains(&marker);
        let keep = !(marker == COM || (is_app && !matches!(marker, 0xE0 | 0xE2 | 0xEE)));
        if keep {
            out.extend_from_slice(&data[pos..end]);
        }
        pos = end;
    }
}

fn parse_length(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").parse().ok()
}

/// A root `viewBox` is redundant when it is `0 0 width height`
fn view_box_is_redundant(root: &BytesStart<'_>) -> Result<bool, quick_xml::Error> {
    let mut view_box = None;
    let mut width = None;
    let mut height = None;

    for attr in root.attributes() {
        let attr = attr?;
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"viewBox" => view_box = Some(value),
            b"width" => width = parse_length(&value),
            b"height" => height = parse_length(&value),
            _ => {}
        }
    }

    let (Some(view_box), Some(width), Some(height)) = (view_box, width, height) else {
        return Ok(false);
    };

    let parts: Vec<f64> = view_box
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    Ok(parts.len() == 4
        && parts[0] == 0.0
        && parts[1] == 0.0
        && parts[2] == width
        && parts[3] == height)
}

fn without_view_box(root: &BytesStart<'_>) -> Result<BytesStart<'static>, quick_xml::Error> {
    let mut out = root.clone().into_owned();
    out.clear_attributes();
    for attr in root.attributes() {
        let attr = attr?;
        if attr.key.as_ref() != b"viewBox" {
            out.push_attribute(attr);
        }
    }
    Ok(out)
}

fn clean_root(root: BytesStart<'_>) -> Result<BytesStart<'_>, quick_xml::Error> {
    if view_box_is_redundant(&root)? {
        Ok(without_view_box(&root)?)
    } else {
        Ok(root)
    }
}

/// Clean SVG markup: drop comments, doctype, processing instructions,
/// `<metadata>` and insignificant whitespace, and a redundant root
/// `viewBox`. Element ids are left alone.
pub fn clean_svg(data: &[u8]) -> Result<Vec<u8>, String> {
    clean_svg_events(data).map_err(|e| e.to_string())
}

fn clean_svg_events(data: &[u8]) -> Result<Vec<u8>, quick_xml::Error> {
    let mut reader = Reader::from_reader(data);
    reader.trim_text(true);
    let mut writer = Writer::new(Vec::with_capacity(data.len()));
    let mut buf = Vec::new();
    let mut skip_depth = 0usize;
    let mut root_seen = false;

    loop {
        let event = reader.read_event_into(&mut buf)?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Comment(_) | Event::DocType(_) | Event::PI(_) | Event::Decl(_) => {}
            Event::Start(e) if e.name().as_ref() == b"metadata" => skip_depth = 1,
            Event::Empty(e) if e.name().as_ref() == b"metadata" => {}
            Event::Start(e) if !root_seen && e.name().as_ref() == b"svg" => {
                root_seen = true;
                writer.write_event(Event::Start(clean_root(e)?))?;
            }
            Event::Empty(e) if !root_seen && e.name().as_ref() == b"svg" => {
                root_seen = true;
                writer.write_event(Event::Empty(clean_root(e)?))?;
            }
            other => writer.write_event(other)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn recompress(path: &Path, data: &[u8]) -> Result<Option<Vec<u8>>, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let out = match ext.as_str() {
        "png" => recompress_png(data)?,
        "gif" => recompress_gif(data)?,
        "jpg" | "jpeg" => strip_jpeg_metadata(data)?,
        "svg" => clean_svg(data)?,
        _ => return Ok(None),
    };
    Ok(Some(out))
}

fn compress_one(path: &Path) -> Result<ImageStats, BuildError> {
    let data = fs::read(path).map_err(|e| BuildError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let compressed = recompress(path, &data).map_err(|message| BuildError::Image {
        path: path.to_path_buf(),
        message,
    })?;

    let final_size = match compressed {
        Some(bytes) if bytes.len() < data.len() => {
            fs::write(path, &bytes).map_err(|e| BuildError::write_failed(path.to_path_buf(), e))?;
            bytes.len()
        }
        _ => data.len(),
    };

    debug!(
        path = %path.display(),
        before = data.len(),
        after = final_size,
        "image processed"
    );

    Ok(ImageStats {
        path: path.to_path_buf(),
        original_size: data.len(),
        final_size,
    })
}

/// Compress every supported image directly inside the images directory
pub fn compress_images(dir: &Path) -> Result<Vec<ImageStats>, BuildError> {
    info!("Compressing images");

    let files = find_files_shallow(&dir.join(IMAGES_DIR), COMPRESSIBLE_EXTENSIONS)?;
    let stats: Vec<ImageStats> = files
        .par_iter()
        .map(|path| compress_one(path))
        .collect::<Result<_, _>>()?;

    let saved: usize = stats.iter().map(|s| s.original_size - s.final_size).sum();
    info!(
        "Compressed {} of {} images, saved {} bytes",
        stats.iter().filter(|s| s.replaced()).count(),
        stats.len(),
        saved
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn sample_png(path: &Path) {
        let img = RgbaImage::from_fn(48, 48, |x, y| {
            Rgba([(x * 5) as u8, (y * 5) as u8, ((x + y) % 7) as u8 * 30, 255])
        });
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    const SVG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<!-- Generator: editor -->
<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
    <metadata><rdf>junk</rdf></metadata>
    <g id="icon">
        <path id="shape" d="M0 0h24v24H0z"/>
    </g>
</svg>
"#;

    #[test]
    fn test_delete_template_images() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("logo.psd"), "psd").unwrap();
        fs::write(images.join("logo.png"), "png").unwrap();

        let removed = delete_template_images(temp.path()).unwrap();

        assert_eq!(removed, 1);
        assert!(!images.join("logo.psd").exists());
        assert!(images.join("logo.png").exists());
    }

    #[test]
    fn test_delete_template_images_without_images_dir() {
        let temp = TempDir::new().unwrap();
        assert_eq!(delete_template_images(temp.path()).unwrap(), 0);
    }

    #[test]
    fn test_clean_svg_keeps_ids_and_drops_noise() {
        let out = String::from_utf8(clean_svg(SVG.as_bytes()).unwrap()).unwrap();

        assert!(!out.contains("<?xml"));
        assert!(!out.contains("DOCTYPE"));
        assert!(!out.contains("Generator"));
        assert!(!out.contains("metadata"));
        assert!(!out.contains("viewBox"));
        assert!(out.contains(r#"id="icon""#));
        assert!(out.contains(r#"id="shape""#));
        assert!(out.starts_with("<svg"));
    }

    #[test]
    fn test_clean_svg_keeps_meaningful_view_box() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="48" height="48" viewBox="0 0 24 24"><rect width="24" height="24"/></svg>"#;
        let out = String::from_utf8(clean_svg(svg.as_bytes()).unwrap()).unwrap();
        assert!(out.contains(r#"viewBox="0 0 24 24""#));
    }

    #[test]
    fn test_clean_svg_is_idempotent() {
        let once = clean_svg(SVG.as_bytes()).unwrap();
        let twice = clean_svg(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_strip_jpeg_metadata() {
        // SOI, APP1 (exif), COM, DQT stub, SOS + data, EOI
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&[0xFF, 0xE1, 0x00, 0x06, b'E', b'x', b'i', b'f']);
        jpeg.extend_from_slice(&[0xFF, 0xFE, 0x00, 0x05, b'h', b'i', b'!']);
        jpeg.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x04, 0x01, 0x02]);
        jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x11, 0x22, 0xFF, 0xD9]);

        let out = strip_jpeg_metadata(&jpeg).unwrap();

        assert_eq!(
            out,
            vec![
                0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x04, 0x01, 0x02, 0xFF, 0xDA, 0x00, 0x02, 0x11,
                0x22, 0xFF, 0xD9
            ]
        );
    }

    #[test]
    fn test_strip_jpeg_metadata_rejects_garbage() {
        assert!(strip_jpeg_metadata(b"not a jpeg").is_err());
        assert!(strip_jpeg_metadata(&[0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x40]).is_err());
    }

    #[test]
    fn test_compress_images_never_grows_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        fs::create_dir_all(&images).unwrap();
        let png = images.join("pixels.png");
        sample_png(&png);
        fs::write(images.join("icon.svg"), SVG).unwrap();
        let original_png = fs::read(&png).unwrap();

        let first = compress_images(temp.path()).unwrap();
        assert_eq!(first.len(), 2);
        for s in &first {
            assert!(s.final_size <= s.original_size);
        }
        let after_first = fs::read(&png).unwrap();

        let second = compress_images(temp.path()).unwrap();
        for s in &second {
            assert!(!s.replaced(), "{} shrank again", s.path.display());
        }

        let before = image::load_from_memory(&original_png).unwrap().to_rgba8();
        let after = image::load_from_memory(&after_first).unwrap().to_rgba8();
        assert_eq!(before, after);
    }

    #[test]
    fn test_compress_images_corrupt_png_is_error() {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("broken.png"), b"\x89PNG garbage").unwrap();

        let result = compress_images(temp.path());

        assert!(matches!(result, Err(BuildError::Image { .. })));
    }
}
