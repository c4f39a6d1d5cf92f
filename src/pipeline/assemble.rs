//! Document assembly: merge the converted raster pages into one PDF.
//!
//! Each image becomes one page, in list order. Pixels are embedded
//! losslessly as a Flate-compressed image XObject (DeviceGray for grayscale
//! scans, DeviceRGB otherwise; alpha is dropped) and drawn over the whole
//! page. The page measures `pixels * 72 / dpi` points on each side, where
//! `dpi` is the resolution recorded in the TIFF when it has one in inches
//! or centimetres, else the configured fallback.
//!
//! Decoding and compression are CPU-bound, so [`assemble_pdf`] runs the
//! work on the blocking pool.

use crate::error::Pdg2PdfError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use std::path::{Path, PathBuf};
use tiff::decoder::ifd::Value;
use tiff::decoder::Decoder;
use tiff::tags::Tag;
use tracing::{debug, info};

/// Build the PDF for `pages` (in order) without blocking the runtime.
///
/// `dpi` sizes pages whose image carries no usable resolution.
pub async fn assemble_pdf(pages: &[PathBuf], dpi: u32) -> Result<Vec<u8>, Pdg2PdfError> {
    let pages = pages.to_vec();
    tokio::task::spawn_blocking(move || build_pdf(&pages, dpi))
        .await
        .map_err(|e| Pdg2PdfError::Internal(format!("Assembly task panicked: {}", e)))?
}

/// Blocking implementation of [`assemble_pdf`].
pub fn build_pdf(pages: &[PathBuf], dpi: u32) -> Result<Vec<u8>, Pdg2PdfError> {
    if pages.is_empty() {
        return Err(Pdg2PdfError::AssemblyFailed {
            detail: "no pages to assemble".into(),
        });
    }
    let fallback_dpi = dpi.max(1) as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for path in pages {
        let img = decode_raster(path)?;
        let resolution = match tiff_resolution(path) {
            Some(res) => {
                debug!("{} records {}x{} dpi", path.display(), res.0, res.1);
                res
            }
            None => (fallback_dpi, fallback_dpi),
        };
        let page_id = add_image_page(&mut doc, pages_id, &img, resolution)?;
        debug!(
            "Added page {} ({}x{} px)",
            path.display(),
            img.width(),
            img.height()
        );
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| Pdg2PdfError::AssemblyFailed {
            detail: format!("failed to serialise PDF: {e}"),
        })?;
    info!("Assembled {} pages into {} bytes", count, bytes.len());
    Ok(bytes)
}

/// Write `bytes` to `path`, replacing any existing file.
///
/// The bytes go to a uniquely named temp file in the destination directory
/// and are persisted over the target, so a failed write never leaves a
/// truncated PDF at `path`. When `path` is a symlink the file it points to
/// is replaced and the link is kept. Missing parent directories are created.
pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), Pdg2PdfError> {
    let target = resolve_output_path(path).await;
    if target != path {
        debug!("{} resolves to {}", path.display(), target.display());
    }

    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || persist_output(&target, &bytes))
        .await
        .map_err(|e| Pdg2PdfError::Internal(format!("Output write task panicked: {}", e)))?
        .map_err(|source| Pdg2PdfError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Follow `path` if it is a symlink. A dangling link resolves to the path
/// it names, which is then created.
async fn resolve_output_path(path: &Path) -> PathBuf {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.file_type().is_symlink() => {
            if let Ok(real) = tokio::fs::canonicalize(path).await {
                return real;
            }
            match tokio::fs::read_link(path).await {
                Ok(link) => match path.parent() {
                    Some(parent) => parent.join(link),
                    None => link,
                },
                Err(_) => path.to_path_buf(),
            }
        }
        _ => path.to_path_buf(),
    }
}

fn persist_output(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let existing = std::fs::metadata(target)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.permissions());

    let mut builder = tempfile::Builder::new();
    builder.prefix(".pdg2pdf-").suffix(".tmp");
    // Temp files are owner-only; a fresh output gets the usual umask mode.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if existing.is_none() {
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
    }

    // Dropping the temp file on any error below removes it.
    let mut tmp = builder.tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    if let Some(permissions) = existing {
        tmp.as_file().set_permissions(permissions)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

fn decode_raster(path: &Path) -> Result<DynamicImage, Pdg2PdfError> {
    let failed = |detail: String| Pdg2PdfError::AssemblyFailed {
        detail: format!("cannot read page image '{}': {}", path.display(), detail),
    };
    image::ImageReader::open(path)
        .map_err(|e| failed(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| failed(e.to_string()))?
        .decode()
        .map_err(|e| failed(e.to_string()))
}

/// Horizontal and vertical resolution of a TIFF page in dots per inch.
///
/// `None` for non-TIFF files, unit-less resolutions (ResolutionUnit 1) and
/// zero or missing values.
fn tiff_resolution(path: &Path) -> Option<(f32, f32)> {
    let file = std::fs::File::open(path).ok()?;
    let mut decoder = Decoder::new(std::io::BufReader::new(file)).ok()?;

    let per_inch = match decoder.find_tag(Tag::ResolutionUnit).ok()? {
        None => 1.0,
        Some(unit) => match tag_number(unit)? as u16 {
            2 => 1.0,
            3 => 2.54,
            _ => return None,
        },
    };
    let x = decoder.find_tag(Tag::XResolution).ok()?.and_then(tag_number)?;
    let y = decoder
        .find_tag(Tag::YResolution)
        .ok()?
        .and_then(tag_number)
        .unwrap_or(x);

    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !valid(x) || !valid(y) {
        return None;
    }
    Some(((x * per_inch) as f32, (y * per_inch) as f32))
}

fn tag_number(value: Value) -> Option<f64> {
    match value {
        Value::Byte(v) => Some(v.into()),
        Value::Short(v) => Some(v.into()),
        Value::Unsigned(v) => Some(v.into()),
        Value::Rational(n, d) if d != 0 => Some(f64::from(n) / f64::from(d)),
        Value::Float(v) => Some(v.into()),
        Value::Double(v) => Some(v),
        Value::List(values) => values.into_iter().next().and_then(tag_number),
        _ => None,
    }
}

/// Embed `img` as an XObject and add a page that shows it full-size.
fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    img: &DynamicImage,
    (x_dpi, y_dpi): (f32, f32),
) -> Result<ObjectId, Pdg2PdfError> {
    let (width, height) = (img.width(), img.height());
    let (color_space, pixels) = if img.color().has_color() {
        ("DeviceRGB", img.to_rgb8().into_raw())
    } else {
        ("DeviceGray", img.to_luma8().into_raw())
    };

    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&pixels)?,
    )
    .with_compression(false);
    let image_id = doc.add_object(image_stream);

    let page_w = width as f32 * 72.0 / x_dpi;
    let page_h = height as f32 * 72.0 / y_dpi;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    page_w.into(),
                    0.into(),
                    0.into(),
                    page_h.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content.encode().map_err(|e| Pdg2PdfError::AssemblyFailed {
        detail: format!("failed to encode page content: {e}"),
    })?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let media_box: Vec<Object> = vec![0.into(), 0.into(), page_w.into(), page_h.into()];
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });
    Ok(page_id)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, Pdg2PdfError> {
    let failed = |e: std::io::Error| Pdg2PdfError::AssemblyFailed {
        detail: format!("failed to compress image data: {e}"),
    };
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(failed)?;
    encoder.finish().map_err(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};

    fn write_tiff(dir: &Path, name: &str, w: u32, h: u32, gray: bool) -> PathBuf {
        let path = dir.join(name);
        let img = if gray {
            DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([128])))
        } else {
            DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 10, 10])))
        };
        img.save_with_format(&path, ImageFormat::Tiff).unwrap();
        path
    }

    fn media_widths(bytes: &[u8]) -> Vec<f32> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|&id| {
                let page = doc.get_object(id).unwrap().as_dict().unwrap();
                let mb = page.get(b"MediaBox").unwrap().as_array().unwrap();
                mb[2].as_float().unwrap()
            })
            .collect()
    }

    #[test]
    fn one_page_per_image_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let pages = vec![
            write_tiff(tmp.path(), "a.tiff", 96, 20, false),
            write_tiff(tmp.path(), "b.tiff", 192, 20, true),
            write_tiff(tmp.path(), "c.tiff", 48, 20, false),
        ];
        let bytes = build_pdf(&pages, 96).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(media_widths(&bytes), [72.0f32, 144.0, 36.0]);
    }

    #[test]
    fn dpi_scales_page_size() {
        let tmp = tempfile::tempdir().unwrap();
        let pages = vec![write_tiff(tmp.path(), "a.tiff", 300, 300, true)];
        let bytes = build_pdf(&pages, 300).unwrap();
        assert_eq!(media_widths(&bytes), [72.0f32]);
    }

    #[test]
    fn empty_page_list_is_rejected() {
        let err = build_pdf(&[], 96).unwrap_err();
        assert!(matches!(err, Pdg2PdfError::AssemblyFailed { .. }));
    }

    #[test]
    fn unreadable_page_fails_assembly() {
        let tmp = tempfile::tempdir().unwrap();
        let bogus = tmp.path().join("bogus.tiff");
        std::fs::write(&bogus, b"not an image").unwrap();
        let err = build_pdf(&[bogus], 96).unwrap_err();
        assert!(err.to_string().contains("bogus.tiff"));
    }

    fn write_tiff_with_resolution(
        dir: &Path,
        name: &str,
        w: u32,
        h: u32,
        unit: tiff::tags::ResolutionUnit,
        per_unit: u32,
    ) -> PathBuf {
        use tiff::encoder::{colortype, Rational, TiffEncoder};

        let path = dir.join(name);
        let mut encoder = TiffEncoder::new(std::fs::File::create(&path).unwrap()).unwrap();
        let mut page = encoder.new_image::<colortype::Gray8>(w, h).unwrap();
        page.resolution(unit, Rational { n: per_unit, d: 1 });
        page.write_data(&vec![90u8; (w * h) as usize]).unwrap();
        path
    }

    #[test]
    fn recorded_resolution_overrides_fallback_dpi() {
        use tiff::tags::ResolutionUnit;

        let tmp = tempfile::tempdir().unwrap();
        let pages = vec![
            write_tiff_with_resolution(tmp.path(), "inch.tiff", 300, 150, ResolutionUnit::Inch, 300),
            write_tiff_with_resolution(
                tmp.path(),
                "cm.tiff",
                254,
                254,
                ResolutionUnit::Centimeter,
                100,
            ),
            write_tiff(tmp.path(), "plain.tiff", 96, 20, true),
        ];
        let bytes = build_pdf(&pages, 96).unwrap();
        let widths = media_widths(&bytes);
        assert!((widths[0] - 72.0).abs() < 0.01, "{widths:?}");
        assert!((widths[1] - 72.0).abs() < 0.01, "{widths:?}");
        assert!((widths[2] - 72.0).abs() < 0.01, "{widths:?}");
    }

    #[test]
    fn unitless_resolution_is_ignored() {
        use tiff::tags::ResolutionUnit;

        let tmp = tempfile::tempdir().unwrap();
        let page =
            write_tiff_with_resolution(tmp.path(), "none.tiff", 192, 10, ResolutionUnit::None, 300);
        assert_eq!(tiff_resolution(&page), None);
        assert_eq!(media_widths(&build_pdf(&[page], 96).unwrap()), [144.0f32]);
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn write_output_replaces_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested/dir/book.pdf");
        write_output(&out, b"first").await.unwrap();
        write_output(&out, b"second").await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"second");
        assert_eq!(dir_entries(out.parent().unwrap()), ["book.pdf"]);
    }

    #[tokio::test]
    async fn write_output_leaves_neighbouring_tmp_file_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("book.pdf");
        let neighbour = tmp.path().join("book.pdf.tmp");
        std::fs::write(&neighbour, b"USER DATA").unwrap();

        write_output(&out, b"pdf").await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"pdf");
        assert_eq!(std::fs::read(&neighbour).unwrap(), b"USER DATA");
    }

    #[tokio::test]
    async fn write_output_into_directory_path_fails_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("taken");
        std::fs::create_dir(&out).unwrap();
        let err = write_output(&out, b"pdf").await.unwrap_err();
        assert!(matches!(err, Pdg2PdfError::OutputWriteFailed { .. }));
        assert!(out.is_dir());
        assert_eq!(dir_entries(tmp.path()), ["taken"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_output_follows_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("real.pdf");
        let link = tmp.path().join("link.pdf");
        std::fs::write(&real, b"old").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        write_output(&link, b"new").await.unwrap();
        assert!(std::fs::symlink_metadata(&link)
            .unwrap()
            .file_type()
            .is_symlink());
        assert_eq!(std::fs::read(&real).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_output_creates_target_of_dangling_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let link = tmp.path().join("link.pdf");
        std::os::unix::fs::symlink("real.pdf", &link).unwrap();

        write_output(&link, b"new").await.unwrap();
        assert_eq!(std::fs::read(tmp.path().join("real.pdf")).unwrap(), b"new");
        assert!(std::fs::symlink_metadata(&link)
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_output_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("book.pdf");
        std::fs::write(&out, b"old").unwrap();
        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o640)).unwrap();

        write_output(&out, b"new").await.unwrap();
        let mode = std::fs::metadata(&out).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }
}
