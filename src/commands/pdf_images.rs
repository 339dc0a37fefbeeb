use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{info, warn};

use crate::cli::PdfExtractImagesArgs;
use crate::poppler::{self, ImageListing};
use crate::util::ensure_directory;

const SCRATCH_ROOT: &str = "img";
/// Side files `pdfimages -all` writes next to JBIG2 streams.
const HELPER_EXTENSIONS: &[&str] = &["params", "jb2g"];
const MIN_SIDE_PX: u32 = 10;
const MIN_MEAN_LUMA: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExtractedImage {
    page: usize,
    number: usize,
    extension: String,
    path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    NearlyBlack,
    TooSmall,
}

pub fn run(args: PdfExtractImagesArgs) -> Result<()> {
    ensure_directory(&args.output_dir)?;
    let scratch = tempfile::tempdir().context("failed to create scratch directory")?;
    poppler::extract_images(&args.pdf_path, &scratch.path().join(SCRATCH_ROOT))?;
    let listing = poppler::list_images(&args.pdf_path)?;

    let mut extracted = Vec::new();
    for entry in fs::read_dir(scratch.path())
        .with_context(|| format!("failed to read {}", scratch.path().display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", scratch.path().display()))?
            .path();
        if let Some(extracted_image) = parse_extracted_name(path) {
            extracted.push(extracted_image);
        }
    }
    let extracted = select_images(extracted, &listing);

    let mut per_page_index = HashMap::<usize, usize>::new();
    let mut saved = 0_usize;

    for extracted_image in extracted {
        let index = per_page_index.entry(extracted_image.page).or_insert(0);
        *index += 1;

        match image::open(&extracted_image.path) {
            Ok(decoded) => {
                if let Some(reason) = skip_reason(&decoded) {
                    info!(page = extracted_image.page, reason = ?reason, "skipping image");
                    continue;
                }
            }
            Err(err) => {
                warn!(
                    page = extracted_image.page,
                    error = %err,
                    "could not decode image, keeping it as extracted"
                );
            }
        }

        let filename = format!(
            "{}_{}_{}.{}",
            args.prefix, extracted_image.page, index, extracted_image.extension
        );
        let output_path = args.output_dir.join(&filename);
        fs::copy(&extracted_image.path, &output_path)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        saved += 1;
        info!(file = %filename, "saved image");
    }

    println!(
        "Extraction complete! {saved} images extracted to {}",
        args.output_dir.display()
    );
    Ok(())
}

/// Parses `img-PPP-NNN.ext` as written by `pdfimages -p`.
fn parse_extracted_name(path: PathBuf) -> Option<ExtractedImage> {
    let filename = path.file_name()?.to_str()?;
    let rest = filename.strip_prefix(SCRATCH_ROOT)?.strip_prefix('-')?;
    let (stem, extension) = rest.split_once('.')?;
    if HELPER_EXTENSIONS
        .iter()
        .any(|helper| extension.eq_ignore_ascii_case(helper))
    {
        return None;
    }
    let (page, number) = stem.split_once('-')?;
    let page = page.parse().ok()?;
    let number = number.parse().ok()?;
    let extension = extension.to_string();

    Some(ExtractedImage {
        page,
        number,
        extension,
        path,
    })
}

/// Keeps the files whose `pdfimages -list` row has type `image`, dropping
/// soft masks and stencils, ordered by page then image number.
fn select_images(extracted: Vec<ExtractedImage>, listing: &[ImageListing]) -> Vec<ExtractedImage> {
    let images = listing
        .iter()
        .filter(|row| row.kind == "image")
        .map(|row| (row.page, row.number))
        .collect::<HashSet<_>>();

    let mut selected = extracted
        .into_iter()
        .filter(|extracted_image| images.contains(&(extracted_image.page, extracted_image.number)))
        .collect::<Vec<_>>();
    selected.sort_by(|a, b| a.page.cmp(&b.page).then(a.number.cmp(&b.number)));
    selected
}

fn skip_reason(image: &DynamicImage) -> Option<SkipReason> {
    let luma = image.to_luma8();
    let pixel_count = u64::from(luma.width()) * u64::from(luma.height());
    if pixel_count > 0 {
        let sum = luma
            .pixels()
            .map(|pixel| u64::from(pixel.0[0]))
            .sum::<u64>();
        if (sum as f64 / pixel_count as f64) < MIN_MEAN_LUMA {
            return Some(SkipReason::NearlyBlack);
        }
    }

    if image.width() < MIN_SIDE_PX || image.height() < MIN_SIDE_PX {
        return Some(SkipReason::TooSmall);
    }

    None
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, Rgb, RgbImage};

    use super::*;

    #[test]
    fn parse_extracted_name_reads_page_and_number() {
        let parsed = parse_extracted_name(PathBuf::from("/tmp/x/img-007-012.jpg"))
            .expect("pdfimages name should parse");
        assert_eq!(parsed.page, 7);
        assert_eq!(parsed.number, 12);
        assert_eq!(parsed.extension, "jpg");

        assert!(parse_extracted_name(PathBuf::from("/tmp/x/other-001-001.png")).is_none());
        assert!(parse_extracted_name(PathBuf::from("/tmp/x/img-001.png")).is_none());
    }

    #[test]
    fn jbig2_side_files_are_not_images() {
        let stream = parse_extracted_name(PathBuf::from("/tmp/x/img-003-004.jb2e"))
            .expect("jbig2 stream should parse");
        assert_eq!(stream.extension, "jb2e");

        assert!(parse_extracted_name(PathBuf::from("/tmp/x/img-003-004.params")).is_none());
        assert!(parse_extracted_name(PathBuf::from("/tmp/x/img-003-005.jb2g")).is_none());
    }

    #[test]
    fn masks_are_dropped_before_per_page_numbering() {
        let listing = poppler::parse_image_list(
            "\
page   num  type   width height color comp bpc  enc interp  object ID x-ppi y-ppi size ratio
--------------------------------------------------------------------------------------------
   1     0 smask     800   600  gray    1   8  image  no        13  0    72    72 1.2K 0.3%
   1     1 image     800   600  rgb     3   8  jpeg   no        12  0    72    72 45.2K 3.2%
   2     2 stencil    64    64  -       1   1  image  no        21  0    72    72  12B 0.3%
   2     3 image    1654  2339  gray    1   1  ccitt  no        20  0   200   200 30.1K 6.3%
",
        );
        let extracted = [
            "img-002-003.tif",
            "img-001-000.png",
            "img-002-002.png",
            "img-001-001.jpg",
        ]
        .iter()
        .filter_map(|name| parse_extracted_name(PathBuf::from("/tmp/x").join(name)))
        .collect::<Vec<_>>();

        let selected = select_images(extracted, &listing);

        assert_eq!(
            selected
                .iter()
                .map(|kept| (kept.page, kept.number, kept.extension.as_str()))
                .collect::<Vec<_>>(),
            vec![(1, 1, "jpg"), (2, 3, "tif")]
        );
    }

    #[test]
    fn skip_reason_flags_black_and_tiny_images() {
        let black = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, Luma([2])));
        assert_eq!(skip_reason(&black), Some(SkipReason::NearlyBlack));

        let sliver = DynamicImage::ImageRgb8(RgbImage::from_pixel(9, 200, Rgb([255, 255, 255])));
        assert_eq!(skip_reason(&sliver), Some(SkipReason::TooSmall));

        let figure = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, Rgb([120, 130, 140])));
        assert_eq!(skip_reason(&figure), None);
    }
}
