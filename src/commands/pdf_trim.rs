use anyhow::{Context, Result, bail};
use image::GrayImage;
use tracing::info;

use crate::cli::PdfRemoveHfArgs;
use crate::poppler::{self, CropBox, PageSize};
use crate::util::{ensure_directory, file_name_string};

/// At 72 dpi one rendered pixel is one PDF point.
const RENDER_DPI: u32 = 72;
const WHITE_THRESHOLD: u8 = 250;
const CONTENT_RATIO: f64 = 0.95;
const SEARCH_FRACTION: f64 = 0.2;
const MARGIN: f64 = 0.01;

/// Consecutive 1-based pages `first..=last` sharing one page size.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageRun {
    first: usize,
    last: usize,
    width_pts: f64,
    height_pts: f64,
}

pub fn run(args: PdfRemoveHfArgs) -> Result<()> {
    let filename = file_name_string(&args.pdf_path)?;
    ensure_directory(&args.output_dir)?;
    let output_path = args.output_dir.join(format!("cleaned_{filename}"));

    let info = poppler::pdf_info(&args.pdf_path)?;
    let scratch = tempfile::tempdir().context("failed to create scratch directory")?;
    let png_path = poppler::render_page_png(
        &args.pdf_path,
        1,
        RENDER_DPI,
        &scratch.path().join("first-page"),
    )?;
    let page = image::open(&png_path)
        .with_context(|| format!("failed to decode {}", png_path.display()))?
        .to_luma8();

    let (header_px, footer_px) = detect_header_footer(&page);
    let page_px = f64::from(page.height().max(1));
    let header_proportion = f64::from(header_px) / page_px + MARGIN;
    let footer_proportion = f64::from(footer_px) / page_px + MARGIN;

    let sizes = poppler::page_sizes(&args.pdf_path, info.pages)?;
    let runs = page_runs(&sizes);
    if let [run] = runs.as_slice() {
        let crop = crop_box(run.width_pts, run.height_pts, header_proportion, footer_proportion)?;
        poppler::crop_pages(&args.pdf_path, run.first, run.last, crop, &output_path)?;
    } else {
        let mut parts = Vec::with_capacity(runs.len());
        for run in &runs {
            let crop =
                crop_box(run.width_pts, run.height_pts, header_proportion, footer_proportion)?;
            let part = scratch
                .path()
                .join(format!("pages-{}-{}.pdf", run.first, run.last));
            poppler::crop_pages(&args.pdf_path, run.first, run.last, crop, &part)?;
            parts.push(part);
        }
        poppler::unite(&parts, &output_path)?;
    }

    info!(
        path = %output_path.display(),
        header = header_proportion,
        footer = footer_proportion,
        page_sizes = runs.len(),
        "wrote cleaned PDF"
    );
    println!("Successfully created cleaned PDF: {}", output_path.display());
    println!("Detected header height: {:.1}%", header_proportion * 100.0);
    println!("Detected footer height: {:.1}%", footer_proportion * 100.0);

    Ok(())
}

/// Header and footer heights in pixels, from the row profile of near-white
/// pixels. Only the top and bottom fifth of the page are searched.
pub fn detect_header_footer(page: &GrayImage) -> (u32, u32) {
    let profile = page
        .rows()
        .map(|row| row.filter(|pixel| pixel.0[0] > WHITE_THRESHOLD).count())
        .collect::<Vec<usize>>();
    let Some(&max) = profile.iter().max() else {
        return (0, 0);
    };
    if max == 0 {
        return (0, 0);
    }

    let has_content = |row: usize| (profile[row] as f64 / max as f64) < CONTENT_RATIO;
    let height = profile.len();

    let header_limit = (height as f64 * SEARCH_FRACTION) as usize;
    let header = (0..header_limit).find(|&row| has_content(row)).unwrap_or(0);

    let footer_limit = (height as f64 * (1.0 - SEARCH_FRACTION)) as usize;
    let footer = (footer_limit + 1..height)
        .rev()
        .find(|&row| has_content(row))
        .map(|row| height - row)
        .unwrap_or(0);

    (header as u32, footer as u32)
}

fn page_runs(sizes: &[PageSize]) -> Vec<PageRun> {
    let mut runs: Vec<PageRun> = Vec::new();
    for size in sizes {
        match runs.last_mut() {
            Some(run)
                if run.width_pts == size.width_pts
                    && run.height_pts == size.height_pts
                    && run.last + 1 == size.page =>
            {
                run.last = size.page;
            }
            _ => runs.push(PageRun {
                first: size.page,
                last: size.page,
                width_pts: size.width_pts,
                height_pts: size.height_pts,
            }),
        }
    }
    runs
}

/// Crop box in points for one page size; the proportions come from the
/// first page and scale with each page's own height.
fn crop_box(
    width_pts: f64,
    height_pts: f64,
    header_proportion: f64,
    footer_proportion: f64,
) -> Result<CropBox> {
    let header_pts = height_pts * header_proportion;
    let footer_pts = height_pts * footer_proportion;
    let kept_pts = height_pts - header_pts - footer_pts;
    if kept_pts < 1.0 {
        bail!("detected header and footer leave no page content");
    }

    Ok(CropBox {
        x: 0,
        y: header_pts.round() as u32,
        width: width_pts.round() as u32,
        height: kept_pts.round() as u32,
    })
}
