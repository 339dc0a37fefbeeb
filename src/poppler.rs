//! Thin wrappers over the poppler-utils binaries (`pdfinfo`, `pdftoppm`,
//! `pdfimages`, `pdfseparate`, `pdfunite`, `pdftocairo`).

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfInfo {
    pub pages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub page: usize,
    pub width_pts: f64,
    pub height_pts: f64,
}

pub fn pdf_info(pdf_path: &Path) -> Result<PdfInfo> {
    let mut command = Command::new("pdfinfo");
    command.arg(pdf_path);
    let output = run_tool(command, "pdfinfo", pdf_path)?;
    parse_pdfinfo(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("failed to read pdfinfo output for {}", pdf_path.display()))
}

pub fn parse_pdfinfo(text: &str) -> Result<PdfInfo> {
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() == "Pages" {
            let pages = value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid page count: {}", value.trim()))?;
            return Ok(PdfInfo { pages });
        }
    }

    bail!("pdfinfo output has no page count")
}

/// Sizes of 1-based pages `1..=pages`, from `pdfinfo -f 1 -l {pages}`.
pub fn page_sizes(pdf_path: &Path, pages: usize) -> Result<Vec<PageSize>> {
    let mut command = Command::new("pdfinfo");
    command
        .arg("-f")
        .arg("1")
        .arg("-l")
        .arg(pages.to_string())
        .arg(pdf_path);
    let output = run_tool(command, "pdfinfo", pdf_path)?;
    let sizes = parse_page_sizes(&String::from_utf8_lossy(&output.stdout));

    if sizes.len() != pages {
        bail!(
            "pdfinfo reported {} page sizes for {} pages of {}",
            sizes.len(),
            pages,
            pdf_path.display()
        );
    }
    Ok(sizes)
}

/// Reads the `Page    N size: W x H pts` lines of a ranged pdfinfo run.
pub fn parse_page_sizes(text: &str) -> Vec<PageSize> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let mut key_tokens = key.split_whitespace();
            if key_tokens.next()? != "Page" {
                return None;
            }
            let page = key_tokens.next()?.parse::<usize>().ok()?;
            if key_tokens.next()? != "size" {
                return None;
            }
            let (width_pts, height_pts) = parse_page_size(value)?;
            Some(PageSize {
                page,
                width_pts,
                height_pts,
            })
        })
        .collect()
}

/// Parses `"595.276 x 841.89 pts (A4)"`.
fn parse_page_size(value: &str) -> Option<(f64, f64)> {
    let mut tokens = value.split_whitespace();
    let width = tokens.next()?.parse::<f64>().ok()?;
    if tokens.next()? != "x" {
        return None;
    }
    let height = tokens.next()?.parse::<f64>().ok()?;
    Some((width, height))
}

/// Renders one 1-based page to `{output_root}.png`.
pub fn render_page_png(
    pdf_path: &Path,
    page_number: usize,
    dpi: u32,
    output_root: &Path,
) -> Result<PathBuf> {
    let mut command = Command::new("pdftoppm");
    command
        .arg("-f")
        .arg(page_number.to_string())
        .arg("-l")
        .arg(page_number.to_string())
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-singlefile")
        .arg("-png")
        .arg(pdf_path)
        .arg(output_root);
    run_tool(command, "pdftoppm", pdf_path)?;

    let png_path = PathBuf::from(format!("{}.png", output_root.display()));
    if !png_path.exists() {
        bail!(
            "pdftoppm did not produce expected image for {} page {}",
            pdf_path.display(),
            page_number
        );
    }
    Ok(png_path)
}

/// Writes every embedded image in its native format as
/// `{output_root}-{page:03}-{number:03}.{ext}`. Masks and stencils are
/// written too; `list_images` tells them apart.
pub fn extract_images(pdf_path: &Path, output_root: &Path) -> Result<()> {
    let mut command = Command::new("pdfimages");
    command.arg("-all").arg("-p").arg(pdf_path).arg(output_root);
    run_tool(command, "pdfimages", pdf_path)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageListing {
    pub page: usize,
    pub number: usize,
    pub kind: String,
}

/// Rows of `pdfimages -list`; `number` matches the extracted file numbering.
pub fn list_images(pdf_path: &Path) -> Result<Vec<ImageListing>> {
    let mut command = Command::new("pdfimages");
    command.arg("-list").arg(pdf_path);
    let output = run_tool(command, "pdfimages", pdf_path)?;
    Ok(parse_image_list(&String::from_utf8_lossy(&output.stdout)))
}

pub fn parse_image_list(text: &str) -> Vec<ImageListing> {
    text.lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let page = columns.next()?.parse::<usize>().ok()?;
            let number = columns.next()?.parse::<usize>().ok()?;
            let kind = columns.next()?.to_string();
            Some(ImageListing { page, number, kind })
        })
        .collect()
}

/// Writes 1-based pages `first..=last` to `pattern`, which must contain `%d`.
pub fn separate_pages(pdf_path: &Path, first: usize, last: usize, pattern: &Path) -> Result<()> {
    let mut command = Command::new("pdfseparate");
    command
        .arg("-f")
        .arg(first.to_string())
        .arg("-l")
        .arg(last.to_string())
        .arg(pdf_path)
        .arg(pattern);
    run_tool(command, "pdfseparate", pdf_path)?;
    Ok(())
}

pub fn unite(inputs: &[PathBuf], output_path: &Path) -> Result<()> {
    let mut command = Command::new("pdfunite");
    command.args(inputs).arg(output_path);
    run_tool(command, "pdfunite", output_path)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Re-emits 1-based pages `first..=last` cropped to `crop`, given in points
/// from the top-left corner of each page.
pub fn crop_pages(
    pdf_path: &Path,
    first: usize,
    last: usize,
    crop: CropBox,
    output_path: &Path,
) -> Result<()> {
    let mut command = Command::new("pdftocairo");
    command
        .arg("-pdf")
        .arg("-f")
        .arg(first.to_string())
        .arg("-l")
        .arg(last.to_string())
        .arg("-x")
        .arg(crop.x.to_string())
        .arg("-y")
        .arg(crop.y.to_string())
        .arg("-W")
        .arg(crop.width.to_string())
        .arg("-H")
        .arg(crop.height.to_string())
        .arg(pdf_path)
        .arg(output_path);
    run_tool(command, "pdftocairo", pdf_path)?;
    Ok(())
}

fn run_tool(mut command: Command, tool: &str, subject: &Path) -> Result<Output> {
    let output = command
        .output()
        .with_context(|| format!("failed to execute {tool} for {}", subject.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{tool} returned non-zero exit status for {}: {}",
            subject.display(),
            stderr.trim()
        );
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pdfinfo_reads_page_count() {
        let text = "\
Title:          OSN 2019
Producer:       pdfTeX-1.40.20
Pages:          12
Encrypted:      no
Page size:      595.276 x 841.89 pts (A4)
Page rot:       0
";
        let info = parse_pdfinfo(text).expect("pdfinfo output should parse");
        assert_eq!(info, PdfInfo { pages: 12 });
    }

    #[test]
    fn parse_pdfinfo_requires_page_count() {
        let err = parse_pdfinfo("Page size:      612 x 792 pts (letter)\n")
            .expect_err("missing page count");
        assert!(err.to_string().contains("no page count"));
    }

    #[test]
    fn parse_page_sizes_reads_ranged_output() {
        let text = "\
Pages:          3
Page    1 size: 595.276 x 841.89 pts (A4)
Page    1 rot:  0
Page    2 size: 612 x 792 pts (letter)
Page    2 rot:  0
Page    3 size: 595.276 x 841.89 pts (A4)
Page    3 rot:  90
Page size:      595.276 x 841.89 pts (A4)
";
        let sizes = parse_page_sizes(text);
        assert_eq!(
            sizes.iter().map(|size| size.page).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(sizes[1].width_pts, 612.0);
        assert_eq!(sizes[1].height_pts, 792.0);
        assert!((sizes[2].height_pts - 841.89).abs() < 1e-9);
    }

    #[test]
    fn parse_image_list_keeps_every_row_with_its_type() {
        let text = "\
page   num  type   width height color comp bpc  enc interp  object ID x-ppi y-ppi size ratio
--------------------------------------------------------------------------------------------
   1     0 image     800   600  rgb     3   8  jpeg   no        12  0    72    72 45.2K 3.2%
   1     1 smask     800   600  gray    1   8  image  no        13  0    72    72 1.2K 0.3%
   2     2 image    1654  2339  gray    1   1  ccitt  no        20  0   200   200 30.1K 6.3%
   2     3 stencil    64    64  -       1   1  image  no        21  0    72    72  12B 0.3%
";
        let rows = parse_image_list(text);
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[1],
            ImageListing {
                page: 1,
                number: 1,
                kind: "smask".to_string(),
            }
        );
        assert_eq!(
            rows.iter()
                .filter(|row| row.kind == "image")
                .map(|row| (row.page, row.number))
                .collect::<Vec<_>>(),
            vec![(1, 0), (2, 2)]
        );
    }

    #[test]
    fn parse_image_list_of_imageless_pdf_is_empty() {
        let text = "\
page   num  type   width height color comp bpc  enc interp  object ID x-ppi y-ppi size ratio
--------------------------------------------------------------------------------------------
";
        assert!(parse_image_list(text).is_empty());
    }

    #[test]
    fn parse_page_size_rejects_malformed_values() {
        assert_eq!(parse_page_size(" 612 x 792 pts"), Some((612.0, 792.0)));
        assert_eq!(parse_page_size(" 612 by 792 pts"), None);
        assert_eq!(parse_page_size(""), None);
    }
}
