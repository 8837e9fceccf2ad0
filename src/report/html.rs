//! HTML page for the executive summary

use super::modal::ModalContainer;
use super::{AnatImages, Report, TxImages};
use crate::error::Error;
use crate::series::{Category, Cell, SeriesRow, SeriesTable};
use crate::tools::params::{AcquisitionParams, HEADER};
use std::io::{self, Write};

const REPORT_JS: &str = include_str!("report.js");

pub fn write<W: Write>(writer: &mut W, report: &Report) -> io::Result<()> {
    let body = render_body(report).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Executive Summary: {title}</title>
    <link rel="stylesheet" href="https://www.w3schools.com/w3css/4/w3.css">
    <style type="text/css">
        header, footer, section, article, nav, aside {{ display: block; }}
        h1, h2, h3, h4, body, button, p {{ font-family: Verdana, Helvetica, Arial, sans-serif; }}
        h2 {{ text-align: center; font-size: 2.00em; }}
        h6 {{ text-align: left; font-size: 1.10em; }}
        img {{ width: 100%; padding: 2px; }}
        .label1 {{ font-size: 1.25em; text-align: center; }}
        .label2 {{ font-size: 1.00em; text-align: center; }}
        .label3 {{ font-size: 1.25em; text-align: left; }}
        .label4 {{ font-size: 1.25em; text-align: right; }}
        .hidden {{ display: none; }}
        .clickable {{ cursor: pointer; }}
        .T1pngs, .T2pngs, .Registrations, .Images {{ display: none; }}
        table.params {{ margin: 1em auto; border-collapse: collapse; }}
        table.params th, table.params td {{ padding: 0.3em 0.8em; border: 1px solid #ccc; text-align: right; }}
        table.params td:first-child {{ text-align: left; }}
        .generated {{ text-align: center; color: #777; font-size: 0.8em; }}
    </style>
</head>
<body>
<header>
    <h2>{title}</h2>
    <p class="generated">Generated {generated}</p>
</header>
{body}
<script>
{scripts}
</script>
</body>
</html>
"#,
        title = escape(&report.title()),
        generated = escape(&report.generated),
        body = body,
        scripts = REPORT_JS,
    )?;

    Ok(())
}

/// Sections, modal containers and per-section scripts.
fn render_body(report: &Report) -> Result<String, Error> {
    let mut regs = ModalContainer::slider("regs_modal", "Registrations");
    let mut images = ModalContainer::new("img_modal", "Images");

    let (t1, t1_scripts) = tx_section(&report.t1, report.tile)?;
    let (t2, t2_scripts) = tx_section(&report.t2, report.tile)?;
    let anat = anat_section(&report.anat, &report.images_dir, &mut regs, &mut images)?;
    let params = params_section(&report.params);
    let tasks = tasks_section(&report.tasks, &report.images_dir, &mut regs, &mut images)?;

    let mut body = String::new();
    body.push_str(&t1);
    body.push_str(&t2);
    body.push_str(&anat);
    body.push_str(&params);
    body.push_str(&tasks);
    body.push_str(&images.close());
    body.push_str(&regs.close());
    body.push_str(&t1_scripts);
    body.push_str(&t2_scripts);
    body.push_str(&images.scripts());
    body.push_str(&regs.scripts());
    Ok(body)
}

fn tx_section(tx: &TxImages, tile: u32) -> Result<(String, String), Error> {
    let name = escape(&tx.tx);
    let mut slider = ModalContainer::slider(&format!("{}_modal", tx.tx), &format!("{}pngs", tx.tx));
    slider.add_images(&tx.pngs)?;

    let (label, viewer, loader) = match &tx.mosaic {
        Some(mosaic) => {
            let viewer_id = format!("{name}-viewer");
            let sprite_id = format!("{name}-spriteImg");
            (
                format!("<h6>BrainSprite Viewer: {name}</h6>"),
                format!(
                    r#"<div class="w3-row w3-hide-small">
            <canvas id="{viewer_id}" style="max-width: 100%"></canvas>
            <img id="{sprite_id}" class="hidden" src="{src}">
        </div>"#,
                    src = escape(mosaic)
                ),
                format!(
                    r#"<script>
window.addEventListener('load', function() {{
    brainsprite({{ canvas: "{viewer_id}", sprite: "{sprite_id}", nbSlice: {{ Y: {n}, Z: {n} }}, flagCoordinates: true }});
}});
</script>
"#,
                    n = tile
                ),
            )
        }
        None => (format!("<h6>{name}: no BrainSprite mosaic</h6>"), String::new(), String::new()),
    };

    let button = if slider.is_empty() {
        String::new()
    } else {
        slider.button(&format!("View {} pngs", tx.tx))
    };

    let mut section = format!(
        r#"
<section id="{name}">
    <div class="w3-container">
        <div class="w3-cell w3-left label3">{label}</div>
        <div class="w3-cell w3-right">{button}</div>
    </div>
    <div class="w3-container">
        {viewer}
    </div>
</section>
"#
    );
    section.push_str(&slider.close());

    let scripts = loader + &slider.scripts();
    Ok((section, scripts))
}

/// An `<img>` for a cell. Real images are added to `modal` and open it at
/// their index; placeholders are not clickable.
fn cell_img(cell: &Cell, images_dir: &str, modal: &mut ModalContainer) -> Result<String, Error> {
    let src = cell.resolve(images_dir);
    match cell {
        Cell::Image(path) => {
            let index = modal.add_image(path)?;
            Ok(format!(
                r#"<img class="clickable" src="{}" onclick="{}">"#,
                escape(&src),
                modal.opener(index)
            ))
        }
        Cell::Placeholder(_) => Ok(format!(r#"<img src="{}">"#, escape(&src))),
    }
}

fn anat_section(
    anat: &AnatImages,
    dir: &str,
    regs: &mut ModalContainer,
    images: &mut ModalContainer,
) -> Result<String, Error> {
    let pre = cell_img(&anat.pre_reg_gray, dir, images)?;
    let post = cell_img(&anat.post_reg_gray, dir, images)?;
    let atlas_in_t1 = cell_img(&anat.atlas_in_t1, dir, regs)?;
    let t1_in_atlas = cell_img(&anat.t1_in_atlas, dir, regs)?;

    Ok(format!(
        r#"
<section id="Anat">
    <div class="w3-container">
        <div class="w3-row">
            <div class="w3-half w3-center label1">Resting State Grayordinates Plots</div>
            <div class="w3-half w3-center label1">Atlas Registration</div>
        </div>
        <div class="w3-cell-row">
            <div class="w3-quarter w3-center label1">Pre-Regression</div>
            <div class="w3-quarter w3-center label1">Post-Regression</div>
            <div class="w3-quarter w3-center label1">Atlas in T1</div>
            <div class="w3-quarter w3-center label1">T1 in Atlas</div>
        </div>
        <div class="w3-row">
            <div class="w3-quarter">{pre}</div>
            <div class="w3-quarter">{post}</div>
            <div class="w3-quarter">{atlas_in_t1}</div>
            <div class="w3-quarter">{t1_in_atlas}</div>
        </div>
    </div>
</section>
"#
    ))
}

fn params_section(params: &[AcquisitionParams]) -> String {
    if params.is_empty() {
        return String::new();
    }

    let head: String = HEADER.iter().map(|h| format!("<th>{}</th>", escape(h))).collect();
    let rows: String = params
        .iter()
        .map(|p| {
            let cells: String = p.record().iter().map(|v| format!("<td>{}</td>", escape(v))).collect();
            format!("            <tr>{cells}</tr>\n")
        })
        .collect();

    format!(
        r#"
<section id="Params">
    <div class="w3-container">
        <div class="label1">Acquisition Parameters</div>
        <table class="params">
            <tr>{head}</tr>
{rows}        </table>
    </div>
</section>
"#
    )
}

pub fn row_label(task: &str, row: &SeriesRow) -> String {
    format!("task-{} run-{:02}", task, row.series)
}

fn task_row(
    task: &str,
    row: &SeriesRow,
    dir: &str,
    regs: &mut ModalContainer,
    images: &mut ModalContainer,
) -> Result<String, Error> {
    let mut img = |category: Category| -> Result<String, Error> {
        let modal = match category {
            Category::TaskInT1 | Category::T1InTask => &mut *regs,
            _ => &mut *images,
        };
        cell_img(row.cell(category), dir, modal)
    };

    let pre = img(Category::PreRegGray)?;
    let post = img(Category::PostRegGray)?;
    let task_in_t1 = img(Category::TaskInT1)?;
    let t1_in_task = img(Category::T1InTask)?;
    let reference = img(Category::Reference)?;
    let bold = img(Category::Bold)?;

    Ok(format!(
        r#"
        <div class="w3-cell-row">
            <div class="w3-col s1 label4">{label}</div>
            <div class="w3-col s2">{pre}</div>
            <div class="w3-col s2">{post}</div>
            <div class="w3-col s2">{task_in_t1}</div>
            <div class="w3-col s2">{t1_in_task}</div>
            <div class="w3-col s3">{reference}<br>{bold}</div>
        </div>"#,
        label = escape(&row_label(task, row)),
    ))
}

fn tasks_section(
    tables: &[SeriesTable],
    images_dir: &str,
    regs: &mut ModalContainer,
    images: &mut ModalContainer,
) -> Result<String, Error> {
    let mut rows = String::new();
    for table in tables {
        for row in &table.rows {
            rows.push_str(&task_row(&table.task, row, images_dir, regs, images)?);
        }
    }
    if rows.is_empty() {
        rows.push_str(r#"
        <div class="w3-row label2">No tasks were found.</div>"#);
    }

    Ok(format!(
        r#"
<section id="Tasks">
    <div class="w3-container">
        <div class="w3-row">
            <div class="w3-col s1 label1">Task</div>
            <div class="w3-col s2 label1">{pre}</div>
            <div class="w3-col s2 label1">{post}</div>
            <div class="w3-col s2 label1">{task_in_t1}</div>
            <div class="w3-col s2 label1">{t1_in_task}</div>
            <div class="w3-col s3 label2">Reference (top) and BOLD (bottom)</div>
        </div>{rows}
    </div>
</section>
"#,
        pre = Category::PreRegGray.label(),
        post = Category::PostRegGray.label(),
        task_in_t1 = Category::TaskInT1.label(),
        t1_in_task = Category::T1InTask.label(),
    ))
}

/// Escape text for HTML content and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{GapPolicy, Placeholder, SeriesMatcher};
    use std::path::PathBuf;

    fn report(tasks: Vec<SeriesTable>, params: Vec<AcquisitionParams>) -> Report {
        Report {
            subject: "sub-01".into(),
            session: Some("ses-<A>".into()),
            generated: "2024-01-01 00:00:00".into(),
            images_dir: "./img".into(),
            tile: 218,
            t1: TxImages {
                tx: "T1".into(),
                mosaic: Some("./img/T1_mosaic.jpg".into()),
                pngs: vec!["./img/s_T1-x-55.png".into(), "./img/s_T1-y-115.png".into()],
            },
            t2: TxImages {
                tx: "T2".into(),
                mosaic: None,
                pngs: vec![],
            },
            anat: AnatImages {
                pre_reg_gray: Cell::Image("./img/DVARS_and_FD_CONCA.png".into()),
                post_reg_gray: Cell::Placeholder(Placeholder::Square),
                atlas_in_t1: Cell::Image("./img/atlas_in_t1.gif".into()),
                t1_in_atlas: Cell::Placeholder(Placeholder::Square),
            },
            params,
            tasks,
        }
    }

    fn render(report: &Report) -> String {
        let mut out = Vec::new();
        write(&mut out, report).unwrap();
        String::from_utf8(out).unwrap()
    }

    // ==========================================================================
    // DOCUMENT TESTS
    // ==========================================================================

    #[test]
    fn test_title_is_escaped() {
        let html = render(&report(vec![], vec![]));
        assert!(html.contains("<title>Executive Summary: sub-01: ses-&lt;A&gt;</title>"));
        assert!(!html.contains("ses-<A>"));
    }

    #[test]
    fn test_every_task_row_is_labelled() {
        let m = SeriesMatcher::new("REST").unwrap();
        let lists = [
            vec!["./img/DVARS_and_FD_REST1.png".to_string()],
            vec![],
            vec![],
            vec![],
            vec!["./img/sub01_REST2_sbref.png".to_string()],
            vec![],
        ];
        let table = m.align(&lists, GapPolicy::Observed);
        let html = render(&report(vec![table], vec![]));

        assert!(html.contains("task-REST run-01"));
        assert!(html.contains("task-REST run-02"));
        assert!(html.contains("./img/square_placeholder_text.png"));
        assert!(html.contains("./img/rectangular_placeholder_text.png"));
    }

    #[test]
    fn test_placeholders_follow_images_dir() {
        let m = SeriesMatcher::new("REST").unwrap();
        let lists = [vec!["./pics/DVARS_and_FD_REST1.png".to_string()], vec![], vec![], vec![], vec![], vec![]];
        let mut report = report(vec![m.align(&lists, GapPolicy::Observed)], vec![]);
        report.images_dir = "./pics".into();
        let html = render(&report);

        assert!(html.contains(r#"<img src="./pics/square_placeholder_text.png">"#));
        assert!(html.contains(r#"<img src="./pics/rectangular_placeholder_text.png">"#));
        assert!(!html.contains("./img/square_placeholder_text.png"));
    }

    #[test]
    fn test_no_tasks_message() {
        let html = render(&report(vec![], vec![]));
        assert!(html.contains("No tasks were found."));
    }

    #[test]
    fn test_brainsprite_only_with_mosaic() {
        let html = render(&report(vec![], vec![]));
        assert!(html.contains(r#"<canvas id="T1-viewer""#));
        assert!(!html.contains(r#"<canvas id="T2-viewer""#));
        assert!(html.contains("nbSlice: { Y: 218, Z: 218 }"));
        assert!(html.contains("function brainsprite("));
    }

    #[test]
    fn test_registration_images_open_slider() {
        let html = render(&report(vec![], vec![]));
        // The atlas-in-T1 GIF is the first image of the registrations slider.
        assert!(html.contains("open_modal_to_index('regs_modal', 'Registrations', 1)"));
        assert!(html.contains("open_modal_to_index('T1_modal', 'T1pngs', 1)"));
    }

    #[test]
    fn test_params_table() {
        let params = vec![AcquisitionParams {
            file: PathBuf::from("a.nii"),
            modality: "T1w".into(),
            x: "1.00".into(),
            y: "1.00".into(),
            z: "1.00".into(),
            te: "2.14".into(),
            tr: "2400.00".into(),
            frames: "1.00".into(),
            ti: "Not found".into(),
        }];
        let html = render(&report(vec![], params));
        assert!(html.contains("<th>Modality</th>"));
        assert!(html.contains("<td>2400.00</td>"));

        let without = render(&report(vec![], vec![]));
        assert!(!without.contains("Acquisition Parameters"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape("plain"), "plain");
    }
}
