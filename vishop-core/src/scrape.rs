//! Structural readers for the remote site's HTML pages.
//!
//! The site has no API, so every value comes from a structural query: a label
//! cell, a heading, a column header or a form field name. Each query goes
//! through a find-or-fail accessor that names its anchor, so a markup change
//! surfaces as one [`VishopError::Scrape`] pointing at the broken assumption.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::contract::{AccountInfo, RemoteScript, ScriptDetails};
use crate::error::{Result, VishopError};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| VishopError::Scrape(format!("invalid selector '{css}': {e}")))
}

/// Concatenated, trimmed text content of an element.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// First `tag` element whose whole text equals `text`.
fn find_by_text<'a>(doc: &'a Html, tag: &str, text: &str) -> Result<ElementRef<'a>> {
    let sel = selector(tag)?;
    doc.select(&sel)
        .find(|el| text_of(*el) == text)
        .ok_or_else(|| VishopError::Scrape(format!("cannot find <{tag}> with text '{text}'")))
}

/// The next sibling element of `element` named `tag`.
fn next_sibling_named<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == tag)
}

fn ancestor_named<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == tag)
}

/// Text of the cell right after the label cell reading `label`.
fn labelled_value(doc: &Html, label: &str) -> Result<String> {
    let label_cell = find_by_text(doc, "td", label)?;
    let value_cell = next_sibling_named(label_cell, "td").ok_or_else(|| {
        VishopError::Scrape(format!("no value cell next to label '{label}'"))
    })?;
    Ok(text_of(value_cell))
}

fn select_first<'a>(doc: &'a Html, css: &str) -> Result<ElementRef<'a>> {
    let sel = selector(css)?;
    doc.select(&sel)
        .next()
        .ok_or_else(|| VishopError::Scrape(format!("cannot find element '{css}'")))
}

fn cells<'a>(row: ElementRef<'a>, cell: &Selector) -> Vec<ElementRef<'a>> {
    row.select(cell).collect()
}

/// Extract the numeric script id from a link such as `script.php?script_id=42`.
pub fn script_id_from_href(href: &str) -> Result<String> {
    let re = Regex::new(r"script_id=(\d+)")
        .map_err(|e| VishopError::Scrape(format!("invalid id pattern: {e}")))?;
    re.captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| VishopError::Scrape(format!("cannot find script id in link '{href}'")))
}

/// Parse the account page.
pub fn parse_account(html: &str) -> Result<AccountInfo> {
    let doc = Html::parse_document(html);

    let user_name = labelled_value(&doc, "user name")?;
    let first_name = labelled_value(&doc, "first name")?;
    let last_name = labelled_value(&doc, "last name")?;
    let email = labelled_value(&doc, "email")?;

    let title = find_by_text(&doc, "h1", "Script Contributions")?;
    let table = next_sibling_named(title, "table").ok_or_else(|| {
        VishopError::Scrape("no table after the 'Script Contributions' heading".into())
    })?;

    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a[href]")?;
    let mut scripts = Vec::new();
    for row in table.select(&row_sel) {
        let cells = cells(row, &cell_sel);
        if cells.is_empty() {
            continue;
        }
        if cells.len() < 2 {
            return Err(VishopError::Scrape(format!(
                "contribution row has {} cell(s), expected name and summary",
                cells.len()
            )));
        }
        let link = cells[0]
            .select(&link_sel)
            .next()
            .ok_or_else(|| VishopError::Scrape("contribution row has no script link".into()))?;
        let href = link.value().attr("href").unwrap_or_default();
        scripts.push(RemoteScript {
            id: script_id_from_href(href)?,
            name: text_of(cells[0]),
            summary: text_of(cells[1]),
        });
    }
    debug!(count = scripts.len(), "Parsed script contributions");

    Ok(AccountInfo {
        user_name,
        first_name,
        last_name,
        email,
        scripts,
    })
}

/// Cells in a version row without the optional delete column.
const VERSION_ROW_CELLS: usize = 6;
/// Position of the version cell counted from the end of a row.
const VERSION_FROM_END: usize = 5;

/// Parse the version table of a script page.
///
/// Rows hold `package, version, date, required, user, note`; once a script has
/// more than one version a leading delete-button cell appears, so the version
/// column is located by counting cells.
pub fn parse_versions(html: &str) -> Result<Vec<String>> {
    let doc = Html::parse_document(html);

    let error_sel = selector("p.errorheader")?;
    if let Some(header) = doc.select(&error_sel).next() {
        let message = next_sibling_named(header, "p")
            .map(text_of)
            .unwrap_or_else(|| text_of(header));
        return Err(VishopError::Remote(message));
    }

    let package_header = find_by_text(&doc, "th", "package")?;
    let table = ancestor_named(package_header, "table")
        .ok_or_else(|| VishopError::Scrape("'package' header is not inside a table".into()))?;

    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let mut versions = Vec::new();
    for row in table.select(&row_sel).skip(1) {
        let cells = cells(row, &cell_sel);
        if cells.len() != VERSION_ROW_CELLS && cells.len() != VERSION_ROW_CELLS + 1 {
            return Err(VishopError::Scrape(format!(
                "version row has {} cells, expected {} or {}",
                cells.len(),
                VERSION_ROW_CELLS,
                VERSION_ROW_CELLS + 1
            )));
        }
        versions.push(text_of(cells[cells.len() - VERSION_FROM_END]));
    }
    debug!(?versions, "Parsed script versions");
    Ok(versions)
}

fn input_value(doc: &Html, name: &str) -> Result<String> {
    let input = select_first(doc, &format!("input[name=\"{name}\"]"))?;
    input
        .value()
        .attr("value")
        .map(str::to_string)
        .ok_or_else(|| VishopError::Scrape(format!("input '{name}' has no value")))
}

fn textarea_text(doc: &Html, name: &str) -> Result<String> {
    let area = select_first(doc, &format!("textarea[name=\"{name}\"]"))?;
    Ok(area.text().collect())
}

/// Parse the edit form of a script.
pub fn parse_details(html: &str) -> Result<ScriptDetails> {
    let doc = Html::parse_document(html);
    Ok(ScriptDetails {
        name: input_value(&doc, "script_name")?,
        summary: input_value(&doc, "summary")?,
        description: textarea_text(&doc, "description")?,
        install_details: textarea_text(&doc, "install_details")?,
    })
}
