//! Plain-text rendering of pages and their controls.

use std::fmt::Write;

use valantis_sdk::models::controls::PageControl;
use valantis_sdk::models::pipeline::PageResult;
use valantis_sdk::models::session::ViewStatus;

pub const MISSING_BRAND: &str = "not specified";
const HEADER: [&str; 5] = ["№", "ID", "Name", "Price", "Brand"];

/// Render `page` as a table with rows numbered across pages.
pub fn render_page(page: &PageResult) -> String {
    if page.items.is_empty() {
        return if page.total_items == 0 {
            "No products found.\n".to_string()
        } else {
            format!(
                "Page {} is empty, there are {} page(s).\n",
                page.page, page.total_pages
            )
        };
    }

    let rows = page
        .items
        .iter()
        .enumerate()
        .map(|(index, product)| {
            [
                (page.first_row_number() + index).to_string(),
                product.id.to_string(),
                product.name.clone(),
                product.price.to_string(),
                product
                    .brand
                    .clone()
                    .unwrap_or_else(|| MISSING_BRAND.to_string()),
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = HEADER.map(|title| title.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &HEADER, &widths);
    write_row(
        &mut out,
        &widths.map(|width| "-".repeat(width)),
        &widths,
    );
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    let _ = writeln!(
        out,
        "\nPage {} of {} ({} products)",
        page.page, page.total_pages, page.total_items
    );
    out
}

fn write_row(out: &mut String, cells: &[impl AsRef<str>], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{}", line.trim_end());
}

/// Render the control strip, e.g. `‹ prev 1 2 … 5 [6] 7 … 10 next ›`.
pub fn render_controls(controls: &[PageControl]) -> String {
    controls
        .iter()
        .map(|control| match control {
            PageControl::Previous => "‹ prev".to_string(),
            PageControl::Page {
                number,
                current: true,
            } => format!("[{number}]"),
            PageControl::Page { number, .. } => number.to_string(),
            PageControl::Ellipsis { .. } => "…".to_string(),
            PageControl::Next => "next ›".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A one line description of `status`, if there is anything to say.
pub fn render_status(status: &ViewStatus) -> Option<String> {
    match status {
        ViewStatus::Idle | ViewStatus::Ready => None,
        ViewStatus::Loading => Some("Loading…".to_string()),
        ViewStatus::Retrying { attempt, error } => Some(format!(
            "Attempt {attempt} failed ({error}), retrying…"
        )),
        ViewStatus::Failed { message } => Some(format!("Query failed: {message}")),
        ViewStatus::Unavailable { message } => Some(format!(
            "The catalog is unavailable, showing the previous page: {message}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use valantis_catalog::{Product, ProductId};
    use valantis_sdk::models::controls::pagination_controls;

    use super::*;

    fn product(id: &str, name: &str, price: f64, brand: Option<&str>) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price,
            brand: brand.map(str::to_string),
        }
    }

    #[test]
    fn table_numbers_rows_from_page_offset() {
        let page = PageResult {
            page: 3,
            items: vec![
                product("1789ecf3", "Золотое кольцо", 16700.0, Some("Piaget")),
                product("2b7c", "Серьги", 4500.5, None),
            ],
            total_pages: 3,
            total_items: 102,
        };

        assert_eq!(render_page(&page), indoc! {"
            №    ID        Name            Price   Brand
            ---  --------  --------------  ------  -------------
            101  1789ecf3  Золотое кольцо  16700   Piaget
            102  2b7c      Серьги          4500.5  not specified

            Page 3 of 3 (102 products)
        "});
    }

    #[test]
    fn empty_results_are_explained() {
        let empty = PageResult {
            page: 1,
            items: vec![],
            total_pages: 0,
            total_items: 0,
        };
        assert_eq!(render_page(&empty), "No products found.\n");

        let past_the_end = PageResult {
            page: 4,
            items: vec![],
            total_pages: 3,
            total_items: 120,
        };
        assert_eq!(
            render_page(&past_the_end),
            "Page 4 is empty, there are 3 page(s).\n"
        );
    }

    #[test]
    fn control_strip() {
        assert_eq!(
            render_controls(&pagination_controls(6, 10)),
            "‹ prev 1 2 … 5 [6] 7 … 10 next ›"
        );
        assert_eq!(render_controls(&pagination_controls(1, 1)), "");
    }

    #[test]
    fn status_lines() {
        assert_eq!(render_status(&ViewStatus::Ready), None);
        assert_eq!(
            render_status(&ViewStatus::Retrying {
                attempt: 2,
                error: "timeout".to_string()
            })
            .unwrap(),
            "Attempt 2 failed (timeout), retrying…"
        );
    }
}
