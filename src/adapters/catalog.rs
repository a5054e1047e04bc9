use crate::domain::model::CatalogEntry;
use crate::utils::error::Result;
use regex::Regex;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

/// Numeric marketplace product id from a listing URL. Handles the canonical
/// `/item/<id>.html` shape plus the alternates the marketplace serves, and
/// normalizes the `.us` mirror host. Ids shorter than 10 digits are redirect
/// artifacts ("404" pages and the like) and are rejected.
pub fn extract_product_id(link: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"/item/(\d+)\.html").unwrap(),
            Regex::new(r"/p/[^/]+/(\d+)\.html").unwrap(),
            Regex::new(r"product/(\d+)").unwrap(),
            Regex::new(r"productId=(\d+)").unwrap(),
        ]
    });

    if link.is_empty() {
        return None;
    }
    let link = link.replace(".aliexpress.us", ".aliexpress.com");

    patterns
        .iter()
        .find_map(|pattern| pattern.captures(&link))
        .map(|caps| caps[1].to_string())
        .filter(|id| id.len() >= 10)
}

/// Brazilian-formatted price cell to a number: `"R$ 1.234,56"` -> `1234.56`.
/// Empty cells, `-` placeholders and stray URLs parse to 0.0, which the
/// caller treats as "no price".
pub fn parse_brl_price(cell: &str) -> f64 {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return 0.0;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return 0.0;
    }

    let cleaned = trimmed.replace("R$", "").replace(' ', "");
    let lowered = cleaned.to_ascii_lowercase();
    if lowered.starts_with("http") || lowered.contains("youtu") || lowered.contains("www.") {
        return 0.0;
    }

    let normalized = if cleaned.contains(',') && cleaned.contains('.') {
        // 1.234,56 -> thousands dots, decimal comma
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.contains(',') {
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    normalized.parse::<f64>().unwrap_or_else(|_| {
        tracing::warn!("Could not parse price cell: {}", cell);
        0.0
    })
}

/// Reader for the curated catalog's CSV export (one sheet per category).
///
/// The sheet is human-maintained: section separator rows, a `Produto` header
/// row per section, then product rows. Rows without a marketplace link are
/// skipped, they cannot be priced.
pub struct CsvCatalog;

impl CsvCatalog {
    pub fn from_path(path: impl AsRef<Path>, category: &str) -> Result<Vec<CatalogEntry>> {
        let file = std::fs::File::open(path)?;
        Self::parse(file, category)
    }

    pub fn parse(reader: impl Read, category: &str) -> Result<Vec<CatalogEntry>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut entries = Vec::new();
        let mut current_section = String::from("default");
        let mut columns: Option<HashMap<Column, usize>> = None;

        for row in csv_reader.records() {
            let row = row?;
            let cells: Vec<&str> = row.iter().map(str::trim).collect();
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }

            let first = cells[0].to_lowercase();
            if first.starts_with("produto") {
                columns = Some(map_columns(&cells));
                continue;
            }

            if is_section_row(&cells) {
                current_section = cells[0].to_string();
                tracing::debug!("Catalog section: {}", current_section);
                continue;
            }

            let Some(cols) = &columns else {
                continue;
            };
            let Some(entry) = parse_product_row(&cells, cols, category, &current_section) else {
                continue;
            };
            entries.push(entry);
        }

        tracing::info!("Parsed {} catalog entries for {}", entries.len(), category);
        Ok(entries)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Name,
    BasePrice,
    FinalPrice,
    Link,
    Description,
}

fn map_columns(header: &[&str]) -> HashMap<Column, usize> {
    let mut map = HashMap::new();
    for (index, cell) in header.iter().enumerate() {
        let name = cell.to_lowercase();
        let column = if name.starts_with("produto") || name.starts_with("product") {
            Some(Column::Name)
        } else if name.contains("final") {
            Some(Column::FinalPrice)
        } else if name.contains("preço") || name.contains("preco") || name.contains("price") {
            Some(Column::BasePrice)
        } else if name.contains("link") || name.contains("aliexpress") {
            Some(Column::Link)
        } else if name.contains("descri") || name.contains("descript") {
            Some(Column::Description)
        } else {
            None
        };
        if let Some(column) = column {
            map.entry(column).or_insert(index);
        }
    }
    map
}

/// A section separator is a sparse label row: a few filled cells, none of
/// which look like a price or a link.
fn is_section_row(cells: &[&str]) -> bool {
    let non_empty = cells.iter().filter(|c| !c.is_empty()).count();
    if non_empty > 3 || cells[0].is_empty() || cells[0] == "-" {
        return false;
    }
    let has_price = cells
        .iter()
        .skip(1)
        .any(|c| c.to_lowercase().contains("r$") || parse_brl_price(c) > 0.0);
    let has_link = cells.iter().any(|c| c.to_lowercase().contains("http"));
    !has_price && !has_link
}

fn parse_product_row(
    cells: &[&str],
    columns: &HashMap<Column, usize>,
    category: &str,
    section: &str,
) -> Option<CatalogEntry> {
    let cell = |column: Column| -> &str {
        columns
            .get(&column)
            .and_then(|&i| cells.get(i))
            .copied()
            .unwrap_or("")
    };

    let name = cell(Column::Name);
    if name.is_empty() {
        return None;
    }

    let link = cell(Column::Link);
    if !link.starts_with("http") {
        return None;
    }

    Some(CatalogEntry {
        name: name.to_string(),
        category: category.to_string(),
        section: section.to_string(),
        base_price: parse_brl_price(cell(Column::BasePrice)),
        final_price: parse_brl_price(cell(Column::FinalPrice)),
        link: link.to_string(),
        description: cell(Column::Description).to_string(),
    })
}
