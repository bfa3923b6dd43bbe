use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PartMatchError, Result};

static COLOR_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"colorID=([0-9]+)").unwrap());
static COLOR_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"background-color:\s*#([0-9a-fA-F]{6})").unwrap());

static COLOR_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.pciColorInfoTable").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static SWATCH: Lazy<Selector> = Lazy::new(|| Selector::parse("span.pciColorTabListItem").unwrap());

/// A color the catalog lists for an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownColor {
    pub id: u32,
    pub name: String,
    /// Six hex digits, without `#`
    pub hex: String,
}

impl std::fmt::Display for KnownColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:#{}", self.id, self.name, self.hex)
    }
}

/// A part-typed search result, in the order the catalog ranked it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub rank: usize,
    pub item_no: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    result: Option<SearchBody>,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(rename = "typeList")]
    type_list: Option<Vec<TypeGroup>>,
}

#[derive(Debug, Deserialize)]
struct TypeGroup {
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(rename = "strItemNo")]
    item_no: String,
    #[serde(rename = "strItemName", default)]
    item_name: String,
    #[serde(rename = "typeItem", default)]
    type_item: String,
}

/// Part hits from the first type group of a search response
pub fn parse_search_results(json: &str) -> Result<Vec<SearchHit>> {
    let envelope: SearchEnvelope = serde_json::from_str(json)?;

    let type_list = envelope
        .result
        .and_then(|body| body.type_list)
        .ok_or_else(|| PartMatchError::UnexpectedResponse("search payload has no result.typeList".to_string()))?;

    let Some(group) = type_list.into_iter().next() else {
        return Ok(Vec::new());
    };

    let hits = group
        .items
        .into_iter()
        .filter(|item| item.type_item.eq_ignore_ascii_case("p"))
        .enumerate()
        .map(|(rank, item)| SearchHit {
            rank,
            item_no: item.item_no,
            name: item.item_name.replace('\n', ""),
        })
        .collect::<Vec<_>>();

    debug!("Search response yielded {} part hits", hits.len());
    Ok(hits)
}

/// Colors listed in the catalog page's color info table
pub fn parse_known_colors(html: &str) -> Vec<KnownColor> {
    let document = Html::parse_document(html);

    let Some(table) = document.select(&COLOR_TABLE).next() else {
        debug!("Catalog page has no color table");
        return Vec::new();
    };

    let Some(cell) = table.select(&CELL).last() else {
        return Vec::new();
    };

    cell.select(&LINK)
        .zip(cell.select(&SWATCH))
        .filter_map(|(link, swatch)| color_from_pair(link, swatch))
        .collect()
}

fn color_from_pair(link: ElementRef<'_>, swatch: ElementRef<'_>) -> Option<KnownColor> {
    let id = COLOR_ID
        .captures(link.value().attr("href")?)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    let hex = COLOR_HEX
        .captures(swatch.value().attr("style")?)?
        .get(1)?
        .as_str()
        .to_uppercase();
    let name = link.text().collect::<String>().trim().to_string();

    Some(KnownColor { id, name, hex })
}
