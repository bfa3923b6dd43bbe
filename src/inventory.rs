use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Catalog IDs known to be relevant, e.g. exported from a set inventory.
///
/// Used to narrow search candidates before keyword ranking.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    ids: HashSet<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let inventory = Self::parse(&content)?;
        debug!("Loaded {} inventory IDs from {}", inventory.len(), path.display());
        Ok(inventory)
    }

    /// One ID per record; the first column of a CSV is used, a header row is skipped
    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut ids = HashSet::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let Some(first) = record.get(0).filter(|cell| !cell.is_empty()) else {
                continue;
            };
            if index == 0 && !first.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            ids.insert(first.to_lowercase());
        }

        Ok(Self { ids })
    }

    pub fn contains(&self, item_no: &str) -> bool {
        self.ids.contains(&item_no.to_lowercase())
    }

    pub fn insert(&mut self, item_no: &str) {
        self.ids.insert(item_no.to_lowercase());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for Inventory {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for id in iter {
            inventory.insert(id);
        }
        inventory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_list() {
        let inventory = Inventory::parse("3626bpb0123\n\n# heads\n3626BPB0456\n").unwrap();
        assert_eq!(inventory.len(), 2);
        assert!(inventory.contains("3626bpb0123"));
        assert!(inventory.contains("3626bpb0456"));
    }

    #[test]
    fn test_parse_csv_with_header() {
        let inventory =
            Inventory::parse("ItemNo,Color,Qty\n3626bpb0123,3,1\n973pb55,11,2\n").unwrap();
        assert_eq!(inventory.len(), 2);
        assert!(inventory.contains("973PB55"));
        assert!(!inventory.contains("itemno"));
    }

    #[test]
    fn test_from_iterator() {
        let inventory: Inventory = ["3626a", "3626B"].into_iter().collect();
        assert!(inventory.contains("3626b"));
        assert!(!inventory.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = Inventory::load(Path::new("/nonexistent/inventory.csv")).await;
        assert!(result.is_err());
    }
}
