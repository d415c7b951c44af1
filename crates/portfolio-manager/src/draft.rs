use serde::{Deserialize, Serialize};

use crate::{PortfolioEntry, PortfolioError};

/// The editable list of entries behind the portfolio form.
///
/// Entries are kept in insertion order and may repeat a ticker; duplicates are
/// merged only when risk is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioDraft {
    entries: Vec<PortfolioEntry>,
}

impl Default for PortfolioDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl PortfolioDraft {
    /// A draft holding a single blank entry, ready to be filled in.
    pub fn new() -> Self {
        Self {
            entries: vec![PortfolioEntry::default()],
        }
    }

    pub fn entries(&self) -> &[PortfolioEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry and return the new entry count.
    pub fn add_entry(&mut self, mut entry: PortfolioEntry) -> Result<usize, PortfolioError> {
        check_shares(entry.shares)?;
        entry.stock = entry.stock.trim().to_uppercase();
        self.entries.push(entry);
        Ok(self.entries.len())
    }

    /// Remove the entry at `index` and return the new entry count.
    pub fn remove_entry(&mut self, index: usize) -> Result<usize, PortfolioError> {
        if index >= self.entries.len() {
            return Err(PortfolioError::EntryNotFound {
                index,
                len: self.entries.len(),
            });
        }
        self.entries.remove(index);
        Ok(self.entries.len())
    }

    pub fn update_entry(
        &mut self,
        index: usize,
        stock: Option<String>,
        shares: Option<f64>,
    ) -> Result<&PortfolioEntry, PortfolioError> {
        let len = self.entries.len();
        if let Some(shares) = shares {
            check_shares(shares)?;
        }
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(PortfolioError::EntryNotFound { index, len })?;

        if let Some(stock) = stock {
            entry.stock = stock.trim().to_uppercase();
        }
        if let Some(shares) = shares {
            entry.shares = shares;
        }
        Ok(entry)
    }

    /// Entries that can be priced, normalised.
    pub fn valid_entries(&self) -> Vec<PortfolioEntry> {
        self.entries.iter().filter_map(PortfolioEntry::normalized).collect()
    }
}

fn check_shares(shares: f64) -> Result<(), PortfolioError> {
    if !shares.is_finite() || shares < 0.0 {
        return Err(PortfolioError::InvalidShares(shares));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_draft_has_one_blank_entry() {
        let draft = PortfolioDraft::new();
        assert_eq!(draft.len(), 1);
        assert_eq!(draft.entries()[0], PortfolioEntry::default());
        assert!(draft.valid_entries().is_empty());
    }

    #[test]
    fn test_add_and_remove_change_count_by_one() {
        let mut draft = PortfolioDraft::new();
        let before = draft.len();
        assert_eq!(draft.add_entry(PortfolioEntry::new("aapl", 10.0)).unwrap(), before + 1);
        assert_eq!(draft.add_entry(PortfolioEntry::default()).unwrap(), before + 2);
        assert_eq!(draft.remove_entry(0).unwrap(), before + 1);
        assert_eq!(draft.entries()[0].stock, "AAPL");
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut draft = PortfolioDraft::new();
        assert!(matches!(
            draft.remove_entry(3),
            Err(PortfolioError::EntryNotFound { index: 3, len: 1 })
        ));
        assert_eq!(draft.len(), 1);
    }

    #[test]
    fn test_update_and_valid_entries() {
        let mut draft = PortfolioDraft::new();
        draft.update_entry(0, Some(" msft ".to_string()), None).unwrap();
        assert!(draft.valid_entries().is_empty());

        draft.update_entry(0, None, Some(5.0)).unwrap();
        draft.add_entry(PortfolioEntry::new("MSFT", 2.0)).unwrap();
        draft.add_entry(PortfolioEntry::new("  ", 3.0)).unwrap();

        let valid = draft.valid_entries();
        assert_eq!(valid, vec![PortfolioEntry::new("MSFT", 5.0), PortfolioEntry::new("MSFT", 2.0)]);
    }

    #[test]
    fn test_negative_shares_rejected() {
        let mut draft = PortfolioDraft::new();
        assert!(matches!(
            draft.update_entry(0, None, Some(-1.0)),
            Err(PortfolioError::InvalidShares(_))
        ));
        assert!(draft.add_entry(PortfolioEntry::new("IBM", f64::NAN)).is_err());
        assert_eq!(draft.len(), 1);
    }
}
